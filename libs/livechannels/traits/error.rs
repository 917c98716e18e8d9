use thiserror::Error;

/// Main error type for livechannels
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Inbound frame parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for livechannels operations
pub type Result<T> = std::result::Result<T, RealtimeError>;
