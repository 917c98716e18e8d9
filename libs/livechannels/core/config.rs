use crate::traits::ReconnectionStrategy;
use std::time::Duration;

/// Default keep-alive interval between ping frames
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Default window within which a burst of subscribes collapses into one
/// connection rebuild
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(1);

/// Configuration for a [`RealtimeClient`](crate::core::client::RealtimeClient)
///
/// Built through the type-state builder; the endpoint and project id are
/// required, everything else has defaults.
pub struct ClientConfig {
    /// Realtime endpoint base URL (ws:// or wss://, no trailing slash)
    pub(crate) endpoint: String,

    /// Backend project identity, encoded on every connection URL
    pub(crate) project: String,

    /// Keep-alive ping interval while connected
    pub(crate) heartbeat_interval: Duration,

    /// Debounce window for coalescing rapid-fire subscribe calls
    pub(crate) debounce_window: Duration,

    /// Backoff schedule for unintentional disconnects
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,
}

impl ClientConfig {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    /// Build the connection target for the given channel set
    ///
    /// Every channel is encoded as a repeated `channels[]` query parameter,
    /// in channel-set iteration order.
    pub fn connection_url(&self, channels: &[String]) -> String {
        let mut url = format!("{}/realtime?project={}", self.endpoint, self.project);
        for channel in channels {
            url.push_str("&channels[]=");
            url.push_str(channel);
        }
        url
    }
}
