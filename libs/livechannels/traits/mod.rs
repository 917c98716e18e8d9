//! # LiveChannels Traits
//!
//! Core traits and types for the livechannels realtime client:
//!
//! - **ReconnectionStrategy**: Control backoff behavior after an
//!   unintentional disconnect
//! - **RealtimeError**: Error taxonomy for the client

pub mod error;
pub mod reconnect;

// Re-export commonly used types
pub use self::error::{RealtimeError, Result};
pub use self::reconnect::{FixedDelay, ReconnectionStrategy, SteppedBackoff};
