//! # LiveChannels core
//!
//! The realtime engine: connection controller, subscription registry,
//! heartbeat monitor, wire protocol, and the type-state builder.

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod heartbeat;
pub mod protocol;
pub mod registry;

// Re-export main types
pub use self::builder::{states, RealtimeClientBuilder};
pub use self::client::{ClientEvent, Metrics, RealtimeClient, Subscription};
pub use self::config::ClientConfig;
pub use self::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use self::protocol::{InboundMessage, RawEvent, RealtimeEvent, ServerError};
pub use self::registry::SubscriptionRegistry;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new realtime client builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let client = livechannels::builder()
///     .endpoint("wss://cloud.example.com/v1")
///     .project("my-project")
///     .heartbeat_interval(Duration::from_secs(20))
///     .build()
///     .await?;
/// ```
pub fn builder() -> RealtimeClientBuilder<states::NoEndpoint, states::NoProject> {
    RealtimeClientBuilder::new()
}
