//! # LiveChannels
//!
//! A client-side realtime subscription manager over a single multiplexed
//! WebSocket connection.
//!
//! ## Features
//!
//! - **Independent subscriptions**: subscribe/unsubscribe to named channels
//!   with typed callbacks; the connection URL always encodes the union of
//!   live subscriptions' channels
//! - **Debounced rebuilds**: a burst of subscribe calls collapses into one
//!   connection rebuild
//! - **Heartbeat keep-alive**: periodic ping frames while connected
//! - **Stepped reconnect backoff**: unintentional closes reconnect forever
//!   with a step-function delay; intentional closes never reconnect
//! - **Isolated fan-out**: each matching subscription decodes the payload for
//!   its own type; one decode failure never suppresses delivery to others

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use crate::core::{
    builder,
    builder::{states, RealtimeClientBuilder},
    client::{ClientEvent, Metrics, RealtimeClient, Subscription},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    protocol::{InboundMessage, RawEvent, RealtimeEvent, ServerError},
    registry::SubscriptionRegistry,
};

/// Type alias for Result with RealtimeError
pub type Result<T> = std::result::Result<T, traits::RealtimeError>;
