pub mod states;

use crate::core::client::RealtimeClient;
use crate::core::config::{ClientConfig, DEFAULT_DEBOUNCE_WINDOW, DEFAULT_HEARTBEAT_INTERVAL};
use crate::traits::*;
use states::*;
use std::time::Duration;

/// Type-state builder for [`RealtimeClient`]
///
/// The type system enforces that the required fields (endpoint and project)
/// are set before the client can be built; everything else has defaults.
pub struct RealtimeClientBuilder<E, P>
where
    E: EndpointState,
    P: ProjectState,
{
    _state: TypeState<E, P>,
    endpoint: Option<String>,
    project: Option<String>,
    heartbeat_interval: Duration,
    debounce_window: Duration,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
}

impl RealtimeClientBuilder<NoEndpoint, NoProject> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            endpoint: None,
            project: None,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            reconnect_strategy: None,
        }
    }
}

impl Default for RealtimeClientBuilder<NoEndpoint, NoProject> {
    fn default() -> Self {
        Self::new()
    }
}

// Endpoint setting
impl<P> RealtimeClientBuilder<NoEndpoint, P>
where
    P: ProjectState,
{
    /// Set the realtime endpoint base URL (ws:// or wss://)
    pub fn endpoint(self, endpoint: impl Into<String>) -> RealtimeClientBuilder<HasEndpoint, P> {
        RealtimeClientBuilder {
            _state: TypeState::new(),
            endpoint: Some(endpoint.into()),
            project: self.project,
            heartbeat_interval: self.heartbeat_interval,
            debounce_window: self.debounce_window,
            reconnect_strategy: self.reconnect_strategy,
        }
    }
}

// Project setting
impl<E> RealtimeClientBuilder<E, NoProject>
where
    E: EndpointState,
{
    /// Set the backend project identity encoded on every connection URL
    pub fn project(self, project: impl Into<String>) -> RealtimeClientBuilder<E, HasProject> {
        RealtimeClientBuilder {
            _state: TypeState::new(),
            endpoint: self.endpoint,
            project: Some(project.into()),
            heartbeat_interval: self.heartbeat_interval,
            debounce_window: self.debounce_window,
            reconnect_strategy: self.reconnect_strategy,
        }
    }
}

// Optional configuration methods
impl<E, P> RealtimeClientBuilder<E, P>
where
    E: EndpointState,
    P: ProjectState,
{
    /// Set the keep-alive ping interval (default 20s)
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the debounce window for coalescing subscribe bursts (default 1ms)
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Set the reconnection strategy (default [`SteppedBackoff`])
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }
}

// Build method - only available when all required fields are set
impl RealtimeClientBuilder<HasEndpoint, HasProject> {
    /// Build the client and spawn its actor task
    ///
    /// Must be called within a Tokio runtime.
    pub async fn build(self) -> Result<RealtimeClient> {
        let endpoint = self.endpoint.expect("endpoint must be set");
        let project = self.project.expect("project must be set");

        if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
            return Err(RealtimeError::Configuration(format!(
                "endpoint must use ws:// or wss://, got: {}",
                endpoint
            )));
        }
        let endpoint = endpoint.trim_end_matches('/').to_string();

        if project.is_empty() {
            return Err(RealtimeError::Configuration("project must not be empty".into()));
        }

        let reconnect_strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(SteppedBackoff::new()));

        let config = ClientConfig {
            endpoint,
            project,
            heartbeat_interval: self.heartbeat_interval,
            debounce_window: self.debounce_window,
            reconnect_strategy,
        };

        Ok(RealtimeClient::spawn(config))
    }
}
