//! Type-state markers for the builder pattern
//!
//! These types track which required fields have been set in the builder at
//! compile-time, preventing invalid configurations.

use std::marker::PhantomData;

/// Marker trait for endpoint state
pub trait EndpointState {}

/// Endpoint has not been set
pub struct NoEndpoint;
impl EndpointState for NoEndpoint {}

/// Endpoint has been set
pub struct HasEndpoint;
impl EndpointState for HasEndpoint {}

/// Marker trait for project state
pub trait ProjectState {}

/// Project has not been set
pub struct NoProject;
impl ProjectState for NoProject {}

/// Project has been set
pub struct HasProject;
impl ProjectState for HasProject {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<E, P> {
    _endpoint: PhantomData<E>,
    _project: PhantomData<P>,
}

impl<E, P> TypeState<E, P> {
    pub(crate) fn new() -> Self {
        Self {
            _endpoint: PhantomData,
            _project: PhantomData,
        }
    }
}

impl<E, P> Default for TypeState<E, P> {
    fn default() -> Self {
        Self::new()
    }
}
