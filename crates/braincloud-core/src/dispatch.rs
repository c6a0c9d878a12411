//! Request dispatch abstraction.
//!
//! Service wrappers never talk to the network themselves. They build a
//! [`ServerCall`] and hand it to a [`RequestDispatch`] implementation, which
//! owns batching, transport, retries and authentication, and eventually
//! completes the call through its callback.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::callback::SharedCallback;
use crate::service::{ServiceName, ServiceOperation};

/// A single queued request
pub struct ServerCall {
    /// Target service
    pub service: ServiceName,

    /// Operation within the service
    pub operation: ServiceOperation,

    /// JSON payload
    pub data: Value,

    /// Receiver of the outcome, if the caller asked for one
    pub callback: Option<SharedCallback>,
}

impl ServerCall {
    /// Create a new server call
    pub fn new(
        service: ServiceName,
        operation: ServiceOperation,
        data: Value,
        callback: Option<SharedCallback>,
    ) -> Self {
        Self {
            service,
            operation,
            data,
            callback,
        }
    }

    /// Complete this call successfully
    pub fn succeed(self, json_data: &Value) {
        trace!(service = %self.service, operation = %self.operation, "server call succeeded");
        if let Some(callback) = self.callback {
            callback.server_callback(self.service, self.operation, json_data);
        }
    }

    /// Complete this call with an error
    pub fn fail(self, status_code: i32, reason_code: i32, message: &str) {
        trace!(
            service = %self.service,
            operation = %self.operation,
            status_code,
            reason_code,
            "server call failed"
        );
        if let Some(callback) = self.callback {
            callback.server_error(
                self.service,
                self.operation,
                status_code,
                reason_code,
                message,
            );
        }
    }
}

impl fmt::Debug for ServerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCall")
            .field("service", &self.service)
            .field("operation", &self.operation)
            .field("data", &self.data)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Collaborator that delivers server calls to the backend
///
/// Implementations must eventually complete every call they accept, either by
/// [`ServerCall::succeed`] or [`ServerCall::fail`].
pub trait RequestDispatch: Send + Sync {
    /// Queue a call for delivery
    fn add_to_queue(&self, call: ServerCall);
}

impl<T: RequestDispatch + ?Sized> RequestDispatch for Arc<T> {
    fn add_to_queue(&self, call: ServerCall) {
        (**self).add_to_queue(call);
    }
}
