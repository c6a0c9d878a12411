//! Response callbacks.
//!
//! Every request carries an optional callback. Successful responses arrive via
//! [`ServerCallback::server_callback`]; failures, whether reported by the
//! server or detected locally, arrive via [`ServerCallback::server_error`].

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::service::{ServiceName, ServiceOperation};

/// Receiver of asynchronous request outcomes
///
/// Callbacks may be invoked from whichever thread drives the dispatcher or the
/// ping pump, so implementations must be `Send + Sync`.
pub trait ServerCallback: Send + Sync {
    /// Called with the JSON response of a successful request
    fn server_callback(&self, service: ServiceName, operation: ServiceOperation, json_data: &Value);

    /// Called when a request fails
    fn server_error(
        &self,
        service: ServiceName,
        operation: ServiceOperation,
        status_code: i32,
        reason_code: i32,
        message: &str,
    );
}

/// Shared handle to a callback
pub type SharedCallback = Arc<dyn ServerCallback>;

/// Callback built from a pair of closures
///
/// # Examples
///
/// ```
/// use braincloud_core::callback::{FnCallback, ServerCallback};
/// use braincloud_core::service::{ServiceName, ServiceOperation};
///
/// let callback = FnCallback::new(
///     |_, op, json| println!("{op} succeeded: {json}"),
///     |_, op, status, reason, message| eprintln!("{op} failed ({status}/{reason}): {message}"),
/// );
/// callback.server_callback(
///     ServiceName::LOBBY,
///     ServiceOperation::GET_LOBBY_DATA,
///     &serde_json::json!({"status": 200}),
/// );
/// ```
pub struct FnCallback<S, E> {
    on_success: S,
    on_error: E,
}

impl<S, E> FnCallback<S, E>
where
    S: Fn(ServiceName, ServiceOperation, &Value) + Send + Sync,
    E: Fn(ServiceName, ServiceOperation, i32, i32, &str) + Send + Sync,
{
    /// Create a callback from success and error closures
    pub fn new(on_success: S, on_error: E) -> Self {
        Self {
            on_success,
            on_error,
        }
    }

    /// Wrap into a [`SharedCallback`]
    pub fn shared(on_success: S, on_error: E) -> SharedCallback
    where
        S: 'static,
        E: 'static,
    {
        Arc::new(Self::new(on_success, on_error))
    }
}

impl<S, E> ServerCallback for FnCallback<S, E>
where
    S: Fn(ServiceName, ServiceOperation, &Value) + Send + Sync,
    E: Fn(ServiceName, ServiceOperation, i32, i32, &str) + Send + Sync,
{
    fn server_callback(&self, service: ServiceName, operation: ServiceOperation, json_data: &Value) {
        (self.on_success)(service, operation, json_data);
    }

    fn server_error(
        &self,
        service: ServiceName,
        operation: ServiceOperation,
        status_code: i32,
        reason_code: i32,
        message: &str,
    ) {
        (self.on_error)(service, operation, status_code, reason_code, message);
    }
}

impl<S, E> fmt::Debug for FnCallback<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}
