//! Callback pump
//!
//! Nothing produced by the ping subsystem reaches a caller's callback on its
//! own. Completed results and queued error events are handed over only when
//! the host calls [`PingCoordinator::run_callbacks`], typically once per frame
//! or tick of its main loop. A host that never pumps never hears back.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use braincloud_core::status::status_codes;
use braincloud_core::{Error, ServiceName, ServiceOperation, SharedCallback};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, warn};

use super::coordinator::{PingCoordinator, SessionState};

/// A failure waiting to be delivered by the pump
pub struct ErrorEvent {
    /// Service the failed call belongs to
    pub service: ServiceName,
    /// Operation that failed
    pub operation: ServiceOperation,
    /// Status code passed to the callback
    pub status_code: i32,
    /// Reason code passed to the callback
    pub reason_code: i32,
    /// Human-readable description
    pub message: String,
    callback: Option<SharedCallback>,
}

impl ErrorEvent {
    /// Create an error event addressed to `callback`
    pub fn new(
        service: ServiceName,
        operation: ServiceOperation,
        status_code: i32,
        reason_code: i32,
        message: impl Into<String>,
        callback: Option<SharedCallback>,
    ) -> Self {
        Self {
            service,
            operation,
            status_code,
            reason_code,
            message: message.into(),
            callback,
        }
    }

    /// Error event carrying the status and reason codes of `error`
    pub fn from_error(
        service: ServiceName,
        operation: ServiceOperation,
        error: &Error,
        callback: Option<SharedCallback>,
    ) -> Self {
        Self::new(
            service,
            operation,
            error.status_code(),
            error.reason_code(),
            error.message.clone(),
            callback,
        )
    }

    /// [`from_error`](Self::from_error) for the lobby `PING_REGIONS` operation
    pub fn ping_error(error: &Error, callback: Option<SharedCallback>) -> Self {
        Self::from_error(
            ServiceName::LOBBY,
            ServiceOperation::PING_REGIONS,
            error,
            callback,
        )
    }

    /// Error event for the lobby `PING_REGIONS` operation
    pub fn ping(
        status_code: i32,
        reason_code: i32,
        message: impl Into<String>,
        callback: Option<SharedCallback>,
    ) -> Self {
        Self::new(
            ServiceName::LOBBY,
            ServiceOperation::PING_REGIONS,
            status_code,
            reason_code,
            message,
            callback,
        )
    }

    /// Hand the event to its callback
    pub fn deliver(self) {
        match self.callback {
            Some(callback) => callback.server_error(
                self.service,
                self.operation,
                self.status_code,
                self.reason_code,
                &self.message,
            ),
            None => warn!(
                operation = %self.operation,
                status_code = self.status_code,
                reason_code = self.reason_code,
                message = %self.message,
                "dropping error event without callback"
            ),
        }
    }
}

impl fmt::Debug for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEvent")
            .field("service", &self.service)
            .field("operation", &self.operation)
            .field("status_code", &self.status_code)
            .field("reason_code", &self.reason_code)
            .field("message", &self.message)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// FIFO queue of error events
#[derive(Debug, Default)]
pub struct ErrorQueue {
    events: Mutex<VecDeque<ErrorEvent>>,
}

impl ErrorQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&self, event: ErrorEvent) {
        debug!(operation = %event.operation, reason_code = event.reason_code, "error event queued");
        self.events.lock().push_back(event);
    }

    /// Remove every queued event, oldest first
    pub fn drain(&self) -> Vec<ErrorEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl PingCoordinator {
    /// Deliver completed ping results and flush queued errors
    ///
    /// If the current session has completed, its results are passed once to
    /// the callback given to [`start_ping`](Self::start_ping) as
    /// `{"status": 200, "data": {region: latency, ...}}`, remembered as the
    /// latest [`ping_data`](Self::ping_data), and the coordinator returns to
    /// idle. Every queued error event is then delivered in the order it was
    /// queued. Callbacks run on the calling thread with no internal lock held,
    /// so they may start another session.
    ///
    /// Cheap enough to call on every tick; with nothing pending it does nothing.
    pub fn run_callbacks(&self) {
        let delivery = {
            let mut session = self.shared.session.lock();
            if session.state == SessionState::Completed {
                session.state = SessionState::Idle;
                let results = std::mem::take(&mut session.results);
                let callback = session.callback.take();
                let handle = self.coordinator_thread.lock().take();
                Some((results, callback, handle))
            } else {
                None
            }
        };

        if let Some((results, callback, handle)) = delivery {
            if let Some(handle) = handle {
                let _ = handle.join();
            }

            let results = Arc::new(results);
            self.ping_data.store(Some(Arc::clone(&results)));
            debug!(regions = results.len(), "delivering ping results");

            if let Some(callback) = callback {
                let response = json!({
                    "status": status_codes::HTTP_OK,
                    "data": results.as_ref(),
                });
                callback.server_callback(
                    ServiceName::LOBBY,
                    ServiceOperation::PING_REGIONS,
                    &response,
                );
            }
        }

        for event in self.errors.drain() {
            event.deliver();
        }
    }
}
