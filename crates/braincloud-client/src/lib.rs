//! # brainCloud Client
//!
//! Client-side service wrappers for the brainCloud backend, with latency
//! probing of lobby regions.
//!
//! ## Features
//!
//! - Lobby matchmaking calls with typed request payloads
//! - Region discovery through `GET_REGIONS_FOR_LOBBIES`
//! - Bounded parallel latency probing of every region
//! - Ping-aware matchmaking (`*_with_ping_data` operations)
//! - Transport-agnostic design (works with any `RequestDispatch` implementation)
//!
//! ## Architecture
//!
//! ```text
//! Application Layer
//!        ↓
//! Service wrappers (this crate)
//!        ↓
//! RequestDispatch (batching, auth, transport)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use braincloud_client::ClientBuilder;
//! use braincloud_core::{FnCallback, RequestDispatch, ServerCall};
//!
//! struct Dispatcher;
//!
//! impl RequestDispatch for Dispatcher {
//!     fn add_to_queue(&self, call: ServerCall) {
//!         // send to the server, then complete the call
//! #       drop(call);
//!     }
//! }
//!
//! # fn example() -> braincloud_core::Result<()> {
//! let client = ClientBuilder::new().build(Arc::new(Dispatcher))?;
//!
//! let on_ping = FnCallback::shared(
//!     |_, _, json| println!("latencies: {}", json["data"]),
//!     |_, _, status, reason, message| eprintln!("ping failed {status}/{reason}: {message}"),
//! );
//!
//! client.lobby().get_regions_for_lobbies(&["MATCH"], None);
//! // once the regions have arrived
//! client.lobby().ping_regions(Some(on_ping));
//!
//! loop {
//!     client.run_callbacks();
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Callback delivery
//!
//! Server responses reach their callbacks whenever the dispatcher completes
//! them. Ping results and locally raised errors only reach their callbacks
//! from [`BrainCloudClient::run_callbacks`]; an application that never calls
//! it never receives them.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod lobby;

use std::fmt;
use std::sync::Arc;

use braincloud_core::{
    PingConfig, RequestDispatch, Result, ServerCall, ServiceName, ServiceOperation, SharedCallback,
};
use serde_json::Value;
use tracing::debug;

use crate::lobby::LobbyService;
use crate::lobby::ping::{HttpProber, PingCoordinator, Prober, RegionRegistry};

/// Entry point of the SDK
pub struct BrainCloudClient {
    dispatch: Arc<dyn RequestDispatch>,
    lobby: LobbyService,
}

impl BrainCloudClient {
    /// Create a client with HTTP region probes configured by `config`
    pub fn new(dispatch: Arc<dyn RequestDispatch>, config: PingConfig) -> Result<Self> {
        ClientBuilder::new().with_ping_config(config).build(dispatch)
    }

    /// Lobby service
    pub fn lobby(&self) -> &LobbyService {
        &self.lobby
    }

    /// Queue a call to any service
    pub fn send(
        &self,
        service: ServiceName,
        operation: ServiceOperation,
        data: Value,
        callback: Option<SharedCallback>,
    ) {
        self.dispatch
            .add_to_queue(ServerCall::new(service, operation, data, callback));
    }

    /// Deliver pending client-side callbacks
    ///
    /// Call once per tick of the application loop.
    pub fn run_callbacks(&self) {
        self.lobby.run_ping_callbacks();
    }
}

impl fmt::Debug for BrainCloudClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrainCloudClient")
            .field("lobby", &self.lobby)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BrainCloudClient`]
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use braincloud_client::ClientBuilder;
/// use braincloud_core::{PingConfigBuilder, RequestDispatch, ServerCall};
///
/// struct Dispatcher;
/// impl RequestDispatch for Dispatcher {
///     fn add_to_queue(&self, _call: ServerCall) {}
/// }
///
/// # fn example() -> braincloud_core::Result<()> {
/// let config = PingConfigBuilder::new().parallelism(4)?.build();
/// let client = ClientBuilder::new()
///     .with_ping_config(config)
///     .build(Arc::new(Dispatcher))?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: PingConfig,
    prober: Option<Arc<dyn Prober>>,
}

impl ClientBuilder {
    /// Create a builder with the default ping configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for region pings
    pub fn with_ping_config(mut self, config: PingConfig) -> Self {
        self.config = config;
        self
    }

    /// Probe regions with `prober` instead of HTTP
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Build a client queuing its calls on `dispatch`
    pub fn build(self, dispatch: Arc<dyn RequestDispatch>) -> Result<BrainCloudClient> {
        self.config.validate()?;

        let prober = match self.prober {
            Some(prober) => prober,
            None => Arc::new(HttpProber::from_config(&self.config)?),
        };

        debug!(config = ?self.config, "building brainCloud client");
        let registry = Arc::new(RegionRegistry::new());
        let ping = Arc::new(PingCoordinator::new(registry, prober, self.config)?);

        Ok(BrainCloudClient {
            lobby: LobbyService::new(Arc::clone(&dispatch), ping),
            dispatch,
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("custom_prober", &self.prober.is_some())
            .finish()
    }
}

// Re-export types for public API
pub use braincloud_core::{Error, ErrorKind, FnCallback, ServerCallback};
