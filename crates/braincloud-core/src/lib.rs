//! # brainCloud Core
//!
//! Foundation crate for the brainCloud client SDK providing the types shared by
//! every service wrapper.
//!
//! ## Features
//!
//! - **Service identifiers** - Typed service names and operation codes
//! - **Callbacks** - A single success/error callback shape for every request
//! - **Request dispatch** - The collaborator trait service wrappers queue calls on
//! - **Error handling** - Context-rich errors that map onto status/reason codes
//! - **Configuration** - Validated settings for the region ping subsystem
//!
//! ## Architecture
//!
//! ```text
//! braincloud-core/
//! ├── error/          # Error types and handling
//! ├── status/         # Status and reason codes
//! ├── service/        # Service names and operation codes
//! ├── callback/       # Response callbacks
//! ├── dispatch/       # ServerCall and the RequestDispatch collaborator
//! └── config/         # Ping configuration
//! ```
//!
//! ## Usage
//!
//! This crate is typically not used directly but through `braincloud-client`.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod callback;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod service;
pub mod status;

// Re-export commonly used types
pub use callback::{FnCallback, ServerCallback, SharedCallback};
pub use config::{MAX_PING_MILLIS, PingConfig, PingConfigBuilder};
pub use dispatch::{RequestDispatch, ServerCall};
pub use error::{Error, ErrorExt, ErrorKind, Result};
pub use service::{ServiceName, ServiceOperation};
pub use status::{reason_codes, status_codes};

/// SDK version information
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SDK name identifier
pub const SDK_NAME: &str = "braincloud-rust";
