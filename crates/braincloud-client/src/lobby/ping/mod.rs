//! Region latency probing
//!
//! Measures round-trip latency from the client to each lobby region so that
//! matchmaking can prefer nearby servers.
//!
//! ```text
//! GET_REGIONS_FOR_LOBBIES ──▶ RegionRegistry ──▶ PingCoordinator ──▶ ProbeWorker × N
//!                                                      │
//!                                  run_callbacks ◀─────┘  (results, ErrorQueue)
//! ```

pub mod coordinator;
pub mod probe;
pub mod pump;
pub mod registry;

pub use coordinator::{PingCoordinator, PingData, PingStats, SessionState};
pub use probe::{
    HttpProber, ProbeError, ProbeResult, ProbeWorker, Prober, trimmed_mean, trimmed_mean_with_cap,
};
pub use pump::{ErrorEvent, ErrorQueue};
pub use registry::{PING_REGION_TYPE, RegionDescriptor, RegionRegistry, RegionSnapshot};
