//! Ping session coordination
//!
//! [`PingCoordinator`] runs at most one ping session at a time. A session is
//! driven by a dedicated coordination thread that keeps up to
//! [`PingConfig::parallelism`] probe worker threads in flight, folds their
//! results into the session, and parks on a condition variable between
//! completions. All session state lives in one session record guarded by a
//! single mutex; workers report back through the same mutex and wake the
//! coordinator through the paired condvar.
//!
//! ```text
//!            start_ping                 last probe done              pump
//!   Idle ───────────────▶ Running ─────────────────────▶ Completed ───────▶ Idle
//!     ▲                      │
//!     └──── stop_ping / ─────┘
//!           spawn failure /
//!           coordinator panic
//! ```
//!
//! Results only become visible to the caller through the callback pump
//! ([`PingCoordinator::run_callbacks`]).

use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arc_swap::ArcSwapOption;
use braincloud_core::config::PingConfig;
use braincloud_core::status::{reason_codes, status_codes};
use braincloud_core::{Error, ErrorExt, ErrorKind, Result, SharedCallback};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

use super::probe::{HttpProber, ProbeResult, ProbeWorker, Prober};
use super::pump::{ErrorEvent, ErrorQueue};
use super::registry::{RegionDescriptor, RegionRegistry};

/// Region name to trimmed-mean latency in milliseconds
pub type PingData = BTreeMap<String, u32>;

/// Lifecycle of the coordinator's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session; a new one may start
    #[default]
    Idle,
    /// Probes are being scheduled or are in flight
    Running,
    /// Every region has a result waiting for the pump
    Completed,
}

/// Counters describing past sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingStats {
    /// Highest number of probes observed in flight at once
    pub peak_active: usize,
    /// Sessions that reached [`SessionState::Completed`]
    pub sessions_completed: u64,
}

#[derive(Debug)]
struct ActiveProbe {
    region: String,
    latency: Option<u32>,
    handle: Option<JoinHandle<()>>,
}

/// State of the current ping run
#[derive(Default)]
pub(crate) struct PingSession {
    pub(crate) state: SessionState,
    /// Incremented whenever a session starts or is torn down, so that probes
    /// belonging to an abandoned session cannot report into a newer one.
    generation: u64,
    pending: VecDeque<RegionDescriptor>,
    active: Vec<ActiveProbe>,
    pub(crate) results: PingData,
    pub(crate) callback: Option<SharedCallback>,
    peak_active: usize,
    sessions_completed: u64,
}

impl PingSession {
    /// Drop everything belonging to the current run and go back to Idle.
    /// In-flight probe threads are detached, not interrupted.
    fn reset(&mut self) -> Option<SharedCallback> {
        self.state = SessionState::Idle;
        self.generation += 1;
        self.pending.clear();
        self.active.clear();
        self.results.clear();
        self.callback.take()
    }

    /// Move every reported probe into `results`, returning the threads to join
    fn harvest(&mut self) -> Vec<JoinHandle<()>> {
        let mut finished = Vec::new();
        let mut still_active = Vec::with_capacity(self.active.len());

        for mut probe in self.active.drain(..) {
            match probe.latency {
                Some(latency) => {
                    trace!(region = %probe.region, latency, "probe harvested");
                    self.results.insert(probe.region, latency);
                    finished.extend(probe.handle.take());
                }
                None => still_active.push(probe),
            }
        }

        self.active = still_active;
        finished
    }
}

#[derive(Default)]
pub(crate) struct SharedSession {
    pub(crate) session: Mutex<PingSession>,
    wakeup: Condvar,
}

impl SharedSession {
    fn report(&self, generation: u64, result: ProbeResult) {
        {
            let mut session = self.session.lock();
            if session.generation != generation {
                trace!(region = %result.region_name, "discarding probe from stale session");
                return;
            }
            if let Some(probe) = session
                .active
                .iter_mut()
                .find(|probe| probe.region == result.region_name)
            {
                probe.latency = Some(result.latency_millis);
            }
        }
        self.wakeup.notify_all();
    }
}

/// Coordinates region ping sessions
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use braincloud_client::lobby::ping::{PingCoordinator, RegionRegistry};
/// use braincloud_core::PingConfig;
///
/// # fn example() -> braincloud_core::Result<()> {
/// let registry = Arc::new(RegionRegistry::new());
/// registry.set_regions(&serde_json::json!({
///     "us-east-1": {"type": "PING", "target": "ping-us-east.example.com"}
/// }));
///
/// let coordinator = PingCoordinator::with_http_prober(registry, PingConfig::default())?;
/// coordinator.start_ping(None);
///
/// // Call on every tick of the host loop
/// coordinator.run_callbacks();
/// # Ok(())
/// # }
/// ```
pub struct PingCoordinator {
    config: PingConfig,
    registry: Arc<RegionRegistry>,
    prober: Arc<dyn Prober>,
    pub(crate) shared: Arc<SharedSession>,
    pub(crate) coordinator_thread: Mutex<Option<JoinHandle<()>>>,
    pub(crate) errors: Arc<ErrorQueue>,
    pub(crate) ping_data: ArcSwapOption<PingData>,
}

impl PingCoordinator {
    /// Create a coordinator probing with `prober`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(
        registry: Arc<RegionRegistry>,
        prober: Arc<dyn Prober>,
        config: PingConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            prober,
            shared: Arc::new(SharedSession::default()),
            coordinator_thread: Mutex::new(None),
            errors: Arc::new(ErrorQueue::new()),
            ping_data: ArcSwapOption::empty(),
        })
    }

    /// Create a coordinator probing over HTTP
    pub fn with_http_prober(registry: Arc<RegionRegistry>, config: PingConfig) -> Result<Self> {
        config.validate()?;
        let prober = HttpProber::from_config(&config)?;
        Self::new(registry, Arc::new(prober), config)
    }

    /// Start a ping session over every registered region
    ///
    /// Never fails synchronously. If no regions are registered, or a session
    /// is already running or awaiting delivery, an error event addressed to
    /// `callback` is queued for the next [`run_callbacks`](Self::run_callbacks).
    pub fn start_ping(&self, callback: Option<SharedCallback>) {
        let regions = self.registry.regions();
        if regions.is_empty() {
            debug!("ping requested before any regions were registered");
            let err = Error::bad_request(
                "No regions to ping. Call get_regions_for_lobbies before ping_regions",
            );
            self.errors.push(ErrorEvent::ping_error(&err, callback));
            return;
        }

        let mut session = self.shared.session.lock();
        if session.state != SessionState::Idle {
            debug!(state = ?session.state, "ping requested while a session is active");
            self.errors.push(ErrorEvent::ping(
                status_codes::HTTP_BAD_REQUEST,
                reason_codes::PING_ALREADY_RUNNING,
                "Region ping already in progress",
                callback,
            ));
            return;
        }

        session.reset();
        session.state = SessionState::Running;
        session.pending = regions.iter().cloned().collect();
        session.callback = callback;

        let context = SessionContext {
            shared: Arc::clone(&self.shared),
            prober: Arc::clone(&self.prober),
            errors: Arc::clone(&self.errors),
            config: self.config.clone(),
            generation: session.generation,
        };

        let spawned = thread::Builder::new()
            .name("braincloud-ping-coordinator".to_string())
            .spawn(move || context.run())
            .with_sdk_error(ErrorKind::BadRequest, "Unable to start region ping");

        let stale = match spawned {
            Ok(handle) => {
                info!(regions = regions.len(), parallelism = self.config.parallelism, "ping session started");
                self.coordinator_thread.lock().replace(handle)
            }
            Err(err) => {
                warn!(error = %err, "failed to spawn ping coordinator");
                let callback = session.reset();
                self.errors.push(ErrorEvent::ping_error(&err, callback));
                None
            }
        };
        drop(session);

        // Left over from a session that aborted or was delivered concurrently;
        // it has already released the session and is exiting.
        if let Some(handle) = stale {
            let _ = handle.join();
        }
    }

    /// Cancel the current session and wait for its coordination thread to exit
    ///
    /// Probes already in flight are left to finish in the background and their
    /// results are discarded. Undelivered results of a completed session are
    /// dropped as well. Does nothing when idle.
    pub fn stop_ping(&self) {
        let handle = {
            let mut session = self.shared.session.lock();
            if session.state != SessionState::Idle {
                session.reset();
                self.shared.wakeup.notify_all();
                debug!("ping session stopped");
            }
            self.coordinator_thread.lock().take()
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("ping coordinator thread panicked");
            }
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.shared.session.lock().state
    }

    /// Whether a session is scheduling or waiting on probes
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Whether a coordination thread is still attached to this coordinator
    ///
    /// False once [`stop_ping`](Self::stop_ping) returns or a completed
    /// session has been delivered.
    pub fn has_coordinator_thread(&self) -> bool {
        self.coordinator_thread.lock().is_some()
    }

    /// Results of the last delivered session
    pub fn ping_data(&self) -> Option<Arc<PingData>> {
        self.ping_data.load_full()
    }

    /// Counters over the coordinator's lifetime
    pub fn stats(&self) -> PingStats {
        let session = self.shared.session.lock();
        PingStats {
            peak_active: session.peak_active,
            sessions_completed: session.sessions_completed,
        }
    }

    /// Region registry sessions are started from
    pub fn registry(&self) -> &Arc<RegionRegistry> {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    /// Queue an error for delivery by the next pump
    pub fn queue_error(&self, event: ErrorEvent) {
        self.errors.push(event);
    }

    /// Number of error events waiting for the pump
    pub fn pending_errors(&self) -> usize {
        self.errors.len()
    }
}

impl Drop for PingCoordinator {
    fn drop(&mut self) {
        self.stop_ping();
    }
}

impl std::fmt::Debug for PingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingCoordinator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pending_errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

/// Everything the coordination thread needs, moved into it at spawn
struct SessionContext {
    shared: Arc<SharedSession>,
    prober: Arc<dyn Prober>,
    errors: Arc<ErrorQueue>,
    config: PingConfig,
    generation: u64,
}

impl SessionContext {
    fn run(self) {
        if panic::catch_unwind(AssertUnwindSafe(|| self.schedule())).is_err() {
            // The guard was released while unwinding; parking_lot does not poison.
            let mut session = self.shared.session.lock();
            if session.generation == self.generation && session.state == SessionState::Running {
                let err = Error::bad_request("Region ping aborted: coordinator panicked")
                    .with_component("ping_coordinator");
                self.abort(&mut session, &err);
            }
        }
    }

    fn schedule(&self) {
        let mut session = self.shared.session.lock();

        loop {
            if session.generation != self.generation || session.state != SessionState::Running {
                debug!("ping session cancelled, coordinator exiting");
                return;
            }

            while session.active.len() < self.config.parallelism {
                let Some(region) = session.pending.pop_front() else {
                    break;
                };
                let name = region.name.clone();
                match self
                    .spawn_probe(region)
                    .with_sdk_error(ErrorKind::BadRequest, "Region ping aborted")
                {
                    Ok(handle) => {
                        session.active.push(ActiveProbe {
                            region: name,
                            latency: None,
                            handle: Some(handle),
                        });
                        session.peak_active = session.peak_active.max(session.active.len());
                    }
                    Err(err) => {
                        self.abort(&mut session, &err);
                        return;
                    }
                }
            }

            let finished = session.harvest();
            if !finished.is_empty() {
                MutexGuard::unlocked(&mut session, || {
                    for handle in finished {
                        let _ = handle.join();
                    }
                });
                continue;
            }

            if session.pending.is_empty() && session.active.is_empty() {
                session.state = SessionState::Completed;
                session.sessions_completed += 1;
                info!(regions = session.results.len(), "ping session completed");
                return;
            }

            self.shared.wakeup.wait(&mut session);
        }
    }

    fn spawn_probe(&self, region: RegionDescriptor) -> std::io::Result<JoinHandle<()>> {
        let shared = Arc::clone(&self.shared);
        let prober = Arc::clone(&self.prober);
        let generation = self.generation;
        let max_ping_millis = self.config.max_ping_millis;
        let worker = ProbeWorker::new(region, &self.config);

        trace!(region = %worker.region().name, "spawning probe");
        // Region names come from the server and may hold bytes a thread name rejects
        thread::Builder::new()
            .name("braincloud-ping-worker".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| worker.run(prober.as_ref())))
                    .unwrap_or_else(|_| {
                        warn!(region = %worker.region().name, "probe panicked, reporting as unreachable");
                        ProbeResult {
                            region_name: worker.region().name.clone(),
                            latency_millis: max_ping_millis,
                        }
                    });
                shared.report(generation, result);
            })
    }

    fn abort(&self, session: &mut PingSession, cause: &Error) {
        warn!(error = %cause, "ping session aborted");
        let callback = session.reset();
        self.errors.push(ErrorEvent::ping_error(cause, callback));
        self.shared.wakeup.notify_all();
    }
}
