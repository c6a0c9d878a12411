//! Tests for region ping sessions driven through the coordinator

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use braincloud_client::lobby::ping::{
    ErrorEvent, PingCoordinator, Prober, RegionRegistry, SessionState,
};
use braincloud_core::status::reason_codes;
use braincloud_core::{
    ErrorKind, PingConfig, ServerCallback, ServiceName, ServiceOperation, SharedCallback,
};
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};

// Callback that records everything it is given
#[derive(Default)]
struct Recorder {
    successes: Mutex<Vec<Value>>,
    errors: Mutex<Vec<(i32, i32, String)>>,
}

impl Recorder {
    fn successes(&self) -> Vec<Value> {
        self.successes.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<(i32, i32, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl ServerCallback for Recorder {
    fn server_callback(&self, service: ServiceName, operation: ServiceOperation, json_data: &Value) {
        assert_eq!(service, ServiceName::LOBBY);
        assert_eq!(operation, ServiceOperation::PING_REGIONS);
        self.successes.lock().unwrap().push(json_data.clone());
    }

    fn server_error(
        &self,
        _service: ServiceName,
        _operation: ServiceOperation,
        status_code: i32,
        reason_code: i32,
        message: &str,
    ) {
        self.errors
            .lock()
            .unwrap()
            .push((status_code, reason_code, message.to_string()));
    }
}

// Prober that blocks every sample until the gate opens and tracks concurrency
#[derive(Default)]
struct GatedProber {
    open: Mutex<bool>,
    opened: Condvar,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
    targets: Mutex<BTreeSet<String>>,
    delay: Duration,
}

impl GatedProber {
    fn open() -> Self {
        Self {
            open: Mutex::new(true),
            delay: Duration::from_millis(5),
            ..Self::default()
        }
    }

    fn closed() -> Self {
        Self::default()
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    fn distinct_targets(&self) -> usize {
        self.targets.lock().unwrap().len()
    }
}

impl Prober for GatedProber {
    fn sample(&self, target_url: &str) -> u32 {
        self.targets.lock().unwrap().insert(target_url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);
        thread::sleep(self.delay);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        10
    }
}

fn registry_with(count: usize) -> Arc<RegionRegistry> {
    let mut raw = Map::new();
    for i in 0..count {
        raw.insert(
            format!("region-{i}"),
            json!({"type": "PING", "target": format!("region-{i}.example.test")}),
        );
    }
    let registry = Arc::new(RegionRegistry::new());
    registry.set_regions(&Value::Object(raw));
    registry
}

fn new_coordinator(count: usize, prober: Arc<dyn Prober>) -> PingCoordinator {
    PingCoordinator::new(registry_with(count), prober, PingConfig::default()).unwrap()
}

fn new_recorder() -> (Arc<Recorder>, SharedCallback) {
    let recorder = Arc::new(Recorder::default());
    let callback: SharedCallback = recorder.clone();
    (recorder, callback)
}

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn pump_until_delivered(coordinator: &PingCoordinator, recorder: &Recorder) {
    wait_until("ping delivery", || {
        coordinator.run_callbacks();
        !recorder.successes.lock().unwrap().is_empty()
    });
}

#[test]
fn test_pump_with_nothing_pending_does_nothing() {
    let coordinator = new_coordinator(3, Arc::new(GatedProber::open()));
    coordinator.run_callbacks();
    coordinator.run_callbacks();
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert!(coordinator.ping_data().is_none());
}

#[test]
fn test_parallelism_cap_is_respected() {
    let prober = Arc::new(GatedProber::open());
    let coordinator = new_coordinator(6, prober.clone());
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    assert!(prober.peak.load(Ordering::SeqCst) <= 2);
    let stats = coordinator.stats();
    assert!(stats.peak_active >= 1 && stats.peak_active <= 2);
    assert_eq!(stats.sessions_completed, 1);
}

#[test]
fn test_one_result_per_region() {
    let coordinator = new_coordinator(5, Arc::new(GatedProber::open()));
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    let delivered = recorder.successes();
    assert_eq!(delivered.len(), 1);
    assert_eq!(
        delivered[0],
        json!({
            "status": 200,
            "data": {
                "region-0": 10,
                "region-1": 10,
                "region-2": 10,
                "region-3": 10,
                "region-4": 10
            }
        })
    );

    let ping_data = coordinator.ping_data().unwrap();
    assert_eq!(ping_data.len(), 5);
    assert_eq!(coordinator.state(), SessionState::Idle);

    // Delivered exactly once
    coordinator.run_callbacks();
    assert_eq!(recorder.successes().len(), 1);
}

#[test]
fn test_latency_is_trimmed_mean_of_samples() {
    let counters = Mutex::new(HashMap::<String, usize>::new());
    let prober = move |url: &str| {
        let mut counters = counters.lock().unwrap();
        let n = counters.entry(url.to_string()).or_default();
        let sample = [999_u32, 30, 10, 20][*n % 4];
        *n += 1;
        sample
    };
    let coordinator = new_coordinator(3, Arc::new(prober));
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    let ping_data = coordinator.ping_data().unwrap();
    assert!(ping_data.values().all(|&latency| latency == 20));
}

#[test]
fn test_failed_samples_report_sentinel() {
    let coordinator = new_coordinator(2, Arc::new(|_: &str| 999_u32));
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    assert_eq!(
        recorder.successes()[0]["data"],
        json!({"region-0": 999, "region-1": 999})
    );
}

#[test]
fn test_panicking_prober_counts_as_unreachable() {
    let prober = |url: &str| -> u32 {
        if url.contains("region-1") {
            panic!("probe exploded");
        }
        15
    };
    let coordinator = new_coordinator(2, Arc::new(prober));
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    assert_eq!(
        recorder.successes()[0]["data"],
        json!({"region-0": 15, "region-1": 999})
    );
}

#[test]
fn test_second_start_while_running_is_rejected() {
    let prober = Arc::new(GatedProber::closed());
    let coordinator = new_coordinator(3, prober.clone());
    let (first, first_callback) = new_recorder();
    let (second, second_callback) = new_recorder();

    coordinator.start_ping(Some(first_callback));
    assert!(coordinator.is_running());

    coordinator.start_ping(Some(second_callback));
    assert_eq!(coordinator.pending_errors(), 1);

    coordinator.run_callbacks();
    let errors = second.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, 400);
    assert_eq!(errors[0].1, reason_codes::PING_ALREADY_RUNNING);
    assert!(first.errors().is_empty());
    assert!(coordinator.is_running());

    prober.release();
    pump_until_delivered(&coordinator, &first);
    assert_eq!(first.successes()[0]["data"].as_object().unwrap().len(), 3);
    assert!(second.successes().is_empty());
}

#[test]
fn test_start_rejected_while_results_await_delivery() {
    let coordinator = new_coordinator(1, Arc::new(GatedProber::open()));
    let (first, first_callback) = new_recorder();
    let (second, second_callback) = new_recorder();

    coordinator.start_ping(Some(first_callback));
    wait_until("completion", || coordinator.state() == SessionState::Completed);

    coordinator.start_ping(Some(second_callback));
    coordinator.run_callbacks();

    assert_eq!(first.successes().len(), 1);
    assert_eq!(second.errors()[0].1, reason_codes::PING_ALREADY_RUNNING);
}

#[test]
fn test_start_without_regions_is_rejected() {
    let coordinator = new_coordinator(0, Arc::new(GatedProber::open()));
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert_eq!(coordinator.pending_errors(), 1);

    coordinator.run_callbacks();
    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, 400);
    assert_eq!(errors[0].1, reason_codes::MISSING_REQUIRED_PARAMETER);
    assert!(recorder.successes().is_empty());
}

#[test]
fn test_errors_are_delivered_in_order() {
    let coordinator = new_coordinator(1, Arc::new(GatedProber::open()));
    let (recorder, callback) = new_recorder();

    coordinator.queue_error(ErrorEvent::ping(400, 1, "E1", Some(callback.clone())));
    coordinator.queue_error(ErrorEvent::ping(500, 2, "E2", Some(callback)));
    coordinator.run_callbacks();

    assert_eq!(
        recorder.errors(),
        vec![
            (400, 1, "E1".to_string()),
            (500, 2, "E2".to_string())
        ]
    );
    assert_eq!(coordinator.pending_errors(), 0);

    coordinator.run_callbacks();
    assert_eq!(recorder.errors().len(), 2);
}

#[test]
fn test_stop_mid_session_schedules_nothing_more() {
    let prober = Arc::new(GatedProber::closed());
    let coordinator = new_coordinator(5, prober.clone());
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    wait_until("two probes in flight", || {
        prober.in_flight.load(Ordering::SeqCst) == 2
    });

    let stats_before = coordinator.stats();
    assert!(coordinator.has_coordinator_thread());
    coordinator.stop_ping();
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert!(!coordinator.has_coordinator_thread());

    // The two detached probes finish their samples and nothing else starts
    prober.release();
    wait_until("detached probes", || {
        prober.finished.load(Ordering::SeqCst) == 2 * 4
    });
    thread::sleep(Duration::from_millis(20));
    assert_eq!(prober.distinct_targets(), 2);
    assert_eq!(coordinator.stats(), stats_before);

    coordinator.run_callbacks();
    assert!(recorder.successes().is_empty());
    assert!(recorder.errors().is_empty());
    assert!(coordinator.ping_data().is_none());
}

#[test]
fn test_session_can_restart_after_stop() {
    let prober = Arc::new(GatedProber::closed());
    let coordinator = new_coordinator(3, prober.clone());
    let (stopped, stopped_callback) = new_recorder();

    coordinator.start_ping(Some(stopped_callback));
    wait_until("probe in flight", || prober.in_flight.load(Ordering::SeqCst) > 0);
    coordinator.stop_ping();
    coordinator.stop_ping();

    prober.release();
    let (restarted, restarted_callback) = new_recorder();
    coordinator.start_ping(Some(restarted_callback));
    pump_until_delivered(&coordinator, &restarted);

    assert_eq!(
        restarted.successes()[0]["data"].as_object().unwrap().len(),
        3
    );
    assert!(stopped.successes().is_empty());
}

#[test]
fn test_registry_update_applies_to_next_session() {
    let prober = Arc::new(GatedProber::closed());
    let coordinator = new_coordinator(2, prober.clone());
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    coordinator
        .registry()
        .set_regions(&json!({"late": {"type": "PING", "target": "late.example.test"}}));
    prober.release();
    pump_until_delivered(&coordinator, &recorder);

    let data = recorder.successes()[0]["data"].clone();
    assert_eq!(data, json!({"region-0": 10, "region-1": 10}));
    assert_eq!(coordinator.registry().len(), 1);
}

#[test]
fn test_stop_when_idle_is_noop() {
    let coordinator = new_coordinator(2, Arc::new(GatedProber::open()));
    coordinator.stop_ping();
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert_eq!(coordinator.pending_errors(), 0);
}

#[test]
fn test_drop_cancels_running_session() {
    let prober = Arc::new(GatedProber::closed());
    let coordinator = new_coordinator(4, prober.clone());
    coordinator.start_ping(None);
    wait_until("probe in flight", || prober.in_flight.load(Ordering::SeqCst) > 0);

    drop(coordinator);
    prober.release();
}

#[test]
fn test_invalid_config_is_rejected_at_construction() {
    let config = PingConfig {
        parallelism: 0,
        ..PingConfig::default()
    };
    let err = PingCoordinator::new(registry_with(2), Arc::new(GatedProber::open()), config)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);

    let config = PingConfig {
        max_ping_millis: 5_000,
        ..PingConfig::default()
    };
    let err = PingCoordinator::new(registry_with(2), Arc::new(GatedProber::open()), config)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn test_region_name_with_nul_byte_completes() {
    let registry = Arc::new(RegionRegistry::new());
    registry.set_regions(&json!({
        "bad\u{0}name": {"type": "PING", "target": "bad.example.test"},
        "good": {"type": "PING", "target": "good.example.test"}
    }));
    let coordinator =
        PingCoordinator::new(registry, Arc::new(GatedProber::open()), PingConfig::default())
            .unwrap();
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    assert_eq!(
        recorder.successes()[0]["data"],
        json!({"bad\u{0}name": 10, "good": 10})
    );
    assert!(recorder.errors().is_empty());
    assert_eq!(coordinator.state(), SessionState::Idle);
    assert!(!coordinator.has_coordinator_thread());
}

#[test]
fn test_lower_max_ping_applies_to_failed_and_panicking_regions() {
    let prober = |url: &str| -> u32 {
        if url.contains("region-1") {
            panic!("sampler exploded");
        }
        999
    };
    let config = PingConfig {
        max_ping_millis: 500,
        ..PingConfig::default()
    };
    let coordinator = PingCoordinator::new(registry_with(2), Arc::new(prober), config).unwrap();
    let (recorder, callback) = new_recorder();

    coordinator.start_ping(Some(callback));
    pump_until_delivered(&coordinator, &recorder);

    assert_eq!(
        recorder.successes()[0]["data"],
        json!({"region-0": 500, "region-1": 500})
    );
}
