use std::sync::Arc;
use std::time::{Duration, Instant};

use doorwatch::sinks::{InMemoryRecordStore, InMemoryRemoteLog, JsonlRecordStore, RecordingAlertSink};
use doorwatch::time::SystemClock;
use doorwatch::{MonitorConfig, MonitorRuntime, MonitorSinks};

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn pooled_runtime_alerts_and_logs_split_tag() {
    let alert = Arc::new(RecordingAlertSink::new());
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(InMemoryRemoteLog::new());
    let cfg = MonitorConfig {
        poll_interval_ms: 10,
        ..MonitorConfig::default()
    };
    let runtime = MonitorRuntime::start(
        cfg,
        MonitorSinks::new(alert.clone(), store.clone(), remote.clone()),
        Arc::new(SystemClock),
    )
    .unwrap();
    let handle = runtime.handle();

    handle.opened().unwrap();
    for fragment in ["li10", "23di0", "07"] {
        handle.feed(fragment).unwrap();
    }

    assert!(wait_for(|| runtime.status().detected_person));
    assert!(wait_for(|| alert.sounds_played() == 1 && alert.notifications().len() == 1));
    assert!(wait_for(|| store.records().len() == 1 && remote.attempts().len() == 1));
    assert!(wait_for(|| runtime.status().last_log_time.starts_with("Last logged at: ")));

    let status = runtime.status();
    assert!(status.is_connected);
    assert_eq!(status.distance, 7);
    assert_eq!(status.light_intensity, 1023);
    assert_eq!(runtime.dropped_effects(), 0);
}

#[test]
fn records_land_in_jsonl_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlRecordStore::in_dir(dir.path()));
    let runtime = MonitorRuntime::start(
        MonitorConfig::default(),
        MonitorSinks::new(
            Arc::new(RecordingAlertSink::new()),
            store.clone(),
            Arc::new(InMemoryRemoteLog::new()),
        ),
        Arc::new(SystemClock),
    )
    .unwrap();
    let handle = runtime.handle();

    handle.opened().unwrap();
    handle.feed_bytes(b"li640di12\r\n").unwrap();
    handle.flush(Duration::from_secs(1)).unwrap();

    assert!(wait_for(|| store.read_all().map(|r| r.len() == 1).unwrap_or(false)));
    let records = store.read_all().unwrap();
    assert_eq!(records[0].distance, 12);
    assert_eq!(records[0].light_intensity, 640);
}

#[test]
fn status_stream_reports_connection_lifecycle() {
    let runtime = MonitorRuntime::start(
        MonitorConfig::default(),
        MonitorSinks::new(
            Arc::new(RecordingAlertSink::new()),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRemoteLog::new()),
        ),
        Arc::new(SystemClock),
    )
    .unwrap();
    let stream = runtime.subscribe();
    let handle = runtime.handle();

    handle.opened().unwrap();
    handle.feed("li1di5\n").unwrap();
    handle.device_removed().unwrap();
    handle.flush(Duration::from_secs(1)).unwrap();

    let first = stream.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(first.is_connected);
    let mut last = first;
    while let Ok(next) = stream.recv_timeout(Duration::from_millis(100)) {
        last = next;
    }
    assert!(!last.is_connected);
    assert!(!last.detected_person);
}

#[test]
fn dropping_runtime_drains_queued_effects() {
    let alert = Arc::new(RecordingAlertSink::new());
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(InMemoryRemoteLog::new());
    let runtime = MonitorRuntime::start(
        MonitorConfig::default(),
        MonitorSinks::new(alert.clone(), store.clone(), remote.clone()),
        Arc::new(SystemClock),
    )
    .unwrap();
    let handle = runtime.handle();

    handle.opened().unwrap();
    handle.feed("li512di9\n").unwrap();
    handle.closed().unwrap();
    handle.flush(Duration::from_secs(1)).unwrap();
    drop(handle);
    drop(runtime);

    assert_eq!(alert.sounds_played(), 1);
    assert_eq!(alert.notifications().len(), 1);
    assert_eq!(store.records().len(), 1);
    assert_eq!(remote.attempts().len(), 1);
}
