//! doorwatch monitor
//!
//! Reads the sensor's serial output from stdin (or a device/file path) and
//! runs the presence monitor over it.
//!
//! ```text
//! stty -F /dev/ttyUSB0 115200 raw && doorwatch --input /dev/ttyUSB0 --records ./logs
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use doorwatch::sinks::{
    HttpRemoteLog, InMemoryRecordStore, JsonlRecordStore, RecordStore, RemoteLog, TerminalAlertSink,
    UnconfiguredRemoteLog,
};
use doorwatch::time::SystemClock;
use doorwatch::{MonitorConfig, MonitorRuntime, MonitorSinks, MonitorStatus};

/// Command-line options.
struct Args {
    /// JSON config file
    config: Option<PathBuf>,
    /// Serial device or file to read; stdin when absent
    input: Option<PathBuf>,
    /// Directory for the JSON-lines record store
    records: Option<PathBuf>,
    /// Remote append endpoint
    remote_url: Option<String>,
}

fn usage() {
    println!("doorwatch - presence monitor for a serial light/distance sensor");
    println!();
    println!("USAGE:");
    println!("    doorwatch [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>       JSON configuration file");
    println!("    -i, --input <PATH>        Serial device or file to read [default: stdin]");
    println!("    -r, --records <DIR>       Directory for proximity_logs.jsonl [default: in memory]");
    println!("    -u, --remote-url <URL>    Remote log endpoint (JSON POST)");
    println!("    -h, --help                Print help information");
    println!();
    println!("Log verbosity follows RUST_LOG (default: info).");
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        input: None,
        records: None,
        remote_url: None,
    };

    let value = |i: usize, flag: &str| -> String {
        args.get(i + 1).cloned().unwrap_or_else(|| {
            eprintln!("error: {flag} requires a value");
            std::process::exit(1);
        })
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => parsed.config = Some(PathBuf::from(value(i, "--config"))),
            "--input" | "-i" => parsed.input = Some(PathBuf::from(value(i, "--input"))),
            "--records" | "-r" => parsed.records = Some(PathBuf::from(value(i, "--records"))),
            "--remote-url" | "-u" => parsed.remote_url = Some(value(i, "--remote-url")),
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
        i += 2;
    }

    parsed
}

fn report(prev: &MonitorStatus, next: &MonitorStatus) {
    if prev.is_connected != next.is_connected {
        println!("{}", if next.is_connected { "Connected" } else { "Disconnected" });
    }
    if prev.detected_person != next.detected_person {
        println!(
            "{} (distance {}cm, light {}/1023)",
            if next.detected_person { "Person detected" } else { "Clear" },
            next.distance,
            next.light_intensity
        );
    }
    if prev.last_log_time != next.last_log_time && !next.last_log_time.is_empty() {
        println!("{}", next.last_log_time);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = parse_args();

    let cfg = match &args.config {
        Some(path) => MonitorConfig::from_json_file(path)?,
        None => MonitorConfig::default(),
    };

    let store: Arc<dyn RecordStore> = match &args.records {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let store = JsonlRecordStore::in_dir(dir);
            info!(path = %store.path().display(), "writing records");
            Arc::new(store)
        }
        None => Arc::new(InMemoryRecordStore::new()),
    };

    let remote: Arc<dyn RemoteLog> = match &args.remote_url {
        Some(url) => Arc::new(HttpRemoteLog::new(url)?),
        None => {
            warn!("no remote log endpoint configured; every arrival will be recorded");
            Arc::new(UnconfiguredRemoteLog)
        }
    };

    let sinks = MonitorSinks::new(Arc::new(TerminalAlertSink), store, remote);
    let runtime = MonitorRuntime::start(cfg, sinks, Arc::new(SystemClock))?;
    let handle = runtime.handle();

    let stream = runtime.subscribe();
    let printer = thread::Builder::new().name("doorwatch-status".to_string()).spawn(move || {
        let mut prev = MonitorStatus::default();
        while let Ok(next) = stream.recv() {
            report(&prev, &next);
            prev = next;
        }
    })?;

    let mut input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };

    handle.opened()?;
    let mut chunk = [0u8; 64];
    loop {
        match input.read(&mut chunk) {
            Ok(0) => {
                handle.closed()?;
                break;
            }
            Ok(n) => {
                if let Err(err) = handle.feed_bytes(&chunk[..n]) {
                    warn!(error = %err, "fragment dropped");
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                error!(error = %err, "input failed");
                handle.device_removed()?;
                break;
            }
        }
    }

    handle.flush(Duration::from_secs(5))?;
    drop(handle);
    drop(runtime);
    let _ = printer.join();
    Ok(())
}
