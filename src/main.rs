//! WuWa Scanner
//!
//! Reads inventory, weapons, echoes, characters and achievements out of the
//! running Wuthering Waves client by navigating its menus with synthetic
//! input and running OCR on screenshots of known screen regions.

mod automation;
mod calibration;
mod capture;
mod catalog;
mod ocr;
mod paths;
mod scanners;

use anyhow::{anyhow, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use automation::StatusKind;

/// Whether `log_debug` lines are written.
static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

/// Per-scan log file, active while a scan runs.
static SESSION_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    append_line(&paths::get_logs_dir().join("wuwa_scanner.log"), &line);

    let session = SESSION_LOG.lock().ok().and_then(|p| p.clone());
    if let Some(path) = session {
        append_line(&path, &line);
    }
}

/// Logs a message only when debug logging is enabled in config.json.
pub fn log_debug(msg: &str) {
    if DEBUG_LOGGING.load(Ordering::Relaxed) {
        log(&format!("[DEBUG] {}", msg));
    }
}

/// Enables or disables `log_debug` output.
pub fn set_debug_logging(enabled: bool) {
    DEBUG_LOGGING.store(enabled, Ordering::Relaxed);
}

/// Routes log lines to an additional per-scan file (or stops doing so).
pub fn set_session_log(path: Option<PathBuf>) {
    if let Ok(mut current) = SESSION_LOG.lock() {
        *current = path;
    }
}

fn append_line(path: &std::path::Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        append_line(&paths::get_logs_dir().join("wuwa_scanner.log"), &log_msg);
    }));

    paths::ensure_directories()?;

    automation::init_config();
    let config = automation::get_config().clone();
    set_debug_logging(config.debug_logging);

    log("WuWa Scanner started");
    log(&format!("Enabled scanners: {}", config.scanners));

    let report = automation::start_scan(config);
    log(&format!("[{}] {}: {}", report.kind, report.title, report.message));

    match report.kind {
        StatusKind::Success | StatusKind::Failed => Ok(()),
        StatusKind::Warning | StatusKind::Error => {
            Err(anyhow!("{}: {}", report.title, report.message))
        }
    }
}
