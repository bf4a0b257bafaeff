//! Scan runner - entry point for one scan.
//!
//! Validates the preconditions, spawns the worker and the watchdog, drains
//! the result queue once the scan has stopped, writes the export and turns
//! the outcome into one status report.

use anyhow::Result;
use chrono::Local;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::{ScanConfig, ScannerKind, ScannerSelection};
use super::error::ScanError;
use super::export;
use super::queue::{create_result_queue, drain, Drained};
use super::state::{ScanFlag, ScanState};
use super::watchdog::{spawn_watchdog, StopProbe, StopReason};
use super::worker::{spawn_worker, ScanJob};

/// Global flag indicating if a scan is currently running.
static SCAN_RUNNING: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Error,
    /// The scan ran, but some items could not be recognized.
    Failed,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::Success => write!(f, "success"),
            StatusKind::Warning => write!(f, "warning"),
            StatusKind::Error => write!(f, "error"),
            StatusKind::Failed => write!(f, "failed"),
        }
    }
}

/// The one summary surfaced per scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub kind: StatusKind,
    pub title: String,
    pub message: String,
}

impl ScanReport {
    fn new(kind: StatusKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

fn enter_state(state: ScanState) {
    crate::log_debug(&format!("Scan state: {}", state));
}

/// Runs one scan to the end and reports its outcome.
pub fn start_scan(config: ScanConfig) -> ScanReport {
    if SCAN_RUNNING.swap(true, Ordering::SeqCst) {
        return ScanReport::new(StatusKind::Warning, "Warning", "A scan is already running.");
    }

    let run_id = Local::now().format("%Y%m%d_%H%M%S").to_string();
    crate::set_session_log(Some(crate::paths::get_logs_dir().join(format!("scan_{}.log", run_id))));
    crate::log(&format!("Starting scan {} ({})", run_id, config.scanners));

    enter_state(ScanState::Validating);
    let report = match run_scan(&config, &run_id) {
        Ok(report) => report,
        Err(e) => {
            crate::log(&format!("Scan could not run: {:#}", e));
            report_for_error(&e)
        }
    };

    crate::log(&format!("Scan {} finished [{}] {}", run_id, report.kind, report.message));
    enter_state(ScanState::Idle);
    crate::set_session_log(None);
    SCAN_RUNNING.store(false, Ordering::SeqCst);
    report
}

/// Enabled scanners in run order. Achievements must run alone.
pub fn validate_selection(selection: &ScannerSelection) -> Result<Vec<ScannerKind>, ScanError> {
    let kinds = selection.enabled_order();
    if kinds.is_empty() {
        return Err(ScanError::NoScannerSelected);
    }
    if kinds.len() > 1 && kinds.contains(&ScannerKind::Achievements) {
        return Err(ScanError::ExclusiveAchievements);
    }
    Ok(kinds)
}

/// Maps an error that stopped the scan before it ran.
pub fn report_for_error(error: &anyhow::Error) -> ScanReport {
    match ScanError::find(error) {
        Some(e @ (ScanError::NoScannerSelected | ScanError::ExclusiveAchievements | ScanError::NotElevated)) => {
            ScanReport::new(StatusKind::Warning, "Warning", e.to_string())
        }
        Some(e @ (ScanError::WindowNotFound | ScanError::NotInMainMenu)) => {
            ScanReport::new(StatusKind::Error, "Error", e.to_string())
        }
        Some(ScanError::Unsupported(platform)) => ScanReport::new(
            StatusKind::Error,
            "Unsupported",
            format!("The scanner needs the Windows game client ({}).", platform),
        ),
        Some(ScanError::Cancelled) => ScanReport::new(StatusKind::Warning, "Stopped", "Scan cancelled before it started."),
        None => ScanReport::new(StatusKind::Error, "Exception", format!("{:#}", error)),
    }
}

/// What came back from a supervised scan.
#[derive(Debug)]
pub struct Supervised {
    pub drained: Drained,
    /// Set when the watchdog stopped the scan.
    pub stop: Option<StopReason>,
}

/// Runs `job` on a worker thread under a watchdog.
///
/// Blocks until the worker completes or the watchdog aborts it, then drains
/// the result queue for at most `drain_timeout`.
pub fn supervise(job: ScanJob, probe: Arc<dyn StopProbe>, poll: Duration, drain_timeout: Duration) -> Supervised {
    let flag = Arc::new(ScanFlag::new());
    let (sender, receiver) = create_result_queue();

    let worker = spawn_worker(job, flag.clone(), sender);
    let watchdog = spawn_watchdog(flag.clone(), probe, poll);

    let stop = match watchdog.join() {
        Ok(stop) => stop,
        Err(_) => {
            crate::log("Watchdog thread panicked, stopping the scan");
            flag.abort();
            None
        }
    };

    enter_state(ScanState::Finalizing);
    let drained = drain(&receiver, drain_timeout);
    if drained.timed_out {
        crate::log(&format!(
            "Worker did not finish within {}s, keeping results received so far",
            drain_timeout.as_secs()
        ));
    } else if worker.join().is_err() {
        crate::log("Worker thread panicked outside the scan");
    }

    Supervised { drained, stop }
}

/// Persists what the scan collected and builds the final report.
pub fn finalize(supervised: Supervised, export_root: &Path, run_id: &str) -> ScanReport {
    let Supervised { drained, stop } = supervised;
    crate::log(&format!(
        "Collected {} (finished: {})",
        drained.result.summary(),
        if drained.completed_scanners.is_empty() {
            "none".to_string()
        } else {
            drained.completed_scanners.join(", ")
        }
    ));

    if let Err(e) = export::save(&drained.result, export_root, run_id) {
        crate::log(&format!("Export failed: {:#}", e));
        return ScanReport::new(StatusKind::Error, "Export failed", format!("{:#}", e));
    }

    if let Some(crash) = drained.crash {
        return ScanReport::new(
            StatusKind::Error,
            "Scan crashed",
            format!("The scan stopped with an error: {}. Results read before the error were saved.", crash),
        );
    }
    if let Some(reason) = stop {
        let scanner = drained.interrupted.as_deref().unwrap_or("startup");
        return ScanReport::new(
            StatusKind::Warning,
            "Scan stopped",
            format!("Scan stopped during {}: {}. Partial results were saved.", scanner, reason),
        );
    }
    if drained.timed_out {
        return ScanReport::new(
            StatusKind::Error,
            "Scan timed out",
            "The scan did not finish in time. Partial results were saved.",
        );
    }
    if !drained.result.failed.is_empty() {
        return ScanReport::new(
            StatusKind::Failed,
            "Failed to recognize",
            format!("Failed to recognize {} items.", drained.result.failed.len()),
        );
    }
    ScanReport::new(StatusKind::Success, "Complete", "Scan completed with no errors.")
}

#[cfg(windows)]
fn run_scan(config: &ScanConfig, run_id: &str) -> Result<ScanReport> {
    use anyhow::Context;
    use std::thread;

    use super::controller::Controller;
    use super::input::SendInputDriver;
    use super::menu::confirm_main_menu;
    use super::watchdog::DesktopStopProbe;
    use super::worker::run_scanners;
    use crate::calibration::{resolve_screen_profile, ScreenProfile};
    use crate::capture::{GameWindow, Win32Desktop, WindowCapture, WindowService};
    use crate::catalog::Catalog;
    use crate::ocr::TesseractEngine;
    use crate::scanners::ScanContext;

    fn build_context(
        window: &GameWindow,
        profile: ScreenProfile,
        catalog: Arc<Catalog>,
        config: ScanConfig,
        flag: Arc<ScanFlag>,
        failed_dir: std::path::PathBuf,
    ) -> Result<ScanContext> {
        let capture = WindowCapture::new(window).context("Failed to start screen capture")?;
        let engine = TesseractEngine::new(flag.clone()).context("Failed to start Tesseract")?;
        let controller = Controller::new(Box::new(SendInputDriver::new(window)), flag, config.delay_scale);
        Ok(ScanContext::new(
            profile,
            catalog,
            config,
            controller,
            Box::new(capture),
            Box::new(engine),
            failed_dir,
        ))
    }

    let kinds = validate_selection(&config.scanners)?;

    let desktop: Arc<dyn WindowService> = Arc::new(Win32Desktop::new());
    if !desktop.is_elevated() {
        return Err(ScanError::NotElevated.into());
    }
    let window = desktop
        .find_window(&config.window_title, &config.process_name)?
        .ok_or(ScanError::WindowNotFound)?;
    desktop.bring_to_foreground(&window)?;
    thread::sleep(Duration::from_millis(200));

    let (width, height) = desktop.client_size(&window)?;
    crate::log(&format!(
        "Game window: {}x{} client area, DPI scale {:.2}",
        width,
        height,
        desktop.dpi_scale(&window)
    ));
    let profile = resolve_screen_profile(width, height)?;
    if !profile.all_within_bounds() {
        anyhow::bail!("Screen profile does not fit a {}x{} window", width, height);
    }
    crate::log(&format!(
        "Screen profile {}:{} at {}x{}{}",
        profile.ratio().0,
        profile.ratio().1,
        profile.reference().0,
        profile.reference().1,
        if profile.is_rescaled() { " (rescaled)" } else { "" }
    ));
    let catalog = Arc::new(Catalog::load(&crate::paths::get_data_dir())?);
    let failed_dir = crate::paths::get_failed_dir(run_id);

    thread::sleep(Duration::from_secs(1));
    {
        let mut ctx = build_context(
            &window,
            profile.clone(),
            catalog.clone(),
            config.clone(),
            Arc::new(ScanFlag::new()),
            failed_dir.clone(),
        )?;
        confirm_main_menu(&mut ctx)?;
    }

    enter_state(ScanState::Running);
    let worker_config = config.clone();
    let job: ScanJob = Box::new(move |flag, sender| {
        let mut ctx = build_context(&window, profile, catalog, worker_config, flag, failed_dir)?;
        run_scanners(&mut ctx, &kinds, &sender)
    });
    let probe = Arc::new(DesktopStopProbe {
        service: desktop.clone(),
        window,
    });

    let supervised = supervise(
        job,
        probe,
        Duration::from_millis(config.watchdog_poll_ms),
        Duration::from_secs(config.drain_timeout_secs),
    );
    Ok(finalize(
        supervised,
        &crate::paths::resolve_export_dir(&config.export_folder),
        run_id,
    ))
}

#[cfg(not(windows))]
fn run_scan(config: &ScanConfig, _run_id: &str) -> Result<ScanReport> {
    validate_selection(&config.scanners)?;
    Err(ScanError::Unsupported(std::env::consts::OS.to_string()).into())
}
