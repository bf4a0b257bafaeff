//! Scan worker thread.
//!
//! The worker owns everything that touches the game (capture, recognition,
//! input) and reports through the result queue only. Errors and panics are
//! caught at the top of the thread and turned into a `Crashed` message, and
//! `Done` is always the last message sent.

use anyhow::{anyhow, Context, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::config::ScannerKind;
use super::error::ScanError;
use super::input::Key;
use super::queue::WorkerMessage;
use super::state::ScanFlag;
use crate::scanners::items::{fill_shell_credits, SHELL_CREDIT_ID};
use crate::scanners::{reads_inventory, run_scanner, ScanContext, ScanResult};

/// Pause after leaving a scanner's menu.
const BETWEEN_SCANNERS: f32 = 0.5;

/// Work run on the worker thread. It builds its own scan context there, so
/// the context itself never crosses threads.
pub type ScanJob = Box<dyn FnOnce(Arc<ScanFlag>, Sender<WorkerMessage>) -> Result<()> + Send + 'static>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Spawns the worker thread running `job`.
pub fn spawn_worker(job: ScanJob, flag: Arc<ScanFlag>, sender: Sender<WorkerMessage>) -> JoinHandle<()> {
    thread::spawn(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(flag.clone(), sender.clone())));

        match outcome {
            Ok(Ok(())) => crate::log("Scan worker finished"),
            Ok(Err(e)) if ScanError::is_cancelled(&e) => crate::log("Scan worker stopped"),
            Ok(Err(e)) => {
                crate::log(&format!("Scan worker failed: {:#}", e));
                let _ = sender.send(WorkerMessage::Crashed(format!("{:#}", e)));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                crate::log(&format!("Scan worker panicked: {}", message));
                let _ = sender.send(WorkerMessage::Crashed(message));
            }
        }

        if !flag.complete() {
            crate::log_debug(&format!("Worker completion lost the race, flag is {}", flag.state()));
        }
        let _ = sender.send(WorkerMessage::Done);
    })
}

/// Runs `kinds` in order, sending each scanner's result as soon as it ends.
///
/// A scanner that fails sends what it read so far as `Interrupted` and ends
/// the run with its error.
pub fn run_scanners(ctx: &mut ScanContext, kinds: &[ScannerKind], sender: &Sender<WorkerMessage>) -> Result<()> {
    let mut shell_known = false;

    for &kind in kinds {
        ctx.reset_cache();
        let mut partial = ScanResult::default();

        if let Err(e) = run_scanner(kind, ctx, &mut partial) {
            crate::log(&format!("{} scanner interrupted: {}", kind, partial.summary()));
            let _ = sender.send(WorkerMessage::Interrupted {
                scanner: kind.to_string(),
                result: partial,
            });
            return Err(e.context(format!("{} scanner", kind)));
        }

        if reads_inventory(kind) && !shell_known {
            fill_shell_credits(ctx, &mut partial);
        }
        shell_known |= partial.inventory.get(SHELL_CREDIT_ID).copied().unwrap_or(0) > 0;

        crate::log(&format!("{} scanner done: {}", kind, partial.summary()));
        sender
            .send(WorkerMessage::Chunk {
                scanner: kind.to_string(),
                result: partial,
            })
            .map_err(|_| anyhow!("Result queue closed"))?;

        // The achievements scanner already returns to the game screen.
        if kind != ScannerKind::Achievements {
            ctx.controller
                .press(Key::ESCAPE, BETWEEN_SCANNERS)
                .context("Failed to leave the scanner menu")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::ScanConfig;
    use crate::automation::queue::{create_result_queue, drain};
    use crate::automation::state::FlagState;
    use crate::catalog::Catalog;
    use crate::scanners::context::tests::{fake_context, fake_context_with_flag, FakeState};
    use std::time::Duration;

    fn shell_only(_: &FakeState, size: (u32, u32)) -> String {
        if size == (165, 50) { "500".to_string() } else { String::new() }
    }

    #[test]
    fn test_run_scanners_sends_chunk_and_shell_credits() {
        let (mut ctx, state) = fake_context(Catalog::default(), ScanConfig::default(), Box::new(shell_only));
        let (sender, receiver) = create_result_queue();

        run_scanners(&mut ctx, &[ScannerKind::DevItems, ScannerKind::Resources], &sender).unwrap();
        drop(sender);

        let drained = drain(&receiver, Duration::from_secs(1));
        assert_eq!(drained.completed_scanners, vec!["devItems", "resources"]);
        assert_eq!(drained.result.inventory[SHELL_CREDIT_ID], 500);
        assert_eq!(state.lock().unwrap().keys.last(), Some(&Key::ESCAPE));
    }

    #[test]
    fn test_cancelled_scanner_sends_interrupted() {
        let flag = Arc::new(ScanFlag::new());
        let (mut ctx, _) =
            fake_context_with_flag(Catalog::default(), ScanConfig::default(), Box::new(shell_only), flag.clone());
        let (sender, receiver) = create_result_queue();

        flag.abort();
        let err = run_scanners(&mut ctx, &[ScannerKind::Weapons], &sender).unwrap_err();
        drop(sender);

        assert!(ScanError::is_cancelled(&err));
        let drained = drain(&receiver, Duration::from_secs(1));
        assert_eq!(drained.interrupted.as_deref(), Some("weapons"));
        assert!(drained.completed_scanners.is_empty());
    }

    #[test]
    fn test_worker_reports_errors_and_finishes() {
        let flag = Arc::new(ScanFlag::new());
        let (sender, receiver) = create_result_queue();
        let job: ScanJob = Box::new(|_, _| Err(anyhow!("capture device lost")));

        spawn_worker(job, flag.clone(), sender).join().unwrap();

        let drained = drain(&receiver, Duration::from_secs(1));
        assert_eq!(drained.crash.as_deref(), Some("capture device lost"));
        assert!(!drained.timed_out);
        assert_eq!(flag.state(), FlagState::Completed);
    }

    #[test]
    fn test_worker_catches_panics() {
        let flag = Arc::new(ScanFlag::new());
        let (sender, receiver) = create_result_queue();
        let job: ScanJob = Box::new(|_, _| panic!("index out of range"));

        spawn_worker(job, flag, sender).join().unwrap();

        let drained = drain(&receiver, Duration::from_secs(1));
        assert!(drained.crash.unwrap().contains("index out of range"));
    }

    #[test]
    fn test_cancelled_worker_is_not_a_crash() {
        let flag = Arc::new(ScanFlag::new());
        let (sender, receiver) = create_result_queue();
        let job: ScanJob = Box::new(|flag: Arc<ScanFlag>, sender: Sender<WorkerMessage>| {
            sender
                .send(WorkerMessage::Interrupted {
                    scanner: "echoes".into(),
                    result: ScanResult::default(),
                })
                .unwrap();
            flag.abort();
            Err(ScanError::Cancelled.into())
        });

        spawn_worker(job, flag.clone(), sender).join().unwrap();

        let drained = drain(&receiver, Duration::from_secs(1));
        assert!(drained.crash.is_none());
        assert_eq!(drained.interrupted.as_deref(), Some("echoes"));
        assert_eq!(flag.state(), FlagState::Aborted);
    }
}
