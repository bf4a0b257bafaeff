//! Result queue between the scan worker and the coordinator.
//!
//! Uses std::sync::mpsc. The worker sends a chunk after every scanner so a
//! stopped scan still hands over everything finished so far.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use crate::scanners::ScanResult;

/// A message from the worker thread.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Results of one finished scanner
    Chunk { scanner: String, result: ScanResult },
    /// Partial results of a scanner that was stopped mid-way
    Interrupted { scanner: String, result: ScanResult },
    /// The worker failed; carries the error or panic message
    Crashed(String),
    /// No more messages follow
    Done,
}

/// Creates the worker → coordinator queue.
///
/// The channel is unbounded; the coordinator only drains it after the worker
/// has stopped.
pub fn create_result_queue() -> (Sender<WorkerMessage>, Receiver<WorkerMessage>) {
    channel()
}

/// Everything drained from the queue.
#[derive(Debug, Default)]
pub struct Drained {
    pub result: ScanResult,
    pub completed_scanners: Vec<String>,
    pub interrupted: Option<String>,
    pub crash: Option<String>,
    /// The drain stopped at the deadline before `Done` arrived.
    pub timed_out: bool,
}

/// Merges queued messages until `Done`, a closed channel or `timeout`.
pub fn drain(receiver: &Receiver<WorkerMessage>, timeout: Duration) -> Drained {
    let deadline = Instant::now() + timeout;
    let mut drained = Drained::default();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(WorkerMessage::Chunk { scanner, result }) => {
                drained.result.merge(result);
                drained.completed_scanners.push(scanner);
            }
            Ok(WorkerMessage::Interrupted { scanner, result }) => {
                drained.result.merge(result);
                drained.interrupted = Some(scanner);
            }
            Ok(WorkerMessage::Crashed(message)) => {
                drained.crash = Some(message);
            }
            Ok(WorkerMessage::Done) => break,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                drained.timed_out = true;
                break;
            }
        }
    }

    drained
}
