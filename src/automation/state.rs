//! Scan lifecycle states and the one-shot supervision flag.
//!
//! A scan moves through Idle → Validating → Running → Finalizing → Idle.
//! While it runs, the worker and the watchdog race to settle the flag; the
//! first compare-and-swap wins and the other side sees the settled value.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Validating,
    Running,
    Finalizing,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "Idle"),
            ScanState::Validating => write!(f, "Validating"),
            ScanState::Running => write!(f, "Running"),
            ScanState::Finalizing => write!(f, "Finalizing"),
        }
    }
}

/// Settled value of a [`ScanFlag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagState {
    Running,
    Completed,
    Aborted,
}

impl std::fmt::Display for FlagState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagState::Running => write!(f, "running"),
            FlagState::Completed => write!(f, "completed"),
            FlagState::Aborted => write!(f, "aborted"),
        }
    }
}

const RUNNING: u8 = 0;
const COMPLETED: u8 = 1;
const ABORTED: u8 = 2;

/// Tri-state flag that leaves `Running` exactly once.
#[derive(Debug)]
pub struct ScanFlag(AtomicU8);

impl ScanFlag {
    pub fn new() -> Self {
        Self(AtomicU8::new(RUNNING))
    }

    /// Worker finished normally. Returns false if the watchdog got there first.
    pub fn complete(&self) -> bool {
        self.settle(COMPLETED)
    }

    /// Watchdog stop. Returns false if the worker already completed.
    pub fn abort(&self) -> bool {
        self.settle(ABORTED)
    }

    fn settle(&self, to: u8) -> bool {
        self.0
            .compare_exchange(RUNNING, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst) == RUNNING
    }

    pub fn state(&self) -> FlagState {
        match self.0.load(Ordering::SeqCst) {
            RUNNING => FlagState::Running,
            COMPLETED => FlagState::Completed,
            _ => FlagState::Aborted,
        }
    }
}

impl Default for ScanFlag {
    fn default() -> Self {
        Self::new()
    }
}
