//! Watchdog thread: stops the scan when the user takes back control.
//!
//! Polls a [`StopProbe`] while the supervision flag is running. The first
//! positive probe aborts the flag; the worker notices on its next input
//! action or settle slice.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::state::ScanFlag;
use crate::capture::{GameWindow, WindowService};

/// Virtual key that aborts a running scan (Enter).
pub const ABORT_KEY_VK: u16 = 0x0D;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FocusLost,
    AbortKey,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::FocusLost => write!(f, "game window lost focus"),
            StopReason::AbortKey => write!(f, "abort key pressed"),
        }
    }
}

/// Decides whether a running scan must stop.
pub trait StopProbe: Send + Sync {
    fn should_stop(&self) -> Option<StopReason>;
}

/// Stops when the game leaves the foreground or Enter is held.
pub struct DesktopStopProbe {
    pub service: Arc<dyn WindowService>,
    pub window: GameWindow,
}

impl StopProbe for DesktopStopProbe {
    fn should_stop(&self) -> Option<StopReason> {
        if !self.service.is_foreground(&self.window) {
            Some(StopReason::FocusLost)
        } else if self.service.is_key_held(ABORT_KEY_VK) {
            Some(StopReason::AbortKey)
        } else {
            None
        }
    }
}

/// Spawns the watchdog. Returns the stop reason if the watchdog aborted the
/// scan, `None` if the worker completed first.
pub fn spawn_watchdog(
    flag: Arc<ScanFlag>,
    probe: Arc<dyn StopProbe>,
    poll: Duration,
) -> JoinHandle<Option<StopReason>> {
    thread::spawn(move || {
        while flag.is_running() {
            if let Some(reason) = probe.should_stop() {
                if flag.abort() {
                    crate::log(&format!("Stopping scan: {}", reason));
                    return Some(reason);
                }
                return None;
            }
            thread::sleep(poll);
        }
        None
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::automation::state::FlagState;
    use anyhow::Result;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Stops after a fixed number of polls.
    pub(crate) struct ScriptedProbe {
        pub polls: AtomicUsize,
        /// When the first stop was reported.
        pub stopped_at: Mutex<Option<Instant>>,
        stop_after: usize,
        reason: StopReason,
    }

    impl ScriptedProbe {
        pub fn new(stop_after: usize, reason: StopReason) -> Self {
            Self {
                polls: AtomicUsize::new(0),
                stopped_at: Mutex::new(None),
                stop_after,
                reason,
            }
        }
    }

    impl StopProbe for ScriptedProbe {
        fn should_stop(&self) -> Option<StopReason> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < self.stop_after {
                return None;
            }
            self.stopped_at.lock().unwrap().get_or_insert_with(Instant::now);
            Some(self.reason)
        }
    }

    #[test]
    fn test_probe_aborts_running_flag() {
        let flag = Arc::new(ScanFlag::new());
        let probe = Arc::new(ScriptedProbe::new(3, StopReason::AbortKey));
        let handle = spawn_watchdog(flag.clone(), probe.clone(), Duration::from_millis(1));

        assert_eq!(handle.join().unwrap(), Some(StopReason::AbortKey));
        assert_eq!(flag.state(), FlagState::Aborted);
        assert_eq!(probe.polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_completed_flag_ends_watchdog() {
        let flag = Arc::new(ScanFlag::new());
        let probe = Arc::new(ScriptedProbe::new(usize::MAX, StopReason::FocusLost));
        let handle = spawn_watchdog(flag.clone(), probe, Duration::from_millis(1));

        thread::sleep(Duration::from_millis(20));
        assert!(flag.complete());
        assert_eq!(handle.join().unwrap(), None);
        assert_eq!(flag.state(), FlagState::Completed);
    }

    struct FakeDesktop {
        foreground: AtomicBool,
        enter_held: AtomicBool,
    }

    impl WindowService for FakeDesktop {
        fn find_window(&self, _title: &str, _process: &str) -> Result<Option<GameWindow>> {
            Ok(None)
        }

        fn bring_to_foreground(&self, _window: &GameWindow) -> Result<()> {
            Ok(())
        }

        fn client_size(&self, _window: &GameWindow) -> Result<(u32, u32)> {
            Ok((1920, 1080))
        }

        fn dpi_scale(&self, _window: &GameWindow) -> f32 {
            1.0
        }

        fn is_foreground(&self, _window: &GameWindow) -> bool {
            self.foreground.load(Ordering::SeqCst)
        }

        fn is_key_held(&self, vk: u16) -> bool {
            vk == ABORT_KEY_VK && self.enter_held.load(Ordering::SeqCst)
        }

        fn is_elevated(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_desktop_probe() {
        let desktop = Arc::new(FakeDesktop {
            foreground: AtomicBool::new(true),
            enter_held: AtomicBool::new(false),
        });
        let probe = DesktopStopProbe {
            service: desktop.clone(),
            window: GameWindow { handle: 1, pid: 42 },
        };

        assert_eq!(probe.should_stop(), None);
        desktop.enter_held.store(true, Ordering::SeqCst);
        assert_eq!(probe.should_stop(), Some(StopReason::AbortKey));
        desktop.foreground.store(false, Ordering::SeqCst);
        assert_eq!(probe.should_stop(), Some(StopReason::FocusLost));
    }
}
