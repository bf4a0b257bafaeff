//! Cancellable input controller.
//!
//! Every input action first checks the supervision flag, and every settle
//! wait sleeps in short slices that re-check it. Once the watchdog aborts the
//! scan, the next action or slice returns `ScanError::Cancelled`.

use anyhow::Result;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::error::ScanError;
use super::input::{InputDriver, Key};
use super::state::ScanFlag;
use crate::calibration::Point;

/// Granularity of settle waits.
pub const WAIT_SLICE: Duration = Duration::from_millis(10);

pub struct Controller {
    driver: Box<dyn InputDriver>,
    flag: Arc<ScanFlag>,
    delay_scale: f32,
}

impl Controller {
    pub fn new(driver: Box<dyn InputDriver>, flag: Arc<ScanFlag>, delay_scale: f32) -> Self {
        Self {
            driver,
            flag,
            delay_scale,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        !self.flag.is_running()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ScanError::Cancelled.into());
        }
        Ok(())
    }

    /// Sleeps `seconds` (scaled by the configured delay scale) in slices.
    pub fn wait(&self, seconds: f32) -> Result<()> {
        self.ensure_running()?;
        let total = Duration::from_secs_f32((seconds * self.delay_scale).max(0.0));
        let deadline = Instant::now() + total;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep(WAIT_SLICE.min(deadline - now));
            self.ensure_running()?;
        }
    }

    pub fn click(&mut self, point: Point, settle: f32) -> Result<()> {
        self.ensure_running()?;
        self.driver.click(point)?;
        self.wait(settle)
    }

    pub fn move_to(&mut self, point: Point, settle: f32) -> Result<()> {
        self.ensure_running()?;
        self.driver.move_to(point)?;
        self.wait(settle)
    }

    pub fn scroll(&mut self, amount: f32, settle: f32) -> Result<()> {
        self.ensure_running()?;
        self.driver.scroll(amount)?;
        self.wait(settle)
    }

    pub fn press(&mut self, key: Key, settle: f32) -> Result<()> {
        self.ensure_running()?;
        self.driver.key_press(key)?;
        self.wait(settle)
    }

    pub fn type_text(&mut self, text: &str, settle: f32) -> Result<()> {
        self.ensure_running()?;
        self.driver.type_text(text)?;
        self.wait(settle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::input::tests::{InputEvent, RecordingDriver};

    #[test]
    fn test_actions_reach_driver_while_running() {
        let driver = RecordingDriver::default();
        let flag = Arc::new(ScanFlag::new());
        let mut controller = Controller::new(Box::new(driver.clone()), flag, 1.0);

        controller.click(Point::new(10, 20), 0.0).unwrap();
        controller.press(Key::ESCAPE, 0.0).unwrap();
        controller.scroll(-31.25, 0.0).unwrap();

        assert_eq!(
            driver.events(),
            vec![
                InputEvent::Click(Point::new(10, 20)),
                InputEvent::Key(Key::ESCAPE),
                InputEvent::Scroll(-31.25),
            ]
        );
    }

    #[test]
    fn test_aborted_flag_refuses_input() {
        let driver = RecordingDriver::default();
        let flag = Arc::new(ScanFlag::new());
        let mut controller = Controller::new(Box::new(driver.clone()), flag.clone(), 1.0);

        flag.abort();
        let err = controller.click(Point::new(1, 1), 0.0).unwrap_err();
        assert!(ScanError::is_cancelled(&err));
        assert!(driver.events().is_empty());
    }

    #[test]
    fn test_wait_is_interrupted_by_abort() {
        let flag = Arc::new(ScanFlag::new());
        let controller = Controller::new(Box::new(RecordingDriver::default()), flag.clone(), 1.0);

        let aborter = {
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                flag.abort();
            })
        };

        let started = Instant::now();
        let err = controller.wait(30.0).unwrap_err();
        aborter.join().unwrap();

        assert!(ScanError::is_cancelled(&err));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_delay_scale_shortens_waits() {
        let flag = Arc::new(ScanFlag::new());
        let controller = Controller::new(Box::new(RecordingDriver::default()), flag, 0.0);
        let started = Instant::now();
        controller.wait(10.0).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
