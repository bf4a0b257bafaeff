//! Scan orchestration for the Wuthering Waves client.
//!
//! This module provides:
//! - Configuration loading and validation
//! - Cancellable input simulation
//! - The worker/watchdog pair that runs a scan in the background
//! - Main-menu detection, JSON export and the final status report

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod input;
pub mod menu;
pub mod queue;
pub mod runner;
pub mod state;
pub mod watchdog;
pub mod worker;

pub use config::{get_config, init_config};
pub use runner::{start_scan, ScanReport, StatusKind};
