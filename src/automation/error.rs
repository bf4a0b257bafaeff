//! Scan error types.
//!
//! Precondition failures and cancellation get their own variants so the
//! runner can map them to a status after they travel through `anyhow`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Select at least one scanner.")]
    NoScannerSelected,

    #[error("The achievements scanner must be run on its own.")]
    ExclusiveAchievements,

    #[error("Administrator privileges not granted.\nTo use the scanner, administrator rights must be granted.")]
    NotElevated,

    #[error("Game window not found. Start Wuthering Waves and rerun the scanner.")]
    WindowNotFound,

    #[error("Not in the main menu. Press ESC in-game and rerun the scanner.")]
    NotInMainMenu,

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Unsupported platform: {0}")]
    Unsupported(String),
}

impl ScanError {
    /// Finds a `ScanError` anywhere in an `anyhow` chain.
    pub fn find(error: &anyhow::Error) -> Option<&ScanError> {
        error.chain().find_map(|cause| cause.downcast_ref::<ScanError>())
    }

    /// True if `error` was caused by a cancellation.
    pub fn is_cancelled(error: &anyhow::Error) -> bool {
        matches!(Self::find(error), Some(ScanError::Cancelled))
    }
}
