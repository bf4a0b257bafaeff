use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the directory for crops of unrecognized items: `<exe_dir>/logs/fail/<run_id>/`
pub fn get_failed_dir(run_id: &str) -> PathBuf {
    get_logs_dir().join("fail").join(run_id)
}

/// Returns the catalog directory: `<exe_dir>/data/`
pub fn get_data_dir() -> PathBuf {
    get_exe_dir().join("data")
}

/// Resolves the configured export folder. Relative paths are taken from the exe dir.
pub fn resolve_export_dir(configured: &str) -> PathBuf {
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        path
    } else {
        get_exe_dir().join(path)
    }
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_data_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_export_dir_is_under_exe_dir() {
        let dir = resolve_export_dir("export");
        assert!(dir.starts_with(get_exe_dir()));
        assert!(dir.ends_with("export"));
    }

    #[test]
    fn test_absolute_export_dir_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = resolve_export_dir(tmp.path().to_str().unwrap());
        assert_eq!(dir, tmp.path());
    }
}
