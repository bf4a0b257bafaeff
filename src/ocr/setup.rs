use anyhow::{anyhow, Result};
use std::path::PathBuf;

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for a locally provided Tesseract copy
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wuwa-scanner")
        .join("tesseract")
}

const COMMON_INSTALL_DIRS: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

fn executable_name() -> &'static str {
    if cfg!(windows) { "tesseract.exe" } else { "tesseract" }
}

/// Locates the Tesseract executable and its tessdata directory.
pub fn locate_tesseract() -> Result<TesseractPaths> {
    Ok(TesseractPaths {
        executable: find_tesseract_executable()?,
        tessdata: find_tessdata_dir()?,
    })
}

/// Finds the Tesseract executable, checking our local dir first, then system
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(executable_name());
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for dir in &COMMON_INSTALL_DIRS {
        let p = PathBuf::from(dir).join("tesseract.exe");
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR (add it to PATH) or copy it to {}",
        get_tesseract_dir().display()
    ))
}

/// Finds the tessdata directory containing eng.traineddata
pub fn find_tessdata_dir() -> Result<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.extend(
        COMMON_INSTALL_DIRS
            .iter()
            .map(|dir| PathBuf::from(dir).join("tessdata")),
    );
    candidates.push(PathBuf::from("/usr/share/tesseract-ocr/5/tessdata"));
    candidates.push(PathBuf::from("/usr/share/tessdata"));

    candidates
        .into_iter()
        .find(|p| p.join("eng.traineddata").exists())
        .ok_or_else(|| {
            anyhow!("tessdata directory not found. Please ensure eng.traineddata is available.")
        })
}
