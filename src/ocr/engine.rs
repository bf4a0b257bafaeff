use anyhow::{anyhow, Context as _, Result};
use image::GrayImage;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;

use tempfile::NamedTempFile;

use super::setup::{locate_tesseract, TesseractPaths};
use crate::automation::controller::WAIT_SLICE;
use crate::automation::error::ScanError;
use crate::automation::state::ScanFlag;

/// Character filters and layout hint for one recognition call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecognizeOptions {
    /// Only these characters may appear in the output.
    pub allowed: Option<String>,
    /// These characters are removed from the output.
    pub banned: Option<String>,
    /// Treat the image as a single text line.
    pub single_line: bool,
}

impl RecognizeOptions {
    pub fn allow(chars: &str) -> Self {
        Self {
            allowed: Some(chars.to_string()),
            ..Default::default()
        }
    }

    pub fn ban(chars: &str) -> Self {
        Self {
            banned: Some(chars.to_string()),
            ..Default::default()
        }
    }

    pub fn single_line(mut self) -> Self {
        self.single_line = true;
        self
    }
}

/// Text recognition over a normalized (binary, dark-on-light) image.
///
/// Lines are separated by `\n`, words within a line by a single space.
pub trait TextRecognizer {
    fn recognize_text(&self, image: &GrayImage, options: &RecognizeOptions) -> Result<String>;
}

/// Represents a line of OCR text with confidence score
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with its box and confidence score
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl OcrWord {
    fn center_y(&self) -> i32 {
        self.top + self.height / 2
    }
}

/// Runs the Tesseract CLI per call. A running call is killed as soon as the
/// scan flag leaves the running state.
pub struct TesseractEngine {
    paths: TesseractPaths,
    flag: Arc<ScanFlag>,
}

impl TesseractEngine {
    pub fn new(flag: Arc<ScanFlag>) -> Result<Self> {
        let paths = locate_tesseract()?;
        crate::log(&format!("Using Tesseract at {}", paths.executable.display()));
        Ok(Self { paths, flag })
    }

    /// Runs Tesseract with TSV output and returns word-level lines.
    pub fn recognize_lines(
        &self,
        img: &GrayImage,
        options: &RecognizeOptions,
    ) -> Result<Vec<OcrLine>> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.paths.executable);
        command
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.paths.tessdata)
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg(if options.single_line { "7" } else { "6" });
        if let Some(allowed) = &options.allowed {
            command.arg("-c").arg(format!("tessedit_char_whitelist={}", allowed));
        }
        if let Some(banned) = &options.banned {
            let banned: String = banned.chars().filter(|c| !c.is_whitespace()).collect();
            if !banned.is_empty() {
                command.arg("-c").arg(format!("tessedit_char_blacklist={}", banned));
            }
        }
        let mut child = command
            .arg("tsv")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to run Tesseract")?;
        let status = wait_cancellable(&mut child, &self.flag)?;

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(group_lines(parse_tsv_words(&tsv_content)))
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize_text(&self, image: &GrayImage, options: &RecognizeOptions) -> Result<String> {
        let lines = self.recognize_lines(image, options)?;
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(apply_char_filters(&text, options))
    }
}

/// Waits for `child` in [`WAIT_SLICE`] steps. Kills it and returns
/// [`ScanError::Cancelled`] once `flag` is no longer running.
pub fn wait_cancellable(child: &mut Child, flag: &ScanFlag) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if !flag.is_running() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ScanError::Cancelled.into());
        }
        thread::sleep(WAIT_SLICE);
    }
}

/// Applies the allow/ban lists to recognized text. Newlines are kept so line
/// structure survives filtering.
pub fn apply_char_filters(text: &str, options: &RecognizeOptions) -> String {
    text.chars()
        .filter(|c| {
            if *c == '\n' {
                return true;
            }
            if let Some(allowed) = &options.allowed {
                if !allowed.contains(*c) {
                    return false;
                }
            }
            if let Some(banned) = &options.banned {
                if banned.contains(*c) {
                    return false;
                }
            }
            true
        })
        .collect::<String>()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Parses Tesseract TSV output into word boxes.
fn parse_tsv_words(tsv: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();

    // Skip header
    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
            left: fields[6].parse().unwrap_or(0),
            top: fields[7].parse().unwrap_or(0),
            width: fields[8].parse().unwrap_or(0),
            height: fields[9].parse().unwrap_or(0),
        });
    }

    words
}

/// Groups words into lines by vertical proximity of their boxes.
///
/// A word joins the current line when its vertical center falls inside the
/// line's vertical span. Words in a line are ordered left to right.
fn group_lines(mut words: Vec<OcrWord>) -> Vec<OcrLine> {
    words.sort_by_key(|w| (w.center_y(), w.left));

    let mut groups: Vec<(i32, i32, Vec<OcrWord>)> = Vec::new();
    for word in words {
        let center = word.center_y();
        match groups.last_mut() {
            Some((top, bottom, members)) if center >= *top && center <= *bottom => {
                *top = (*top).min(word.top);
                *bottom = (*bottom).max(word.top + word.height);
                members.push(word);
            }
            _ => groups.push((word.top, word.top + word.height, vec![word])),
        }
    }

    groups
        .into_iter()
        .map(|(_, _, mut members)| {
            members.sort_by_key(|w| w.left);
            let confidence =
                members.iter().map(|w| w.confidence).sum::<f32>() / members.len() as f32;
            let text = members
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            OcrLine {
                text,
                words: members,
                confidence,
            }
        })
        .collect()
}
