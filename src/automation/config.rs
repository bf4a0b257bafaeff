//! Scan configuration.
//!
//! Loads settings from config.json at startup. Every field has a default so a
//! partial file is valid; floors are clamped to the ranges the game allows.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<ScanConfig> = OnceLock::new();

/// Scanner identifiers in the order they run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScannerKind {
    Characters,
    Weapons,
    Echoes,
    DevItems,
    Resources,
    Achievements,
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerKind::Characters => write!(f, "characters"),
            ScannerKind::Weapons => write!(f, "weapons"),
            ScannerKind::Echoes => write!(f, "echoes"),
            ScannerKind::DevItems => write!(f, "devItems"),
            ScannerKind::Resources => write!(f, "resources"),
            ScannerKind::Achievements => write!(f, "achievements"),
        }
    }
}

/// Which scanners are enabled.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerSelection {
    pub characters: bool,
    pub weapons: bool,
    pub echoes: bool,
    pub dev_items: bool,
    pub resources: bool,
    /// Must be the only enabled scanner.
    pub achievements: bool,
}

impl ScannerSelection {
    /// Enabled scanners in run order.
    pub fn enabled_order(&self) -> Vec<ScannerKind> {
        [
            (self.characters, ScannerKind::Characters),
            (self.weapons, ScannerKind::Weapons),
            (self.echoes, ScannerKind::Echoes),
            (self.dev_items, ScannerKind::DevItems),
            (self.resources, ScannerKind::Resources),
            (self.achievements, ScannerKind::Achievements),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

impl std::fmt::Display for ScannerSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.enabled_order().iter().map(|k| k.to_string()).collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

/// Minimum rarity/level of recorded weapons and echoes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Floors {
    /// 1..=5
    pub echo_min_rarity: u8,
    /// 0..=25
    pub echo_min_level: u32,
    /// 1..=5
    pub weapons_min_rarity: u8,
    /// 1..=90
    pub weapons_min_level: u32,
}

impl Default for Floors {
    fn default() -> Self {
        Self {
            echo_min_rarity: 1,
            echo_min_level: 0,
            weapons_min_rarity: 1,
            weapons_min_level: 1,
        }
    }
}

impl Floors {
    pub fn clamped(&self) -> Self {
        Self {
            echo_min_rarity: self.echo_min_rarity.clamp(1, 5),
            echo_min_level: self.echo_min_level.min(25),
            weapons_min_rarity: self.weapons_min_rarity.clamp(1, 5),
            weapons_min_level: self.weapons_min_level.clamp(1, 90),
        }
    }
}

/// Complete scan configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Game executable name
    #[serde(default = "default_process_name")]
    pub process_name: String,
    /// Game window title
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// Folder for per-scan exports, relative paths resolve next to the exe
    #[serde(default = "default_export_folder")]
    pub export_folder: String,
    /// In-game key opening the inventory
    #[serde(default = "default_inventory_keybind")]
    pub inventory_keybind: String,
    /// In-game key opening the resonator screen
    #[serde(default = "default_resonator_keybind")]
    pub resonator_keybind: String,
    /// Player character name, exported as ID 1502
    #[serde(default = "default_rover_name")]
    pub rover_name: String,
    #[serde(default)]
    pub floors: Floors,
    #[serde(default)]
    pub scanners: ScannerSelection,
    #[serde(default)]
    pub debug_logging: bool,
    /// Foreground and abort key poll interval (milliseconds)
    #[serde(default = "default_watchdog_poll_ms")]
    pub watchdog_poll_ms: u64,
    /// Upper bound for collecting results after the worker ends (seconds)
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    /// Multiplier for every settle delay
    #[serde(default = "default_delay_scale")]
    pub delay_scale: f32,
}

fn default_process_name() -> String {
    "Client-Win64-Shipping.exe".to_string()
}

fn default_window_title() -> String {
    "Wuthering Waves".to_string()
}

fn default_export_folder() -> String {
    "export".to_string()
}

fn default_inventory_keybind() -> String {
    "B".to_string()
}

fn default_resonator_keybind() -> String {
    "C".to_string()
}

fn default_rover_name() -> String {
    "Rover".to_string()
}

fn default_watchdog_poll_ms() -> u64 {
    100
}

fn default_drain_timeout_secs() -> u64 {
    60
}

const MIN_DELAY_SCALE: f32 = 0.1;
const MAX_DELAY_SCALE: f32 = 10.0;
/// Matches the controller's wait slice.
const MIN_WATCHDOG_POLL_MS: u64 = 10;

fn default_delay_scale() -> f32 {
    1.0
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            window_title: default_window_title(),
            export_folder: default_export_folder(),
            inventory_keybind: default_inventory_keybind(),
            resonator_keybind: default_resonator_keybind(),
            rover_name: default_rover_name(),
            floors: Floors::default(),
            scanners: ScannerSelection::default(),
            debug_logging: false,
            watchdog_poll_ms: default_watchdog_poll_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
            delay_scale: default_delay_scale(),
        }
    }
}

impl ScanConfig {
    /// Applies range limits to values read from disk.
    fn sanitized(mut self) -> Self {
        self.floors = self.floors.clamped();
        if !self.delay_scale.is_finite() || self.delay_scale <= 0.0 {
            self.delay_scale = default_delay_scale();
        }
        self.delay_scale = self.delay_scale.clamp(MIN_DELAY_SCALE, MAX_DELAY_SCALE);
        self.watchdog_poll_ms = self.watchdog_poll_ms.max(MIN_WATCHDOG_POLL_MS);
        self
    }
}

/// Parses a config file body. Errors are returned to the caller for logging.
pub fn parse_config(contents: &str) -> serde_json::Result<ScanConfig> {
    serde_json::from_str::<ScanConfig>(contents).map(ScanConfig::sanitized)
}

/// Loads configuration from `path` or returns defaults.
fn load_config_from(path: &Path) -> ScanConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if !path.exists() {
        crate::log("config.json not found. Using default config.");
        return ScanConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                crate::log("Config loaded from config.json");
                config
            }
            Err(e) => {
                crate::log(&format!("Failed to parse config.json: {}. Using defaults.", e));
                ScanConfig::default()
            }
        },
        Err(e) => {
            crate::log(&format!("Failed to read config.json: {}. Using defaults.", e));
            ScanConfig::default()
        }
    }
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config_from(&crate::paths::get_exe_dir().join("config.json")));
}

/// Returns the global configuration, loading it on first use.
pub fn get_config() -> &'static ScanConfig {
    CONFIG.get_or_init(|| load_config_from(&crate::paths::get_exe_dir().join("config.json")))
}
