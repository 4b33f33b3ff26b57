use std::path::{Path, PathBuf};

use crate::components::history::DEFAULT_HISTORY_SIZE;

/// Editor preferences, stored as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// File name offered when exporting JSON
    pub default_json_file_name: String,
    /// Width of the layout panel in percent
    pub default_left_width: f64,
    /// Step applied by the width/flex nudge buttons
    pub ratio_step: f64,
    /// Object key prefix inside the storage bucket
    pub storage_bucket_prefix: String,
    /// Public base URL that uploaded object keys are appended to
    pub storage_public_base_url: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_HISTORY_SIZE,
            default_json_file_name: "DT_EX0000.json".to_string(),
            default_left_width: 60.0,
            ratio_step: 0.1,
            storage_bucket_prefix: "exhibits".to_string(),
            storage_public_base_url: String::new(),
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/tourfe/tourfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\TourFE\tourfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/TourFE/tourfe_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join("tourfe_settings.cfg"))
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
        Self::parse(&content)
    }

    /// Parse `key=value` lines. Unknown keys and malformed values are skipped.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.clamp(1, 1000);
                    }
                }
                "default_json_file_name" => {
                    if !val.is_empty() {
                        s.default_json_file_name = val.to_string();
                    }
                }
                "default_left_width" => {
                    if let Ok(v) = val.parse::<f64>() {
                        if v.is_finite() {
                            s.default_left_width = v.clamp(10.0, 90.0);
                        }
                    }
                }
                "ratio_step" => {
                    if let Ok(v) = val.parse::<f64>() {
                        if v.is_finite() && v > 0.0 {
                            s.ratio_step = v;
                        }
                    }
                }
                "storage_bucket_prefix" => s.storage_bucket_prefix = val.trim_matches('/').to_string(),
                "storage_public_base_url" => s.storage_public_base_url = val.trim_end_matches('/').to_string(),
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             default_json_file_name={}\n\
             default_left_width={}\n\
             ratio_step={}\n\
             storage_bucket_prefix={}\n\
             storage_public_base_url={}\n",
            self.max_undo_steps,
            self.default_json_file_name,
            self.default_left_width,
            self.ratio_step,
            self.storage_bucket_prefix,
            self.storage_public_base_url,
        )
    }

    /// Save settings to disk
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::settings_path() else { return Ok(()) };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}

/// Per-user configuration directory for TourFE.
pub(crate) fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
        return Some(PathBuf::from(appdata).join("TourFE"));
    }
    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("TourFE"),
        );
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
            .ok()?;
        Some(base.join("tourfe"))
    }
}
