use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "gui_settings.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GuiSettings {
    pub cli_path: String,
    pub escalation_tool: String,
    pub log_level_val: f32,
    pub close_to_tray: bool,
    pub notifications: bool,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            cli_path: pvpn::cli::DEFAULT_PROGRAM.to_string(),
            escalation_tool: "sudo".to_string(),
            log_level_val: 3.0, // Default: Info level
            close_to_tray: true,
            notifications: true,
        }
    }
}

fn settings_path() -> anyhow::Result<PathBuf> {
    let dir = pvpn::get_app_data_dir().map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(dir.join(SETTINGS_FILE))
}

impl GuiSettings {
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load() -> Self {
        match settings_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Self::default(),
        }
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!("Ignoring malformed {}: {}", SETTINGS_FILE, e),
                }
            }
        }
        Self::default()
    }

    /// CLI program to look up, never empty.
    pub fn cli_program(&self) -> &str {
        if self.cli_path.trim().is_empty() {
            pvpn::cli::DEFAULT_PROGRAM
        } else {
            self.cli_path.trim()
        }
    }
}
