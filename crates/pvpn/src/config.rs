//! Access to the CLI's INI settings file (`pvpn-cli.cfg`).
//!
//! The CLI rewrites this file on every connect, so callers should load it
//! fresh whenever they need current values instead of caching a `CliConfig`.

use crate::error::CliError;
use ini::Ini;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const USER: &str = "USER";
pub const METADATA: &str = "metadata";

/// Literal the CLI writes for unset values.
const NONE_LITERAL: &str = "None";

pub struct CliConfig {
    path: PathBuf,
    ini: Ini,
}

impl CliConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(CliError::MissingConfig { path });
        }
        let ini = Ini::load_from_file(&path).map_err(|e| match e {
            ini::Error::Io(io) => CliError::io(format!("Reading {}", path.display()), io),
            ini::Error::Parse(parse) => CliError::Parse {
                path: path.clone(),
                message: parse.to_string(),
            },
        })?;
        Ok(Self { path, ini })
    }

    /// Writes the default settings file the CLI expects on first run.
    pub fn initialize(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref().to_path_buf();
        let mut ini = Ini::new();
        ini.with_section(Some(USER))
            .set("username", NONE_LITERAL)
            .set("tier", NONE_LITERAL)
            .set("default_protocol", NONE_LITERAL)
            .set("initialized", "0")
            .set("dns_leak_protection", "1")
            .set("custom_dns", NONE_LITERAL)
            .set("check_update_interval", "3");
        ini.with_section(Some(METADATA))
            .set("last_api_pull", "0")
            .set("last_update_check", unix_now().to_string());

        let config = Self { path, ini };
        config.save()?;
        log::debug!("pvpn-cli.cfg initialized at {:?}", config.path);
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value, including the CLI's `None` literal.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.get_from(Some(section), key)
    }

    /// Value with the `None` literal treated as absent.
    pub fn get_opt(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key)
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != NONE_LITERAL)
    }

    pub fn require(&self, section: &str, key: &str) -> Result<&str, CliError> {
        self.get_opt(section, key).ok_or_else(|| CliError::MissingValue {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Parses a value; `Ok(None)` when it is absent.
    pub fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, CliError> {
        match self.get_opt(section, key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| CliError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl ToString) {
        self.ini
            .set_to(Some(section), key.to_string(), value.to_string());
    }

    /// Stores `None` when `value` is absent, mirroring what the CLI writes.
    pub fn set_opt(&mut self, section: &str, key: &str, value: Option<&str>) {
        self.set(section, key, value.unwrap_or(NONE_LITERAL));
    }

    pub fn save(&self) -> Result<(), CliError> {
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| CliError::io(format!("Writing {}", self.path.display()), e))
    }

    // ── Typed accessors ───────────────────────────────────────────────────

    /// Account tier: 0 Free, 1 Basic, 2 Plus/Visionary. Unset counts as Free.
    pub fn tier(&self) -> u8 {
        match self.get_parsed::<u8>(USER, "tier") {
            Ok(tier) => tier.unwrap_or(0),
            Err(e) => {
                log::warn!("{}", e);
                0
            }
        }
    }

    pub fn default_protocol(&self) -> Option<&str> {
        self.get_opt(USER, "default_protocol")
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.get_parsed::<u8>(USER, "initialized"), Ok(Some(1)))
    }

    pub fn connected_server(&self) -> Option<&str> {
        self.get_opt(METADATA, "connected_server")
    }

    pub fn connected_protocol(&self) -> Option<&str> {
        self.get_opt(METADATA, "connected_proto")
    }

    /// Unix timestamp of the current connection's start, as recorded by the CLI.
    pub fn connected_time(&self) -> Option<u64> {
        self.get_parsed::<u64>(METADATA, "connected_time")
            .ok()
            .flatten()
    }
}

/// Re-reads the file, sets one value and writes it back.
pub fn set_value(
    path: impl AsRef<Path>,
    section: &str,
    key: &str,
    value: impl ToString,
) -> Result<(), CliError> {
    let mut config = CliConfig::load(path)?;
    config.set(section, key, value);
    config.save()
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
