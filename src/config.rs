//! Settings file location and load/save
//!
//! TOML by default; files ending in `.json` are read and written as JSON so
//! settings exported by older releases can be used directly.

use anyhow::Context;
use quadrant_core::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

/// Default settings path (~/.config/quadrant/settings.toml)
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quadrant")
        .join("settings.toml")
}

/// Parse settings text and check it for consistency
pub fn parse(content: &str, format: FileFormat) -> anyhow::Result<Settings> {
    let settings: Settings = match format {
        FileFormat::Toml => toml::from_str(content)?,
        FileFormat::Json => serde_json::from_str(content)?,
    };
    settings.validate()?;
    Ok(settings)
}

pub fn render(settings: &Settings, format: FileFormat) -> anyhow::Result<String> {
    Ok(match format {
        FileFormat::Toml => toml::to_string_pretty(settings)?,
        FileFormat::Json => serde_json::to_string_pretty(settings)?,
    })
}

/// Load settings from a file, or return defaults if it does not exist
pub fn load(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        debug!("No settings at {:?}, using defaults", path);
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content, FileFormat::for_path(path))
        .with_context(|| format!("Invalid settings in {}", path.display()))
}

/// Save settings to a file
pub fn save(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = render(settings, FileFormat::for_path(path))?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Saved settings to {:?}", path);
    Ok(())
}
