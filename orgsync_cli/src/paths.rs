//! Centralized path management for the orgsync CLI
//!
//! Data (mapping files, reports) lives under the platform data directory,
//! configuration under the platform config directory.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "orgsync";

const MAPPING_SUBDIR: &str = "mappings";

const REPORT_SUBDIR: &str = "reports";

/// Base data directory, e.g. `~/.local/share/orgsync`.
/// Falls back to `.orgsync` in the current directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".orgsync"))
}

pub fn get_mapping_dir() -> PathBuf {
    get_data_dir().join(MAPPING_SUBDIR)
}

pub fn get_report_dir() -> PathBuf {
    get_data_dir().join(REPORT_SUBDIR)
}

/// Configuration directory. `XDG_CONFIG_HOME` wins on Unix-like systems,
/// then the platform default (`~/.config/orgsync`, `%APPDATA%\orgsync`).
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".orgsync"))
}
