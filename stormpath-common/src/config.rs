//! Data folder resolution
//!
//! Resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file (`stormpath/config.toml` in the platform config dir)
//! 4. OS-dependent default (fallback)

use std::path::{Path, PathBuf};

/// Resolve the data folder holding the reports database and road files.
pub fn resolve_data_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = data_folder_from_config_file() {
        return path;
    }

    // Priority 4: OS-dependent default
    default_data_folder()
}

fn data_folder_from_config_file() -> Option<PathBuf> {
    let config_path = dirs::config_dir()?.join("stormpath").join("config.toml");
    let contents = std::fs::read_to_string(config_path).ok()?;
    let config: toml::Value = toml::from_str(&contents).ok()?;
    config
        .get("data_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

/// Platform data dir plus `stormpath`, or a relative fallback
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stormpath"))
        .unwrap_or_else(|| PathBuf::from("./stormpath_data"))
}
