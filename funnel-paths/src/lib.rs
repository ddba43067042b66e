//! XDG Base Directory paths for the funnel tool.
//!
//! The CLI resolves its user config and its simulation data (the JSON
//! session store) from these locations on every platform, the same way
//! tools like gh and kubectl do.

use std::path::PathBuf;

/// Application directory name under the XDG roots.
const APP_DIR: &str = "funnel";

/// Get the funnel config directory.
///
/// Returns `$XDG_CONFIG_HOME/funnel` if set, otherwise `~/.config/funnel`.
///
/// # Examples
///
/// ```
/// use funnel_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// assert!(config_file.ends_with("funnel/config.toml"));
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP_DIR)
    } else {
        PathBuf::from(".config").join(APP_DIR)
    }
}

/// Get the funnel data directory.
///
/// Returns `$XDG_DATA_HOME/funnel` if set, otherwise `~/.local/share/funnel`.
/// Simulated analytics sessions are written here.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share").join(APP_DIR)
    } else {
        PathBuf::from(".local/share").join(APP_DIR)
    }
}

/// Default location of the JSON session store used by `funnel simulate`.
pub fn session_store_path() -> PathBuf {
    data_dir().join("sessions.json")
}
