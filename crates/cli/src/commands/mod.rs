pub mod chat;
pub mod onboard;
pub mod status;

use std::path::Path;

use stratadesk_config::AppConfig;

/// Load the config from `--config` or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
