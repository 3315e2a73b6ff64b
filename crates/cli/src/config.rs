//! CLI configuration utilities

use anyhow::Result;
use catalog_http::ClientConfig;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "CATALOG";

/// Resolve the data directory: flag, then `CATALOG_DATA_DIR`, then the
/// platform data directory.
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir.unwrap_or_else(|| {
        if let Ok(dir) = std::env::var("CATALOG_DATA_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("catalog")
        }
    })
}

/// Load the client configuration.
///
/// Layers, lowest priority first: built-in defaults, the config file
/// (`path`, or `<data_dir>/config.toml` when present), `CATALOG_*`
/// environment variables.
pub fn load_client_config(path: Option<&Path>, data_dir: &Path) -> Result<ClientConfig> {
    let defaults = ClientConfig::default();
    let file = path.map_or_else(|| data_dir.join(CONFIG_FILE), Path::to_path_buf);

    let settings = config::Config::builder()
        .set_default("base_url", defaults.base_url)?
        .set_default("refresh_path", defaults.refresh_path)?
        .set_default("refresh_auth", "session_cookie")?
        .set_default("share_refresh", defaults.share_refresh)?
        .set_default("timeout_ms", defaults.timeout_ms)?
        .set_default("user_agent", defaults.user_agent)?
        .add_source(config::File::from(file).required(path.is_some()))
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()?;

    Ok(settings.try_deserialize()?)
}
