// Configuration loader
// Reads ~/.sagectl/config.toml; the router has well-known defaults so a
// missing file is not an error.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::settings::{Config, RouterConfig};

pub const MODEM_IP_ENV: &str = "SAGEMCOM_MODEM_IP";

/// Load configuration from ~/.sagectl/config.toml, falling back to defaults.
/// The SAGEMCOM_MODEM_IP environment variable overrides the host.
pub fn load_config() -> Result<Config> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let config_path = home.join(".sagectl/config.toml");

    let mut config = load_from_path(&config_path)?.unwrap_or_default();

    if let Ok(host) = std::env::var(MODEM_IP_ENV) {
        if !host.is_empty() {
            config.router.host = host;
        }
    }

    Ok(config)
}

/// Load configuration from a specific path. Returns None if the file does
/// not exist.
pub fn load_from_path(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    #[derive(serde::Deserialize)]
    struct TomlConfig {
        #[serde(default)]
        router: TomlRouter,
    }

    #[derive(serde::Deserialize, Default)]
    struct TomlRouter {
        host: Option<String>,
        port: Option<u16>,
        password: Option<String>,
        onepassword_item: Option<String>,
    }

    let toml_config: TomlConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let defaults = RouterConfig::default();
    Ok(Some(Config {
        router: RouterConfig {
            host: toml_config.router.host.unwrap_or(defaults.host),
            port: toml_config.router.port.unwrap_or(defaults.port),
            password: toml_config.router.password,
            onepassword_item: toml_config
                .router
                .onepassword_item
                .unwrap_or(defaults.onepassword_item),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let result = load_from_path(Path::new("/nonexistent/sagectl/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.router.host, "192.168.178.1");
        assert_eq!(config.router.port, 80);
        assert!(config.router.password.is_none());
        assert_eq!(config.router.onepassword_item, "Ziggo");
    }
}
