// Configuration structs

use crate::router::password::DEFAULT_ONEPASSWORD_ITEM;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub router: RouterConfig,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Router LAN address
    pub host: String,

    /// Router HTTP port
    pub port: u16,

    /// Explicit password; takes precedence over env var and 1Password
    pub password: Option<String>,

    /// 1Password item name for password lookup
    pub onepassword_item: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: "192.168.178.1".to_string(),
            port: 80,
            password: None,
            onepassword_item: DEFAULT_ONEPASSWORD_ITEM.to_string(),
        }
    }
}
