// Configuration

mod loader;
mod settings;

pub use loader::{load_config, load_from_path, MODEM_IP_ENV};
pub use settings::{Config, RouterConfig};
