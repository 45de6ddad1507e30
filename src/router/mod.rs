// Router REST client and rule model

pub mod client;
pub mod password;
pub mod rule;

pub use client::{RemoveError, RouterClient};
pub use rule::{expand_ip_shorthand, validate_port, PortForwardingRule, Protocol, RemoteRule};
