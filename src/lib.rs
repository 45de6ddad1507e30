// sagectl - Sagemcom router port forward manager
// Library exports

pub mod cli;
pub mod config;
pub mod errors;
pub mod mcp; // MCP stdio server front-end
pub mod router; // Router REST client and rule model
