// MCP stdio server front-end

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
