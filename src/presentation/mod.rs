// Presentation layer - MCP protocol and its transports
pub mod app_state;
pub mod handlers;
pub mod mcp;
pub mod stdio;
