//! Launcher settings: ports, tool-server overrides and external command lines.
//!
//! The CLI fills this from flags and environment variables; the library only
//! sees the resolved values.

use std::path::PathBuf;

/// Stream path each gateway serves, relative to its mount.
pub const GATEWAY_SSE_PATH: &str = "/sse";
/// Message path each gateway serves, relative to its mount.
pub const GATEWAY_MESSAGE_PATH: &str = "/message";
/// Stream endpoint prefix of the local tool server.
pub const LOCAL_SSE_PREFIX: &str = "/sse";
/// Message endpoint prefix of the local tool server.
pub const LOCAL_MESSAGE_PREFIX: &str = "/messages";

pub const DEFAULT_LISTEN_PORT: u16 = 8080;
pub const DEFAULT_BASE_PORT: u16 = 8100;
pub const DEFAULT_TOOLS_PORT: u16 = 8000;
pub const DEFAULT_TOOLS_HOST: &str = "0.0.0.0";
pub const DEFAULT_TOOLS_DIR: &str = "./tools";
pub const DEFAULT_INSTANCE_NAME: &str = "mcp-server";
pub const DEFAULT_GATEWAY_COMMAND: &str = "npx -y supergateway";
pub const DEFAULT_TOOLS_COMMAND: &str = "python server/start_mcp.py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSettings {
    /// Bind address of the public listener.
    pub listen_host: String,
    /// Port of the public listener.
    pub listen_port: u16,
    /// First gateway port; gateway `i` gets `base_port + i`.
    pub base_port: u16,
    /// Host the local tool server is told to bind.
    pub tools_host: String,
    /// Port the local tool server is told to bind.
    pub tools_port: u16,
    pub tools_dir: PathBuf,
    pub instance_name: String,
    /// Externally visible URL of the listener. Defaults to `http://localhost:<listen_port>`.
    pub public_url: Option<String>,
    /// Gateway program and leading arguments.
    pub gateway_command: Vec<String>,
    /// Local tool server program and arguments.
    pub tools_command: Vec<String>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            base_port: DEFAULT_BASE_PORT,
            tools_host: DEFAULT_TOOLS_HOST.to_string(),
            tools_port: DEFAULT_TOOLS_PORT,
            tools_dir: PathBuf::from(DEFAULT_TOOLS_DIR),
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            public_url: None,
            gateway_command: split_command(DEFAULT_GATEWAY_COMMAND),
            tools_command: split_command(DEFAULT_TOOLS_COMMAND),
        }
    }
}

impl LauncherSettings {
    /// Public base URL without a trailing slash.
    pub fn public_base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.listen_port),
        }
    }

    /// `host:port` the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

/// Split a command string on whitespace. No shell quoting is interpreted.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
