//! Error types for Switchyard launch and proxy operations.

use std::path::PathBuf;

use thiserror::Error;

/// Shape of the server file, quoted in config errors so operators can fix it.
pub const EXPECTED_FORMAT: &str =
    r#"{"mcpServers": {"<name>": {"command": "<program>", "args": ["..."], "env": {"KEY": "value"}}}}"#;

/// Main error type for Switchyard operations
#[derive(Error, Debug)]
pub enum SwitchyardError {
    /// Server file does not exist
    #[error("config file not found: {} (expected {fmt})", .0.display(), fmt = EXPECTED_FORMAT)]
    ConfigNotFound(PathBuf),

    /// Server file exists but could not be read
    #[error("failed to read config file {}: {}", .0.display(), .1)]
    ConfigRead(PathBuf, String),

    /// Server file is not valid JSON or has the wrong shape
    #[error("failed to parse config file {}: {} (expected {fmt})", .0.display(), .1, fmt = EXPECTED_FORMAT)]
    ConfigParse(PathBuf, String),

    /// `mcpServers` is missing or has no entries
    #[error("no servers defined in {}: 'mcpServers' must contain at least one entry", .0.display())]
    EmptyConfig(PathBuf),

    /// Invalid definition for a named server
    #[error("invalid config for server '{0}': {1}")]
    InvalidConfig(String, String),

    /// Two server names collide once lowercased
    #[error("duplicate server name: {0}")]
    DuplicateName(String),

    /// Allocated port would exceed the u16 range
    #[error("port overflow: base port {0} + index {1} exceeds 65535")]
    PortOverflow(u16, usize),

    /// A child process could not be started
    #[error("failed to spawn '{0}': {1}")]
    Spawn(String, String),

    /// The supervisor no longer accepts new children
    #[error("supervisor is shutting down, refusing to spawn '{0}'")]
    ShuttingDown(String),

    /// Upstream HTTP client could not be built
    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(String),

    /// HTTP listener failure
    #[error("listener error on {0}: {1}")]
    Listener(String, String),
}

/// Result type alias for Switchyard operations
pub type Result<T> = std::result::Result<T, SwitchyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_display() {
        let err = SwitchyardError::DuplicateName("github".to_string());
        assert_eq!(err.to_string(), "duplicate server name: github");
    }

    #[test]
    fn test_invalid_config_display() {
        let err = SwitchyardError::InvalidConfig(
            "gh".to_string(),
            "'command' must not be empty".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "invalid config for server 'gh': 'command' must not be empty"
        );
    }

    #[test]
    fn test_parse_error_names_expected_format() {
        let err = SwitchyardError::ConfigParse(
            PathBuf::from("mcp.json"),
            "expected value at line 1 column 1".to_string(),
        );
        let msg = err.to_string();
        assert!(msg.contains("expected value at line 1 column 1"));
        assert!(msg.contains("mcpServers"));
    }

    #[test]
    fn test_port_overflow_display() {
        let err = SwitchyardError::PortOverflow(65535, 2);
        assert_eq!(
            err.to_string(),
            "port overflow: base port 65535 + index 2 exceeds 65535"
        );
    }
}
