//! Server file loading: `mcpServers` JSON deserialization and validation.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::SwitchyardError;

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is a literal.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve a server's env overrides against the parent environment.
///
/// `${VAR}` values are looked up (unset resolves to the empty string, same as
/// shell `${UNSET-}`); anything else is passed through literally. Order is kept.
pub fn resolve_env_vars(env: &IndexMap<String, String>) -> Vec<(String, String)> {
    env.iter()
        .map(|(k, v)| {
            let resolved = match parse_env_ref(v) {
                Some(var_name) => std::env::var(var_name).unwrap_or_default(),
                None => v.clone(),
            };
            (k.clone(), resolved)
        })
        .collect()
}

/// Top-level server file, parsed from JSON.
///
/// `IndexMap` keeps the declaration order, which drives port allocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConfig {
    #[serde(default)]
    pub mcp_servers: IndexMap<String, ServerEntry>,
}

/// One raw `mcpServers.<name>` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

/// A validated, name-normalized server definition. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDefinition {
    /// Lowercased name, used as the route prefix.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: IndexMap<String, String>,
}

impl ServerDefinition {
    /// Program and arguments joined with single spaces, as handed to the gateway.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Route prefix this server is mounted under, e.g. `/github`.
    pub fn mount_path(&self) -> String {
        format!("/{}", self.name)
    }
}

impl McpConfig {
    /// Parse a server file body. `path` is only used for error messages.
    pub fn from_json(path: &Path, content: &str) -> crate::Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| SwitchyardError::ConfigParse(path.to_path_buf(), e.to_string()))
    }

    /// Validate every entry and produce definitions in declaration order.
    ///
    /// Fails fast: an empty map, an empty command, a name that cannot be a
    /// path segment, or two names equal after lowercasing all abort startup.
    pub fn into_definitions(self, path: &Path) -> crate::Result<Vec<ServerDefinition>> {
        if self.mcp_servers.is_empty() {
            return Err(SwitchyardError::EmptyConfig(path.to_path_buf()));
        }

        let mut definitions: Vec<ServerDefinition> = Vec::with_capacity(self.mcp_servers.len());
        for (raw_name, entry) in self.mcp_servers {
            let name = raw_name.to_lowercase();

            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(SwitchyardError::InvalidConfig(
                    raw_name,
                    "name must be non-empty ASCII alphanumeric with '-' or '_'".to_string(),
                ));
            }

            if definitions.iter().any(|d| d.name == name) {
                return Err(SwitchyardError::DuplicateName(name));
            }

            if entry.command.trim().is_empty() {
                return Err(SwitchyardError::InvalidConfig(
                    raw_name,
                    "'command' must not be empty".to_string(),
                ));
            }

            definitions.push(ServerDefinition {
                name,
                program: entry.command,
                args: entry.args,
                env: entry.env,
            });
        }

        Ok(definitions)
    }
}

/// Read, parse and validate the server file at `path`.
pub async fn load_definitions(path: &Path) -> crate::Result<Vec<ServerDefinition>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SwitchyardError::ConfigNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(SwitchyardError::ConfigRead(path.to_path_buf(), e.to_string()));
        }
    };

    let definitions = McpConfig::from_json(path, &content)?.into_definitions(path)?;
    tracing::info!(
        path = %path.display(),
        servers = definitions.len(),
        "loaded server definitions"
    );
    Ok(definitions)
}
