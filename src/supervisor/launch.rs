//! Launch specs for the two kinds of child: the local tool server and the
//! per-server stdio-to-SSE gateway.
//!
//! Specs are plain data so the exact argv and env handed to each child can be
//! inspected without spawning anything.

use std::process::Stdio;

use tokio::process::Command;

use crate::config::{resolve_env_vars, ServerDefinition};
use crate::error::SwitchyardError;
use crate::settings::{LauncherSettings, GATEWAY_MESSAGE_PATH, GATEWAY_SSE_PATH};

/// Everything needed to start one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Name used in logs (server name or tool instance name).
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    /// Overrides merged over the inherited parent environment.
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Spec for the local tool server.
    ///
    /// Receives the tools directory, instance name, host and port via environment.
    pub fn local_tool_server(settings: &LauncherSettings) -> crate::Result<Self> {
        let (program, args) = split_program(&settings.instance_name, &settings.tools_command)?;
        Ok(Self {
            label: settings.instance_name.clone(),
            program,
            args,
            env: vec![
                (
                    "MCP_TOOLS_DIR".to_string(),
                    settings.tools_dir.display().to_string(),
                ),
                (
                    "MCP_INSTANCE_NAME".to_string(),
                    settings.instance_name.clone(),
                ),
                ("MCP_HOST".to_string(), settings.tools_host.clone()),
                ("MCP_PORT".to_string(), settings.tools_port.to_string()),
            ],
        })
    }

    /// Spec for the gateway wrapping `definition`, listening on `port`.
    ///
    /// The wrapped command line is passed as one argument. The base URL is the
    /// public mount of this server, so the message endpoint the gateway
    /// advertises routes back through the proxy.
    pub fn gateway(
        settings: &LauncherSettings,
        definition: &ServerDefinition,
        port: u16,
    ) -> crate::Result<Self> {
        let (program, mut args) = split_program(&definition.name, &settings.gateway_command)?;
        args.extend([
            "--stdio".to_string(),
            definition.command_line(),
            "--port".to_string(),
            port.to_string(),
            "--baseUrl".to_string(),
            format!("{}{}", settings.public_base_url(), definition.mount_path()),
            "--ssePath".to_string(),
            GATEWAY_SSE_PATH.to_string(),
            "--messagePath".to_string(),
            GATEWAY_MESSAGE_PATH.to_string(),
        ]);
        Ok(Self {
            label: definition.name.clone(),
            program,
            args,
            env: resolve_env_vars(&definition.env),
        })
    }

    /// Build the command. Standard streams are inherited so child logs land on
    /// the launcher's terminal.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);
        cmd
    }
}

fn split_program(label: &str, command: &[String]) -> crate::Result<(String, Vec<String>)> {
    match command.split_first() {
        Some((program, rest)) if !program.is_empty() => Ok((program.clone(), rest.to_vec())),
        _ => Err(SwitchyardError::InvalidConfig(
            label.to_string(),
            "launch command must not be empty".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn definition(name: &str, program: &str, args: &[&str]) -> ServerDefinition {
        ServerDefinition {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: IndexMap::new(),
        }
    }

    #[test]
    fn test_gateway_argv() {
        let settings = LauncherSettings::default();
        let def = definition("foo", "echo", &["hi"]);
        let spec = LaunchSpec::gateway(&settings, &def, 8100).unwrap();

        assert_eq!(spec.label, "foo");
        assert_eq!(spec.program, "npx");
        assert_eq!(
            spec.args,
            vec![
                "-y",
                "supergateway",
                "--stdio",
                "echo hi",
                "--port",
                "8100",
                "--baseUrl",
                "http://localhost:8080/foo",
                "--ssePath",
                "/sse",
                "--messagePath",
                "/message",
            ]
        );
    }

    #[test]
    fn test_gateway_env_overrides() {
        let settings = LauncherSettings::default();
        let mut def = definition("gh", "gh-mcp", &[]);
        def.env.insert("GITHUB_HOST".to_string(), "github.com".to_string());
        let spec = LaunchSpec::gateway(&settings, &def, 8101).unwrap();
        assert_eq!(
            spec.env,
            vec![("GITHUB_HOST".to_string(), "github.com".to_string())]
        );
    }

    #[test]
    fn test_local_tool_server_env() {
        let settings = LauncherSettings {
            tools_port: 8500,
            tools_host: "127.0.0.1".to_string(),
            instance_name: "marketing".to_string(),
            tools_dir: "./tools/marketing_mcp".into(),
            ..Default::default()
        };
        let spec = LaunchSpec::local_tool_server(&settings).unwrap();
        assert_eq!(spec.label, "marketing");
        assert_eq!(spec.program, "python");
        assert_eq!(spec.args, vec!["server/start_mcp.py"]);
        assert!(spec
            .env
            .contains(&("MCP_PORT".to_string(), "8500".to_string())));
        assert!(spec
            .env
            .contains(&("MCP_HOST".to_string(), "127.0.0.1".to_string())));
        assert!(spec.env.contains(&(
            "MCP_TOOLS_DIR".to_string(),
            "./tools/marketing_mcp".to_string()
        )));
        assert!(spec
            .env
            .contains(&("MCP_INSTANCE_NAME".to_string(), "marketing".to_string())));
    }

    #[test]
    fn test_empty_launch_command_rejected() {
        let settings = LauncherSettings {
            gateway_command: vec![],
            ..Default::default()
        };
        let def = definition("foo", "echo", &[]);
        let result = LaunchSpec::gateway(&settings, &def, 8100);
        assert!(matches!(result, Err(SwitchyardError::InvalidConfig(n, _)) if n == "foo"));
    }
}
