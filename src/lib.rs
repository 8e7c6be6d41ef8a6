//! Switchyard — MCP launch front-end.
//! Reads an `mcpServers` JSON file, starts a local tool server plus one
//! stdio-to-SSE gateway per entry, and fronts them all with a single
//! path-routed HTTP reverse proxy.

pub mod config;
pub mod error;
pub mod launcher;
pub mod ports;
pub mod proxy;
pub mod settings;
pub mod status;
pub mod supervisor;

pub use config::{load_definitions, parse_env_ref, resolve_env_vars, McpConfig, ServerDefinition};
pub use error::{Result, SwitchyardError};
pub use launcher::{GatewayPlan, LaunchPlan, Launcher};
pub use proxy::routes::{RouteMatch, RouteTable};
pub use settings::LauncherSettings;
pub use status::StatusDocument;
pub use supervisor::launch::LaunchSpec;
pub use supervisor::{ShutdownReport, Supervisor};
