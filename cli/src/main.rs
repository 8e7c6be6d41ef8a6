//! Switchyard — launch MCP gateways and serve them behind one HTTP port.
//!
//! Two subcommands:
//! - `switchyard serve` (default): spawn every child and run the proxy until SIGINT/SIGTERM
//! - `switchyard check`: load the server file and print the launch plan without spawning

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nimbus_switchyard::settings::{
    split_command, DEFAULT_BASE_PORT, DEFAULT_GATEWAY_COMMAND, DEFAULT_INSTANCE_NAME,
    DEFAULT_LISTEN_PORT, DEFAULT_TOOLS_COMMAND, DEFAULT_TOOLS_DIR, DEFAULT_TOOLS_HOST,
    DEFAULT_TOOLS_PORT,
};
use nimbus_switchyard::{load_definitions, LaunchPlan, Launcher, LauncherSettings};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "mcp.json";

/// Switchyard — launch MCP gateways and serve them behind one HTTP port.
#[derive(Parser)]
#[command(
    name = "switchyard",
    version,
    about = "Switchyard — launch MCP gateways and serve them behind one HTTP port"
)]
struct Cli {
    #[command(flatten)]
    launch: LaunchArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn the tool server and gateways, then serve the proxy
    Serve,
    /// Validate the server file and print the launch plan
    Check,
}

#[derive(Args)]
struct LaunchArgs {
    /// Path to the mcpServers JSON file [default: ./mcp.json or ~/.config/switchyard/mcp.json]
    #[arg(short, long, global = true, env = "SWITCHYARD_CONFIG")]
    config: Option<PathBuf>,
    /// Public listener port
    #[arg(short, long, global = true, env = "PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    port: u16,
    /// Public listener bind address
    #[arg(long, global = true, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// First gateway port; each server gets base + its position in the file
    #[arg(long, global = true, env = "GATEWAY_BASE_PORT", default_value_t = DEFAULT_BASE_PORT)]
    base_port: u16,
    /// Bind host handed to the local tool server
    #[arg(long, global = true, env = "MCP_HOST", default_value = DEFAULT_TOOLS_HOST)]
    tools_host: String,
    /// Port handed to the local tool server
    #[arg(long, global = true, env = "MCP_PORT", default_value_t = DEFAULT_TOOLS_PORT)]
    tools_port: u16,
    /// Tools directory handed to the local tool server
    #[arg(long, global = true, env = "MCP_TOOLS_DIR", default_value = DEFAULT_TOOLS_DIR)]
    tools_dir: PathBuf,
    /// Instance name handed to the local tool server
    #[arg(long, global = true, env = "MCP_INSTANCE_NAME", default_value = DEFAULT_INSTANCE_NAME)]
    instance_name: String,
    /// Externally visible URL of this proxy [default: http://localhost:<port>]
    #[arg(long, global = true, env = "PUBLIC_URL")]
    public_url: Option<String>,
    /// Gateway program and leading arguments (split on whitespace)
    #[arg(long, global = true, env = "GATEWAY_COMMAND", default_value = DEFAULT_GATEWAY_COMMAND)]
    gateway_command: String,
    /// Local tool server program and arguments (split on whitespace)
    #[arg(long, global = true, env = "TOOLS_COMMAND", default_value = DEFAULT_TOOLS_COMMAND)]
    tools_command: String,
}

impl LaunchArgs {
    fn settings(&self) -> LauncherSettings {
        LauncherSettings {
            listen_host: self.host.clone(),
            listen_port: self.port,
            base_port: self.base_port,
            tools_host: self.tools_host.clone(),
            tools_port: self.tools_port,
            tools_dir: self.tools_dir.clone(),
            instance_name: self.instance_name.clone(),
            public_url: self.public_url.clone(),
            gateway_command: split_command(&self.gateway_command),
            tools_command: split_command(&self.tools_command),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity; default to info so child lifecycle is visible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.launch.settings();
    let config_path = resolve_config(cli.launch.config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_serve(&config_path, settings).await,
        Commands::Check => run_check(&config_path, settings).await,
    }
}

/// Load config, spawn children, serve until a termination signal, then
/// terminate every child and exit 0.
async fn run_serve(config_path: &Path, settings: LauncherSettings) -> Result<()> {
    let plan = build_plan(config_path, &settings).await?;
    print_routes(&plan, &settings);

    // Handlers go in before any child exists so an early SIGTERM cannot
    // take the launcher down without its children.
    let signals = ShutdownSignals::install();
    let mut launcher = Launcher::start(plan).context("Failed to start launcher")?;

    let addr = settings.listen_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            launcher.shutdown().await;
            return Err(e).with_context(|| format!("Failed to bind to {}", addr));
        }
    };
    tracing::info!("Status available at {}/", settings.public_base_url());

    launcher
        .run(listener, async move {
            let signal = signals.recv().await;
            tracing::info!(signal, "Shutting down Switchyard...");
        })
        .await
        .context("Switchyard proxy error")?;

    tracing::info!("Switchyard stopped");
    Ok(())
}

/// Load config and print the plan without spawning or binding anything.
async fn run_check(config_path: &Path, settings: LauncherSettings) -> Result<()> {
    let plan = build_plan(config_path, &settings).await?;
    for gateway in &plan.gateways {
        println!(
            "{:<20} :{:<5}  {} {}",
            gateway.definition.mount_path(),
            gateway.port,
            gateway.spec.program,
            gateway.spec.args.join(" ")
        );
    }
    println!(
        "{:<20} :{:<5}  {} {}",
        "/sse, /messages",
        settings.tools_port,
        plan.local_tools.program,
        plan.local_tools.args.join(" ")
    );
    Ok(())
}

async fn build_plan(config_path: &Path, settings: &LauncherSettings) -> Result<LaunchPlan> {
    let definitions = load_definitions(config_path)
        .await
        .context("Failed to load MCP server config")?;
    LaunchPlan::new(settings, definitions).context("Failed to plan launch")
}

/// Resolve config file path: explicit flag → ./mcp.json → ~/.config/switchyard/mcp.json.
///
/// Falls back to `./mcp.json` when nothing exists so the loader reports the
/// missing file along with the expected format.
fn resolve_config(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    let local = Path::new(CONFIG_FILE);
    if local.exists() {
        return local.to_path_buf();
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("switchyard").join(CONFIG_FILE);
        if xdg.exists() {
            return xdg;
        }
    }

    local.to_path_buf()
}

/// SIGINT and SIGTERM streams, registered up front.
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Option<tokio::signal::unix::Signal>,
    sigint: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = signal(SignalKind::terminate())
            .inspect_err(|e| tracing::warn!(error = %e, "could not install SIGTERM handler"))
            .ok();
        let sigint = signal(SignalKind::interrupt())
            .inspect_err(|e| tracing::warn!(error = %e, "could not install SIGINT handler"))
            .ok();
        Self { sigterm, sigint }
    }

    /// Wait for SIGINT or SIGTERM and return its name.
    async fn recv(mut self) -> &'static str {
        match (self.sigterm.as_mut(), self.sigint.as_mut()) {
            (Some(sigterm), Some(sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                }
            }
            (Some(sigterm), None) => {
                sigterm.recv().await;
                "SIGTERM"
            }
            (None, Some(sigint)) => {
                sigint.recv().await;
                "SIGINT"
            }
            (None, None) => {
                tokio::signal::ctrl_c().await.ok();
                "SIGINT"
            }
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Self {
        Self
    }

    /// Wait for Ctrl-C and return its name.
    async fn recv(self) -> &'static str {
        tokio::signal::ctrl_c().await.ok();
        "SIGINT"
    }
}

/// Print the route table to stderr at startup.
///
/// Colored when stderr is a terminal and NO_COLOR is unset; plain otherwise.
fn print_routes(plan: &LaunchPlan, settings: &LauncherSettings) {
    use std::fmt::Write;
    use std::io::IsTerminal;

    let color = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let (accent, dim, reset) = if color {
        ("\x1b[38;2;210;120;55m", "\x1b[2m", "\x1b[0m")
    } else {
        ("", "", "")
    };
    let base = settings.public_base_url();

    let mut buf = String::with_capacity(1024);
    let _ = writeln!(
        buf,
        "\n    {accent}switchyard{reset} {dim}v{}{reset}",
        env!("CARGO_PKG_VERSION")
    );
    for gateway in &plan.gateways {
        let _ = writeln!(
            buf,
            "    {accent}{:<16}{reset} {base}{}/sse {dim}→ :{}{reset}",
            gateway.definition.name,
            gateway.definition.mount_path(),
            gateway.port
        );
    }
    let _ = writeln!(
        buf,
        "    {accent}{:<16}{reset} {base}/sse {dim}→ :{}{reset}\n",
        settings.instance_name, settings.tools_port
    );

    eprint!("{buf}");
}
