//! Launcher — the single public entry point for Switchyard.
//!
//! [`LaunchPlan`] is the pure part: ports, argv/env for every child, the route
//! table and the status document, all derived from settings plus definitions.
//! [`Launcher`] executes a plan: it spawns every child without waiting for
//! readiness, serves the proxy, and tears the children down on shutdown.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::ServerDefinition;
use crate::error::SwitchyardError;
use crate::ports::{allocate_all, find_collisions};
use crate::proxy::routes::RouteTable;
use crate::proxy::{router, ProxyState};
use crate::settings::LauncherSettings;
use crate::status::StatusDocument;
use crate::supervisor::launch::LaunchSpec;
use crate::supervisor::{ShutdownReport, Supervisor};

/// One gateway to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPlan {
    pub definition: ServerDefinition,
    pub port: u16,
    pub spec: LaunchSpec,
}

/// Everything the launcher will do, computed up front.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub local_tools: LaunchSpec,
    /// In declaration order; gateway `i` listens on `base_port + i`.
    pub gateways: Vec<GatewayPlan>,
    pub routes: RouteTable,
    pub status: StatusDocument,
}

impl LaunchPlan {
    pub fn new(
        settings: &LauncherSettings,
        definitions: Vec<ServerDefinition>,
    ) -> crate::Result<Self> {
        let ports = allocate_all(settings.base_port, definitions.len())?;

        let collisions = find_collisions(&ports, &[settings.listen_port, settings.tools_port]);
        if !collisions.is_empty() {
            tracing::warn!(
                ports = ?collisions,
                base_port = settings.base_port,
                "gateway ports overlap the listener or tool server port"
            );
        }

        let routes = RouteTable::build(&definitions, &ports, settings.tools_port);
        let status = StatusDocument::build(
            &definitions,
            &ports,
            &settings.instance_name,
            settings.tools_port,
        );
        let local_tools = LaunchSpec::local_tool_server(settings)?;

        let gateways = definitions
            .into_iter()
            .zip(ports)
            .map(|(definition, port)| {
                let spec = LaunchSpec::gateway(settings, &definition, port)?;
                Ok(GatewayPlan {
                    definition,
                    port,
                    spec,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self {
            local_tools,
            gateways,
            routes,
            status,
        })
    }
}

/// A running set of children plus the proxy that fronts them.
pub struct Launcher {
    supervisor: Supervisor,
    proxy: ProxyState,
}

impl Launcher {
    /// Spawn the local tool server and every gateway.
    ///
    /// Spawn failures are logged and skipped: one broken server never stops
    /// the others or the proxy. Only building the HTTP client is fatal.
    pub fn start(plan: LaunchPlan) -> crate::Result<Self> {
        let proxy = ProxyState::new(plan.routes, plan.status)?;
        let mut supervisor = Supervisor::new();

        if let Err(e) = supervisor.spawn(&plan.local_tools) {
            tracing::error!(
                child = %plan.local_tools.label,
                error = %e,
                "failed to start local tool server"
            );
        }

        for gateway in &plan.gateways {
            match supervisor.spawn(&gateway.spec) {
                Ok(_) => tracing::info!(
                    server = %gateway.definition.name,
                    port = gateway.port,
                    command = %gateway.definition.command_line(),
                    "gateway started"
                ),
                Err(e) => tracing::error!(
                    server = %gateway.definition.name,
                    error = %e,
                    "failed to start gateway"
                ),
            }
        }

        Ok(Self { supervisor, proxy })
    }

    /// The proxy router for this launch.
    pub fn router(&self) -> Router {
        router(self.proxy.clone())
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Serve the proxy on `listener` until `shutdown` resolves.
    ///
    /// Returns as soon as `shutdown` fires without draining open streams;
    /// SSE connections end when their children are killed.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> crate::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let app = self.router();

        tracing::info!(addr = %addr, "proxy listening");

        tokio::select! {
            result = async move { axum::serve(listener, app).await } => {
                result.map_err(|e| SwitchyardError::Listener(addr, e.to_string()))
            }
            _ = shutdown => Ok(()),
        }
    }

    /// Serve until `shutdown` resolves, then terminate every child.
    ///
    /// Children are torn down even when the listener fails; the listener
    /// error is returned after teardown.
    pub async fn run<F>(
        &mut self,
        listener: TcpListener,
        shutdown: F,
    ) -> crate::Result<ShutdownReport>
    where
        F: Future<Output = ()>,
    {
        let served = self.serve(listener, shutdown).await;
        let report = self.shutdown().await;
        served.map(|()| report)
    }

    /// Terminate every tracked child. Safe to call more than once.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        self.supervisor.shutdown().await
    }
}
