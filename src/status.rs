//! Status document served at `GET /`.

use serde::Serialize;

use crate::config::ServerDefinition;
use crate::settings::{
    GATEWAY_MESSAGE_PATH, GATEWAY_SSE_PATH, LOCAL_MESSAGE_PREFIX, LOCAL_SSE_PREFIX,
};

/// Externally reachable endpoints of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub name: String,
    pub port: u16,
    pub sse_path: String,
    pub message_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub status: String,
    pub servers: Vec<EndpointSummary>,
    pub local_tools: EndpointSummary,
}

impl StatusDocument {
    /// Derive the document from the loaded definitions and their ports.
    pub fn build(
        definitions: &[ServerDefinition],
        ports: &[u16],
        instance_name: &str,
        tools_port: u16,
    ) -> Self {
        let servers = definitions
            .iter()
            .zip(ports)
            .map(|(definition, port)| {
                let mount = definition.mount_path();
                EndpointSummary {
                    name: definition.name.clone(),
                    port: *port,
                    sse_path: format!("{}{}", mount, GATEWAY_SSE_PATH),
                    message_path: format!("{}{}", mount, GATEWAY_MESSAGE_PATH),
                }
            })
            .collect();

        Self {
            status: "running".to_string(),
            servers,
            local_tools: EndpointSummary {
                name: instance_name.to_string(),
                port: tools_port,
                sse_path: LOCAL_SSE_PREFIX.to_string(),
                message_path: format!("{}/", LOCAL_MESSAGE_PREFIX),
            },
        }
    }
}
