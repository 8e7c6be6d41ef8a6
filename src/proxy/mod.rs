//! Path-routed HTTP reverse proxy.
//!
//! `GET /` serves the status document; every other request is resolved
//! against the [`RouteTable`](routes::RouteTable) and forwarded to a local port.

pub mod forward;
pub mod routes;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::SwitchyardError;
use crate::proxy::routes::RouteTable;
use crate::status::StatusDocument;

/// Shared state for the proxy handlers. Cheap to clone.
#[derive(Clone)]
pub struct ProxyState {
    pub routes: Arc<RouteTable>,
    pub status: Arc<StatusDocument>,
    pub client: reqwest::Client,
}

impl ProxyState {
    /// Build state with an upstream client that never follows redirects,
    /// ignores system proxies and applies no timeouts.
    pub fn new(routes: RouteTable, status: StatusDocument) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| SwitchyardError::HttpClient(e.to_string()))?;
        Ok(Self {
            routes: Arc::new(routes),
            status: Arc::new(status),
            client,
        })
    }
}

/// Build the axum router: status at `/`, everything else proxied.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .fallback(forward::forward)
        .with_state(state)
}

async fn status_handler(State(state): State<ProxyState>) -> Json<StatusDocument> {
    Json(state.status.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use indexmap::IndexMap;
    use tower::ServiceExt;

    use crate::config::ServerDefinition;

    fn state() -> ProxyState {
        let defs = vec![ServerDefinition {
            name: "foo".to_string(),
            program: "echo".to_string(),
            args: vec!["hi".to_string()],
            env: IndexMap::new(),
        }];
        let routes = RouteTable::build(&defs, &[8100], 8000);
        let status = StatusDocument::build(&defs, &[8100], "mcp-server", 8000);
        ProxyState::new(routes, status).unwrap()
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let app = router(state());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["servers"][0]["ssePath"], "/foo/sse");
        assert_eq!(value["servers"][0]["messagePath"], "/foo/message");
        assert_eq!(value["localTools"]["ssePath"], "/sse");
    }

    #[tokio::test]
    async fn test_unrouted_path_is_not_found() {
        let app = router(state());
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
