//! Ordered route table for the reverse proxy.
//!
//! Routes are evaluated first-match-wins in installation order, which matches
//! independently mounted prefixes as long as they do not overlap.

use crate::config::ServerDefinition;
use crate::settings::{LOCAL_MESSAGE_PREFIX, LOCAL_SSE_PREFIX};

/// How a route matches and rewrites a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// Matches `prefix` or `prefix/...` (ASCII case-insensitive) and strips the
    /// prefix. An empty remainder becomes `/`.
    Mount(String),
    /// Matches any path starting with `prefix`. A bare `prefix` is normalized
    /// to `prefix/`; longer paths pass through unchanged.
    Prefix(String),
}

impl RouteMatch {
    /// Rewritten path if `path` matches, `None` otherwise.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        match self {
            RouteMatch::Mount(prefix) => {
                let head = path.get(..prefix.len())?;
                if !head.eq_ignore_ascii_case(prefix) {
                    return None;
                }
                let rest = &path[prefix.len()..];
                if rest.is_empty() {
                    Some("/".to_string())
                } else if rest.starts_with('/') {
                    Some(rest.to_string())
                } else {
                    None
                }
            }
            RouteMatch::Prefix(prefix) => {
                if path == prefix {
                    Some(format!("{}/", prefix))
                } else if path.starts_with(prefix.as_str()) {
                    Some(path.to_string())
                } else {
                    None
                }
            }
        }
    }
}

/// One proxied route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub matcher: RouteMatch,
    pub target_port: u16,
}

impl Route {
    /// Upstream origin, e.g. `http://localhost:8100`.
    pub fn target(&self) -> String {
        format!("http://localhost:{}", self.target_port)
    }
}

/// Where a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub target_port: u16,
    /// Rewritten path with the original query string appended.
    pub path_and_query: String,
}

impl Resolved {
    pub fn url(&self) -> String {
        format!("http://localhost:{}{}", self.target_port, self.path_and_query)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard table: one mount per server (declaration order),
    /// then the local tool server's stream and message prefixes.
    pub fn build(definitions: &[ServerDefinition], ports: &[u16], tools_port: u16) -> Self {
        let mut table = Self::new();
        for (definition, port) in definitions.iter().zip(ports) {
            table.push(RouteMatch::Mount(definition.mount_path()), *port);
        }
        table.push(RouteMatch::Prefix(LOCAL_SSE_PREFIX.to_string()), tools_port);
        table.push(RouteMatch::Prefix(LOCAL_MESSAGE_PREFIX.to_string()), tools_port);
        table
    }

    pub fn push(&mut self, matcher: RouteMatch, target_port: u16) {
        self.routes.push(Route {
            matcher,
            target_port,
        });
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve `path` (and optional query) against the first matching route.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Option<Resolved> {
        self.routes.iter().find_map(|route| {
            route.matcher.rewrite(path).map(|rewritten| Resolved {
                target_port: route.target_port,
                path_and_query: match query {
                    Some(q) => format!("{}?{}", rewritten, q),
                    None => rewritten,
                },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn def(name: &str) -> ServerDefinition {
        ServerDefinition {
            name: name.to_string(),
            program: "echo".to_string(),
            args: vec![],
            env: IndexMap::new(),
        }
    }

    fn table() -> RouteTable {
        RouteTable::build(&[def("foo"), def("github")], &[8100, 8101], 8000)
    }

    #[test]
    fn test_mount_forwards_to_allocated_port() {
        let table = table();
        assert_eq!(table.routes()[0].target(), "http://localhost:8100");
        let resolved = table.resolve("/foo/sse", None).unwrap();
        assert_eq!(resolved.url(), "http://localhost:8100/sse");
    }

    #[test]
    fn test_mount_strips_prefix_and_keeps_query() {
        let resolved = table().resolve("/github/message", Some("sessionId=abc")).unwrap();
        assert_eq!(resolved.target_port, 8101);
        assert_eq!(resolved.path_and_query, "/message?sessionId=abc");
    }

    #[test]
    fn test_mount_bare_prefix_becomes_root() {
        let resolved = table().resolve("/foo", None).unwrap();
        assert_eq!(resolved.path_and_query, "/");
    }

    #[test]
    fn test_mount_requires_segment_boundary() {
        assert!(table().resolve("/foobar/sse", None).is_none());
    }

    #[test]
    fn test_mount_is_case_insensitive() {
        let resolved = table().resolve("/GitHub/sse", None).unwrap();
        assert_eq!(resolved.target_port, 8101);
        assert_eq!(resolved.path_and_query, "/sse");
    }

    #[test]
    fn test_local_sse_bare_prefix_gets_trailing_slash() {
        let resolved = table().resolve("/sse", Some("x=1")).unwrap();
        assert_eq!(resolved.target_port, 8000);
        assert_eq!(resolved.path_and_query, "/sse/?x=1");
    }

    #[test]
    fn test_local_sse_subpath_not_rewritten() {
        let resolved = table().resolve("/sse/anything", None).unwrap();
        assert_eq!(resolved.path_and_query, "/sse/anything");
    }

    #[test]
    fn test_local_messages_prefix() {
        let table = table();
        assert_eq!(
            table.resolve("/messages", None).unwrap().path_and_query,
            "/messages/"
        );
        let resolved = table.resolve("/messages/", Some("session_id=1")).unwrap();
        assert_eq!(resolved.target_port, 8000);
        assert_eq!(resolved.path_and_query, "/messages/?session_id=1");
    }

    #[test]
    fn test_first_match_wins() {
        // A server named "sse" shadows the local tool server's bare /sse.
        let table = RouteTable::build(&[def("sse")], &[8100], 8000);
        assert_eq!(table.resolve("/sse", None).unwrap().target_port, 8100);
        assert_eq!(table.resolve("/sse/x", None).unwrap().target_port, 8100);
        assert_eq!(table.resolve("/ssex", None).unwrap().target_port, 8000);
    }

    #[test]
    fn test_unmatched_path() {
        assert!(table().resolve("/unknown", None).is_none());
        assert!(table().resolve("/", None).is_none());
    }

    #[test]
    fn test_mount_handles_multibyte_path() {
        // Slicing at the prefix length must not panic on a char boundary.
        assert!(table().resolve("/fé", None).is_none());
    }
}
