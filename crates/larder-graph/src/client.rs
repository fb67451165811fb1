//! Script execution client: provisioning, graph binding, and execution.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use larder_core::GraphName;

use crate::backend::{Backend, HttpBackend};
use crate::script::{Request, ScriptMode};
use crate::traversal::Traversal;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Graph transport error: {0}")]
    Transport(String),

    #[error("Script execution failed with status {code}: {message}")]
    Execution { code: u16, message: String },

    #[error("Response decoding error: {0}")]
    Decode(String),

    #[error("No graph bound to this client")]
    GraphNotBound,
}

/// Configuration for connecting to the Gremlin Server HTTP endpoint.
///
/// Loaded from the `[graph]` section or `LARDER__GRAPH__` environment
/// variables.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// How values are embedded in scripts (`inline` or `bound`).
    #[serde(default)]
    pub script_mode: ScriptMode,

    /// Per-request timeout applied by the HTTP transport. None waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_endpoint() -> String {
    "http://localhost:8182".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: default_username(),
            password: String::new(),
            script_mode: ScriptMode::default(),
            timeout_secs: None,
        }
    }
}

/// Client for the remote graph service.
///
/// Clone is cheap (inner Arc). The bound graph is per client value;
/// use [`GraphClient::execute_in`] to address several graphs from one client.
#[derive(Clone)]
pub struct GraphClient {
    backend: Arc<dyn Backend>,
    bound: Option<GraphName>,
}

impl GraphClient {
    /// Connect to the HTTP endpoint described by `config`.
    pub fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let backend = HttpBackend::new(config)?;
        tracing::info!(endpoint = %config.endpoint, "Graph client configured");
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            bound: None,
        }
    }

    // ── Provisioning ─────────────────────────────────────────────

    /// True only if opening `graph` answers with status 200. Every failure,
    /// transport errors included, reads as "does not exist".
    pub async fn probe_graph_exists(&self, graph: &GraphName) -> bool {
        match self.backend.submit(&Request::OpenGraph(graph.clone())).await {
            Ok(envelope) => {
                tracing::debug!(%graph, code = envelope.status.code, "Graph probe");
                envelope.is_success()
            }
            Err(e) => {
                tracing::debug!(%graph, error = %e, "Graph probe failed");
                false
            }
        }
    }

    /// Probe `graph` and create it if absent. Returns whether the graph
    /// exists or was created with status 200. A failed creation is not
    /// rolled back; re-probe to confirm.
    pub async fn ensure_graph(&self, graph: &GraphName) -> Result<bool, GraphError> {
        if self.probe_graph_exists(graph).await {
            return Ok(true);
        }

        let envelope = self
            .backend
            .submit(&Request::CreateGraph(graph.clone()))
            .await?;
        if envelope.is_success() {
            tracing::info!(%graph, "Created graph");
        } else {
            tracing::warn!(
                %graph,
                code = envelope.status.code,
                message = %envelope.status.message,
                "Graph creation failed"
            );
        }
        Ok(envelope.is_success())
    }

    /// Set the graph used by [`GraphClient::execute`].
    pub fn bind_graph(&mut self, graph: GraphName) {
        tracing::info!(%graph, "Bound graph");
        self.bound = Some(graph);
    }

    pub fn bound_graph(&self) -> Option<&GraphName> {
        self.bound.as_ref()
    }

    // ── Execution ────────────────────────────────────────────────

    /// Run `traversal` against the bound graph.
    pub async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>, GraphError> {
        let graph = self.bound.as_ref().ok_or(GraphError::GraphNotBound)?;
        self.execute_in(graph, traversal).await
    }

    /// Run `traversal` against `graph`. Any status other than 200 is an error.
    pub async fn execute_in(
        &self,
        graph: &GraphName,
        traversal: &Traversal,
    ) -> Result<Vec<Value>, GraphError> {
        let request = Request::Run {
            graph: graph.clone(),
            traversal: traversal.clone(),
        };
        let envelope = self.backend.submit(&request).await?;
        if !envelope.is_success() {
            tracing::warn!(
                %graph,
                code = envelope.status.code,
                message = %envelope.status.message,
                "Script execution failed"
            );
            return Err(GraphError::Execution {
                code: envelope.status.code,
                message: envelope.status.message,
            });
        }
        Ok(envelope.into_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::response::{Envelope, STATUS_SUCCESS};
    use crate::traversal;

    struct Unreachable;

    #[async_trait::async_trait]
    impl Backend for Unreachable {
        async fn submit(&self, _request: &Request) -> Result<Envelope, GraphError> {
            Err(GraphError::Transport("connection refused".to_string()))
        }
    }

    /// Probes succeed, everything else is rejected with 401.
    struct Unauthorized;

    #[async_trait::async_trait]
    impl Backend for Unauthorized {
        async fn submit(&self, request: &Request) -> Result<Envelope, GraphError> {
            match request {
                Request::OpenGraph(_) => Ok(Envelope::ok(Vec::new())),
                _ => Ok(Envelope::failure(401, "Unauthorized")),
            }
        }
    }

    #[tokio::test]
    async fn test_probe_missing_graph_is_false() {
        let client = GraphClient::new(Arc::new(MemoryBackend::new()));
        assert!(!client.probe_graph_exists(&GraphName::new("recipes")).await);
    }

    #[tokio::test]
    async fn test_probe_swallows_transport_errors() {
        let client = GraphClient::new(Arc::new(Unreachable));
        assert!(!client.probe_graph_exists(&GraphName::new("recipes")).await);
    }

    #[tokio::test]
    async fn test_ensure_graph_creates_then_reuses() {
        let client = GraphClient::new(Arc::new(MemoryBackend::new()));
        let graph = GraphName::new("recipes");
        assert!(client.ensure_graph(&graph).await.unwrap());
        assert!(client.probe_graph_exists(&graph).await);
        assert!(client.ensure_graph(&graph).await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_graph_propagates_transport_errors() {
        let client = GraphClient::new(Arc::new(Unreachable));
        let err = client.ensure_graph(&GraphName::new("recipes")).await.unwrap_err();
        assert!(matches!(err, GraphError::Transport(_)));
    }

    #[tokio::test]
    async fn test_execute_requires_bound_graph() {
        let client = GraphClient::new(Arc::new(MemoryBackend::new()));
        let err = client.execute(&traversal::Traversal::v()).await.unwrap_err();
        assert!(matches!(err, GraphError::GraphNotBound));
    }

    #[tokio::test]
    async fn test_execute_rejects_non_success_status() {
        let mut client = GraphClient::new(Arc::new(Unauthorized));
        client.bind_graph(GraphName::new("recipes"));
        let err = client.execute(&traversal::Traversal::v()).await.unwrap_err();
        match err {
            GraphError::Execution { code, .. } => assert_eq!(code, 401),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_execute_uses_bound_graph() {
        let backend = Arc::new(MemoryBackend::with_graph(GraphName::new("recipes")));
        let mut client = GraphClient::new(backend);
        client.bind_graph(GraphName::new("recipes"));
        let rows = client.execute(&traversal::Traversal::v()).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(client.bound_graph(), Some(&GraphName::new("recipes")));

        let other = client
            .execute_in(&GraphName::new("elsewhere"), &traversal::Traversal::v())
            .await
            .unwrap_err();
        assert!(matches!(other, GraphError::Execution { code, .. } if code != STATUS_SUCCESS));
    }

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.endpoint, "http://localhost:8182");
        assert_eq!(config.script_mode, ScriptMode::Inline);
        assert!(config.timeout_secs.is_none());
    }
}
