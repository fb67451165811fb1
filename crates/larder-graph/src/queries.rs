//! Read operations over the graph.

use larder_core::{Edge, ElementId, GraphName, Path, PropertyValue, Vertex};

use crate::client::{GraphClient, GraphError};
use crate::response;
use crate::traversal::{self, Traversal};

impl GraphClient {
    /// Vertices with `label` whose `key` equals `value`. Empty when none match.
    pub async fn find_vertices(
        &self,
        graph: &GraphName,
        label: &str,
        key: &str,
        value: PropertyValue,
    ) -> Result<Vec<Vertex>, GraphError> {
        self.vertices(graph, &traversal::find_vertices(label, key, value))
            .await
    }

    /// The `label` edge from `out_v` to `in_v`, if any.
    ///
    /// Resolved through the connecting path; the edge is picked out of the
    /// path structurally rather than by position.
    pub async fn find_edge(
        &self,
        graph: &GraphName,
        label: &str,
        out_v: &ElementId,
        in_v: &ElementId,
    ) -> Result<Option<Edge>, GraphError> {
        let paths = self
            .paths(graph, &traversal::find_edge_path(label, out_v, in_v))
            .await?;
        Ok(paths.iter().find_map(|p| p.first_edge().cloned()))
    }

    /// Run a traversal whose rows are vertices.
    pub async fn vertices(
        &self,
        graph: &GraphName,
        traversal: &Traversal,
    ) -> Result<Vec<Vertex>, GraphError> {
        let rows = self.execute_in(graph, traversal).await?;
        rows.iter().map(response::decode_vertex).collect()
    }

    /// Run a traversal ending in `path()`.
    pub async fn paths(
        &self,
        graph: &GraphName,
        traversal: &Traversal,
    ) -> Result<Vec<Path>, GraphError> {
        let rows = self.execute_in(graph, traversal).await?;
        rows.iter().map(response::decode_path).collect()
    }
}
