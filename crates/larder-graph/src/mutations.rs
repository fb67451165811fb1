//! Write operations: vertex and edge creation, edge property updates.
//!
//! Creation returns the element echoed back by the service, or `None`
//! when the response carried no rows.

use larder_core::{Edge, ElementId, GraphName, NewVertex, Properties, Vertex};

use crate::client::{GraphClient, GraphError};
use crate::response;
use crate::traversal;

impl GraphClient {
    /// Add a vertex with one property per entry of `vertex.properties`.
    pub async fn create_vertex(
        &self,
        graph: &GraphName,
        vertex: &NewVertex,
    ) -> Result<Option<Vertex>, GraphError> {
        let rows = self
            .execute_in(graph, &traversal::add_vertex(vertex))
            .await?;
        let created = rows.first().map(response::decode_vertex).transpose()?;
        tracing::debug!(%graph, label = %vertex.label, echoed = created.is_some(), "Created vertex");
        Ok(created)
    }

    /// Add a `label` edge from `out_v` to `in_v`.
    pub async fn create_edge(
        &self,
        graph: &GraphName,
        label: &str,
        out_v: &ElementId,
        in_v: &ElementId,
        properties: &Properties,
    ) -> Result<Option<Edge>, GraphError> {
        let rows = self
            .execute_in(graph, &traversal::add_edge(label, out_v, in_v, properties))
            .await?;
        let created = rows.first().map(response::decode_edge).transpose()?;
        tracing::debug!(%graph, label, %out_v, %in_v, echoed = created.is_some(), "Created edge");
        Ok(created)
    }

    /// Overwrite `properties` on an existing edge.
    pub async fn update_edge(
        &self,
        graph: &GraphName,
        edge: &ElementId,
        properties: &Properties,
    ) -> Result<(), GraphError> {
        self.execute_in(graph, &traversal::update_edge(edge, properties))
            .await?;
        Ok(())
    }
}
