//! Error types for the larder-store crate.

use thiserror::Error;

use larder_core::{GraphName, LarderError, VertexLabel};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph error: {0}")]
    Graph(#[from] larder_graph::GraphError),

    #[error("Core error: {0}")]
    Core(#[from] LarderError),

    #[error("Graph {graph} could not be opened or created")]
    Provisioning { graph: GraphName },

    #[error("Graph service did not echo the created {label}")]
    MissingEcho { label: String },

    #[error("{label} vertex has no {key} property")]
    MissingKey { label: String, key: String },

    #[error("Recommendations cannot start from a {0} vertex")]
    UnsupportedOrigin(VertexLabel),
}

pub type Result<T> = std::result::Result<T, StoreError>;
