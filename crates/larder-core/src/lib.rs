//! larder-core: Shared types, canonical keys, configuration, and error handling.
//!
//! This crate provides the foundational types used by the Larder recipe graph:
//! - Vertex and edge labels of the interaction graph
//! - Property values, elements, and traversal paths as returned by the graph service
//! - Canonical uniqueness keys for ingredients, cuisines, and recipes
//! - Configuration loading
//! - The top-level error type

pub mod config;
pub mod error;
pub mod keys;
pub mod types;

pub use error::LarderError;
pub use types::{
    Edge, EdgeLabel, Element, ElementId, FavoriteRecipe, GraphName, NewVertex, Path, Properties,
    PropertyValue, RecommendedRecipe, Vertex, VertexLabel,
};
