//! Larder Store: recipe interaction graph.
//!
//! Records users' ingredient, cuisine, and recipe selections as weighted
//! `selects` edges and answers favourite and recommendation queries over
//! them. All graph access goes through [`larder_graph::GraphClient`].

pub mod error;
pub mod recommend;
pub mod store;

pub use error::{Result, StoreError};
pub use recommend::rank_recommendations;
pub use store::{CounterMode, RecipeGraphStore};
