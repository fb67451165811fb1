//! Recipe graph store: find-or-create upserts, weighted edge bookkeeping,
//! and favourite/recommendation queries.
//!
//! Upserts and counter updates are lookups followed by writes, issued as
//! separate requests without a transaction. Two callers racing on the same
//! key can both miss the lookup; see [`CounterMode`] for the edge counter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use larder_core::config::StoreConfig;
use larder_core::keys::{canonical_cuisine_key, canonical_ingredient_key, canonical_recipe_key};
use larder_core::{
    Edge, EdgeLabel, ElementId, FavoriteRecipe, GraphName, NewVertex, Properties, PropertyValue,
    RecommendedRecipe, Vertex, VertexLabel,
};
use larder_graph::{traversal, GraphClient, GraphConfig};

use crate::error::{Result, StoreError};
use crate::recommend::rank_recommendations;

/// How `selects` counters are incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterMode {
    /// Read the count, then write `count + 1` with no lock. Concurrent
    /// increments of one edge can lose updates.
    #[default]
    ReadModifyWrite,
    /// Hold a per-edge lock across the read and the write. Only covers
    /// callers sharing this store (or its clones).
    Serialized,
}

type EdgeKey = (EdgeLabel, ElementId, ElementId);

/// One async lock per `(label, out, in)` edge with an update in flight.
#[derive(Debug, Default)]
struct EdgeLocks {
    locks: Mutex<HashMap<EdgeKey, Arc<AsyncMutex<()>>>>,
}

impl EdgeLocks {
    async fn acquire(&self, key: EdgeKey) -> EdgeGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        EdgeGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Releases the edge lock on drop and forgets the entry once no other
/// caller holds or awaits it.
struct EdgeGuard<'a> {
    locks: &'a EdgeLocks,
    key: EdgeKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EdgeGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Interaction store over one provisioned graph.
///
/// Clone is cheap; clones share the client and the edge locks.
#[derive(Clone)]
pub struct RecipeGraphStore {
    client: GraphClient,
    graph: GraphName,
    config: StoreConfig,
    counter_mode: CounterMode,
    edge_locks: Arc<EdgeLocks>,
}

impl RecipeGraphStore {
    /// Ensure `graph_id` exists, then bind it. Fails with
    /// [`StoreError::Provisioning`] if the graph can be neither opened nor
    /// created.
    pub async fn initialize(client: GraphClient, graph_id: &str) -> Result<Self> {
        let config = StoreConfig {
            graph_id: graph_id.to_string(),
            ..StoreConfig::default()
        };
        Self::with_config(client, config).await
    }

    /// Initialize with every setting taken from `config`.
    pub async fn with_config(mut client: GraphClient, config: StoreConfig) -> Result<Self> {
        let graph = GraphName::new(config.graph_id.as_str());
        if !client.ensure_graph(&graph).await? {
            return Err(StoreError::Provisioning { graph });
        }
        client.bind_graph(graph.clone());

        let counter_mode = if config.serialize_edge_updates {
            CounterMode::Serialized
        } else {
            CounterMode::ReadModifyWrite
        };
        tracing::info!(%graph, ?counter_mode, "Recipe graph store ready");

        Ok(Self {
            client,
            graph,
            config,
            counter_mode,
            edge_locks: Arc::new(EdgeLocks::default()),
        })
    }

    /// Connect over HTTP and initialize.
    pub async fn connect(graph_config: &GraphConfig, store_config: StoreConfig) -> Result<Self> {
        let client = GraphClient::connect(graph_config)?;
        Self::with_config(client, store_config).await
    }

    pub fn with_counter_mode(mut self, mode: CounterMode) -> Self {
        self.counter_mode = mode;
        self
    }

    pub fn graph(&self) -> &GraphName {
        &self.graph
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn counter_mode(&self) -> CounterMode {
        self.counter_mode
    }

    // ── Vertices ─────────────────────────────────────────────────

    /// Return the vertex with `vertex.label` whose `unique_key` matches,
    /// creating it from `vertex` if none exists.
    pub async fn upsert_vertex(&self, vertex: &NewVertex, unique_key: &str) -> Result<Vertex> {
        let label = vertex.label.as_str();
        let value = vertex
            .properties
            .get(unique_key)
            .cloned()
            .ok_or_else(|| StoreError::MissingKey {
                label: label.to_string(),
                key: unique_key.to_string(),
            })?;

        let existing = self
            .client
            .find_vertices(&self.graph, label, unique_key, value)
            .await?;
        if let Some(found) = existing.into_iter().next() {
            tracing::debug!(label, id = %found.id, "Vertex exists");
            return Ok(found);
        }

        let created = self
            .client
            .create_vertex(&self.graph, vertex)
            .await?
            .ok_or_else(|| StoreError::MissingEcho {
                label: label.to_string(),
            })?;
        tracing::debug!(label, id = %created.id, "Vertex created");
        Ok(created)
    }

    pub async fn add_user(&self, user_id: &str) -> Result<Vertex> {
        let person = NewVertex::new(VertexLabel::Person).with("name", user_id);
        self.upsert_vertex(&person, "name").await
    }

    /// Upsert the ingredient vertex for `ingredients` and record that
    /// `person` selected it. `results` is stored as the vertex `detail`
    /// when the vertex is first created.
    pub async fn add_ingredient<T>(
        &self,
        ingredients: &str,
        results: &T,
        person: &Vertex,
    ) -> Result<Vertex>
    where
        T: Serialize + ?Sized,
    {
        let key = canonical_ingredient_key(ingredients);
        self.add_selection(VertexLabel::Ingredient, key, results, person)
            .await
    }

    /// Cuisine counterpart of [`RecipeGraphStore::add_ingredient`].
    pub async fn add_cuisine<T>(&self, cuisine: &str, results: &T, person: &Vertex) -> Result<Vertex>
    where
        T: Serialize + ?Sized,
    {
        let key = canonical_cuisine_key(cuisine);
        self.add_selection(VertexLabel::Cuisine, key, results, person)
            .await
    }

    async fn add_selection<T>(
        &self,
        label: VertexLabel,
        key: String,
        results: &T,
        person: &Vertex,
    ) -> Result<Vertex>
    where
        T: Serialize + ?Sized,
    {
        let vertex = NewVertex::new(label)
            .with("name", key)
            .with("detail", PropertyValue::blob(results)?);
        let selected = self.upsert_vertex(&vertex, "name").await?;
        self.record_weighted_edge(EdgeLabel::Selects, person, &selected)
            .await?;
        Ok(selected)
    }

    /// Upsert the recipe and record `person → recipe`. With an `origin`
    /// ingredient or cuisine, also records `origin → recipe` and links
    /// `recipe → origin` with a `has` edge.
    pub async fn add_recipe(
        &self,
        recipe_id: &str,
        title: &str,
        detail: &str,
        origin: Option<&Vertex>,
        person: &Vertex,
    ) -> Result<Vertex> {
        let vertex = NewVertex::new(VertexLabel::Recipe)
            .with("name", canonical_recipe_key(recipe_id))
            .with("title", title)
            .with("detail", detail);
        let recipe = self.upsert_vertex(&vertex, "name").await?;

        self.record_weighted_edge(EdgeLabel::Selects, person, &recipe)
            .await?;
        if let Some(origin) = origin {
            self.record_weighted_edge(EdgeLabel::Selects, origin, &recipe)
                .await?;
            self.ensure_edge_exists(EdgeLabel::Has, &recipe, origin, &Properties::new())
                .await?;
        }
        Ok(recipe)
    }

    // ── Edges ────────────────────────────────────────────────────

    /// Increment the `count` of the `label` edge from `out_v` to `in_v`,
    /// creating it with `count = 1` if absent. Returns the edge with its
    /// new count.
    pub async fn record_weighted_edge(
        &self,
        label: EdgeLabel,
        out_v: &Vertex,
        in_v: &Vertex,
    ) -> Result<Edge> {
        let _guard = match self.counter_mode {
            CounterMode::Serialized => Some(
                self.edge_locks
                    .acquire((label, out_v.id.clone(), in_v.id.clone()))
                    .await,
            ),
            CounterMode::ReadModifyWrite => None,
        };

        let existing = self
            .client
            .find_edge(&self.graph, label.as_str(), &out_v.id, &in_v.id)
            .await?;

        match existing {
            Some(mut edge) => {
                let count = edge.count().saturating_add(1);
                let mut properties = Properties::new();
                properties.insert("count".to_string(), PropertyValue::Int(count));
                self.client
                    .update_edge(&self.graph, &edge.id, &properties)
                    .await?;
                edge.properties.extend(properties);
                tracing::debug!(%label, from = %out_v.id, to = %in_v.id, count, "Edge count incremented");
                Ok(edge)
            }
            None => {
                let mut properties = Properties::new();
                properties.insert("count".to_string(), PropertyValue::Int(1));
                let edge = self.create_edge(label, out_v, in_v, &properties).await?;
                tracing::debug!(%label, from = %out_v.id, to = %in_v.id, "Weighted edge created");
                Ok(edge)
            }
        }
    }

    /// Return the `label` edge from `out_v` to `in_v`, creating it with
    /// `properties` only if absent.
    pub async fn ensure_edge_exists(
        &self,
        label: EdgeLabel,
        out_v: &Vertex,
        in_v: &Vertex,
        properties: &Properties,
    ) -> Result<Edge> {
        if let Some(edge) = self
            .client
            .find_edge(&self.graph, label.as_str(), &out_v.id, &in_v.id)
            .await?
        {
            return Ok(edge);
        }
        self.create_edge(label, out_v, in_v, properties).await
    }

    async fn create_edge(
        &self,
        label: EdgeLabel,
        out_v: &Vertex,
        in_v: &Vertex,
        properties: &Properties,
    ) -> Result<Edge> {
        self.client
            .create_edge(&self.graph, label.as_str(), &out_v.id, &in_v.id, properties)
            .await?
            .ok_or_else(|| StoreError::MissingEcho {
                label: label.to_string(),
            })
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Recipes `person` selected most, highest count first. Ties come back
    /// in whatever order the service returns them.
    pub async fn find_favorite_recipes(
        &self,
        person: &Vertex,
        limit: usize,
    ) -> Result<Vec<FavoriteRecipe>> {
        let recipes = self
            .client
            .vertices(&self.graph, &traversal::favorite_recipes(&person.id, limit))
            .await?;

        Ok(recipes
            .iter()
            .filter_map(|recipe| {
                let Some(id) = recipe.name() else {
                    tracing::warn!(id = %recipe.id, "Skipping favourite recipe with no name");
                    return None;
                };
                Some(FavoriteRecipe {
                    id: id.to_string(),
                    title: recipe
                        .property("title")
                        .and_then(PropertyValue::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect())
    }

    /// Recipes popular with other users who reached them through the
    /// `origin` ingredient or cuisine named `key`. See
    /// [`rank_recommendations`] for the limit rule.
    pub async fn find_recommended_recipes(
        &self,
        origin: VertexLabel,
        key: &str,
        person: &Vertex,
        limit: usize,
    ) -> Result<Vec<RecommendedRecipe>> {
        let key = match origin {
            VertexLabel::Ingredient => canonical_ingredient_key(key),
            VertexLabel::Cuisine => canonical_cuisine_key(key),
            other => return Err(StoreError::UnsupportedOrigin(other)),
        };
        let user = person.name().ok_or_else(|| StoreError::MissingKey {
            label: person.label.clone(),
            key: "name".to_string(),
        })?;

        let paths = self
            .client
            .paths(&self.graph, &traversal::recommendation_paths(origin, &key, user))
            .await?;
        tracing::debug!(%origin, key = %key, paths = paths.len(), "Recommendation paths fetched");
        Ok(rank_recommendations(&paths, limit))
    }
}
