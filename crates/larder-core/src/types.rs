//! Core domain types for the Larder interaction graph.
//!
//! These types mirror what the remote graph service stores and returns:
//! labelled vertices and edges carrying a small closed set of property
//! value kinds, plus the traversal paths used by recommendations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Identifiers ───────────────────────────────────────────────────

/// Name of a graph managed by the remote `ConfiguredGraphFactory`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GraphName(pub String);

impl GraphName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a vertex or edge as assigned by the graph service.
///
/// JanusGraph hands out numeric vertex ids and string edge ids, so both
/// forms have to survive a round trip back into a script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum ElementId {
    Num(i64),
    Text(String),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ElementId {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// ── Properties ────────────────────────────────────────────────────

/// A property value stored on a vertex or edge.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Int(i64),
    Bool(bool),
    /// An already-serialized JSON document, stored as text.
    Blob(String),
}

impl PropertyValue {
    /// Serialize `value` into a `Blob`.
    pub fn blob<T: Serialize + ?Sized>(value: &T) -> crate::error::Result<Self> {
        Ok(Self::Blob(serde_json::to_string(value)?))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Blob(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// JSON form, used for script bindings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) | Self::Blob(s) => serde_json::Value::String(s.clone()),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Property map of a vertex or edge. Ordered so rendered scripts are stable.
pub type Properties = BTreeMap<String, PropertyValue>;

// ── Labels ────────────────────────────────────────────────────────

/// Vertex labels of the interaction graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLabel {
    Person,
    Ingredient,
    Cuisine,
    Recipe,
}

impl VertexLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Ingredient => "ingredient",
            Self::Cuisine => "cuisine",
            Self::Recipe => "recipe",
        }
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge labels of the interaction graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    /// Weighted interaction edge carrying `count`.
    Selects,
    /// Existence-only edge from a recipe to the ingredient or cuisine it came from.
    Has,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selects => "selects",
            Self::Has => "has",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Elements ──────────────────────────────────────────────────────

/// A vertex to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVertex {
    pub label: VertexLabel,
    pub properties: Properties,
}

impl NewVertex {
    pub fn new(label: VertexLabel) -> Self {
        Self {
            label,
            properties: Properties::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A vertex as returned by the graph service.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: ElementId,
    pub label: String,
    pub properties: Properties,
}

impl Vertex {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// The `name` property, which is the unique key of every vertex label.
    pub fn name(&self) -> Option<&str> {
        self.property("name").and_then(PropertyValue::as_str)
    }

    pub fn has_label(&self, label: VertexLabel) -> bool {
        self.label == label.as_str()
    }
}

/// An edge as returned by the graph service.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: ElementId,
    pub label: String,
    pub out_v: ElementId,
    pub in_v: ElementId,
    pub properties: Properties,
}

impl Edge {
    /// Interaction count of a weighted edge; an unset count reads as 0.
    pub fn count(&self) -> i64 {
        self.properties
            .get("count")
            .and_then(PropertyValue::as_i64)
            .unwrap_or(0)
    }
}

/// Either kind of graph element.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

impl Element {
    pub fn id(&self) -> &ElementId {
        match self {
            Self::Vertex(v) => &v.id,
            Self::Edge(e) => &e.id,
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Self::Vertex(v) => Some(v),
            Self::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Edge(e) => Some(e),
            Self::Vertex(_) => None,
        }
    }
}

/// The ordered elements visited by one traverser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub objects: Vec<Element>,
}

impl Path {
    /// First vertex in the path carrying `label`.
    pub fn find_vertex(&self, label: VertexLabel) -> Option<&Vertex> {
        self.objects
            .iter()
            .filter_map(Element::as_vertex)
            .find(|v| v.has_label(label))
    }

    /// First edge in the path.
    pub fn first_edge(&self) -> Option<&Edge> {
        self.objects.iter().find_map(Element::as_edge)
    }
}

// ── Query Results ─────────────────────────────────────────────────

/// A recipe the user selected most often.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteRecipe {
    pub id: String,
    pub title: String,
}

/// A recipe popular with other users sharing an ingredient or cuisine interest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecommendedRecipe {
    pub id: String,
    pub title: String,
    #[serde(rename = "recommendedUserCount")]
    pub recommended_user_count: u32,
}
