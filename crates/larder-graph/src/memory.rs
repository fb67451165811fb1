//! In-memory graph backend.
//!
//! Interprets the typed traversals directly and answers with the same
//! GraphSON-shaped envelopes the remote service produces. Used for tests
//! and local development.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use serde_json::{json, Map, Value};

use larder_core::{ElementId, GraphName, Properties, PropertyValue};

use crate::backend::Backend;
use crate::client::GraphError;
use crate::response::{Envelope, STATUS_SCRIPT_EVALUATION_ERROR};
use crate::script::Request;
use crate::traversal::{Predicate, Step, Traversal};

#[derive(Debug, Clone)]
struct StoredVertex {
    label: String,
    properties: Properties,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    label: String,
    out_v: i64,
    in_v: i64,
    properties: Properties,
}

#[derive(Debug, Default)]
struct MemoryGraph {
    vertices: BTreeMap<i64, StoredVertex>,
    edges: BTreeMap<i64, StoredEdge>,
    next_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Vertex(i64),
    Edge(i64),
}

#[derive(Debug, Clone)]
struct Traverser {
    at: Cursor,
    path: Vec<Cursor>,
}

impl Traverser {
    fn start(at: Cursor) -> Self {
        Self { at, path: vec![at] }
    }

    fn step_to(&self, at: Cursor) -> Self {
        let mut path = self.path.clone();
        path.push(at);
        Self { at, path }
    }
}

fn edge_id_text(id: i64) -> String {
    format!("e{id}")
}

fn vertex_key(id: &ElementId) -> Option<i64> {
    match id {
        ElementId::Num(n) => Some(*n),
        ElementId::Text(_) => None,
    }
}

fn edge_key(id: &ElementId) -> Option<i64> {
    match id {
        ElementId::Text(s) => s.strip_prefix('e')?.parse().ok(),
        ElementId::Num(_) => None,
    }
}

fn satisfies(actual: Option<&PropertyValue>, predicate: &Predicate) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    match predicate {
        Predicate::Eq(expected) => same_value(actual, expected),
        Predicate::Neq(expected) => !same_value(actual, expected),
        Predicate::Gt(expected) => match (actual.as_i64(), expected.as_i64()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
    }
}

fn same_value(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl MemoryGraph {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn properties_of(&self, at: Cursor) -> Option<&Properties> {
        match at {
            Cursor::Vertex(id) => self.vertices.get(&id).map(|v| &v.properties),
            Cursor::Edge(id) => self.edges.get(&id).map(|e| &e.properties),
        }
    }

    fn label_of(&self, at: Cursor) -> Option<&str> {
        match at {
            Cursor::Vertex(id) => self.vertices.get(&id).map(|v| v.label.as_str()),
            Cursor::Edge(id) => self.edges.get(&id).map(|e| e.label.as_str()),
        }
    }

    fn id_matches(at: Cursor, id: &ElementId) -> bool {
        match at {
            Cursor::Vertex(v) => vertex_key(id) == Some(v),
            Cursor::Edge(e) => edge_key(id) == Some(e),
        }
    }

    fn run(&mut self, traversal: &Traversal) -> Result<Vec<Value>, String> {
        let mut steps = traversal.steps.iter();
        let mut traversers: Vec<Traverser> = match steps.next() {
            Some(Step::V(None)) => self
                .vertices
                .keys()
                .map(|id| Traverser::start(Cursor::Vertex(*id)))
                .collect(),
            Some(Step::V(Some(id))) => vertex_key(id)
                .filter(|k| self.vertices.contains_key(k))
                .map(|k| vec![Traverser::start(Cursor::Vertex(k))])
                .unwrap_or_default(),
            Some(Step::E(id)) => edge_key(id)
                .filter(|k| self.edges.contains_key(k))
                .map(|k| vec![Traverser::start(Cursor::Edge(k))])
                .unwrap_or_default(),
            Some(Step::AddV(label)) => {
                let id = self.allocate_id();
                self.vertices.insert(
                    id,
                    StoredVertex {
                        label: label.clone(),
                        properties: Properties::new(),
                    },
                );
                vec![Traverser::start(Cursor::Vertex(id))]
            }
            Some(other) => return Err(format!("Traversal cannot start with {other:?}")),
            None => return Ok(Vec::new()),
        };

        let mut emit_paths = false;
        for step in steps {
            traversers = self.apply(step, traversers)?;
            if *step == Step::Path {
                emit_paths = true;
            }
        }

        Ok(traversers
            .iter()
            .map(|t| {
                if emit_paths {
                    self.path_json(&t.path)
                } else {
                    self.element_json(t.at)
                }
            })
            .collect())
    }

    fn apply(&mut self, step: &Step, traversers: Vec<Traverser>) -> Result<Vec<Traverser>, String> {
        let out: Vec<Traverser> = match step {
            Step::HasLabel(label) => traversers
                .into_iter()
                .filter(|t| self.label_of(t.at) == Some(label.as_str()))
                .collect(),
            Step::Has(key, predicate) => traversers
                .into_iter()
                .filter(|t| {
                    let value = self.properties_of(t.at).and_then(|p| p.get(key));
                    satisfies(value, predicate)
                })
                .collect(),
            Step::HasId(id) => traversers
                .into_iter()
                .filter(|t| Self::id_matches(t.at, id))
                .collect(),
            Step::OutE(label) => self.expand(traversers, |g, v| {
                g.edges
                    .iter()
                    .filter(|(_, e)| e.out_v == v && &e.label == label)
                    .map(|(id, _)| Cursor::Edge(*id))
                    .collect()
            }),
            Step::InE(label) => self.expand(traversers, |g, v| {
                g.edges
                    .iter()
                    .filter(|(_, e)| e.in_v == v && &e.label == label)
                    .map(|(id, _)| Cursor::Edge(*id))
                    .collect()
            }),
            Step::In(label) => self.expand(traversers, |g, v| {
                g.edges
                    .values()
                    .filter(|e| e.in_v == v && &e.label == label)
                    .map(|e| Cursor::Vertex(e.out_v))
                    .collect()
            }),
            Step::InV | Step::OutV => traversers
                .into_iter()
                .filter_map(|t| match t.at {
                    Cursor::Edge(id) => {
                        let edge = self.edges.get(&id)?;
                        let v = if *step == Step::InV { edge.in_v } else { edge.out_v };
                        Some(t.step_to(Cursor::Vertex(v)))
                    }
                    Cursor::Vertex(_) => None,
                })
                .collect(),
            Step::OrderByDesc(key) => {
                let mut sorted = traversers;
                sorted.sort_by_key(|t| {
                    let value = self
                        .properties_of(t.at)
                        .and_then(|p| p.get(key))
                        .and_then(PropertyValue::as_i64)
                        .unwrap_or(i64::MIN);
                    Reverse(value)
                });
                sorted
            }
            Step::Limit(n) => traversers.into_iter().take(*n).collect(),
            Step::Property(key, value) => {
                for t in &traversers {
                    let properties = match t.at {
                        Cursor::Vertex(id) => self.vertices.get_mut(&id).map(|v| &mut v.properties),
                        Cursor::Edge(id) => self.edges.get_mut(&id).map(|e| &mut e.properties),
                    };
                    if let Some(properties) = properties {
                        properties.insert(key.clone(), value.clone());
                    }
                }
                traversers
            }
            Step::AddE { label, from } => {
                let from = vertex_key(from)
                    .filter(|k| self.vertices.contains_key(k))
                    .ok_or_else(|| format!("The provided traverser does not map to a value: {from}"))?;
                let mut created = Vec::with_capacity(traversers.len());
                for t in traversers {
                    let Cursor::Vertex(to) = t.at else {
                        return Err("addE() requires a vertex traverser".to_string());
                    };
                    let id = self.allocate_id();
                    self.edges.insert(
                        id,
                        StoredEdge {
                            label: label.clone(),
                            out_v: from,
                            in_v: to,
                            properties: Properties::new(),
                        },
                    );
                    created.push(t.step_to(Cursor::Edge(id)));
                }
                created
            }
            Step::Path => traversers,
            Step::V(_) | Step::E(_) | Step::AddV(_) => {
                return Err(format!("{step:?} is only supported as a start step"))
            }
        };
        Ok(out)
    }

    /// Replace each vertex traverser with one traverser per target of `next`.
    fn expand<F>(&self, traversers: Vec<Traverser>, next: F) -> Vec<Traverser>
    where
        F: Fn(&Self, i64) -> Vec<Cursor>,
    {
        traversers
            .into_iter()
            .flat_map(|t| match t.at {
                Cursor::Vertex(v) => next(self, v)
                    .into_iter()
                    .map(|c| t.step_to(c))
                    .collect::<Vec<_>>(),
                Cursor::Edge(_) => Vec::new(),
            })
            .collect()
    }

    fn element_json(&self, at: Cursor) -> Value {
        match at {
            Cursor::Vertex(id) => {
                let Some(v) = self.vertices.get(&id) else {
                    return Value::Null;
                };
                let properties: Map<String, Value> = v
                    .properties
                    .iter()
                    .map(|(k, p)| (k.clone(), json!([{"id": format!("{id}-{k}"), "value": p.to_json()}])))
                    .collect();
                json!({"id": id, "label": v.label, "type": "vertex", "properties": properties})
            }
            Cursor::Edge(id) => {
                let Some(e) = self.edges.get(&id) else {
                    return Value::Null;
                };
                let properties: Map<String, Value> = e
                    .properties
                    .iter()
                    .map(|(k, p)| (k.clone(), p.to_json()))
                    .collect();
                json!({
                    "id": edge_id_text(id),
                    "label": e.label,
                    "type": "edge",
                    "outV": e.out_v,
                    "inV": e.in_v,
                    "outVLabel": self.label_of(Cursor::Vertex(e.out_v)),
                    "inVLabel": self.label_of(Cursor::Vertex(e.in_v)),
                    "properties": properties
                })
            }
        }
    }

    fn path_json(&self, path: &[Cursor]) -> Value {
        let labels: Vec<Value> = path.iter().map(|_| json!([])).collect();
        let objects: Vec<Value> = path.iter().map(|c| self.element_json(*c)).collect();
        json!({"labels": labels, "objects": objects})
    }
}

/// In-memory graph service holding any number of named graphs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    graphs: Mutex<HashMap<GraphName, MemoryGraph>>,
    history: Mutex<Vec<Request>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend where `graph` already exists.
    pub fn with_graph(graph: GraphName) -> Self {
        let mut graphs = HashMap::new();
        graphs.insert(graph, MemoryGraph::default());
        Self {
            graphs: Mutex::new(graphs),
            history: Mutex::default(),
        }
    }

    /// Every request submitted so far, in order.
    pub fn history(&self) -> Vec<Request> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn vertex_count(&self, graph: &GraphName, label: &str) -> usize {
        self.with_stored(graph, |g| g.vertices.values().filter(|v| v.label == label).count())
    }

    /// All `label` edges as `(out, in, properties)` with vertex ids.
    pub fn edges(&self, graph: &GraphName, label: &str) -> Vec<(i64, i64, Properties)> {
        self.with_stored(graph, |g| {
            g.edges
                .values()
                .filter(|e| e.label == label)
                .map(|e| (e.out_v, e.in_v, e.properties.clone()))
                .collect()
        })
    }

    fn with_stored<T: Default>(&self, graph: &GraphName, f: impl FnOnce(&MemoryGraph) -> T) -> T {
        self.graphs
            .lock()
            .ok()
            .and_then(|graphs| graphs.get(graph).map(f))
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> GraphError {
    GraphError::Transport("memory backend lock poisoned".to_string())
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn submit(&self, request: &Request) -> Result<Envelope, GraphError> {
        // Every call suspends once, as a network round trip would.
        tokio::task::yield_now().await;

        self.history.lock().map_err(poisoned)?.push(request.clone());
        let mut graphs = self.graphs.lock().map_err(poisoned)?;

        let envelope = match request {
            Request::OpenGraph(name) if graphs.contains_key(name) => Envelope::ok(vec![json!(0)]),
            Request::OpenGraph(name) => Envelope::failure(
                STATUS_SCRIPT_EVALUATION_ERROR,
                format!("Graph {name} does not exist"),
            ),
            Request::CreateGraph(name) if graphs.contains_key(name) => Envelope::failure(
                STATUS_SCRIPT_EVALUATION_ERROR,
                format!("Graph {name} already exists"),
            ),
            Request::CreateGraph(name) => {
                graphs.insert(name.clone(), MemoryGraph::default());
                Envelope::ok(vec![json!(0)])
            }
            Request::Run { graph, traversal } => match graphs.get_mut(graph) {
                None => Envelope::failure(
                    STATUS_SCRIPT_EVALUATION_ERROR,
                    format!("Graph {graph} does not exist"),
                ),
                Some(g) => match g.run(traversal) {
                    Ok(rows) => Envelope::ok(rows),
                    Err(message) => Envelope::failure(STATUS_SCRIPT_EVALUATION_ERROR, message),
                },
            },
        };
        Ok(envelope)
    }
}
