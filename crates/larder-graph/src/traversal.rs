//! Typed traversal steps.
//!
//! Traversals are built as step lists and only turned into script text at
//! the backend boundary, so the same value can be rendered for the remote
//! service or interpreted by the in-memory backend.

use larder_core::{EdgeLabel, ElementId, NewVertex, PropertyValue, VertexLabel};

/// Comparison used by `has(key, predicate)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(PropertyValue),
    Gt(PropertyValue),
    Neq(PropertyValue),
}

/// A single traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `V()` or `V(id)`.
    V(Option<ElementId>),
    /// `E(id)`.
    E(ElementId),
    AddV(String),
    /// Add an edge from the vertex `from` to the current vertex.
    AddE { label: String, from: ElementId },
    HasLabel(String),
    Has(String, Predicate),
    HasId(ElementId),
    OutE(String),
    InE(String),
    In(String),
    InV,
    OutV,
    OrderByDesc(String),
    Limit(usize),
    Property(String, PropertyValue),
    Path,
}

/// An ordered list of steps starting at the graph traversal source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traversal {
    pub steps: Vec<Step>,
}

impl Traversal {
    fn start(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn v() -> Self {
        Self::start(Step::V(None))
    }

    pub fn v_id(id: &ElementId) -> Self {
        Self::start(Step::V(Some(id.clone())))
    }

    pub fn e_id(id: &ElementId) -> Self {
        Self::start(Step::E(id.clone()))
    }

    pub fn add_v(label: &str) -> Self {
        Self::start(Step::AddV(label.to_string()))
    }

    pub fn add_e(self, label: &str, from: &ElementId) -> Self {
        self.push(Step::AddE {
            label: label.to_string(),
            from: from.clone(),
        })
    }

    pub fn has_label(self, label: &str) -> Self {
        self.push(Step::HasLabel(label.to_string()))
    }

    pub fn has(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.push(Step::Has(key.to_string(), Predicate::Eq(value.into())))
    }

    pub fn has_gt(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.push(Step::Has(key.to_string(), Predicate::Gt(value.into())))
    }

    pub fn has_neq(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.push(Step::Has(key.to_string(), Predicate::Neq(value.into())))
    }

    pub fn has_id(self, id: &ElementId) -> Self {
        self.push(Step::HasId(id.clone()))
    }

    pub fn out_e(self, label: &str) -> Self {
        self.push(Step::OutE(label.to_string()))
    }

    pub fn in_e(self, label: &str) -> Self {
        self.push(Step::InE(label.to_string()))
    }

    pub fn in_(self, label: &str) -> Self {
        self.push(Step::In(label.to_string()))
    }

    pub fn in_v(self) -> Self {
        self.push(Step::InV)
    }

    pub fn out_v(self) -> Self {
        self.push(Step::OutV)
    }

    pub fn order_by_desc(self, key: &str) -> Self {
        self.push(Step::OrderByDesc(key.to_string()))
    }

    pub fn limit(self, n: usize) -> Self {
        self.push(Step::Limit(n))
    }

    pub fn property(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.push(Step::Property(key.to_string(), value.into()))
    }

    pub fn path(self) -> Self {
        self.push(Step::Path)
    }

    /// Append one `property` step per entry, skipping the reserved `label` key.
    pub fn properties<'a, I>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a PropertyValue)>,
    {
        for (key, value) in properties {
            if key == "label" {
                tracing::debug!("Skipping reserved label key in property list");
                continue;
            }
            self.steps.push(Step::Property(key.clone(), value.clone()));
        }
        self
    }
}

// ── Templates ────────────────────────────────────────────────────

/// Add a vertex with its label and properties.
pub fn add_vertex(vertex: &NewVertex) -> Traversal {
    Traversal::add_v(vertex.label.as_str()).properties(&vertex.properties)
}

/// Add an edge between two vertices resolved by identifier.
pub fn add_edge<'a, I>(label: &str, out_v: &ElementId, in_v: &ElementId, properties: I) -> Traversal
where
    I: IntoIterator<Item = (&'a String, &'a PropertyValue)>,
{
    Traversal::v_id(in_v).add_e(label, out_v).properties(properties)
}

/// Overwrite properties on an existing edge.
pub fn update_edge<'a, I>(edge: &ElementId, properties: I) -> Traversal
where
    I: IntoIterator<Item = (&'a String, &'a PropertyValue)>,
{
    Traversal::e_id(edge).properties(properties)
}

/// Vertices with `label` whose `key` equals `value`.
pub fn find_vertices(label: &str, key: &str, value: impl Into<PropertyValue>) -> Traversal {
    Traversal::v().has_label(label).has(key, value)
}

/// Path `[out, edge, in]` for each `label` edge from `out_v` to `in_v`.
pub fn find_edge_path(label: &str, out_v: &ElementId, in_v: &ElementId) -> Traversal {
    Traversal::v_id(out_v).out_e(label).in_v().has_id(in_v).path()
}

/// Recipes a person selected, most-selected first.
pub fn favorite_recipes(person: &ElementId, limit: usize) -> Traversal {
    Traversal::v_id(person)
        .out_e(EdgeLabel::Selects.as_str())
        .order_by_desc("count")
        .in_v()
        .has_label(VertexLabel::Recipe.as_str())
        .limit(limit)
}

/// Paths `[origin, recipe, selects, person]` from an ingredient or cuisine to
/// other users who selected one of its recipes more than once.
pub fn recommendation_paths(origin: VertexLabel, key: &str, exclude_person: &str) -> Traversal {
    Traversal::v()
        .has_label(origin.as_str())
        .has("name", key)
        .in_(EdgeLabel::Has.as_str())
        .in_e(EdgeLabel::Selects.as_str())
        .has_gt("count", 1i64)
        .order_by_desc("count")
        .out_v()
        .has_label(VertexLabel::Person.as_str())
        .has_neq("name", exclude_person)
        .path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_vertex_skips_reserved_label_key() {
        let vertex = NewVertex::new(VertexLabel::Person)
            .with("name", "U1")
            .with("label", "admin");
        let t = add_vertex(&vertex);
        assert_eq!(
            t.steps,
            vec![
                Step::AddV("person".to_string()),
                Step::Property("name".to_string(), "U1".into()),
            ]
        );
    }

    #[test]
    fn test_find_edge_path_shape() {
        let t = find_edge_path("selects", &ElementId::Num(1), &ElementId::Num(2));
        assert_eq!(
            t.steps,
            vec![
                Step::V(Some(ElementId::Num(1))),
                Step::OutE("selects".to_string()),
                Step::InV,
                Step::HasId(ElementId::Num(2)),
                Step::Path,
            ]
        );
    }

    #[test]
    fn test_recommendation_paths_filters() {
        let t = recommendation_paths(VertexLabel::Ingredient, "basil,tomato", "U1");
        assert!(t
            .steps
            .contains(&Step::Has("count".to_string(), Predicate::Gt(PropertyValue::Int(1)))));
        assert!(t
            .steps
            .contains(&Step::Has("name".to_string(), Predicate::Neq("U1".into()))));
        assert_eq!(t.steps.last(), Some(&Step::Path));
    }
}
