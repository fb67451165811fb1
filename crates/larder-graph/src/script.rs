//! Gremlin script rendering.
//!
//! Turns a [`Request`] into the JSON body accepted by the Gremlin Server
//! HTTP endpoint. String values are either inlined as escaped literals or
//! passed as named bindings, depending on [`ScriptMode`].

use serde::{Deserialize, Serialize};

use larder_core::{ElementId, GraphName, PropertyValue};

use crate::traversal::{Predicate, Step, Traversal};

/// One request to the graph service.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Open a named graph; succeeds only if it exists.
    OpenGraph(GraphName),
    /// Create a named graph.
    CreateGraph(GraphName),
    /// Open `graph` and run `traversal` against it.
    Run {
        graph: GraphName,
        traversal: Traversal,
    },
}

/// How values are embedded in rendered scripts.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScriptMode {
    /// Values are quoted and escaped into the script text.
    #[default]
    Inline,
    /// Values are sent as `bindings` next to the script text.
    Bound,
}

/// Request body for the Gremlin Server HTTP endpoint.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Script {
    pub gremlin: String,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub bindings: serde_json::Map<String, serde_json::Value>,
}

/// Escape a string for embedding in a double-quoted Groovy literal.
///
/// Every backslash is doubled first, then every `"`, every `$` (Groovy
/// interpolation) and line breaks are escaped. The literal therefore
/// decodes back to exactly `raw`, whatever backslashes it contains.
pub fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn quoted(raw: &str) -> String {
    format!("\"{}\"", escape_literal(raw))
}

/// Render `request` into a script body.
pub fn render(request: &Request, mode: ScriptMode) -> Script {
    match request {
        Request::OpenGraph(graph) => Script {
            gremlin: format!("{};0", open_statement(graph)),
            ..Default::default()
        },
        Request::CreateGraph(graph) => Script {
            gremlin: format!(
                "def graph = ConfiguredGraphFactory.create({});0",
                quoted(graph.as_str())
            ),
            ..Default::default()
        },
        Request::Run { graph, traversal } => {
            let mut writer = ScriptWriter::new(mode);
            writer.text.push_str(&open_statement(graph));
            writer.text.push_str(";def g = graph.traversal();g");
            for step in &traversal.steps {
                writer.step(step);
            }
            writer.finish()
        }
    }
}

fn open_statement(graph: &GraphName) -> String {
    format!(
        "def graph = ConfiguredGraphFactory.open({})",
        quoted(graph.as_str())
    )
}

struct ScriptWriter {
    mode: ScriptMode,
    text: String,
    bindings: serde_json::Map<String, serde_json::Value>,
}

impl ScriptWriter {
    fn new(mode: ScriptMode) -> Self {
        Self {
            mode,
            text: String::new(),
            bindings: serde_json::Map::new(),
        }
    }

    fn finish(self) -> Script {
        Script {
            gremlin: self.text,
            bindings: self.bindings,
        }
    }

    fn bind(&mut self, value: serde_json::Value) -> String {
        let name = format!("p{}", self.bindings.len());
        self.bindings.insert(name.clone(), value);
        name
    }

    fn value(&mut self, value: &PropertyValue) -> String {
        match (self.mode, value) {
            (ScriptMode::Bound, _) => self.bind(value.to_json()),
            (ScriptMode::Inline, PropertyValue::Text(s) | PropertyValue::Blob(s)) => quoted(s),
            (ScriptMode::Inline, PropertyValue::Int(n)) => n.to_string(),
            (ScriptMode::Inline, PropertyValue::Bool(b)) => b.to_string(),
        }
    }

    fn id(&mut self, id: &ElementId) -> String {
        match (self.mode, id) {
            (ScriptMode::Bound, ElementId::Num(n)) => self.bind(serde_json::Value::from(*n)),
            (ScriptMode::Bound, ElementId::Text(s)) => self.bind(serde_json::Value::from(s.as_str())),
            (ScriptMode::Inline, ElementId::Num(n)) => n.to_string(),
            (ScriptMode::Inline, ElementId::Text(s)) => quoted(s),
        }
    }

    fn step(&mut self, step: &Step) {
        let rendered = match step {
            Step::V(None) => ".V()".to_string(),
            Step::V(Some(id)) => format!(".V({})", self.id(id)),
            Step::E(id) => format!(".E({})", self.id(id)),
            Step::AddV(label) => format!(".addV({})", quoted(label)),
            Step::AddE { label, from } => {
                format!(".addE({}).from(__.V({}))", quoted(label), self.id(from))
            }
            Step::HasLabel(label) => format!(".hasLabel({})", quoted(label)),
            Step::Has(key, predicate) => {
                let arg = match predicate {
                    Predicate::Eq(v) => self.value(v),
                    Predicate::Gt(v) => format!("gt({})", self.value(v)),
                    Predicate::Neq(v) => format!("neq({})", self.value(v)),
                };
                format!(".has({}, {arg})", quoted(key))
            }
            Step::HasId(id) => format!(".hasId({})", self.id(id)),
            Step::OutE(label) => format!(".outE({})", quoted(label)),
            Step::InE(label) => format!(".inE({})", quoted(label)),
            Step::In(label) => format!(".in({})", quoted(label)),
            Step::InV => ".inV()".to_string(),
            Step::OutV => ".outV()".to_string(),
            Step::OrderByDesc(key) => format!(".order().by({}, desc)", quoted(key)),
            Step::Limit(n) => format!(".limit({n})"),
            Step::Property(key, value) => {
                format!(".property({}, {})", quoted(key), self.value(value))
            }
            Step::Path => ".path()".to_string(),
        };
        self.text.push_str(&rendered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal;
    use larder_core::{NewVertex, VertexLabel};

    const PREFIX: &str =
        "def graph = ConfiguredGraphFactory.open(\"recipes\");def g = graph.traversal();";

    fn run(traversal: Traversal) -> Request {
        Request::Run {
            graph: GraphName::new("recipes"),
            traversal,
        }
    }

    /// Decode the body of a double-quoted Groovy literal. Panics on an
    /// unescaped `"` or `$`, a raw line break, or a dangling backslash.
    fn decode_literal(escaped: &str) -> String {
        let mut out = String::new();
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('$') => out.push('$'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    other => panic!("unexpected escape {other:?} in {escaped}"),
                },
                '"' | '$' | '\n' | '\r' => panic!("unescaped {c:?} in {escaped}"),
                _ => out.push(c),
            }
        }
        out
    }

    /// Escaped body of the literal that starts right after `marker`.
    fn literal_after<'a>(gremlin: &'a str, marker: &str) -> &'a str {
        let start = gremlin.find(marker).unwrap() + marker.len();
        let body = &gremlin[start..];
        let mut escaped = false;
        for (i, c) in body.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return &body[..i],
                _ => {}
            }
        }
        panic!("unterminated literal in {gremlin}");
    }

    #[test]
    fn test_escape_literal_order() {
        assert_eq!(escape_literal(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_literal("cost $5"), r"cost \$5");
        assert_eq!(escape_literal("line1\nline2"), r"line1\nline2");
        assert_eq!(escape_literal("${g.V().drop()}"), r"\${g.V().drop()}");
        assert_eq!(escape_literal(r"C:\temp"), r"C:\\temp");
    }

    #[test]
    fn test_escape_literal_backslash_cannot_close_literal() {
        let cases = [
            (r#"a\\"; g.V().drop(); ""#, r#"a\\\\\"; g.V().drop(); \""#),
            (r"ends with \", r"ends with \\"),
            (r"\${g.V().drop()}", r"\\\${g.V().drop()}"),
            (r#"a \"b\" c"#, r#"a \\\"b\\\" c"#),
        ];
        for (raw, expected) in cases {
            let escaped = escape_literal(raw);
            assert_eq!(escaped, expected);
            assert_eq!(decode_literal(&escaped), raw);
        }
    }

    #[test]
    fn test_escape_literal_combinations() {
        let pieces = ["\"", "$", "\n", "a", "{", "}", "\\", "\\\"", "\\$", "'", "\r"];
        for a in &pieces {
            for b in &pieces {
                for c in &pieces {
                    let raw = format!("{a}{b}{c}");
                    assert_eq!(decode_literal(&escape_literal(&raw)), raw);
                }
            }
        }
    }

    #[test]
    fn test_render_inline_values_decode_to_originals() {
        let title = r#"Mom's \\"best\" soup ${price}"#;
        let detail = "Step 1:\r\nsimmer \\\"gently\\\".\\";
        let vertex = NewVertex::new(VertexLabel::Recipe)
            .with("name", "42")
            .with("title", title)
            .with("detail", detail);
        let script = render(&run(traversal::add_vertex(&vertex)), ScriptMode::Inline);

        for (key, raw) in [("detail", detail), ("title", title), ("name", "42")] {
            let marker = format!(".property(\"{key}\", \"");
            assert_eq!(decode_literal(literal_after(&script.gremlin, &marker)), raw);
        }
        // Title is the last property; nothing may follow its literal.
        assert!(script
            .gremlin
            .ends_with(&format!("\"{}\")", escape_literal(title))));
    }

    #[test]
    fn test_render_open_and_create() {
        let open = render(&Request::OpenGraph(GraphName::new("recipes")), ScriptMode::Inline);
        assert_eq!(open.gremlin, "def graph = ConfiguredGraphFactory.open(\"recipes\");0");
        let create = render(&Request::CreateGraph(GraphName::new("recipes")), ScriptMode::Inline);
        assert_eq!(create.gremlin, "def graph = ConfiguredGraphFactory.create(\"recipes\");0");
        assert!(create.bindings.is_empty());
    }

    #[test]
    fn test_render_add_vertex_inline() {
        let vertex = NewVertex::new(VertexLabel::Recipe)
            .with("name", "42")
            .with("title", "Tomato \"Soup\"")
            .with("servings", 4i64);
        let script = render(&run(traversal::add_vertex(&vertex)), ScriptMode::Inline);
        assert_eq!(
            script.gremlin,
            format!(
                "{PREFIX}g.addV(\"recipe\").property(\"name\", \"42\").property(\"servings\", 4).property(\"title\", \"Tomato \\\"Soup\\\"\")"
            )
        );
    }

    #[test]
    fn test_render_add_edge_and_update() {
        let mut props = larder_core::Properties::new();
        props.insert("count".to_string(), PropertyValue::Int(1));
        let add = render(
            &run(traversal::add_edge("selects", &ElementId::Num(8), &ElementId::Num(16), &props)),
            ScriptMode::Inline,
        );
        assert_eq!(
            add.gremlin,
            format!("{PREFIX}g.V(16).addE(\"selects\").from(__.V(8)).property(\"count\", 1)")
        );

        let update = render(
            &run(traversal::update_edge(&ElementId::from("odx-3bk"), &props)),
            ScriptMode::Inline,
        );
        assert_eq!(
            update.gremlin,
            format!("{PREFIX}g.E(\"odx-3bk\").property(\"count\", 1)")
        );
    }

    #[test]
    fn test_render_recommendation_traversal() {
        let script = render(
            &run(traversal::recommendation_paths(VertexLabel::Ingredient, "basil,tomato", "U1")),
            ScriptMode::Inline,
        );
        assert_eq!(
            script.gremlin,
            format!(
                "{PREFIX}g.V().hasLabel(\"ingredient\").has(\"name\", \"basil,tomato\").in(\"has\").inE(\"selects\").has(\"count\", gt(1)).order().by(\"count\", desc).outV().hasLabel(\"person\").has(\"name\", neq(\"U1\")).path()"
            )
        );
    }

    #[test]
    fn test_render_bound_mode_moves_values_to_bindings() {
        let script = render(
            &run(traversal::find_vertices("person", "name", "U1\"; g.V().drop(); \"")),
            ScriptMode::Bound,
        );
        assert_eq!(
            script.gremlin,
            format!("{PREFIX}g.V().hasLabel(\"person\").has(\"name\", p0)")
        );
        assert_eq!(
            script.bindings.get("p0"),
            Some(&serde_json::json!("U1\"; g.V().drop(); \""))
        );

        let path = render(
            &run(traversal::find_edge_path("selects", &ElementId::Num(1), &ElementId::from("e2"))),
            ScriptMode::Bound,
        );
        assert_eq!(
            path.gremlin,
            format!("{PREFIX}g.V(p0).outE(\"selects\").inV().hasId(p1).path()")
        );
        assert_eq!(path.bindings.get("p0"), Some(&serde_json::json!(1)));
        assert_eq!(path.bindings.get("p1"), Some(&serde_json::json!("e2")));
    }

    #[test]
    fn test_script_body_omits_empty_bindings() {
        let script = render(&Request::OpenGraph(GraphName::new("recipes")), ScriptMode::Bound);
        let body = serde_json::to_value(&script).unwrap();
        assert!(body.get("bindings").is_none());
        assert!(body["gremlin"].as_str().unwrap().contains("open(\"recipes\")"));
    }
}
