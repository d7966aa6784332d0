//! Node/edge view of a subsection's routing, for graph-drawing front ends.

use std::fmt::{self, Write};

use serde::{Serialize, Serializer};

use crate::schema::{Position, Question};

/// Identifier of the synthetic terminal node.
pub const END_NODE_ID: &str = "__END__";
pub const END_LABEL: &str = "End";
pub const DEFAULT_END_POSITION: Position = Position::new(520.0, 0.0);

/// Layout used for questions that were never dragged.
pub fn default_position(index: usize) -> Position {
    Position::new(40.0, index as f64 * 90.0 + 40.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Question(String),
    End,
}

impl NodeId {
    /// Node a route lands on: the named question, or the end node.
    pub fn target(next_question_id: Option<&str>) -> Self {
        match next_question_id {
            Some(id) => NodeId::Question(id.to_string()),
            None => NodeId::End,
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw == END_NODE_ID {
            NodeId::End
        } else {
            NodeId::Question(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeId::Question(id) => id,
            NodeId::End => END_NODE_ID,
        }
    }

    pub fn question_id(&self) -> Option<&str> {
        match self {
            NodeId::Question(id) => Some(id),
            NodeId::End => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Edge identity: a question routes each answer value at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeKey {
    pub source: String,
    pub answer_value: String,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, answer_value: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            answer_value: answer_value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    #[serde(flatten)]
    pub key: EdgeKey,
    pub target: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoutingGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// One node per question plus the end node, one edge per route.
pub fn derive_graph(questions: &[Question], end_position: Position) -> RoutingGraph {
    let mut nodes: Vec<GraphNode> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| GraphNode {
            id: NodeId::Question(question.id.clone()),
            label: if question.name.is_empty() {
                question.id.clone()
            } else {
                question.name.clone()
            },
            position: question.position.unwrap_or_else(|| default_position(index)),
        })
        .collect();
    nodes.push(GraphNode {
        id: NodeId::End,
        label: END_LABEL.into(),
        position: end_position,
    });

    let edges = questions
        .iter()
        .flat_map(|question| {
            question.routes.iter().map(|route| GraphEdge {
                key: EdgeKey::new(question.id.clone(), route.answer_value.clone()),
                target: NodeId::target(route.next_question_id.as_deref()),
                label: route.answer_value.clone(),
            })
        })
        .collect();

    RoutingGraph { nodes, edges }
}

impl RoutingGraph {
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == *id)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| edge.key == *key)
    }

    pub fn edges_into<'a>(&'a self, target: &'a NodeId) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.target == *target)
    }

    /// Graphviz rendering; node positions are emitted as `pos` hints.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph routing {\n    rankdir=TB;\n");
        for node in &self.nodes {
            let shape = match node.id {
                NodeId::End => "doublecircle",
                NodeId::Question(_) => "box",
            };
            writeln!(
                dot,
                "    \"{}\" [label=\"{}\", shape={}, pos=\"{},{}\"];",
                escape(node.id.as_str()),
                escape(&node.label),
                shape,
                node.position.x,
                -node.position.y
            )
            .expect("writing to string cannot fail");
        }
        for edge in &self.edges {
            writeln!(
                dot,
                "    \"{}\" -> \"{}\" [label=\"{}\"];",
                escape(&edge.key.source),
                escape(edge.target.as_str()),
                escape(&edge.label)
            )
            .expect("writing to string cannot fail");
        }
        dot.push_str("}\n");
        dot
    }
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
