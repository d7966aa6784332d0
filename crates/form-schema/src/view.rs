use std::sync::Arc;

use crate::graph::{DEFAULT_END_POSITION, EdgeKey, NodeId, RoutingGraph, derive_graph};
use crate::schema::{FormSchema, Position, Question, SubsectionPath};
use crate::store::SchemaStore;

/// Route-editing fields seeded by graph selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteEditor {
    pub source_question_id: Option<String>,
    pub answer_value: Option<String>,
}

#[derive(Debug)]
struct CachedGraph {
    schema: Arc<FormSchema>,
    end_position: Position,
    graph: RoutingGraph,
}

/// Interactive routing graph of one subsection.
///
/// The derived graph is cached until the schema snapshot or the end node position changes.
/// The end node position is local to the view and never persisted.
#[derive(Debug)]
pub struct RoutingView {
    subsection: SubsectionPath,
    end_position: Position,
    selected_question: Option<String>,
    selected_edge: Option<EdgeKey>,
    route_editor: RouteEditor,
    cache: Option<CachedGraph>,
}

impl RoutingView {
    pub fn new(subsection: SubsectionPath) -> Self {
        Self {
            subsection,
            end_position: DEFAULT_END_POSITION,
            selected_question: None,
            selected_edge: None,
            route_editor: RouteEditor::default(),
            cache: None,
        }
    }

    pub fn with_end_position(mut self, position: Position) -> Self {
        self.end_position = position;
        self
    }

    pub fn subsection(&self) -> &SubsectionPath {
        &self.subsection
    }

    pub fn end_position(&self) -> Position {
        self.end_position
    }

    pub fn selected_question(&self) -> Option<&str> {
        self.selected_question.as_deref()
    }

    pub fn selected_edge(&self) -> Option<&EdgeKey> {
        self.selected_edge.as_ref()
    }

    pub fn route_editor(&self) -> &RouteEditor {
        &self.route_editor
    }

    /// Graph for `schema`, or `None` when the subsection no longer exists.
    pub fn graph(&mut self, schema: &Arc<FormSchema>) -> Option<&RoutingGraph> {
        let fresh = self.cache.as_ref().is_some_and(|cached| {
            Arc::ptr_eq(&cached.schema, schema) && cached.end_position == self.end_position
        });
        if !fresh {
            self.cache = schema
                .subsection(&self.subsection)
                .map(|subsection| CachedGraph {
                    schema: Arc::clone(schema),
                    end_position: self.end_position,
                    graph: derive_graph(&subsection.questions, self.end_position),
                });
        }
        self.cache.as_ref().map(|cached| &cached.graph)
    }

    /// Selects a question for editing and points the route editor at its first answer.
    /// The end node is not selectable.
    pub fn select_node(&mut self, schema: &FormSchema, node: &NodeId) {
        let NodeId::Question(question_id) = node else {
            return;
        };
        let first_answer = self
            .question(schema, question_id)
            .and_then(|question| question.routes.first())
            .map(|route| route.answer_value.clone());

        self.selected_question = Some(question_id.clone());
        self.selected_edge = None;
        self.route_editor = RouteEditor {
            source_question_id: Some(question_id.clone()),
            answer_value: first_answer,
        };
    }

    pub fn select_edge(&mut self, key: &EdgeKey) {
        self.selected_edge = Some(key.clone());
        self.route_editor = RouteEditor {
            source_question_id: Some(key.source.clone()),
            answer_value: Some(key.answer_value.clone()),
        };
    }

    /// Current target of the route the editor points at.
    pub fn route_target(&self, schema: &FormSchema) -> Option<NodeId> {
        let source = self.route_editor.source_question_id.as_deref()?;
        let answer_value = self.route_editor.answer_value.as_deref()?;
        let route = self.question(schema, source)?.route(answer_value)?;
        Some(NodeId::target(route.next_question_id.as_deref()))
    }

    /// Writes the edited route back through the store.
    pub fn commit_route(&self, store: &mut SchemaStore, target: &NodeId) -> bool {
        let (Some(source), Some(answer_value)) = (
            self.route_editor.source_question_id.as_deref(),
            self.route_editor.answer_value.as_deref(),
        ) else {
            return false;
        };
        store.set_question_route(
            &self.subsection.question(source),
            answer_value,
            target.question_id().map(str::to_string),
        )
    }

    /// Drops a dragged node: questions persist their position, the end node only moves locally.
    pub fn drag_node(&mut self, store: &mut SchemaStore, node: &NodeId, position: Position) -> bool {
        match node {
            NodeId::End if !position.is_finite() => false,
            NodeId::End => {
                self.end_position = position;
                true
            }
            NodeId::Question(question_id) => {
                store.set_question_position(&self.subsection.question(question_id.as_str()), position)
            }
        }
    }

    fn question<'a>(&self, schema: &'a FormSchema, question_id: &str) -> Option<&'a Question> {
        schema.subsection(&self.subsection)?.question(question_id)
    }
}
