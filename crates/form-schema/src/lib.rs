#![allow(missing_docs)]

pub mod error;
pub mod export;
pub mod graph;
pub mod routing;
pub mod schema;
pub mod storage;
pub mod store;
pub mod view;

pub use error::StorageError;
pub use export::{
    EXPORT_FILE_NAME, ExportDocument, OutlineDocument, export_document, export_json_schema,
    outline_document, write_export,
};
pub use graph::{
    DEFAULT_END_POSITION, END_NODE_ID, EdgeKey, GraphEdge, GraphNode, NodeId, RoutingGraph,
    derive_graph,
};
pub use routing::{admissible_answer_values, reconcile_routes, upsert_route};
pub use schema::{
    AnswerKind, AnswerType, Category, FormSchema, MultiField, Position, Question, QuestionPatch,
    QuestionPath, Route, Section, Subsection, SubsectionPath, clamp_category_count,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, STORAGE_KEY};
pub use store::{SchemaReader, SchemaStore, SubscriptionId};
pub use view::{RouteEditor, RoutingView};
