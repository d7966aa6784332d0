use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::routing::{admissible_answer_values, reconcile_routes};
use crate::schema::answer::{AnswerKind, AnswerType, MultiField};

/// Graph-layout coordinates of a question node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Maps one answer value to the next question, or to the end of the questionnaire when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub answer_value: String,
    #[serde(default)]
    pub next_question_id: Option<String>,
}

impl Route {
    pub fn terminal(answer_value: impl Into<String>) -> Self {
        Self {
            answer_value: answer_value.into(),
            next_question_id: None,
        }
    }
}

/// A single question of a subsection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub shortform: Option<String>,
    pub is_starting_question: bool,
    pub answer: AnswerKind,
    pub routes: Vec<Route>,
    pub position: Option<Position>,
}

impl Question {
    /// Boolean question with both answers routed to the end.
    pub fn boolean(
        id: impl Into<String>,
        name: impl Into<String>,
        is_starting_question: bool,
        position: Option<Position>,
    ) -> Self {
        let answer = AnswerKind::Boolean;
        let routes = reconcile_routes(&[], &admissible_answer_values(&answer));
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            shortform: None,
            is_starting_question,
            answer,
            routes,
            position,
        }
    }

    /// The question every fresh subsection starts with.
    pub fn seeded(subsection_id: &str) -> Self {
        Self::boolean(
            format!("{}-question-1", subsection_id),
            "Question 1",
            true,
            Some(Position::new(40.0, 40.0)),
        )
    }

    /// Question appended as the `ordinal`-th entry of a subsection.
    pub fn appended(subsection_id: &str, ordinal: usize) -> Self {
        let offset = ordinal.saturating_sub(1) as f64;
        Self::boolean(
            format!("{}-question-{}", subsection_id, ordinal),
            format!("Question {}", ordinal),
            false,
            Some(Position::new(40.0, offset * 90.0 + 40.0)),
        )
    }

    pub fn answer_type(&self) -> AnswerType {
        self.answer.answer_type()
    }

    pub fn route(&self, answer_value: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.answer_value == answer_value)
    }

    /// Merges `patch` and recomputes routes against the resulting answer kind.
    pub fn apply_patch(&mut self, patch: QuestionPatch) {
        let QuestionPatch {
            name,
            description,
            shortform,
            is_starting_question,
            answer_type,
            options,
            fields,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = Some(description);
        }
        if let Some(shortform) = shortform {
            self.shortform = Some(shortform);
        }
        if let Some(flag) = is_starting_question {
            self.is_starting_question = flag;
        }

        let answer_type = answer_type.unwrap_or_else(|| self.answer_type());
        self.answer = self.answer.reshape(answer_type, options, fields);
        self.routes = reconcile_routes(&self.routes, &admissible_answer_values(&self.answer));
    }
}

/// Partial update for a question. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_starting_question: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_type: Option<AnswerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<MultiField>>,
}

impl QuestionPatch {
    pub fn is_empty(&self) -> bool {
        *self == QuestionPatch::default()
    }
}

/// Flat persisted layout of a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shortform: Option<String>,
    #[serde(default)]
    is_starting_question: bool,
    #[serde(default)]
    answer_type: AnswerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<MultiField>>,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
}

impl From<QuestionRecord> for Question {
    fn from(record: QuestionRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            shortform: record.shortform,
            is_starting_question: record.is_starting_question,
            answer: AnswerKind::from_parts(
                record.answer_type,
                record.options.unwrap_or_default(),
                record.fields.unwrap_or_default(),
            ),
            routes: record.routes,
            position: record.position,
        }
    }
}

impl From<Question> for QuestionRecord {
    fn from(question: Question) -> Self {
        let answer_type = question.answer.answer_type();
        let (options, fields) = match question.answer {
            AnswerKind::SingleSelect { options } | AnswerKind::MultiSelect { options } => {
                (Some(options), None)
            }
            AnswerKind::MultiField { fields } => (None, Some(fields)),
            _ => (None, None),
        };
        Self {
            id: question.id,
            name: question.name,
            description: question.description,
            shortform: question.shortform,
            is_starting_question: question.is_starting_question,
            answer_type,
            options,
            fields,
            routes: question.routes,
            position: question.position,
        }
    }
}
