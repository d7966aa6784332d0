use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer type tag as written in persisted and exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    #[default]
    Boolean,
    SingleSelect,
    MultiSelect,
    Text,
    Number,
    Upload,
    MultiField,
}

impl AnswerType {
    pub const ALL: [AnswerType; 7] = [
        AnswerType::Boolean,
        AnswerType::SingleSelect,
        AnswerType::MultiSelect,
        AnswerType::Text,
        AnswerType::Number,
        AnswerType::Upload,
        AnswerType::MultiField,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Boolean => "boolean",
            AnswerType::SingleSelect => "single_select",
            AnswerType::MultiSelect => "multi_select",
            AnswerType::Text => "text",
            AnswerType::Number => "number",
            AnswerType::Upload => "upload",
            AnswerType::MultiField => "multi_field",
        }
    }

    /// Label shown to authors when picking a type.
    pub fn label(&self) -> &'static str {
        match self {
            AnswerType::Boolean => "Yes / No",
            AnswerType::SingleSelect => "Single choice",
            AnswerType::MultiSelect => "Multi choice",
            AnswerType::Text => "Text",
            AnswerType::Number => "Number",
            AnswerType::Upload => "Upload",
            AnswerType::MultiField => "Multiple field input",
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, AnswerType::SingleSelect | AnswerType::MultiSelect)
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "boolean" | "bool" | "yes_no" => Ok(AnswerType::Boolean),
            "single_select" | "single" | "choice" => Ok(AnswerType::SingleSelect),
            "multi_select" | "multi" => Ok(AnswerType::MultiSelect),
            "text" | "string" => Ok(AnswerType::Text),
            "number" => Ok(AnswerType::Number),
            "upload" | "file" => Ok(AnswerType::Upload),
            "multi_field" | "fields" => Ok(AnswerType::MultiField),
            _ => Err(format!("unknown answer type '{}'", value)),
        }
    }
}

/// One labelled input of a multi-field question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MultiField {
    pub id: String,
    pub label: String,
}

impl MultiField {
    /// Field appended as the `ordinal`-th input of `question_id`.
    pub fn numbered(question_id: &str, ordinal: usize) -> Self {
        Self {
            id: format!("{}-field-{}", question_id, ordinal),
            label: format!("Field {}", ordinal),
        }
    }
}

/// Answer type together with the payload that type owns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerKind {
    #[default]
    Boolean,
    SingleSelect {
        options: Vec<String>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    Text,
    Number,
    Upload,
    MultiField {
        fields: Vec<MultiField>,
    },
}

impl AnswerKind {
    /// Builds a kind from the flat document layout, dropping payloads the tag does not own.
    pub fn from_parts(answer_type: AnswerType, options: Vec<String>, fields: Vec<MultiField>) -> Self {
        match answer_type {
            AnswerType::Boolean => AnswerKind::Boolean,
            AnswerType::SingleSelect => AnswerKind::SingleSelect { options },
            AnswerType::MultiSelect => AnswerKind::MultiSelect { options },
            AnswerType::Text => AnswerKind::Text,
            AnswerType::Number => AnswerKind::Number,
            AnswerType::Upload => AnswerKind::Upload,
            AnswerType::MultiField => AnswerKind::MultiField { fields },
        }
    }

    pub fn answer_type(&self) -> AnswerType {
        match self {
            AnswerKind::Boolean => AnswerType::Boolean,
            AnswerKind::SingleSelect { .. } => AnswerType::SingleSelect,
            AnswerKind::MultiSelect { .. } => AnswerType::MultiSelect,
            AnswerKind::Text => AnswerType::Text,
            AnswerKind::Number => AnswerType::Number,
            AnswerKind::Upload => AnswerType::Upload,
            AnswerKind::MultiField { .. } => AnswerType::MultiField,
        }
    }

    /// Option list of a select kind; empty for every other kind.
    pub fn options(&self) -> &[String] {
        match self {
            AnswerKind::SingleSelect { options } | AnswerKind::MultiSelect { options } => options,
            _ => &[],
        }
    }

    /// Field list of a multi-field kind; empty for every other kind.
    pub fn fields(&self) -> &[MultiField] {
        match self {
            AnswerKind::MultiField { fields } => fields,
            _ => &[],
        }
    }

    pub(crate) fn fields_mut(&mut self) -> Option<&mut Vec<MultiField>> {
        match self {
            AnswerKind::MultiField { fields } => Some(fields),
            _ => None,
        }
    }

    /// Switches to `answer_type`, taking new payloads when given and carrying compatible ones over otherwise.
    ///
    /// Options survive a switch between the two select kinds; fields survive only when the kind was
    /// already multi-field. Payloads the target kind does not own are discarded.
    pub fn reshape(
        &self,
        answer_type: AnswerType,
        options: Option<Vec<String>>,
        fields: Option<Vec<MultiField>>,
    ) -> Self {
        let options = options.unwrap_or_else(|| self.options().to_vec());
        let fields = fields.unwrap_or_else(|| self.fields().to_vec());
        Self::from_parts(answer_type, options, fields)
    }
}
