use std::{fs, io, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{
    AnswerType, Category, FormSchema, MultiField, Position, Question, Route, Section, Subsection,
};

/// File name offered for downloads.
pub const EXPORT_FILE_NAME: &str = "question-logic-builder.json";

/// Full export with every optional field materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportDocument {
    pub categories: Vec<ExportCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportCategory {
    pub id: String,
    pub name: String,
    pub sections: Vec<ExportSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportSection {
    pub id: String,
    pub name: String,
    pub subsections: Vec<ExportSubsection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportSubsection {
    pub id: String,
    pub name: String,
    pub starting_heading: String,
    pub questions: Vec<ExportQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuestion {
    pub id: String,
    pub name: String,
    pub description: String,
    pub shortform: String,
    pub is_starting_question: bool,
    pub answer_type: AnswerType,
    pub options: Vec<String>,
    pub fields: Vec<MultiField>,
    pub routes: Vec<Route>,
    pub position: Option<Position>,
}

/// Structure-only export: categories, sections and subsections by id and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineDocument {
    pub categories: Vec<OutlineCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineCategory {
    pub id: String,
    pub name: String,
    pub sections: Vec<OutlineSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineSection {
    pub id: String,
    pub name: String,
    pub subsections: Vec<OutlineSubsection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineSubsection {
    pub id: String,
    pub name: String,
}

pub fn export_document(schema: &FormSchema) -> ExportDocument {
    ExportDocument {
        categories: schema.categories.iter().map(export_category).collect(),
    }
}

fn export_category(category: &Category) -> ExportCategory {
    ExportCategory {
        id: category.id.clone(),
        name: category.name.clone(),
        sections: category.sections.iter().map(export_section).collect(),
    }
}

fn export_section(section: &Section) -> ExportSection {
    ExportSection {
        id: section.id.clone(),
        name: section.name.clone(),
        subsections: section.subsections.iter().map(export_subsection).collect(),
    }
}

fn export_subsection(subsection: &Subsection) -> ExportSubsection {
    ExportSubsection {
        id: subsection.id.clone(),
        name: subsection.name.clone(),
        starting_heading: subsection.starting_heading.clone().unwrap_or_default(),
        questions: subsection.questions.iter().map(export_question).collect(),
    }
}

fn export_question(question: &Question) -> ExportQuestion {
    ExportQuestion {
        id: question.id.clone(),
        name: question.name.clone(),
        description: question.description.clone().unwrap_or_default(),
        shortform: question.shortform.clone().unwrap_or_default(),
        is_starting_question: question.is_starting_question,
        answer_type: question.answer_type(),
        options: question.answer.options().to_vec(),
        fields: question.answer.fields().to_vec(),
        routes: question.routes.clone(),
        position: question.position,
    }
}

pub fn outline_document(schema: &FormSchema) -> OutlineDocument {
    OutlineDocument {
        categories: schema
            .categories
            .iter()
            .map(|category| OutlineCategory {
                id: category.id.clone(),
                name: category.name.clone(),
                sections: category
                    .sections
                    .iter()
                    .map(|section| OutlineSection {
                        id: section.id.clone(),
                        name: section.name.clone(),
                        subsections: section
                            .subsections
                            .iter()
                            .map(|subsection| OutlineSubsection {
                                id: subsection.id.clone(),
                                name: subsection.name.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// JSON Schema describing [`ExportDocument`].
pub fn export_json_schema() -> Value {
    schemars::schema_for!(ExportDocument).to_value()
}

/// Writes `value` as pretty JSON.
pub fn write_export(path: &Path, value: &impl Serialize) -> io::Result<()> {
    let contents = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, contents)
}
