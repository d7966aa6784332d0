use serde::{Deserialize, Serialize};

use crate::schema::path::{QuestionPath, SubsectionPath};
use crate::schema::question::Question;

pub const MIN_CATEGORIES: usize = 1;
pub const MAX_CATEGORIES: usize = 10;

/// Clamps a requested category count into `MIN_CATEGORIES..=MAX_CATEGORIES`.
pub fn clamp_category_count(count: i64) -> usize {
    count.clamp(MIN_CATEGORIES as i64, MAX_CATEGORIES as i64) as usize
}

/// Root of the questionnaire hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_heading: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl FormSchema {
    /// Fresh schema with `count` seeded categories.
    pub fn with_categories(count: usize) -> Self {
        Self {
            categories: (1..=count).map(Category::seeded).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.id == category_id)
    }

    pub fn category_mut(&mut self, category_id: &str) -> Option<&mut Category> {
        self.categories
            .iter_mut()
            .find(|category| category.id == category_id)
    }

    pub fn section(&self, category_id: &str, section_id: &str) -> Option<&Section> {
        self.category(category_id)?
            .sections
            .iter()
            .find(|section| section.id == section_id)
    }

    pub fn section_mut(&mut self, category_id: &str, section_id: &str) -> Option<&mut Section> {
        self.category_mut(category_id)?
            .sections
            .iter_mut()
            .find(|section| section.id == section_id)
    }

    pub fn subsection(&self, path: &SubsectionPath) -> Option<&Subsection> {
        self.section(&path.category_id, &path.section_id)?
            .subsections
            .iter()
            .find(|subsection| subsection.id == path.subsection_id)
    }

    pub fn subsection_mut(&mut self, path: &SubsectionPath) -> Option<&mut Subsection> {
        self.section_mut(&path.category_id, &path.section_id)?
            .subsections
            .iter_mut()
            .find(|subsection| subsection.id == path.subsection_id)
    }

    pub fn question(&self, path: &QuestionPath) -> Option<&Question> {
        self.subsection(&path.subsection)?.question(&path.question_id)
    }

    pub fn question_mut(&mut self, path: &QuestionPath) -> Option<&mut Question> {
        self.subsection_mut(&path.subsection)?
            .questions
            .iter_mut()
            .find(|question| question.id == path.question_id)
    }
}

impl Category {
    /// The `ordinal`-th category of a fresh schema, seeded down to its first question.
    pub fn seeded(ordinal: usize) -> Self {
        let id = format!("category-{}", ordinal);
        let sections = vec![Section::seeded(&id, 1)];
        Self {
            id,
            name: format!("Category {}", ordinal),
            sections,
        }
    }
}

impl Section {
    /// Section without subsections, as appended by authors.
    pub fn empty(category_id: &str, ordinal: usize) -> Self {
        Self {
            id: format!("{}-section-{}", category_id, ordinal),
            name: format!("Section {}", ordinal),
            subsections: Vec::new(),
        }
    }

    pub fn seeded(category_id: &str, ordinal: usize) -> Self {
        let mut section = Self::empty(category_id, ordinal);
        section.subsections.push(Subsection::seeded(&section.id, 1));
        section
    }
}

impl Subsection {
    /// Subsection holding one starting boolean question.
    pub fn seeded(section_id: &str, ordinal: usize) -> Self {
        let id = format!("{}-subsection-{}", section_id, ordinal);
        let questions = vec![Question::seeded(&id)];
        Self {
            id,
            name: format!("Subsection {}", ordinal),
            starting_heading: None,
            questions,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }
}
