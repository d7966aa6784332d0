use std::fmt;

/// Parent chain locating one subsection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubsectionPath {
    pub category_id: String,
    pub section_id: String,
    pub subsection_id: String,
}

impl SubsectionPath {
    pub fn new(
        category_id: impl Into<String>,
        section_id: impl Into<String>,
        subsection_id: impl Into<String>,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            section_id: section_id.into(),
            subsection_id: subsection_id.into(),
        }
    }

    pub fn question(&self, question_id: impl Into<String>) -> QuestionPath {
        QuestionPath {
            subsection: self.clone(),
            question_id: question_id.into(),
        }
    }
}

impl fmt::Display for SubsectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.category_id, self.section_id, self.subsection_id
        )
    }
}

/// Parent chain locating one question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionPath {
    pub subsection: SubsectionPath,
    pub question_id: String,
}

impl fmt::Display for QuestionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subsection, self.question_id)
    }
}
