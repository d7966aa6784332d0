pub mod answer;
pub mod form;
pub mod path;
pub mod question;

pub use answer::{AnswerKind, AnswerType, MultiField};
pub use form::{
    Category, FormSchema, MAX_CATEGORIES, MIN_CATEGORIES, Section, Subsection,
    clamp_category_count,
};
pub use path::{QuestionPath, SubsectionPath};
pub use question::{Position, Question, QuestionPatch, Route};
