use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::routing::upsert_route;
use crate::schema::{
    FormSchema, MultiField, Position, Question, QuestionPatch, QuestionPath, Section, Subsection,
    SubsectionPath, clamp_category_count,
};
use crate::storage::{KeyValueStore, load_schema, save_schema};

/// Handle returned by [`SchemaStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut()>;

/// Cheap read handle on the latest committed schema.
///
/// Subscribers capture one of these to re-read state when notified.
#[derive(Debug, Clone)]
pub struct SchemaReader {
    schema: Rc<RefCell<Arc<FormSchema>>>,
    hydrated: Rc<Cell<bool>>,
}

impl SchemaReader {
    pub fn snapshot(&self) -> Arc<FormSchema> {
        Arc::clone(&self.schema.borrow())
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated.get()
    }
}

/// Single-writer owner of the form schema.
///
/// Every successful mutation replaces the whole schema value, persists it, and then notifies
/// subscribers in registration order. Mutations whose parent chain does not resolve return
/// `false` and leave everything untouched.
pub struct SchemaStore {
    current: SchemaReader,
    initialized_count: Option<usize>,
    storage: Option<Box<dyn KeyValueStore>>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("categories", &self.snapshot().categories.len())
            .field("initialized_count", &self.initialized_count)
            .field("hydrated", &self.is_hydrated())
            .field("persistent", &self.storage.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SchemaStore {
    /// Store holding an empty schema; call [`SchemaStore::hydrate`] before the first read.
    pub fn new(storage: Option<Box<dyn KeyValueStore>>) -> Self {
        Self {
            current: SchemaReader {
                schema: Rc::new(RefCell::new(Arc::new(FormSchema::default()))),
                hydrated: Rc::new(Cell::new(false)),
            },
            initialized_count: None,
            storage,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Store that has already attempted hydration.
    pub fn open(storage: Option<Box<dyn KeyValueStore>>) -> Self {
        let mut store = Self::new(storage);
        store.hydrate();
        store
    }

    /// In-memory store that never persists.
    pub fn ephemeral() -> Self {
        Self::open(None)
    }

    pub fn snapshot(&self) -> Arc<FormSchema> {
        self.current.snapshot()
    }

    pub fn reader(&self) -> SchemaReader {
        self.current.clone()
    }

    pub fn is_hydrated(&self) -> bool {
        self.current.is_hydrated()
    }

    pub fn initialized_count(&self) -> Option<usize> {
        self.initialized_count
    }

    /// Loads the persisted schema once. Missing, malformed, or misshapen state leaves the empty schema.
    ///
    /// Subscribers are notified only when a schema was loaded.
    pub fn hydrate(&mut self) {
        if self.current.hydrated.get() {
            return;
        }
        self.current.hydrated.set(true);

        let loaded = match self.storage.as_deref() {
            Some(storage) => load_schema(storage),
            None => {
                debug!("no storage configured; starting from an empty schema");
                Ok(None)
            }
        };
        match loaded {
            Ok(Some(schema)) => {
                info!(
                    categories = schema.categories.len(),
                    "hydrated schema from storage"
                );
                self.replace(schema);
                self.notify();
            }
            Ok(None) => debug!("no persisted schema found"),
            Err(error) => warn!(%error, "ignoring persisted schema"),
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Drops every subscriber. State is already persisted after each commit.
    pub fn teardown(&mut self) {
        debug!(subscribers = self.subscribers.len(), "tearing down schema store");
        self.subscribers.clear();
    }

    /// Builds the schema for `category_count` categories, clamped to the supported range.
    ///
    /// A non-empty schema that was never initialized (for example one just hydrated from
    /// storage) is adopted as-is. Re-initializing with the current count is a no-op.
    pub fn initialize(&mut self, category_count: i64) -> bool {
        let count = clamp_category_count(category_count);
        let current = self.snapshot();

        if !current.is_empty() && self.initialized_count.is_none() {
            self.initialized_count = Some(current.categories.len());
            self.commit("initialize", current);
            return true;
        }
        if self.initialized_count == Some(count) && !current.is_empty() {
            return false;
        }
        self.reset(category_count);
        true
    }

    /// Discards the current schema and builds a fresh one.
    pub fn reset(&mut self, category_count: i64) {
        let count = clamp_category_count(category_count);
        self.initialized_count = Some(count);
        self.commit("reset", Arc::new(FormSchema::with_categories(count)));
    }

    pub fn set_category_name(&mut self, category_id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        self.mutate("set_category_name", |schema| {
            schema
                .category_mut(category_id)
                .map(|category| category.name = name)
                .is_some()
        })
    }

    pub fn add_section(&mut self, category_id: &str) -> bool {
        self.mutate("add_section", |schema| {
            let Some(category) = schema.category_mut(category_id) else {
                return false;
            };
            let section = Section::empty(&category.id, category.sections.len() + 1);
            category.sections.push(section);
            true
        })
    }

    pub fn delete_section(&mut self, category_id: &str, section_id: &str) -> bool {
        self.mutate("delete_section", |schema| {
            schema
                .category_mut(category_id)
                .is_some_and(|category| remove_by(&mut category.sections, |s| s.id == section_id))
        })
    }

    pub fn set_section_name(
        &mut self,
        category_id: &str,
        section_id: &str,
        name: impl Into<String>,
    ) -> bool {
        let name = name.into();
        self.mutate("set_section_name", |schema| {
            schema
                .section_mut(category_id, section_id)
                .map(|section| section.name = name)
                .is_some()
        })
    }

    pub fn add_subsection(&mut self, category_id: &str, section_id: &str) -> bool {
        self.mutate("add_subsection", |schema| {
            let Some(section) = schema.section_mut(category_id, section_id) else {
                return false;
            };
            let subsection = Subsection::seeded(&section.id, section.subsections.len() + 1);
            section.subsections.push(subsection);
            true
        })
    }

    pub fn delete_subsection(&mut self, path: &SubsectionPath) -> bool {
        self.mutate("delete_subsection", |schema| {
            schema
                .section_mut(&path.category_id, &path.section_id)
                .is_some_and(|section| {
                    remove_by(&mut section.subsections, |s| s.id == path.subsection_id)
                })
        })
    }

    pub fn set_subsection_name(&mut self, path: &SubsectionPath, name: impl Into<String>) -> bool {
        let name = name.into();
        self.mutate("set_subsection_name", |schema| {
            schema
                .subsection_mut(path)
                .map(|subsection| subsection.name = name)
                .is_some()
        })
    }

    pub fn set_subsection_starting_heading(
        &mut self,
        path: &SubsectionPath,
        heading: impl Into<String>,
    ) -> bool {
        let heading = heading.into();
        self.mutate("set_subsection_starting_heading", |schema| {
            schema
                .subsection_mut(path)
                .map(|subsection| subsection.starting_heading = Some(heading))
                .is_some()
        })
    }

    pub fn add_question(&mut self, path: &SubsectionPath) -> bool {
        self.mutate("add_question", |schema| {
            let Some(subsection) = schema.subsection_mut(path) else {
                return false;
            };
            let question = Question::appended(&subsection.id, subsection.questions.len() + 1);
            subsection.questions.push(question);
            true
        })
    }

    /// Removes the question. Routes elsewhere that targeted it keep the dangling id.
    pub fn delete_question(&mut self, path: &QuestionPath) -> bool {
        self.mutate("delete_question", |schema| {
            schema.subsection_mut(&path.subsection).is_some_and(|subsection| {
                remove_by(&mut subsection.questions, |q| q.id == path.question_id)
            })
        })
    }

    pub fn update_question(&mut self, path: &QuestionPath, patch: QuestionPatch) -> bool {
        self.mutate("update_question", |schema| {
            schema
                .question_mut(path)
                .map(|question| question.apply_patch(patch))
                .is_some()
        })
    }

    /// Non-finite coordinates are rejected; JSON cannot carry them.
    pub fn set_question_position(&mut self, path: &QuestionPath, position: Position) -> bool {
        if !position.is_finite() {
            debug!(?position, "rejecting non-finite question position");
            return false;
        }
        self.mutate("set_question_position", |schema| {
            schema
                .question_mut(path)
                .map(|question| question.position = Some(position))
                .is_some()
        })
    }

    /// Points `answer_value` at `next_question_id` (`None` ends the questionnaire).
    ///
    /// The answer value is not checked against the question's answer type.
    pub fn set_question_route(
        &mut self,
        path: &QuestionPath,
        answer_value: &str,
        next_question_id: Option<String>,
    ) -> bool {
        self.mutate("set_question_route", |schema| {
            schema
                .question_mut(path)
                .map(|question| upsert_route(&mut question.routes, answer_value, next_question_id))
                .is_some()
        })
    }

    pub fn add_multi_field(&mut self, path: &QuestionPath) -> bool {
        self.mutate("add_multi_field", |schema| {
            let Some(question) = schema.question_mut(path) else {
                return false;
            };
            let question_id = question.id.clone();
            let Some(fields) = question.answer.fields_mut() else {
                return false;
            };
            fields.push(MultiField::numbered(&question_id, fields.len() + 1));
            true
        })
    }

    pub fn set_multi_field_label(
        &mut self,
        path: &QuestionPath,
        field_id: &str,
        label: impl Into<String>,
    ) -> bool {
        let label = label.into();
        self.mutate("set_multi_field_label", |schema| {
            schema
                .question_mut(path)
                .and_then(|question| question.answer.fields_mut())
                .and_then(|fields| fields.iter_mut().find(|field| field.id == field_id))
                .map(|field| field.label = label)
                .is_some()
        })
    }

    pub fn remove_multi_field(&mut self, path: &QuestionPath, field_id: &str) -> bool {
        self.mutate("remove_multi_field", |schema| {
            schema
                .question_mut(path)
                .and_then(|question| question.answer.fields_mut())
                .is_some_and(|fields| remove_by(fields, |field| field.id == field_id))
        })
    }

    fn mutate(&mut self, operation: &'static str, edit: impl FnOnce(&mut FormSchema) -> bool) -> bool {
        let mut next = FormSchema::clone(&self.snapshot());
        if !edit(&mut next) {
            debug!(operation, "target not found; schema unchanged");
            return false;
        }
        self.commit(operation, Arc::new(next));
        true
    }

    fn commit(&mut self, operation: &'static str, next: Arc<FormSchema>) {
        *self.current.schema.borrow_mut() = Arc::clone(&next);
        if let Some(storage) = self.storage.as_deref_mut()
            && let Err(error) = save_schema(storage, &next)
        {
            warn!(operation, %error, "persisting schema failed; keeping in-memory state");
        }
        debug!(
            operation,
            categories = next.categories.len(),
            "committed schema"
        );
        self.notify();
    }

    fn replace(&mut self, schema: FormSchema) {
        *self.current.schema.borrow_mut() = Arc::new(schema);
    }

    fn notify(&mut self) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber();
        }
    }
}

fn remove_by<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !matches(item));
    items.len() != before
}
