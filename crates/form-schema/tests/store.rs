use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use form_schema::{
    AnswerKind, AnswerType, FormSchema, KeyValueStore, MemoryStore, MultiField, Position,
    QuestionPatch, Route, STORAGE_KEY, SchemaStore, StorageError, SubsectionPath,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "routing_subsection" => include_str!("../tests/fixtures/routing_subsection.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn first_subsection(category: usize) -> SubsectionPath {
    let category_id = format!("category-{}", category);
    let section_id = format!("{}-section-1", category_id);
    let subsection_id = format!("{}-subsection-1", section_id);
    SubsectionPath::new(category_id, section_id, subsection_id)
}

fn persistent_store() -> (SchemaStore, MemoryStore) {
    let slots = MemoryStore::new();
    let store = SchemaStore::open(Some(Box::new(slots.clone())));
    (store, slots)
}

fn notification_counter(store: &mut SchemaStore) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let seen = Rc::clone(&count);
    store.subscribe(move || seen.set(seen.get() + 1));
    count
}

fn routed(value: &str, target: Option<&str>) -> Route {
    Route {
        answer_value: value.into(),
        next_question_id: target.map(str::to_string),
    }
}

struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk detached".into()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("quota exceeded".into()))
    }
}

#[test]
fn initialize_seeds_every_category() {
    for count in 1..=10 {
        let mut store = SchemaStore::ephemeral();
        assert!(store.initialize(count));
        let schema = store.snapshot();
        assert_eq!(schema.categories.len(), count as usize);

        for category in &schema.categories {
            assert_eq!(category.sections.len(), 1);
            let section = &category.sections[0];
            assert_eq!(section.name, "Section 1");
            assert_eq!(section.subsections.len(), 1);
            let subsection = &section.subsections[0];
            assert_eq!(subsection.questions.len(), 1);
            let question = &subsection.questions[0];
            assert!(question.is_starting_question);
            assert_eq!(question.answer, AnswerKind::Boolean);
            assert_eq!(
                question.routes,
                vec![routed("Yes", None), routed("No", None)]
            );
        }
    }
}

#[test]
fn initialize_clamps_requested_count() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(0);
    assert_eq!(store.snapshot().categories.len(), 1);

    let mut store = SchemaStore::ephemeral();
    store.initialize(25);
    assert_eq!(store.snapshot().categories.len(), 10);
    assert_eq!(store.initialized_count(), Some(10));
}

#[test]
fn initialize_with_same_count_is_a_no_op() {
    let (mut store, _slots) = persistent_store();
    store.initialize(3);
    store.set_category_name("category-2", "Renamed");
    let before = store.snapshot();
    let notified = notification_counter(&mut store);

    assert!(!store.initialize(3));
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert_eq!(store.snapshot().categories[1].name, "Renamed");
    assert_eq!(notified.get(), 0);
}

#[test]
fn initialize_with_new_count_rebuilds() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(2);
    store.add_section("category-1");

    assert!(store.initialize(4));
    let schema = store.snapshot();
    assert_eq!(schema.categories.len(), 4);
    assert_eq!(schema.categories[0].sections.len(), 1);
}

#[test]
fn initialize_adopts_hydrated_schema() {
    let slots = MemoryStore::new();
    slots.insert_raw(STORAGE_KEY, fixture("routing_subsection"));
    let mut store = SchemaStore::open(Some(Box::new(slots.clone())));
    let hydrated = store.snapshot();
    assert_eq!(hydrated.categories[0].name, "Intake");
    assert_eq!(store.initialized_count(), None);

    assert!(store.initialize(5));
    assert_eq!(*store.snapshot(), *hydrated);
    assert_eq!(store.initialized_count(), Some(1));

    // Adopted count now matches, so asking for it again changes nothing.
    assert!(!store.initialize(1));
}

#[test]
fn add_section_only_touches_target_category() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(2);
    let untouched = store.snapshot().categories[1].clone();

    assert!(store.add_section("category-1"));
    let schema = store.snapshot();
    let names: Vec<_> = schema.categories[0]
        .sections
        .iter()
        .map(|section| section.name.as_str())
        .collect();
    assert_eq!(names, ["Section 1", "Section 2"]);
    assert_eq!(schema.categories[0].sections[1].id, "category-1-section-2");
    assert!(schema.categories[0].sections[1].subsections.is_empty());
    assert_eq!(schema.categories[1], untouched);
}

#[test]
fn add_subsection_seeds_starting_question() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    assert!(store.add_subsection("category-1", "category-1-section-1"));

    let schema = store.snapshot();
    let subsection = &schema.categories[0].sections[0].subsections[1];
    assert_eq!(subsection.id, "category-1-section-1-subsection-2");
    assert_eq!(subsection.name, "Subsection 2");
    assert_eq!(
        subsection.questions[0].id,
        "category-1-section-1-subsection-2-question-1"
    );
    assert!(subsection.questions[0].is_starting_question);
}

#[test]
fn add_question_appends_below_previous() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    assert!(store.add_question(&path));
    assert!(store.add_question(&path));

    let schema = store.snapshot();
    let questions = &schema.subsection(&path).expect("subsection").questions;
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[2].name, "Question 3");
    assert_eq!(questions[2].id, format!("{}-question-3", path.subsection_id));
    assert_eq!(questions[2].position, Some(Position::new(40.0, 220.0)));
    assert!(!questions[2].is_starting_question);
    assert_eq!(
        questions[2].routes,
        vec![routed("Yes", None), routed("No", None)]
    );
}

#[test]
fn answer_type_change_recomputes_routes() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    store.add_question(&path);
    let question = path.question(format!("{}-question-1", path.subsection_id));
    let target = format!("{}-question-2", path.subsection_id);
    store.set_question_route(&question, "Yes", Some(target.clone()));

    assert!(store.update_question(
        &question,
        QuestionPatch {
            answer_type: Some(AnswerType::SingleSelect),
            options: Some(vec!["A".into(), "B".into()]),
            ..QuestionPatch::default()
        }
    ));
    let routes = store.snapshot().question(&question).expect("question").routes.clone();
    assert_eq!(routes, vec![routed("A", None), routed("B", None)]);

    store.set_question_route(&question, "A", Some(target));
    store.update_question(
        &question,
        QuestionPatch {
            answer_type: Some(AnswerType::Boolean),
            ..QuestionPatch::default()
        },
    );
    let schema = store.snapshot();
    let updated = schema.question(&question).expect("question");
    assert_eq!(updated.answer, AnswerKind::Boolean);
    assert_eq!(
        updated.routes,
        vec![routed("Yes", None), routed("No", None)]
    );
}

#[test]
fn option_edits_keep_surviving_targets() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    let question = path.question(format!("{}-question-1", path.subsection_id));
    store.update_question(
        &question,
        QuestionPatch {
            answer_type: Some(AnswerType::MultiSelect),
            options: Some(vec!["Red".into(), "Blue".into()]),
            ..QuestionPatch::default()
        },
    );
    store.set_question_route(&question, "Blue", Some("elsewhere".into()));

    store.update_question(
        &question,
        QuestionPatch {
            options: Some(vec![" Blue ".into(), "Green".into(), "".into()]),
            name: Some("Favourite colour".into()),
            ..QuestionPatch::default()
        },
    );
    let schema = store.snapshot();
    let updated = schema.question(&question).expect("question");
    assert_eq!(updated.name, "Favourite colour");
    assert_eq!(
        updated.routes,
        vec![routed("Blue", Some("elsewhere")), routed("Green", None)]
    );
}

#[test]
fn free_form_types_route_on_next() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    let question = path.question(format!("{}-question-1", path.subsection_id));
    store.update_question(
        &question,
        QuestionPatch {
            answer_type: Some(AnswerType::Number),
            description: Some("Whole years".into()),
            ..QuestionPatch::default()
        },
    );
    let schema = store.snapshot();
    let updated = schema.question(&question).expect("question");
    assert_eq!(updated.routes, vec![routed("Next", None)]);
    assert_eq!(updated.description.as_deref(), Some("Whole years"));
}

#[test]
fn set_route_updates_only_that_answer() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    let question = path.question(format!("{}-question-1", path.subsection_id));
    store.set_question_route(&question, "No", Some("q-no".into()));

    assert!(store.set_question_route(&question, "Yes", Some("q-yes".into())));
    let schema = store.snapshot();
    assert_eq!(
        schema.question(&question).expect("question").routes,
        vec![routed("Yes", Some("q-yes")), routed("No", Some("q-no"))]
    );

    assert!(store.set_question_route(&question, "Maybe", None));
    let schema = store.snapshot();
    assert_eq!(
        schema.question(&question).expect("question").routes,
        vec![
            routed("Yes", Some("q-yes")),
            routed("No", Some("q-no")),
            routed("Maybe", None)
        ]
    );
}

#[test]
fn delete_subsection_keeps_siblings_and_dangling_routes() {
    let slots = MemoryStore::new();
    slots.insert_raw(STORAGE_KEY, fixture("routing_subsection"));
    let mut store = SchemaStore::open(Some(Box::new(slots)));
    let sibling_before = store.snapshot().categories[0].sections[0].subsections[1].clone();

    assert!(store.delete_subsection(&SubsectionPath::new(
        "category-1",
        "category-1-section-1",
        "category-1-section-1-subsection-1",
    )));

    let schema = store.snapshot();
    let subsections = &schema.categories[0].sections[0].subsections;
    assert_eq!(subsections.len(), 1);
    assert_eq!(subsections[0], sibling_before);
    assert_eq!(
        subsections[0].questions[0].routes[0].next_question_id.as_deref(),
        Some("category-1-section-1-subsection-1-question-2")
    );
}

#[test]
fn deletes_remove_only_the_target() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    store.add_section("category-1");
    store.add_section("category-1");
    assert!(store.delete_section("category-1", "category-1-section-2"));
    let ids: Vec<_> = store.snapshot().categories[0]
        .sections
        .iter()
        .map(|section| section.id.clone())
        .collect();
    assert_eq!(ids, ["category-1-section-1", "category-1-section-3"]);

    let path = first_subsection(1);
    store.add_question(&path);
    assert!(store.delete_question(&path.question(format!("{}-question-1", path.subsection_id))));
    let schema = store.snapshot();
    let questions = &schema.subsection(&path).expect("subsection").questions;
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].name, "Question 2");
}

#[test]
fn unresolved_ids_leave_everything_untouched() {
    let (mut store, slots) = persistent_store();
    store.initialize(1);
    let persisted = slots.raw(STORAGE_KEY);
    let before = store.snapshot();
    let notified = notification_counter(&mut store);

    let path = first_subsection(1);
    let missing_question = path.question("nope");
    let missing_subsection = SubsectionPath::new("category-1", "category-1-section-1", "nope");

    assert!(!store.set_category_name("category-9", "x"));
    assert!(!store.add_section("category-9"));
    assert!(!store.delete_section("category-1", "nope"));
    assert!(!store.set_section_name("category-1", "nope", "x"));
    assert!(!store.add_subsection("category-1", "nope"));
    assert!(!store.delete_subsection(&missing_subsection));
    assert!(!store.set_subsection_name(&missing_subsection, "x"));
    assert!(!store.set_subsection_starting_heading(&missing_subsection, "x"));
    assert!(!store.add_question(&missing_subsection));
    assert!(!store.delete_question(&missing_question));
    assert!(!store.update_question(&missing_question, QuestionPatch::default()));
    assert!(!store.set_question_position(&missing_question, Position::new(1.0, 1.0)));
    assert!(!store.set_question_route(&missing_question, "Yes", None));
    assert!(!store.add_multi_field(&missing_question));

    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert_eq!(slots.raw(STORAGE_KEY), persisted);
    assert_eq!(notified.get(), 0);
}

#[test]
fn multi_field_operations() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    let question = path.question(format!("{}-question-1", path.subsection_id));

    assert!(!store.add_multi_field(&question));

    store.update_question(
        &question,
        QuestionPatch {
            answer_type: Some(AnswerType::MultiField),
            ..QuestionPatch::default()
        },
    );
    assert!(store.add_multi_field(&question));
    assert!(store.add_multi_field(&question));
    let first_field = format!("{}-field-1", question.question_id);
    let second_field = format!("{}-field-2", question.question_id);
    assert!(store.set_multi_field_label(&question, &second_field, "Postcode"));
    assert!(!store.set_multi_field_label(&question, "missing", "x"));
    assert!(store.remove_multi_field(&question, &first_field));
    assert!(!store.remove_multi_field(&question, &first_field));

    let schema = store.snapshot();
    let updated = schema.question(&question).expect("question");
    assert_eq!(
        updated.answer.fields(),
        [MultiField {
            id: second_field,
            label: "Postcode".into()
        }]
    );
    assert_eq!(updated.routes, vec![routed("Next", None)]);
}

#[test]
fn renames_and_layout_updates() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let path = first_subsection(1);
    let question = path.question(format!("{}-question-1", path.subsection_id));

    assert!(store.set_section_name("category-1", "category-1-section-1", "Basics"));
    assert!(store.set_subsection_name(&path, "Identity"));
    assert!(store.set_subsection_starting_heading(&path, "Who are you?"));
    assert!(store.set_question_position(&question, Position::new(300.0, 12.5)));

    let schema = store.snapshot();
    let subsection = schema.subsection(&path).expect("subsection");
    assert_eq!(schema.categories[0].sections[0].name, "Basics");
    assert_eq!(subsection.name, "Identity");
    assert_eq!(subsection.starting_heading.as_deref(), Some("Who are you?"));
    assert_eq!(
        subsection.questions[0].position,
        Some(Position::new(300.0, 12.5))
    );
}

#[test]
fn persisted_schema_rehydrates_equal() {
    let (mut store, slots) = persistent_store();
    store.initialize(2);
    let path = first_subsection(2);
    store.add_question(&path);
    let question = path.question(format!("{}-question-2", path.subsection_id));
    store.update_question(
        &question,
        QuestionPatch {
            answer_type: Some(AnswerType::MultiField),
            shortform: Some("contact".into()),
            ..QuestionPatch::default()
        },
    );
    store.add_multi_field(&question);
    store.set_question_route(
        &path.question(format!("{}-question-1", path.subsection_id)),
        "Yes",
        Some(question.question_id.clone()),
    );
    store.add_subsection("category-1", "category-1-section-1");
    store.set_subsection_starting_heading(&first_subsection(1), "Start here");

    let fresh = SchemaStore::open(Some(Box::new(slots)));
    assert_eq!(*fresh.snapshot(), *store.snapshot());
}

#[test]
fn dragged_positions_rehydrate_exactly() {
    let (mut store, slots) = persistent_store();
    store.initialize(1);
    let path = first_subsection(1);
    store.add_question(&path);
    let positions = [
        Position::new(231.65114052975866, 924.2944458879899),
        Position::new(0.1 + 0.2, -17.000000000000004),
    ];
    for (ordinal, position) in positions.into_iter().enumerate() {
        let question = path.question(format!("{}-question-{}", path.subsection_id, ordinal + 1));
        assert!(store.set_question_position(&question, position));
    }

    let fresh = SchemaStore::open(Some(Box::new(slots)));
    let schema = fresh.snapshot();
    let stored: Vec<_> = schema
        .subsection(&path)
        .expect("subsection")
        .questions
        .iter()
        .map(|question| question.position)
        .collect();
    assert_eq!(stored, positions.map(Some));
    assert_eq!(*schema, *store.snapshot());
}

#[test]
fn non_finite_positions_are_rejected() {
    let (mut store, slots) = persistent_store();
    store.initialize(3);
    let question = first_subsection(1).question("category-1-section-1-subsection-1-question-1");
    let notified = notification_counter(&mut store);
    let before = store.snapshot();

    for position in [
        Position::new(f64::NAN, 10.0),
        Position::new(10.0, f64::INFINITY),
        Position::new(f64::NEG_INFINITY, f64::NAN),
    ] {
        assert!(!store.set_question_position(&question, position));
    }
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert_eq!(notified.get(), 0);

    let fresh = SchemaStore::open(Some(Box::new(slots)));
    assert_eq!(fresh.snapshot().categories.len(), 3);
    assert_eq!(*fresh.snapshot(), *before);
}

#[test]
fn malformed_or_misshapen_state_falls_back_to_empty() {
    for raw in ["{broken", "{\"sections\": []}", "[]", "{\"categories\": 3}"] {
        let slots = MemoryStore::new();
        slots.insert_raw(STORAGE_KEY, raw);
        let store = SchemaStore::open(Some(Box::new(slots)));
        assert!(store.is_hydrated());
        assert_eq!(*store.snapshot(), FormSchema::default());
    }
}

#[test]
fn hydration_happens_once_and_is_observable() {
    let slots = MemoryStore::new();
    slots.insert_raw(STORAGE_KEY, fixture("routing_subsection"));
    let mut store = SchemaStore::new(Some(Box::new(slots.clone())));
    let reader = store.reader();
    assert!(!reader.is_hydrated());
    assert!(store.snapshot().is_empty());

    let notified = notification_counter(&mut store);
    store.hydrate();
    assert!(reader.is_hydrated());
    assert_eq!(reader.snapshot().categories[0].name, "Intake");
    assert_eq!(notified.get(), 1);

    slots.insert_raw(STORAGE_KEY, "{\"categories\": []}");
    store.hydrate();
    assert_eq!(notified.get(), 1);
    assert_eq!(store.snapshot().categories.len(), 1);
}

#[test]
fn hydration_without_saved_state_stays_quiet() {
    for slots in [MemoryStore::new(), {
        let broken = MemoryStore::new();
        broken.insert_raw(STORAGE_KEY, "{broken");
        broken
    }] {
        let mut store = SchemaStore::new(Some(Box::new(slots)));
        let notified = notification_counter(&mut store);
        store.hydrate();
        assert!(store.is_hydrated());
        assert_eq!(notified.get(), 0);
    }

    let mut store = SchemaStore::new(None);
    let notified = notification_counter(&mut store);
    store.hydrate();
    assert!(store.is_hydrated());
    assert_eq!(notified.get(), 0);
}

#[test]
fn storage_failures_are_swallowed() {
    let mut store = SchemaStore::open(Some(Box::new(FailingStore)));
    assert!(store.is_hydrated());
    assert!(store.snapshot().is_empty());

    assert!(store.initialize(2));
    assert!(store.add_section("category-2"));
    assert_eq!(store.snapshot().categories[1].sections.len(), 2);
}

#[test]
fn subscribers_run_in_order_and_see_latest_state() {
    let mut store = SchemaStore::ephemeral();
    let log = Rc::new(RefCell::new(Vec::new()));

    let first_log = Rc::clone(&log);
    let reader = store.reader();
    let first = store.subscribe(move || {
        let categories = reader.snapshot().categories.len();
        first_log.borrow_mut().push(format!("first:{}", categories));
    });
    let second_log = Rc::clone(&log);
    store.subscribe(move || second_log.borrow_mut().push("second".to_string()));

    store.initialize(3);
    assert_eq!(*log.borrow(), ["first:3", "second"]);

    assert!(store.unsubscribe(first));
    assert!(!store.unsubscribe(first));
    store.add_section("category-1");
    assert_eq!(*log.borrow(), ["first:3", "second", "second"]);

    store.teardown();
    store.add_section("category-1");
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn each_commit_persists_and_notifies_once() {
    let (mut store, slots) = persistent_store();
    let notified = notification_counter(&mut store);
    store.initialize(1);
    assert_eq!(notified.get(), 1);

    store.set_category_name("category-1", "Household");
    assert_eq!(notified.get(), 2);
    let persisted: serde_json::Value =
        serde_json::from_str(&slots.raw(STORAGE_KEY).expect("persisted")).expect("json");
    assert_eq!(persisted["categories"][0]["name"], "Household");
}

#[test]
fn snapshots_are_immutable() {
    let mut store = SchemaStore::ephemeral();
    store.initialize(1);
    let before = store.snapshot();
    store.set_category_name("category-1", "Changed");
    assert_eq!(before.categories[0].name, "Category 1");
    assert_eq!(store.snapshot().categories[0].name, "Changed");
}
