use std::collections::HashSet;

use crate::schema::{AnswerKind, Route};

pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const NEXT: &str = "Next";

/// Answer values a question of this kind can route on, in display order.
///
/// Select options are trimmed; blank and repeated options do not produce a value.
pub fn admissible_answer_values(answer: &AnswerKind) -> Vec<String> {
    match answer {
        AnswerKind::Boolean => vec![YES.to_string(), NO.to_string()],
        AnswerKind::SingleSelect { options } | AnswerKind::MultiSelect { options } => {
            let mut seen = HashSet::new();
            options
                .iter()
                .map(|option| option.trim())
                .filter(|option| !option.is_empty() && seen.insert(*option))
                .map(str::to_string)
                .collect()
        }
        _ => vec![NEXT.to_string()],
    }
}

/// One route per answer value, keeping targets of values that were already routed.
pub fn reconcile_routes(existing: &[Route], answer_values: &[String]) -> Vec<Route> {
    answer_values
        .iter()
        .map(|value| Route {
            answer_value: value.clone(),
            next_question_id: existing
                .iter()
                .find(|route| route.answer_value == *value)
                .and_then(|route| route.next_question_id.clone()),
        })
        .collect()
}

/// Replaces the target of `answer_value`, appending a route when the value is not routed yet.
pub fn upsert_route(routes: &mut Vec<Route>, answer_value: &str, next_question_id: Option<String>) {
    match routes
        .iter_mut()
        .find(|route| route.answer_value == answer_value)
    {
        Some(route) => route.next_question_id = next_question_id,
        None => routes.push(Route {
            answer_value: answer_value.to_string(),
            next_question_id,
        }),
    }
}
