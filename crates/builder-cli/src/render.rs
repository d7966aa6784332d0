use std::fmt::Write;

use form_schema::{FormSchema, Question, Route};

/// Indented outline of the whole schema, one line per entity.
pub fn render_tree(schema: &FormSchema) -> String {
    if schema.is_empty() {
        return "No categories available.\n".into();
    }

    let mut out = String::new();
    for category in &schema.categories {
        line(&mut out, 0, &format!("{} [{}]", category.name, category.id));
        if category.sections.is_empty() {
            line(&mut out, 1, &format!("No sections found in {}.", category.name));
        }
        for section in &category.sections {
            line(&mut out, 1, &format!("{} [{}]", section.name, section.id));
            if section.subsections.is_empty() {
                line(&mut out, 2, "No subsections yet.");
            }
            for subsection in &section.subsections {
                let mut header = format!("{} [{}]", subsection.name, subsection.id);
                if let Some(heading) = subsection
                    .starting_heading
                    .as_deref()
                    .filter(|heading| !heading.is_empty())
                {
                    write!(header, " \"{}\"", heading).expect("writing to string cannot fail");
                }
                line(&mut out, 2, &header);
                for question in &subsection.questions {
                    line(&mut out, 3, &describe_question(question));
                }
            }
        }
    }
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    writeln!(out, "{}{}", "  ".repeat(depth), text).expect("writing to string cannot fail");
}

fn describe_question(question: &Question) -> String {
    let marker = if question.is_starting_question { "*" } else { "-" };
    let mut entry = format!(
        "{} {} [{}] ({})",
        marker,
        question.name,
        question.id,
        question.answer_type()
    );
    if !question.answer.fields().is_empty() {
        let labels: Vec<_> = question
            .answer
            .fields()
            .iter()
            .map(|field| field.label.as_str())
            .collect();
        write!(entry, " fields: {}", labels.join(", ")).expect("writing to string cannot fail");
    }
    if !question.routes.is_empty() {
        let routes: Vec<_> = question.routes.iter().map(describe_route).collect();
        write!(entry, ": {}", routes.join(", ")).expect("writing to string cannot fail");
    }
    entry
}

fn describe_route(route: &Route) -> String {
    format!(
        "{} -> {}",
        route.answer_value,
        route.next_question_id.as_deref().unwrap_or("End")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schema_has_placeholder() {
        assert_eq!(
            render_tree(&FormSchema::default()),
            "No categories available.\n"
        );
    }

    #[test]
    fn tree_lists_routes() {
        let mut schema = FormSchema::with_categories(1);
        schema.categories[0].sections[0].subsections[0].starting_heading = Some("Hello".into());
        let tree = render_tree(&schema);
        assert!(tree.starts_with("Category 1 [category-1]\n"));
        assert!(tree.contains("    Subsection 1 [category-1-section-1-subsection-1] \"Hello\"\n"));
        assert!(tree.contains(
            "      * Question 1 [category-1-section-1-subsection-1-question-1] (boolean): Yes -> End, No -> End"
        ));
    }
}
