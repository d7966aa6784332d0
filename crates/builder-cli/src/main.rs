mod render;

use clap::{Args, Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use form_schema::{
    AnswerType, EXPORT_FILE_NAME, FileStore, NodeId, Position, QuestionPatch, QuestionPath,
    RoutingView, SchemaStore, SubsectionPath, export_document, export_json_schema,
    outline_document, write_export,
};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const STATE_DIR_ENV: &str = "QLB_STATE_DIR";
const FALLBACK_STATE_DIR: &str = ".question-logic-builder";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Question-logic form schema builder",
    long_about = "Authors categories, sections, subsections and routed questions, persisting the schema locally between runs"
)]
struct Cli {
    /// Directory holding the persisted schema (defaults to QLB_STATE_DIR or the platform data directory).
    #[arg(long, value_name = "DIR", global = true)]
    state_dir: Option<PathBuf>,
    /// Log store activity to stderr.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct SubsectionArgs {
    #[arg(long)]
    category: String,
    #[arg(long)]
    section: String,
    #[arg(long)]
    subsection: String,
}

impl SubsectionArgs {
    fn path(&self) -> SubsectionPath {
        SubsectionPath::new(&self.category, &self.section, &self.subsection)
    }
}

#[derive(Args, Clone)]
struct QuestionArgs {
    #[command(flatten)]
    subsection: SubsectionArgs,
    #[arg(long)]
    question: String,
}

impl QuestionArgs {
    fn path(&self) -> QuestionPath {
        self.subsection.path().question(&self.question)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GraphFormat {
    Json,
    Dot,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema from a category count (clamped to 1-10), or adopt the persisted one.
    Init {
        #[arg(long, allow_hyphen_values = true)]
        count: i64,
        /// Discard any persisted schema and start over.
        #[arg(long)]
        force: bool,
    },
    /// Print the schema as an indented outline.
    Show,
    /// Rename a category, or a section/subsection when their ids are given.
    Rename {
        #[arg(long)]
        category: String,
        #[arg(long)]
        section: Option<String>,
        #[arg(long, requires = "section")]
        subsection: Option<String>,
        #[arg(long)]
        name: String,
    },
    /// Set the heading shown before a subsection's first question.
    SetHeading {
        #[command(flatten)]
        target: SubsectionArgs,
        #[arg(long)]
        heading: String,
    },
    AddSection {
        #[arg(long)]
        category: String,
    },
    AddSubsection {
        #[arg(long)]
        category: String,
        #[arg(long)]
        section: String,
    },
    AddQuestion {
        #[command(flatten)]
        target: SubsectionArgs,
    },
    DeleteSection {
        #[arg(long)]
        category: String,
        #[arg(long)]
        section: String,
    },
    DeleteSubsection {
        #[command(flatten)]
        target: SubsectionArgs,
    },
    DeleteQuestion {
        #[command(flatten)]
        target: QuestionArgs,
    },
    /// Patch question fields; routes follow the resulting answer type and options.
    UpdateQuestion {
        #[command(flatten)]
        target: QuestionArgs,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        shortform: Option<String>,
        /// Mark (true) or unmark (false) the starting question.
        #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
        starting: Option<bool>,
        /// boolean, single_select, multi_select, text, number, upload or multi_field.
        #[arg(long, value_name = "TYPE")]
        answer_type: Option<AnswerType>,
        /// Comma-separated options for select types.
        #[arg(long, value_name = "LIST")]
        options: Option<String>,
    },
    /// Store the graph-layout position of a question.
    MoveQuestion {
        #[command(flatten)]
        target: QuestionArgs,
        #[arg(long, allow_hyphen_values = true, value_parser = parse_coordinate)]
        x: f64,
        #[arg(long, allow_hyphen_values = true, value_parser = parse_coordinate)]
        y: f64,
    },
    /// Route an answer value to another question, or to the end.
    SetRoute {
        #[command(flatten)]
        target: QuestionArgs,
        #[arg(long)]
        answer: String,
        #[arg(long, value_name = "QUESTION", conflicts_with = "end", required_unless_present = "end")]
        next: Option<String>,
        #[arg(long)]
        end: bool,
    },
    AddField {
        #[command(flatten)]
        target: QuestionArgs,
    },
    SetFieldLabel {
        #[command(flatten)]
        target: QuestionArgs,
        #[arg(long)]
        field: String,
        #[arg(long)]
        label: String,
    },
    RemoveField {
        #[command(flatten)]
        target: QuestionArgs,
        #[arg(long)]
        field: String,
    },
    /// Print the routing graph of a subsection.
    Graph {
        #[command(flatten)]
        target: SubsectionArgs,
        #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
        /// Position of the End node.
        #[arg(long, allow_hyphen_values = true, requires = "end_y", value_parser = parse_coordinate)]
        end_x: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "end_x", value_parser = parse_coordinate)]
        end_y: Option<f64>,
    },
    /// Export the schema as JSON (stdout, or a file with --out).
    Export {
        /// Only categories, sections and subsections.
        #[arg(long)]
        outline: bool,
        /// Target file, or a directory to place question-logic-builder.json in.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Print the JSON Schema of the export document.
    JsonSchema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let state_dir = resolve_state_dir(cli.state_dir)?;
    debug!(state_dir = %state_dir.display(), "opening schema store");
    let mut store = SchemaStore::open(Some(Box::new(FileStore::new(state_dir))));

    let reader = store.reader();
    store.subscribe(move || {
        let schema = reader.snapshot();
        debug!(categories = schema.categories.len(), "schema updated");
    });

    let result = run(cli.command, &mut store);
    store.teardown();
    result
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_state_dir(flag: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match flag {
        Some(path) => path,
        None => env::var_os(STATE_DIR_ENV)
            .map(PathBuf::from)
            .or_else(platform_data_dir)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_STATE_DIR)),
    };
    if candidate.as_os_str().is_empty() {
        return Err("state directory cannot be empty".into());
    }
    Ok(candidate)
}

fn platform_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "question-logic-builder").map(|dirs| dirs.data_dir().to_path_buf())
}

fn run(command: Command, store: &mut SchemaStore) -> CliResult<()> {
    match command {
        Command::Init { count, force } => run_init(store, count, force),
        Command::Show => {
            print!("{}", render::render_tree(&store.snapshot()));
            Ok(())
        }
        Command::Rename {
            category,
            section,
            subsection,
            name,
        } => {
            let (applied, target) = match (section, subsection) {
                (Some(section), Some(subsection)) => {
                    let path = SubsectionPath::new(category, section, subsection);
                    (store.set_subsection_name(&path, &name), path.to_string())
                }
                (Some(section), None) => (
                    store.set_section_name(&category, &section, &name),
                    format!("{}/{}", category, section),
                ),
                _ => (store.set_category_name(&category, &name), category),
            };
            report(applied, &format!("Renamed {} to '{}'", target, name), &target)
        }
        Command::SetHeading { target, heading } => {
            let path = target.path();
            report(
                store.set_subsection_starting_heading(&path, heading),
                &format!("Updated starting heading of {}", path),
                &path.to_string(),
            )
        }
        Command::AddSection { category } => {
            let applied = store.add_section(&category);
            let added = store
                .snapshot()
                .category(&category)
                .and_then(|category| category.sections.last())
                .map(|section| section.id.clone());
            report_added(applied, added, &category)
        }
        Command::AddSubsection { category, section } => {
            let applied = store.add_subsection(&category, &section);
            let added = store
                .snapshot()
                .section(&category, &section)
                .and_then(|section| section.subsections.last())
                .map(|subsection| subsection.id.clone());
            report_added(applied, added, &format!("{}/{}", category, section))
        }
        Command::AddQuestion { target } => {
            let path = target.path();
            let applied = store.add_question(&path);
            let added = store
                .snapshot()
                .subsection(&path)
                .and_then(|subsection| subsection.questions.last())
                .map(|question| question.id.clone());
            report_added(applied, added, &path.to_string())
        }
        Command::DeleteSection { category, section } => {
            let target = format!("{}/{}", category, section);
            report(
                store.delete_section(&category, &section),
                &format!("Deleted {}", target),
                &target,
            )
        }
        Command::DeleteSubsection { target } => {
            let path = target.path();
            report(
                store.delete_subsection(&path),
                &format!("Deleted {}", path),
                &path.to_string(),
            )
        }
        Command::DeleteQuestion { target } => {
            let path = target.path();
            report(
                store.delete_question(&path),
                &format!("Deleted {}", path),
                &path.to_string(),
            )
        }
        Command::UpdateQuestion {
            target,
            name,
            description,
            shortform,
            starting,
            answer_type,
            options,
        } => {
            let patch = QuestionPatch {
                name,
                description,
                shortform,
                is_starting_question: starting,
                answer_type,
                options: options.as_deref().map(parse_options),
                fields: None,
            };
            let path = target.path();
            report(
                store.update_question(&path, patch),
                &format!("Updated {}", path),
                &path.to_string(),
            )
        }
        Command::MoveQuestion { target, x, y } => {
            let path = target.path();
            report(
                store.set_question_position(&path, Position::new(x, y)),
                &format!("Moved {} to ({}, {})", path, x, y),
                &path.to_string(),
            )
        }
        Command::SetRoute {
            target,
            answer,
            next,
            end,
        } => {
            let next = if end { None } else { next };
            let path = target.path();
            let destination = next.clone().unwrap_or_else(|| "End".into());
            report(
                store.set_question_route(&path, &answer, next),
                &format!("Routed '{}' of {} to {}", answer, path, destination),
                &path.to_string(),
            )
        }
        Command::AddField { target } => {
            let path = target.path();
            let applied = store.add_multi_field(&path);
            let added = store
                .snapshot()
                .question(&path)
                .and_then(|question| question.answer.fields().last())
                .map(|field| field.id.clone());
            report_added(applied, added, &format!("multi-field question {}", path))
        }
        Command::SetFieldLabel {
            target,
            field,
            label,
        } => {
            let path = target.path();
            let target = format!("{}/{}", path, field);
            report(
                store.set_multi_field_label(&path, &field, label),
                &format!("Relabelled {}", target),
                &target,
            )
        }
        Command::RemoveField { target, field } => {
            let path = target.path();
            let target = format!("{}/{}", path, field);
            report(
                store.remove_multi_field(&path, &field),
                &format!("Removed {}", target),
                &target,
            )
        }
        Command::Graph {
            target,
            format,
            end_x,
            end_y,
        } => run_graph(store, target.path(), format, end_x.zip(end_y)),
        Command::Export { outline, out } => {
            let schema = store.snapshot();
            if outline {
                emit_json(&outline_document(&schema), out)
            } else {
                emit_json(&export_document(&schema), out)
            }
        }
        Command::JsonSchema => {
            println!("{}", serde_json::to_string_pretty(&export_json_schema())?);
            Ok(())
        }
    }
}

fn run_init(store: &mut SchemaStore, count: i64, force: bool) -> CliResult<()> {
    if force {
        store.reset(count);
        println!(
            "Created a fresh schema with {} categories",
            store.snapshot().categories.len()
        );
        return Ok(());
    }

    let had_schema = !store.snapshot().is_empty();
    let adopting = had_schema && store.initialized_count().is_none();
    let changed = store.initialize(count);
    let categories = store.snapshot().categories.len();
    if adopting {
        println!(
            "Using the saved schema with {} categories (pass --force to start over)",
            categories
        );
    } else if changed {
        println!("Created a schema with {} categories", categories);
    } else {
        println!("Schema already has {} categories", categories);
    }
    Ok(())
}

fn run_graph(
    store: &SchemaStore,
    path: SubsectionPath,
    format: GraphFormat,
    end_position: Option<(f64, f64)>,
) -> CliResult<()> {
    let mut view = RoutingView::new(path.clone());
    if let Some((x, y)) = end_position {
        view = view.with_end_position(Position::new(x, y));
    }
    let schema = store.snapshot();
    let Some(graph) = view.graph(&schema) else {
        println!("Subsection {} not found.", path);
        return Ok(());
    };
    match format {
        GraphFormat::Json => println!("{}", serde_json::to_string_pretty(graph)?),
        GraphFormat::Dot => print!("{}", graph.to_dot()),
    }
    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        ends = graph.edges_into(&NodeId::End).count(),
        "derived routing graph"
    );
    Ok(())
}

fn emit_json(document: &impl Serialize, out: Option<PathBuf>) -> CliResult<()> {
    match out {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(EXPORT_FILE_NAME)
            } else {
                path
            };
            write_export(&path, document)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(document)?),
    }
    Ok(())
}

fn report(applied: bool, done: &str, target: &str) -> CliResult<()> {
    if applied {
        println!("{}", done);
    } else {
        println!("{} not found; nothing changed.", target);
    }
    Ok(())
}

fn report_added(applied: bool, added: Option<String>, parent: &str) -> CliResult<()> {
    match added.filter(|_| applied) {
        Some(id) => println!("Added {}", id),
        None => println!("{} not found; nothing changed.", parent),
    }
    Ok(())
}

/// Graph coordinate; NaN and infinities cannot be stored.
fn parse_coordinate(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite coordinate", raw))
    }
}

/// Splits comma-separated options, trimming each and dropping blanks.
fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect()
}
