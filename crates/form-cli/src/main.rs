mod store;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    FormSpec, FormStore, LiveForm, SessionError, SubmissionKey, SubmitOutcome, ValidationResult,
    ValueStore, build_render_payload, check_form, form_json_schema, open_form, render_json_ui,
    render_text, submission_json_schema, submit, summarize, validate,
};
use serde_json::Value;
use store::FileStore;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DATA_DIR_ENV: &str = "FORMWRIGHT_DATA_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form schema and submission tool",
    long_about = "Lints, validates and renders form schemas, and records submissions per subject and occasion in a JSON data directory"
)]
struct Cli {
    /// Data directory holding published forms and submissions (defaults to FORMWRIGHT_DATA_DIR or the current directory).
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Published form identifier.
    #[arg(long, value_name = "FORM_ID")]
    form_id: String,
    /// Subject the answers belong to.
    #[arg(long, alias = "patient", value_name = "SUBJECT")]
    subject: String,
    /// Occasion (visit, timepoint) the answers were captured at.
    #[arg(long, alias = "timepoint", value_name = "OCCASION")]
    occasion: String,
}

impl KeyArgs {
    fn key(&self) -> SubmissionKey {
        SubmissionKey::new(&self.form_id, &self.subject, &self.occasion)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Lint a form schema before publishing it.
    Check {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Validate answers against a form schema.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON, keyed by field id or label.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Render a form with optional answers.
    Render {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional answers JSON.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Store a form schema in the data directory.
    Publish {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Identifier to publish the form under.
        #[arg(long, value_name = "FORM_ID")]
        form_id: String,
    },
    /// Open a published form for a subject and occasion, loading any prior submission.
    Open {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Submit answers for a subject and occasion; a prior submission is updated.
    Submit {
        #[command(flatten)]
        key: KeyArgs,
        /// Path to the answers JSON, keyed by field id or label.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Tabulate every submission of a published form.
    Responses {
        /// Published form identifier.
        #[arg(long, value_name = "FORM_ID")]
        form_id: String,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the JSON Schema of the form (or submission) document format.
    Schema {
        /// Emit the submission document schema instead.
        #[arg(long)]
        submission: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check { form } => run_check(form),
        Command::Validate { form, answers } => run_validate(form, answers),
        Command::Render {
            form,
            answers,
            format,
        } => run_render(form, answers, format),
        Command::Publish { form, form_id } => {
            let store = open_store(cli.data_dir)?;
            run_publish(store, form, &form_id)
        }
        Command::Open { key, format } => {
            let store = open_store(cli.data_dir)?;
            run_open(&store, &key.key(), format)
        }
        Command::Submit { key, answers } => {
            let store = open_store(cli.data_dir)?;
            run_submit(store, &key.key(), answers)
        }
        Command::Responses { form_id, format } => {
            let store = open_store(cli.data_dir)?;
            run_responses(&store, &form_id, format)
        }
        Command::Schema { submission } => {
            let schema = if submission {
                submission_json_schema()
            } else {
                form_json_schema()
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
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

fn resolve_data_dir(dir: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match dir {
        Some(path) => path,
        None => env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("data directory cannot be empty".into());
    }
    Ok(candidate)
}

fn open_store(dir: Option<PathBuf>) -> CliResult<FileStore> {
    Ok(FileStore::new(resolve_data_dir(dir)?))
}

fn read_form(path: &Path) -> CliResult<FormSpec> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read form '{}': {}", path.display(), err))?;
    Ok(serde_json::from_str(&text)?)
}

fn read_answers(path: &Path) -> CliResult<Value> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read answers '{}': {}", path.display(), err))?;
    Ok(serde_json::from_str(&text)?)
}

fn run_check(form_path: PathBuf) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let issues = check_form(&form);
    if issues.is_empty() {
        println!(
            "Form check: ok ({} rows, {} fields)",
            form.rows.len(),
            form.field_count()
        );
        return Ok(());
    }
    println!("Form check: {} issue(s)", issues.len());
    for issue in &issues {
        println!("  - {}", issue);
    }
    Err("form check failed".into())
}

fn run_validate(form_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let answers = read_answers(&answers_path)?;
    let values = ValueStore::from_answers_json(&form, &answers)?;

    let result = validate(&form, &values);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {} ({})", error.field_id, error.message, error.code);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            join_ids(result.missing_required.iter())
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            join_ids(result.unknown_fields.iter())
        );
    }
    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  {} - {}", warning.field_id, warning.message);
        }
    }
}

fn join_ids<'a, I>(ids: I) -> String
where
    I: Iterator<Item = &'a form_spec::FieldId>,
{
    ids.map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}

fn print_live(live: &LiveForm, format: RenderMode) -> CliResult<()> {
    let payload = build_render_payload(live);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?),
    }
    Ok(())
}

/// Applies an answers document to an editable live form.
fn apply_answers(live: &mut LiveForm, answers: &Value) -> CliResult<()> {
    let values = ValueStore::from_answers_json(live.form(), answers)?;
    for (id, value) in values.iter() {
        live.set_value(id, value.clone())?;
    }
    Ok(())
}

fn run_render(form_path: PathBuf, answers: Option<PathBuf>, format: RenderMode) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let mut live = LiveForm::new(form);
    if let Some(path) = answers {
        apply_answers(&mut live, &read_answers(&path)?)?;
    }
    print_live(&live, format)
}

fn run_publish(mut store: FileStore, form_path: PathBuf, form_id: &str) -> CliResult<()> {
    let form = read_form(&form_path)?.normalized();
    let issues = check_form(&form);
    for issue in &issues {
        println!("warning: {}", issue);
    }
    store.persist_schema(form_id, &form)?;
    println!(
        "Published form '{}' to {}",
        form_id,
        store.root().display()
    );
    Ok(())
}

fn run_open(store: &FileStore, key: &SubmissionKey, format: RenderMode) -> CliResult<()> {
    let opened = open_form(store, key)?;
    if let Some(report) = &opened.report {
        for dropped in &report.dropped {
            println!(
                "note: stored answer for '{}' ({}) no longer matches a field",
                dropped.label, dropped.input_type
            );
        }
    }
    print_live(&opened.live, format)
}

fn run_submit(mut store: FileStore, key: &SubmissionKey, answers_path: PathBuf) -> CliResult<()> {
    let answers = read_answers(&answers_path)?;
    let mut live = open_form(&store, key)?.live;
    live.enable_editing();
    apply_answers(&mut live, &answers)?;

    match submit(&mut store, &mut live, key) {
        Ok(SubmitOutcome::Created(id)) => {
            println!("Submission created: {}", id);
            Ok(())
        }
        Ok(SubmitOutcome::Updated(id)) => {
            println!("Submission updated: {}", id);
            Ok(())
        }
        Err(SessionError::Invalid(result)) => {
            println!("Validation result: invalid");
            describe_validation(&result);
            Err("submission rejected".into())
        }
        Err(err) => Err(err.into()),
    }
}

fn run_responses(store: &FileStore, form_id: &str, format: RenderMode) -> CliResult<()> {
    let form = store.fetch_form_schema(form_id)?;
    let submissions = store.list_submissions(form_id)?;
    let summaries = summarize(&form, &submissions);

    match format {
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        RenderMode::Text => {
            println!("Responses for '{}': {}", form_id, summaries.len());
            for summary in &summaries {
                println!("{} / {}", summary.subject_id, summary.occasion_id);
                for field in form.fields() {
                    let answer = summary
                        .answers
                        .get(&field.label)
                        .map(String::as_str)
                        .unwrap_or(form_spec::submission::NOT_ANSWERED);
                    println!("  {}: {}", field.label, answer);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::{FieldId, FieldValue};
    use tempfile::TempDir;

    fn visit_form() -> FormSpec {
        serde_json::from_str(include_str!("../tests/fixtures/visit_form.json")).expect("form")
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/forms"))).expect("dir");
        assert_eq!(dir, PathBuf::from("/tmp/forms"));
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        assert!(resolve_data_dir(Some(PathBuf::new())).is_err());
    }

    #[test]
    fn file_store_round_trips_forms_and_submissions() {
        let temp = TempDir::new().expect("temp dir");
        let mut store = FileStore::new(temp.path());
        store
            .persist_schema("baseline", &visit_form())
            .expect("persist");
        assert!(temp.path().join("forms/baseline.form.json").exists());

        let key = SubmissionKey::new("baseline", "p1", "week-0");
        let mut live = LiveForm::new(store.fetch_form_schema("baseline").expect("fetch"));
        live.set_value(&FieldId::from("name"), FieldValue::scalar("Alice"))
            .expect("name");
        let outcome = submit(&mut store, &mut live, &key).expect("submit");
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert!(temp.path().join("submissions/baseline/p1/week-0.json").exists());

        let stored = store.fetch_submission(&key).expect("fetch").expect("stored");
        assert_eq!(stored.id.as_deref(), Some(outcome.submission_id()));
        assert_eq!(store.list_submissions("baseline").expect("list").len(), 1);
        assert!(store.list_submissions("other").expect("list").is_empty());
    }

    #[test]
    fn file_store_refuses_path_like_ids() {
        let temp = TempDir::new().expect("temp dir");
        let store = FileStore::new(temp.path());
        assert!(store.fetch_form_schema("../etc").is_err());
        assert!(store
            .fetch_submission(&SubmissionKey::new("baseline", "..", "week-0"))
            .is_err());
    }

    #[test]
    fn missing_form_maps_to_not_found() {
        let temp = TempDir::new().expect("temp dir");
        let mut store = FileStore::new(temp.path());
        assert!(matches!(
            store.fetch_form_schema("nope"),
            Err(form_spec::StoreError::FormNotFound(_))
        ));
        assert!(matches!(
            store.delete_schema("nope"),
            Err(form_spec::StoreError::FormNotFound(_))
        ));
    }
}
