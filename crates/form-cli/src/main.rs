mod http;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use form_spec::{
    FieldErrors, FieldKind, FieldRegistry, FormController, FormSpec, RuleSchema, SchemaError,
    SubmissionState, SubmitAction, SubmitOutcome, make_validator, render, render_html,
    render_json_ui, render_text, resolve_defaults,
};
use serde_json::{Number, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use http::{EchoAction, HttpAction};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DEFAULT_LOG_FILTER: &str = "formctl=info,form_spec=info";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Declarative form tooling",
    long_about = "Renders, validates and submits forms described as JSON documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
    Html,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaTarget {
    Form,
    Rules,
}

#[derive(Args)]
struct ValueArgs {
    /// JSON object with field values.
    #[arg(long, value_name = "VALUES")]
    values: Option<PathBuf>,
    /// Single field value, parsed according to the field type. Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Render a form description.
    Render {
        /// Path to the form description JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[command(flatten)]
        values: ValueArgs,
        /// Optional JSON object of field errors to display inline.
        #[arg(long, value_name = "ERRORS")]
        errors: Option<PathBuf>,
        /// Render the submit control as disabled.
        #[arg(long)]
        submitting: bool,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Print the default values merged into every submission.
    Defaults {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Validate field values against a rule schema.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the rule schema JSON.
        #[arg(long, value_name = "RULES")]
        rules: PathBuf,
        #[command(flatten)]
        values: ValueArgs,
    },
    /// Run a full submit cycle.
    Submit {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "RULES")]
        rules: PathBuf,
        #[command(flatten)]
        values: ValueArgs,
        /// Endpoint receiving the payload as a JSON POST.
        #[arg(long, env = "FORMCTL_ENDPOINT", value_name = "URL")]
        endpoint: Option<String>,
        /// Skip the network and answer with the payload itself.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the JSON Schema of form descriptions or rule schemas.
    Schema {
        #[arg(long, value_enum, default_value_t = SchemaTarget::Form)]
        target: SchemaTarget,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            form,
            values,
            errors,
            submitting,
            format,
        } => run_render(form, values, errors, submitting, format),
        Command::Defaults { form } => run_defaults(form),
        Command::Validate {
            form,
            rules,
            values,
        } => run_validate(form, rules, values),
        Command::Submit {
            form,
            rules,
            values,
            endpoint,
            dry_run,
        } => run_submit(form, rules, values, endpoint, dry_run).await,
        Command::Schema { target } => run_schema(target),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_render(
    form_path: PathBuf,
    values: ValueArgs,
    errors_path: Option<PathBuf>,
    submitting: bool,
    mode: RenderMode,
) -> CliResult<()> {
    let spec = load_form(&form_path)?;
    let mut registry = bind_values(&spec, &values)?;
    let errors_by_field = match errors_path {
        Some(path) => read_json::<FieldErrors>(&path)?,
        None => FieldErrors::new(),
    };
    let state = SubmissionState {
        is_submitting: submitting,
        errors_by_field,
        ..SubmissionState::default()
    };

    let tree = render(&spec, &state, &mut registry);
    match mode {
        RenderMode::Text => println!("{}", render_text(&tree)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&tree))?),
        RenderMode::Html => print!("{}", render_html(&tree)),
    }
    Ok(())
}

fn run_defaults(form_path: PathBuf) -> CliResult<()> {
    let spec = load_form(&form_path)?;
    let defaults = resolve_defaults(spec.fields());
    println!("{}", serde_json::to_string_pretty(&Value::Object(defaults))?);
    Ok(())
}

fn run_validate(form_path: PathBuf, rules_path: PathBuf, values: ValueArgs) -> CliResult<()> {
    let spec = load_form(&form_path)?;
    let rules: RuleSchema = read_json(&rules_path)?;
    let registry = bind_values(&spec, &values)?;

    match make_validator(rules).validate(&registry.values()) {
        Ok(parsed) => {
            println!("Validation result: valid");
            println!("{}", serde_json::to_string_pretty(&Value::Object(parsed))?);
            Ok(())
        }
        Err(SchemaError::Invalid(errors)) => {
            println!("Validation result: invalid");
            describe_errors(&errors);
            Err("validation failed".into())
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_submit(
    form_path: PathBuf,
    rules_path: PathBuf,
    values: ValueArgs,
    endpoint: Option<String>,
    dry_run: bool,
) -> CliResult<()> {
    let spec = load_form(&form_path)?;
    let rules: RuleSchema = read_json(&rules_path)?;

    let outcome = if dry_run {
        submit_with(spec, rules, &values, EchoAction).await?
    } else {
        let endpoint =
            endpoint.ok_or("an --endpoint (or FORMCTL_ENDPOINT) is required without --dry-run")?;
        submit_with(spec, rules, &values, HttpAction::new(endpoint)).await?
    };

    match outcome {
        SubmitOutcome::Succeeded(_) => {
            info!("submission accepted");
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => {
            println!("Validation result: invalid");
            describe_errors(&errors);
            Err("validation failed".into())
        }
        SubmitOutcome::Rejected { status, .. } => {
            Err(format!("submission rejected with status {status}").into())
        }
        SubmitOutcome::Failed(message) => Err(format!("submission failed: {message}").into()),
    }
}

async fn submit_with<A>(
    spec: FormSpec,
    rules: RuleSchema,
    values: &ValueArgs,
    action: A,
) -> CliResult<SubmitOutcome>
where
    A: SubmitAction + 'static,
{
    let assignments = collect_values(&spec, values)?;
    let mut controller = FormController::new(spec, make_validator(rules), action)
        .with_response_handler(|body| match serde_json::to_string_pretty(body) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{body}"),
        });
    controller.render();
    for (name, value) in assignments {
        if let Err(err) = controller.set_value(&name, value) {
            warn!(%err, "ignoring value");
        }
    }
    Ok(controller.submit().await)
}

fn run_schema(target: SchemaTarget) -> CliResult<()> {
    let schema = match target {
        SchemaTarget::Form => schemars::schema_for!(FormSpec),
        SchemaTarget::Rules => schemars::schema_for!(RuleSchema),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn load_form(path: &Path) -> CliResult<FormSpec> {
    let spec = FormSpec::from_json(&fs::read_to_string(path)?)?;
    for name in spec.duplicate_names() {
        warn!(field = %name, "duplicate field name; values and errors will collide");
    }
    Ok(spec)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Registers the form controls with one render pass, then applies values.
fn bind_values(spec: &FormSpec, values: &ValueArgs) -> CliResult<FieldRegistry> {
    let mut registry = FieldRegistry::new();
    render(spec, &SubmissionState::default(), &mut registry);
    for (name, value) in collect_values(spec, values)? {
        if let Err(err) = registry.set_value(&name, value) {
            warn!(%err, "ignoring value");
        }
    }
    Ok(registry)
}

fn collect_values(spec: &FormSpec, args: &ValueArgs) -> CliResult<Vec<(String, Value)>> {
    let mut collected = Vec::new();
    if let Some(path) = &args.values {
        let value: Value = read_json(path)?;
        let Value::Object(map) = value else {
            return Err(format!("{} must contain a JSON object", path.display()).into());
        };
        collected.extend(map);
    }
    for raw in &args.set {
        collected.push(parse_assignment(spec, raw)?);
    }
    Ok(collected)
}

fn parse_assignment(spec: &FormSpec, raw: &str) -> CliResult<(String, Value)> {
    let (name, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let kind = spec
        .field(name)
        .map(|field| field.kind)
        .ok_or_else(|| format!("form has no field named '{name}'"))?;
    let value = parse_field_value(kind, text).map_err(|err| format!("{name}: {err}"))?;
    Ok((name.to_string(), value))
}

fn parse_field_value(kind: FieldKind, raw: &str) -> Result<Value, String> {
    match kind {
        FieldKind::Checkbox => parse_boolean(raw.trim()),
        FieldKind::Number if !raw.trim().is_empty() => parse_number(raw.trim()),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, String> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" | "off" | "" => Ok(Value::Bool(false)),
        _ => Err("expected boolean (y/n/true/false)".to_string()),
    }
}

fn parse_number(raw: &str) -> Result<Value, String> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(Number::from(integer)));
    }
    raw.parse::<f64>()
        .map_err(|_| "expected number".to_string())
        .and_then(|value| {
            Number::from_f64(value)
                .map(Value::Number)
                .ok_or_else(|| "number must be finite".to_string())
        })
}

fn describe_errors(errors: &FieldErrors) {
    println!("Errors:");
    for (field, message) in errors {
        println!("  {} - {}", field, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use form_spec::{FieldGroup, FieldSpec};
    use predicates::prelude::*;
    use serde_json::json;

    const FORM: &str = r#"{
        "style": "form",
        "button": { "label": "Create", "style": "btn" },
        "elements": [
            { "label": { "text": "Email" }, "field": { "type": "email", "name": "email" } },
            { "field": { "type": "checkbox", "name": "isActive", "default": true } },
            { "field": { "type": "number", "name": "orgId", "visible": false, "default": 42 } },
            { "field": { "type": "relation", "name": "team" } }
        ]
    }"#;

    const RULES: &str = r#"{
        "fields": {
            "email": { "required": true, "email": true },
            "isActive": {}
        }
    }"#;

    fn workspace() -> assert_fs::TempDir {
        let dir = assert_fs::TempDir::new().expect("temp dir");
        dir.child("form.json").write_str(FORM).expect("form");
        dir.child("rules.json").write_str(RULES).expect("rules");
        dir
    }

    fn sample_spec() -> FormSpec {
        FormSpec::new(vec![
            FieldGroup::new(FieldSpec::new(FieldKind::Checkbox, "isActive")),
            FieldGroup::new(FieldSpec::new(FieldKind::Number, "age")),
            FieldGroup::new(FieldSpec::new(FieldKind::Text, "title")),
        ])
    }

    #[test]
    fn parse_assignment_uses_field_kind() {
        let spec = sample_spec();
        assert_eq!(
            parse_assignment(&spec, "isActive=yes").unwrap(),
            ("isActive".to_string(), Value::Bool(true))
        );
        assert_eq!(
            parse_assignment(&spec, "age=42").unwrap(),
            ("age".to_string(), json!(42))
        );
        assert_eq!(
            parse_assignment(&spec, "title=a=b").unwrap(),
            ("title".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn parse_assignment_rejects_bad_input() {
        let spec = sample_spec();
        assert!(parse_assignment(&spec, "title").is_err());
        assert!(parse_assignment(&spec, "missing=1").is_err());
        assert!(parse_assignment(&spec, "age=lots").is_err());
        assert!(parse_assignment(&spec, "isActive=maybe").is_err());
    }

    #[test]
    fn render_command_prints_text_summary() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace();
        Command::cargo_bin("formctl")?
            .arg("render")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .args(["--set", "email=a@b.com"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Form (3 fields)"))
            .stdout(predicate::str::contains(" - email (Email) [email] = a@b.com"))
            .stdout(predicate::str::contains("[hidden]"))
            .stdout(predicate::str::contains("team").not());
        Ok(())
    }

    #[test]
    fn render_command_outputs_html_with_errors() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace();
        dir.child("errors.json")
            .write_str(r#"{ "email": "Invalid email" }"#)?;
        Command::cargo_bin("formctl")?
            .arg("render")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--errors")
            .arg(dir.child("errors.json").path())
            .args(["--format", "html", "--submitting"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<span>Invalid email</span>"))
            .stdout(predicate::str::contains(
                r#"<button type="submit" class="btn" disabled>Create</button>"#,
            ));
        Ok(())
    }

    #[test]
    fn defaults_command_lists_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace();
        let output = Command::cargo_bin("formctl")?
            .arg("defaults")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .output()?;
        assert!(output.status.success());
        let defaults: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(defaults, json!({ "isActive": true, "orgId": 42 }));
        Ok(())
    }

    #[test]
    fn validate_command_reports_field_errors() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace();
        Command::cargo_bin("formctl")?
            .arg("validate")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--rules")
            .arg(dir.child("rules.json").path())
            .args(["--set", "email=nope"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Validation result: invalid"))
            .stdout(predicate::str::contains("email - Invalid email"));
        Ok(())
    }

    #[test]
    fn submit_dry_run_applies_defaults_over_values() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace();
        dir.child("values.json")
            .write_str(r#"{ "email": "a@b.com", "isActive": false }"#)?;
        let output = Command::cargo_bin("formctl")?
            .arg("submit")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--rules")
            .arg(dir.child("rules.json").path())
            .arg("--values")
            .arg(dir.child("values.json").path())
            .arg("--dry-run")
            .output()?;
        assert!(output.status.success());
        let echoed: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(
            echoed,
            json!({ "email": "a@b.com", "isActive": true, "orgId": 42 })
        );
        Ok(())
    }

    #[test]
    fn submit_requires_endpoint_without_dry_run() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace();
        Command::cargo_bin("formctl")?
            .env_remove("FORMCTL_ENDPOINT")
            .arg("submit")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--rules")
            .arg(dir.child("rules.json").path())
            .args(["--set", "email=a@b.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--endpoint"));
        Ok(())
    }

    #[test]
    fn schema_command_describes_form_spec() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("formctl")?.arg("schema").output()?;
        assert!(output.status.success());
        let schema: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(schema["title"], "FormSpec");
        assert!(schema["properties"]["elements"].is_object());
        Ok(())
    }
}
