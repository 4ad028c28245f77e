use clap::{Parser, Subcommand};
use component_form::{check_form, describe, json_schema, validate_submission};
use form_spec::{EngineConfig, ValidationReport};
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const CONFIG_ENV: &str = "FORMGEN_CONFIG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Dynamic form generator CLI",
    long_about = "Builds forms from stored definitions, validates submissions and lints conditions"
)]
struct Cli {
    /// Engine configuration JSON (defaults to FORMGEN_CONFIG when set).
    #[arg(long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a submission and report cleaned data and removed fields.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the submission JSON.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
        /// Role whose access levels apply.
        #[arg(long)]
        role: Option<String>,
        /// Read the form as a stored form (with accesses) instead of a schema.
        #[arg(long)]
        stored: bool,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the form as a given role sees it.
    Describe {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        stored: bool,
    },
    /// Lint conditions and confirm the form builds.
    Check {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        stored: bool,
    },
    /// Print the JSON Schema of form documents.
    JsonSchema,
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let engine = load_engine_config(cli.config)?;
    match cli.command {
        Command::Validate {
            form,
            data,
            role,
            stored,
            json,
        } => run_validate(&engine, &form, &data, role.as_deref(), stored, json),
        Command::Describe { form, role, stored } => {
            run_describe(&engine, &form, role.as_deref(), stored)
        }
        Command::Check { form, stored } => run_check(&engine, &form, stored),
        Command::JsonSchema => {
            let schema = unwrap_payload(&json_schema())?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_engine_config(path: Option<PathBuf>) -> CliResult<EngineConfig> {
    let path = path.or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading engine config");
            let raw = fs::read_to_string(&path)?;
            Ok(EngineConfig::from_json(&raw)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn component_config(engine: &EngineConfig, form_path: &Path, stored: bool) -> CliResult<String> {
    let form_json = fs::read_to_string(form_path)?;
    let key = if stored {
        "stored_form_json"
    } else {
        "schema_json"
    };
    Ok(json!({ key: form_json, "engine": engine }).to_string())
}

fn unwrap_payload(payload: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(payload)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(error.to_string().into());
    }
    Ok(value)
}

fn run_validate(
    engine: &EngineConfig,
    form_path: &Path,
    data_path: &Path,
    role: Option<&str>,
    stored: bool,
    as_json: bool,
) -> CliResult<()> {
    let config = component_config(engine, form_path, stored)?;
    let data = fs::read_to_string(data_path)?;
    let payload = validate_submission(&config, role.unwrap_or_default(), &data);
    let report: ValidationReport = serde_json::from_value(unwrap_payload(&payload)?)?;
    info!(
        valid = report.valid,
        removed = report.removed_fields.len(),
        "submission checked"
    );

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Validation result: {}",
            if report.valid { "valid" } else { "invalid" }
        );
        describe_report(&report);
    }

    if report.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_report(report: &ValidationReport) {
    if !report.errors.is_empty() {
        println!("Errors:");
        for (slug, messages) in &report.errors {
            for message in messages {
                println!("  {} - {}", slug, message);
            }
        }
    }
    if !report.removed_fields.is_empty() {
        println!("Removed fields: {}", report.removed_fields.join(", "));
    }
    println!("Active fields: {}", report.active_fields.join(", "));
}

fn run_describe(
    engine: &EngineConfig,
    form_path: &Path,
    role: Option<&str>,
    stored: bool,
) -> CliResult<()> {
    let config = component_config(engine, form_path, stored)?;
    let view = unwrap_payload(&describe(&config, role.unwrap_or_default()))?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run_check(engine: &EngineConfig, form_path: &Path, stored: bool) -> CliResult<()> {
    let config = component_config(engine, form_path, stored)?;
    let result = unwrap_payload(&check_form(&config))?;
    let issues = result["issues"].as_array().cloned().unwrap_or_default();
    for issue in &issues {
        println!("  {}", issue.as_str().unwrap_or_default());
    }
    if let Some(build_error) = result["build_error"].as_str() {
        println!("Build error: {}", build_error);
    }

    if result["ok"].as_bool().unwrap_or(false) {
        println!("Form OK");
        Ok(())
    } else {
        Err(format!("form check failed ({} issue(s))", issues.len()).into())
    }
}
