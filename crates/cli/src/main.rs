mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use assetdesk_engine::{parse_with_source, validate, IntentSource, OperationIntent, Verdict};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_PATH};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Natural-language CRUD service for the asset inventory.
#[derive(Parser)]
#[command(name = "assetdesk", version, about = "Natural-language CRUD for the asset inventory")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Parse an instruction offline and show how it would be validated
    Parse {
        /// The natural-language instruction
        instruction: String,
        /// Model completion to parse instead of calling the model
        #[arg(long)]
        completion: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Serve { port } => {
            let mut config = load_config(&cli.config, cli.output, cli.quiet);
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(&format!("failed to start runtime: {}", e), cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Parse {
            instruction,
            completion,
        } => {
            cmd_parse(&instruction, completion.as_deref(), cli.output);
        }
    }
}

/// Logs go to stderr so `--output json` stays machine-readable.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &std::path::Path, output: OutputFormat, quiet: bool) -> Config {
    match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

/// Exits 0 when the instruction would execute, 1 when it needs
/// clarification or is rejected.
fn cmd_parse(instruction: &str, completion: Option<&str>, output: OutputFormat) {
    let (intent, source) = parse_with_source(instruction, completion);
    let verdict = validate(intent.clone());
    let runnable = source.unknown_operation().is_none() && matches!(verdict, Verdict::Valid(_));

    match output {
        OutputFormat::Json => {
            let report = parse_report_json(&intent, &source, &verdict);
            match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    report_error(&format!("serialization error: {}", e), output, false);
                    process::exit(1);
                }
            }
        }
        OutputFormat::Text => print!("{}", parse_report_text(&intent, &source, &verdict)),
    }

    if !runnable {
        process::exit(1);
    }
}

/// Rejection text for a model intent whose operation was not recognised.
fn unknown_operation_reason(source: &IntentSource) -> Option<String> {
    source
        .unknown_operation()
        .map(|op| format!("Unknown operation: {}", op))
}

fn verdict_json(verdict: &Verdict) -> serde_json::Value {
    match verdict {
        Verdict::Valid(_) => serde_json::json!({ "status": "valid" }),
        Verdict::ClarificationNeeded(missing) => serde_json::json!({
            "status": "clarification_needed",
            "missing_fields": missing,
        }),
        Verdict::Rejected(rejection) => serde_json::json!({
            "status": "rejected",
            "reason": rejection.to_string(),
        }),
    }
}

fn parse_report_json(
    intent: &OperationIntent,
    source: &IntentSource,
    verdict: &Verdict,
) -> serde_json::Value {
    let (source_name, fallback_reason) = match source {
        IntentSource::Model => ("model", None),
        IntentSource::Heuristic(reason) => ("heuristic", Some(reason.to_string())),
        IntentSource::UnknownOperation(_) => ("model", None),
    };
    let verdict = match unknown_operation_reason(source) {
        Some(reason) => serde_json::json!({ "status": "rejected", "reason": reason }),
        None => verdict_json(verdict),
    };
    serde_json::json!({
        "intent": intent,
        "source": source_name,
        "fallback_reason": fallback_reason,
        "verdict": verdict,
    })
}

fn parse_report_text(intent: &OperationIntent, source: &IntentSource, verdict: &Verdict) -> String {
    let mut out = String::new();
    out.push_str(&format!("operation: {}\n", intent.operation));
    out.push_str(&format!("source:    {}\n", source));
    if !intent.fields.is_empty() {
        out.push_str(&format!("fields:    {}\n", render_map(&intent.fields)));
    }
    if !intent.filters.is_empty() {
        out.push_str(&format!("filters:   {}\n", render_map(&intent.filters)));
    }
    if let Some(id) = &intent.resource_id {
        out.push_str(&format!("target:    {}\n", id));
    }
    let verdict_line = match (unknown_operation_reason(source), verdict) {
        (Some(reason), _) => format!("rejected: {}", reason),
        (None, Verdict::Valid(_)) => "valid".to_string(),
        (None, Verdict::ClarificationNeeded(missing)) => {
            format!("needs clarification ({})", missing.join(", "))
        }
        (None, Verdict::Rejected(rejection)) => format!("rejected: {}", rejection),
    };
    out.push_str(&format!("verdict:   {}\n", verdict_line));
    out
}

fn render_map(map: &std::collections::BTreeMap<String, serde_json::Value>) -> String {
    map.iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
