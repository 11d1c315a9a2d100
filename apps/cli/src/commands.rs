//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docrouter_core::{Orchestrator, ProcessingResult, ProgressReporter};
use docrouter_detection::DocumentInput;
use docrouter_shared::{AppConfig, ThreadId, init_config, load_config, load_config_from};
use docrouter_storage::MemoryStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Crates whose logs the `-v` flags control.
const LOG_TARGETS: &[&str] = &[
    "docrouter",
    "docrouter_core",
    "docrouter_detection",
    "docrouter_fields",
    "docrouter_normalizer",
    "docrouter_storage",
    "docrouter_shared",
];

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docrouter: classify inbound business documents and route them to extractors.
#[derive(Parser)]
#[command(
    name = "docrouter",
    version,
    about = "Classify PDF, JSON, and email documents by format and intent, then extract structured records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docrouter/docrouter.toml.
    #[arg(long, global = true, env = "DOCROUTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process one or more document files.
    Process {
        /// Files to process.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Source label (defaults to each file's name).
        #[arg(short, long)]
        source: Option<String>,

        /// Do not write result logs.
        #[arg(long)]
        no_log: bool,
    },

    /// Process inline text (read from stdin when --text is absent).
    Submit {
        /// Source label, e.g. an API tag or mailbox name.
        #[arg(short, long)]
        source: String,

        /// Document text. May be JSON, an email, or a base64-encoded PDF.
        #[arg(long)]
        text: Option<String>,

        /// Do not write result logs.
        #[arg(long)]
        no_log: bool,
    },

    /// Inspect recorded processing contexts.
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Report store backend and LLM availability.
    Health,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Context subcommands.
#[derive(Subcommand)]
pub(crate) enum ContextAction {
    /// Print the context recorded for a thread.
    Show {
        /// Thread id printed by `process` or `submit`.
        thread_id: String,
    },
    /// List thread ids with a live context.
    List,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}", directives.join(","))));

    // Logs go to stderr; stdout carries the JSON results.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    // Process-scoped fallback store, shared by everything this run opens.
    let fallback = Arc::new(MemoryStore::new());

    match cli.command {
        Command::Process {
            files,
            source,
            no_log,
        } => cmd_process(&config, fallback, &files, source.as_deref(), no_log).await,
        Command::Submit {
            source,
            text,
            no_log,
        } => cmd_submit(&config, fallback, &source, text, no_log).await,
        Command::Context { action } => match action {
            ContextAction::Show { thread_id } => cmd_context_show(&config, fallback, &thread_id).await,
            ContextAction::List => cmd_context_list(&config, fallback).await,
        },
        Command::Health => cmd_health(&config, fallback).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

async fn orchestrator(
    config: &AppConfig,
    fallback: Arc<MemoryStore>,
    no_log: bool,
) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::from_config(config, fallback).await?;
    Ok(if no_log {
        orchestrator.without_result_logs()
    } else {
        orchestrator
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(
    config: &AppConfig,
    fallback: Arc<MemoryStore>,
    files: &[PathBuf],
    source: Option<&str>,
    no_log: bool,
) -> Result<()> {
    let pipeline = orchestrator(config, fallback, no_log).await?;

    for file in files {
        if !file.is_file() {
            return Err(eyre!("'{}' is not a readable file", file.display()));
        }
        let label = match source {
            Some(s) => s.to_string(),
            None => file_label(file),
        };
        info!(file = %file.display(), source = %label, "processing document");

        let reporter = CliProgress::new(&label);
        let result = pipeline
            .process_with_progress(&DocumentInput::path(file), &label, &reporter)
            .await;
        print_result(&result)?;
    }
    Ok(())
}

async fn cmd_submit(
    config: &AppConfig,
    fallback: Arc<MemoryStore>,
    source: &str,
    text: Option<String>,
    no_log: bool,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| eyre!("failed to read stdin: {e}"))?;
            buf
        }
    };

    let pipeline = orchestrator(config, fallback, no_log).await?;
    let reporter = CliProgress::new(source);
    let result = pipeline
        .process_with_progress(&DocumentInput::text(text), source, &reporter)
        .await;
    print_result(&result)
}

async fn cmd_context_show(
    config: &AppConfig,
    fallback: Arc<MemoryStore>,
    thread_id: &str,
) -> Result<()> {
    let id: ThreadId = thread_id
        .parse()
        .map_err(|e| eyre!("invalid thread id '{thread_id}': {e}"))?;

    let recorder = docrouter_storage::open_recorder(&config.store, fallback).await;
    let context = recorder
        .get(&id)
        .await
        .ok_or_else(|| eyre!("no live context for thread {id}"))?;
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

async fn cmd_context_list(config: &AppConfig, fallback: Arc<MemoryStore>) -> Result<()> {
    let recorder = docrouter_storage::open_recorder(&config.store, fallback).await;
    let ids = recorder.list().await;
    if ids.is_empty() {
        println!("No contexts recorded.");
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

async fn cmd_health(config: &AppConfig, fallback: Arc<MemoryStore>) -> Result<()> {
    let pipeline = Orchestrator::from_config(config, fallback).await?;
    let recorder = pipeline.recorder();

    let report = serde_json::json!({
        "status": "ok",
        "store": {
            "backend": recorder.backend(),
            "expiring": recorder.expiring(),
            "retention_secs": config.store.retention_secs,
        },
        "llm": {
            "configured": pipeline.llm_name().is_some(),
            "model": pipeline.llm_name(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_result(result: &ProcessingResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    label: String,
}

impl CliProgress {
    fn new(label: &str) -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            spinner,
            label: label.to_string(),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(format!("{name} {}", self.label));
    }

    fn done(&self, _result: &ProcessingResult) {
        self.spinner.finish_and_clear();
    }
}
