//! talkscope - conversation analysis through Langflow flows
//!
//! A CLI tool that forwards conversation transcripts to a list of
//! analysis endpoints and renders the summary, intent, sentiment and
//! keyword results they return.
//!
//! Exit codes:
//!   0 - Success (every endpoint answered)
//!   1 - Runtime error (configuration, input, flow host, etc.)
//!   2 - Partial run (an endpoint failed; earlier results were shown)

mod analysis;
mod cli;
mod config;
mod dispatch;
mod flows;
mod models;
mod report;
mod session;
mod transcript;

use anyhow::{bail, Context, Result};
use cli::{AnalyzeArgs, Args, Command, FlowAction, OutputFormat, SettingsAction, TranscriptAction};
use config::{Config, DEFAULT_CONFIG_FILE};
use dispatch::{Dispatcher, HttpTransport};
use models::{AnalysisRequest, EndpointKind, RunStatus};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use transcript::TranscriptStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(&args);

    debug!("talkscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the selected command. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    // settings init must work without a readable config
    if let Command::Settings {
        action: SettingsAction::Init { force },
    } = args.command
    {
        return handle_settings_init(&config_path(&args), force);
    }

    let config = load_config(&args)?;

    match &args.command {
        Command::Analyze(analyze) => handle_analyze(&args, analyze, &config).await,
        Command::Session => handle_session(&args, &config).await,
        Command::Transcripts { action } => handle_transcripts(action, &config),
        Command::Flows { action } => handle_flows(action, &config).await,
        Command::Settings { action } => handle_settings(&args, action, config),
    }
}

/// Path of the configuration file this invocation reads and rewrites.
fn config_path(args: &Args) -> PathBuf {
    args.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load configuration from file or use defaults, then apply overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                debug!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    config.apply_env_overrides();
    config.validate()?;

    Ok(config)
}

fn build_dispatcher(
    args: &Args,
    config: &Config,
    only: Option<&[String]>,
    timeout: Option<u64>,
) -> Result<Dispatcher<HttpTransport>> {
    let endpoints = config.select_endpoints(only)?;
    if endpoints.is_empty() {
        bail!("No analysis endpoints configured");
    }

    let transport = HttpTransport::new(timeout.or(config.general.request_timeout_seconds))
        .context("Failed to create HTTP client")?;

    Ok(Dispatcher::new(transport, endpoints).with_progress(!args.quiet))
}

/// Resolve the analysis input from the text argument, a file, a transcript or stdin.
fn read_input(analyze: &AnalyzeArgs, config: &Config) -> Result<String> {
    if let Some(ref text) = analyze.text {
        return Ok(text.clone());
    }

    if let Some(ref path) = analyze.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()));
    }

    if let Some(ref name) = analyze.transcript {
        let store = TranscriptStore::new(&config.general.transcripts_dir);
        return Ok(store.load(name)?);
    }

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read input from stdin")?;
    Ok(text)
}

async fn handle_analyze(args: &Args, analyze: &AnalyzeArgs, config: &Config) -> Result<i32> {
    let input = read_input(analyze, config)?;

    let Some(request) = AnalysisRequest::new(input) else {
        eprintln!("⚠️  Input is empty; nothing was sent.");
        return Ok(0);
    };

    let dispatcher = build_dispatcher(args, config, analyze.only.as_deref(), analyze.timeout)?;

    if !args.quiet {
        eprintln!(
            "🔬 Analyzing {} characters with {} endpoint(s)...",
            request.character_count(),
            dispatcher.endpoints().len()
        );
    }

    let run = dispatcher.run_request(request).await;

    let output = match analyze.format {
        OutputFormat::Text => report::generate_text_report(&run),
        OutputFormat::Markdown => report::generate_markdown_report(&run),
        OutputFormat::Json => report::generate_json_report(&run)?,
    };

    match analyze.output {
        Some(ref path) => {
            report::write_report(&output, path)?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => print!("{}", output),
    }

    if run.is_complete() {
        return Ok(0);
    }

    if let RunStatus::Partial { failed_at } = run.status() {
        if let Some(ref failure) = run.failure {
            eprintln!(
                "\n⛔ Endpoint {} failed ({}). Later endpoints were not called.",
                failed_at, failure.url
            );
        }
    }
    Ok(2)
}

async fn handle_session(args: &Args, config: &Config) -> Result<i32> {
    let dispatcher = build_dispatcher(args, config, None, None)?;
    let store = TranscriptStore::new(&config.general.transcripts_dir);

    info!(
        "Session with {} endpoint(s); transcripts from {}",
        dispatcher.endpoints().len(),
        store.dir().display()
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    session::Session::new(&dispatcher, &store)
        .run(stdin, &mut stdout)
        .await?;

    Ok(0)
}

fn handle_transcripts(action: &TranscriptAction, config: &Config) -> Result<i32> {
    let store = TranscriptStore::new(&config.general.transcripts_dir);

    match action {
        TranscriptAction::List => {
            let names = store.list()?;
            if names.is_empty() {
                println!("No transcripts found in {}", store.dir().display());
            }
            for name in names {
                println!("📄 {}", name);
            }
        }
        TranscriptAction::Show { name } => {
            println!("{}", store.load(name)?);
        }
    }

    Ok(0)
}

async fn handle_flows(action: &FlowAction, config: &Config) -> Result<i32> {
    let client = flows::FlowClient::new(&config.host.url, config.general.request_timeout_seconds)
        .context("Failed to create HTTP client")?;
    let interval = Duration::from_secs(config.host.health_interval_seconds);

    match action {
        FlowAction::List => {
            let flows = client.list_flows().await?;
            for flow in &flows {
                println!("Name: {}", flow.name);
                println!("ID: {}", flow.id);
                println!("---");
            }
            println!("\nFound {} flow(s)", flows.len());
            Ok(0)
        }
        FlowAction::Health { retries } => {
            let retries = retries.unwrap_or(config.host.health_retries);
            let attempts = client.wait_until_healthy(retries, interval).await?;
            println!("✅ Langflow host ready ({} attempt(s))", attempts);
            Ok(0)
        }
        FlowAction::Import {
            dir,
            retries,
            interval: interval_override,
        } => {
            let dir = dir.clone().unwrap_or_else(|| config.host.flows_dir.clone());
            let retries = retries.unwrap_or(config.host.health_retries);
            let interval = interval_override.map(Duration::from_secs).unwrap_or(interval);

            println!("📥 Importing flows from {}", dir.display());
            let report = client.import_dir(&dir, retries, interval).await?;

            println!("\n📊 Import Summary:");
            println!("   Imported: {}", report.imported.len());
            println!("   Skipped (already present): {}", report.skipped.len());
            println!("   Failed: {}", report.failed.len());
            for (file, reason) in &report.failed {
                println!("   - {}: {}", file, reason);
            }

            Ok(if report.has_failures() { 1 } else { 0 })
        }
    }
}

fn handle_settings(args: &Args, action: &SettingsAction, config: Config) -> Result<i32> {
    match action {
        SettingsAction::Show => {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
        SettingsAction::Set {
            name,
            url,
            sentiment,
        } => {
            let path = config_path(args);
            // Rewrite the stored file, not the env-overridden view.
            let mut stored = if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            };
            let kind = sentiment.then_some(EndpointKind::Sentiment);
            stored.set_endpoint_url(name, url, kind)?;
            stored.validate()?;
            stored.save(&path)?;

            println!("✅ {} -> {} saved to {}", name, url, path.display());
            println!("   Restart running sessions to pick up the change.");
        }
        SettingsAction::Init { force } => return handle_settings_init(&config_path(args), *force),
    }

    Ok(0)
}

/// Handle `settings init`: generate a default .talkscope.toml.
fn handle_settings_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        eprintln!(
            "⚠️  {} already exists. Use --force to overwrite it or edit it manually.",
            path.display()
        );
        return Ok(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to point the endpoints at your Langflow flows.");
    Ok(0)
}
