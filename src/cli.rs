//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// talkscope - conversation analysis through Langflow flows
///
/// Sends a transcript to each configured analysis flow (summary, intent,
/// sentiment, keywords) and shows what comes back.
///
/// Examples:
///   talkscope analyze "agent: hello, customer: my bill is wrong"
///   talkscope analyze --transcript call_001 --format markdown -o report.md
///   cat call.txt | talkscope analyze --only summary,sentiment
///   talkscope session
///   talkscope flows import --dir flows
///   talkscope settings set summary http://localhost:7860/api/v1/run/<flow-id>
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .talkscope.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true, env = "TALKSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Langflow host URL used by the flow tooling
    #[arg(long, value_name = "URL", global = true, env = "LANGFLOW_URL")]
    pub host: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze one transcript and print the results
    Analyze(AnalyzeArgs),

    /// Interactive session keeping the latest run on screen
    Session,

    /// Browse the transcript directory
    Transcripts {
        #[command(subcommand)]
        action: TranscriptAction,
    },

    /// List or import Langflow flow definitions
    Flows {
        #[command(subcommand)]
        action: FlowAction,
    },

    /// Show or rewrite the configuration file
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Transcript text. Read from stdin when no text source is given.
    #[arg(value_name = "TEXT", conflicts_with_all = ["file", "transcript"])]
    pub text: Option<String>,

    /// Read the transcript text from a plain file
    #[arg(short, long, value_name = "FILE", conflicts_with = "transcript")]
    pub file: Option<PathBuf>,

    /// Load a transcript by name from the transcript directory
    #[arg(short, long, value_name = "NAME")]
    pub transcript: Option<String>,

    /// Only call these endpoints (comma-separated, config order is kept)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Output format (text, markdown, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the rendered run to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Request timeout in seconds (HTTP client default when unset)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TranscriptAction {
    /// List transcript files
    List,
    /// Print a transcript reformatted into speaker lines
    Show { name: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum FlowAction {
    /// List flows on the host
    List,
    /// Wait for the host's health endpoint
    Health {
        /// Number of health checks before giving up
        #[arg(long, value_name = "COUNT")]
        retries: Option<usize>,
    },
    /// Import flow definition files the host does not have yet
    Import {
        /// Directory with flow definition JSON files
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Number of health checks before giving up
        #[arg(long, value_name = "COUNT")]
        retries: Option<usize>,

        /// Seconds between health checks
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print the effective configuration
    Show,
    /// Set an endpoint URL (adds the endpoint if it is new)
    Set {
        name: String,
        url: String,
        /// Decode this endpoint's result as sentiment
        #[arg(long)]
        sentiment: bool,
    },
    /// Write a default .talkscope.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output format for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Terminal text (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref host) = self.host {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err("Host URL must start with 'http://' or 'https://'".to_string());
            }
        }

        match &self.command {
            Command::Analyze(analyze) => {
                if analyze.timeout == Some(0) {
                    return Err("Timeout must be at least 1 second".to_string());
                }
                if let Some(ref file) = analyze.file {
                    if !file.is_file() {
                        return Err(format!("Input file does not exist: {}", file.display()));
                    }
                }
                if let Some(ref only) = analyze.only {
                    if only.iter().any(|n| n.trim().is_empty()) {
                        return Err("--only must not contain empty names".to_string());
                    }
                }
            }
            Command::Flows {
                action: FlowAction::Import { retries, .. } | FlowAction::Health { retries },
            } => {
                if *retries == Some(0) {
                    return Err("Retries must be at least 1".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            host: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    fn analyze_args() -> AnalyzeArgs {
        AnalyzeArgs {
            text: Some("agent: hi".to_string()),
            file: None,
            transcript: None,
            only: None,
            format: OutputFormat::Text,
            output: None,
            timeout: None,
        }
    }

    #[test]
    fn test_parse_analyze() {
        let args = Args::try_parse_from([
            "talkscope",
            "analyze",
            "agent: hi",
            "--only",
            "summary,sentiment",
            "--format",
            "json",
        ])
        .unwrap();

        match args.command {
            Command::Analyze(analyze) => {
                assert_eq!(analyze.text.as_deref(), Some("agent: hi"));
                assert_eq!(
                    analyze.only,
                    Some(vec!["summary".to_string(), "sentiment".to_string()])
                );
                assert_eq!(analyze.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_text_conflicts_with_transcript() {
        let result = Args::try_parse_from([
            "talkscope",
            "analyze",
            "--transcript",
            "call_001",
            "agent: hi",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_settings_set() {
        let args = Args::try_parse_from([
            "talkscope",
            "settings",
            "set",
            "sentiment",
            "http://localhost:7860/api/v1/run/abc",
            "--sentiment",
        ])
        .unwrap();

        assert!(matches!(
            args.command,
            Command::Settings {
                action: SettingsAction::Set { sentiment: true, .. }
            }
        ));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Session);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_host() {
        let mut args = make_args(Command::Session);
        args.host = Some("langflow:7860".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout_and_retries() {
        let mut analyze = analyze_args();
        analyze.timeout = Some(0);
        assert!(make_args(Command::Analyze(analyze)).validate().is_err());

        let import = make_args(Command::Flows {
            action: FlowAction::Import {
                dir: None,
                retries: Some(0),
                interval: None,
            },
        });
        assert!(import.validate().is_err());

        assert!(make_args(Command::Analyze(analyze_args())).validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Session);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
