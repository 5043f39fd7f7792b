//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// RoleCouncil - multi-role LLM analysis of construction estimates
///
/// Sends one project to a panel of expert roles (structural engineer,
/// concrete technologist, cost estimator, site manager, scheduler,
/// standards reviewer) and consolidates their answers into one report.
///
/// Examples:
///   rolecouncil --context project.json
///   rolecouncil --context project.json --task formwork --format json
///   rolecouncil --context project.json --ask statik --question "Is the slab too thin?"
///   rolecouncil --context project.json --task betonaz --dry-run
///   rolecouncil --list-roles
///   rolecouncil --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Project context file (JSON)
    ///
    /// Contains project_name, building_type, storeys, structural_systems,
    /// line_items and document_text.
    #[arg(
        short = 'x',
        long,
        value_name = "FILE",
        required_unless_present_any = ["init_config", "list_roles"]
    )]
    pub context: Option<PathBuf>,

    /// Plain-text document whose content replaces the context's document_text
    #[arg(long, value_name = "FILE")]
    pub document: Option<PathBuf>,

    /// Task type to analyze (formwork, concrete_phases, schedule, bedneni, ...)
    ///
    /// Without --task the full roster of roles is consulted.
    #[arg(short, long, value_name = "TYPE", conflicts_with = "ask")]
    pub task: Option<String>,

    /// Ask a single role directly (role id, e.g. statik or rozpočtář)
    #[arg(long, value_name = "ROLE", requires = "question")]
    pub ask: Option<String>,

    /// Question for --ask
    #[arg(long, value_name = "TEXT", requires = "ask")]
    pub question: Option<String>,

    /// List roles and task types, then exit
    #[arg(long)]
    pub list_roles: bool,

    /// Ollama model to use
    ///
    /// Can also be set via ROLECOUNCIL_MODEL env var or .rolecouncil.toml config.
    #[arg(short, long, env = "ROLECOUNCIL_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .rolecouncil.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Timeout for each role call in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Role calls in flight at once
    #[arg(long, value_name = "NUM")]
    pub max_parallel: Option<usize>,

    /// Exit with code 2 when any role failed
    #[arg(long)]
    pub fail_on_partial: bool,

    /// Render the prompts that would be sent, without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .rolecouncil.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
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
        if self.init_config || self.list_roles {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !self.dry_run && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_parallel == Some(0) {
            return Err("Max parallel calls must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref question) = self.question {
            if question.trim().is_empty() {
                return Err("Question must not be empty".to_string());
            }
        }

        for path in [self.context.as_ref(), self.document.as_ref()].into_iter().flatten() {
            if !path.is_file() {
                return Err(format!("File does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    /// Log level for these flags. `config_verbose` is the `general.verbose`
    /// setting; `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
