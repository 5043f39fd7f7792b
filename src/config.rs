//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.rolecouncil.toml` files.

use crate::analysis::ConsolidationLimits;
use crate::llm::OllamaGatewayConfig;
use crate::orchestrator::{BatchConfig, OrchestratorSettings};
use crate::prompt::PromptLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".rolecouncil.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Batch execution settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Prompt rendering settings.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Consolidation settings.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "rolecouncil_report.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Model used for expert reasoning calls; defaults to `name`.
    #[serde(default)]
    pub reasoning_name: Option<String>,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            reasoning_name: None,
            ollama_url: default_ollama_url(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Batch execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Role calls in flight at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel_calls: usize,

    /// Timeout for a single role call in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_calls: default_max_parallel(),
            call_timeout_seconds: default_call_timeout(),
        }
    }
}

fn default_max_parallel() -> usize {
    3
}

fn default_call_timeout() -> u64 {
    60
}

/// Prompt rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Items listed per category before eliding.
    #[serde(default = "default_items_per_group")]
    pub max_items_per_group: usize,

    /// Characters of document text included in prompts.
    #[serde(default = "default_document_budget")]
    pub document_char_budget: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_items_per_group: default_items_per_group(),
            document_char_budget: default_document_budget(),
        }
    }
}

fn default_items_per_group() -> usize {
    10
}

fn default_document_budget() -> usize {
    3000
}

/// Consolidation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Characters of an unstructured answer kept as a recommendation.
    #[serde(default = "default_raw_fallback")]
    pub raw_fallback_chars: usize,

    /// Prefix length compared when deduplicating.
    #[serde(default = "default_dedup_prefix")]
    pub dedup_prefix_chars: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            raw_fallback_chars: default_raw_fallback(),
            dedup_prefix_chars: default_dedup_prefix(),
        }
    }
}

fn default_raw_fallback() -> usize {
    500
}

fn default_dedup_prefix() -> usize {
    100
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include each role's raw answer in Markdown reports.
    #[serde(default = "default_true")]
    pub include_raw_responses: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_raw_responses: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.rolecouncil.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.orchestrator.call_timeout_seconds = timeout;
        }
        if let Some(max_parallel) = args.max_parallel {
            self.orchestrator.max_parallel_calls = max_parallel;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Orchestrator tunables derived from this configuration.
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            batch: BatchConfig {
                max_parallel: self.orchestrator.max_parallel_calls,
                call_timeout: Duration::from_secs(self.orchestrator.call_timeout_seconds),
            },
            prompt: PromptLimits {
                max_items_per_group: self.prompt.max_items_per_group,
                document_char_budget: self.prompt.document_char_budget,
            },
            consolidation: ConsolidationLimits {
                raw_fallback_chars: self.consolidation.raw_fallback_chars,
                dedup_prefix_chars: self.consolidation.dedup_prefix_chars,
            },
        }
    }

    /// Gateway connection settings derived from this configuration.
    pub fn gateway_config(&self) -> OllamaGatewayConfig {
        OllamaGatewayConfig {
            ollama_url: self.model.ollama_url.clone(),
            model_name: self.model.name.clone(),
            reasoning_model: self.model.reasoning_name.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
