//! RoleCouncil - multi-role analysis orchestrator.
//!
//! Fans one analytical question about a construction project out to a panel
//! of expert role prompts, runs them against a text-completion backend in
//! bounded-concurrency waves, and consolidates the free-text answers into
//! recommendations, warnings and actions.
//!
//! ```no_run
//! use rolecouncil::{AnalysisContext, Orchestrator, OrchestratorSettings, RoleCatalog};
//! use rolecouncil::llm::{OllamaGateway, OllamaGatewayConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let gateway = Arc::new(OllamaGateway::new(OllamaGatewayConfig::default())?);
//! let orchestrator = Orchestrator::new(
//!     Arc::new(RoleCatalog::builtin()),
//!     gateway,
//!     OrchestratorSettings::default(),
//! );
//! let report = orchestrator
//!     .analyze_with_roles("formwork", &AnalysisContext::new("Bytový dům"))
//!     .await?;
//! println!("{} recommendations", report.consolidated.recommendations.len());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod report;
pub mod roles;

pub use error::{OrchestratorError, OrchestratorResult};
pub use models::{AnalysisContext, AnalysisReport, LineItem, RoleAnswer};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use roles::RoleCatalog;
