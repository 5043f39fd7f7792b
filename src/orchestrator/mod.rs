//! Multi-role analysis orchestrator.
//!
//! The [`Orchestrator`] picks a role set from the catalog, runs it through
//! the [`BatchExecutor`] and consolidates the answers into an
//! [`AnalysisReport`]. It holds no mutable state; every call is one linear
//! pipeline run.

pub mod batch;

pub use batch::{BatchConfig, BatchExecutor};

use crate::analysis::{extract_structured, ConsolidationLimits, Consolidator};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::llm::CompletionGateway;
use crate::models::{AnalysisContext, AnalysisReport, ReportLabel, ReportMetadata, RoleAnswer};
use crate::prompt::{PromptBuilder, PromptLimits};
use crate::roles::{Role, RoleCatalog, TaskType};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Label used for the full-roster analysis.
pub const FULL_PROJECT_ANALYSIS: &str = "full_project_analysis";

/// Tunables for an [`Orchestrator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub batch: BatchConfig,
    pub prompt: PromptLimits,
    pub consolidation: ConsolidationLimits,
}

/// Façade over catalog, executor and consolidator.
pub struct Orchestrator {
    catalog: Arc<RoleCatalog>,
    gateway: Arc<dyn CompletionGateway>,
    executor: BatchExecutor,
    prompts: PromptBuilder,
    consolidator: Consolidator,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<RoleCatalog>,
        gateway: Arc<dyn CompletionGateway>,
        settings: OrchestratorSettings,
    ) -> Self {
        let prompts = PromptBuilder::new(settings.prompt);
        let executor = BatchExecutor::new(Arc::clone(&gateway), prompts.clone(), settings.batch);

        Self {
            catalog,
            gateway,
            executor,
            prompts,
            consolidator: Consolidator::new(settings.consolidation),
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    /// Consult every role in the catalog.
    pub async fn analyze_project(
        &self,
        context: &AnalysisContext,
    ) -> OrchestratorResult<AnalysisReport> {
        let roles: Vec<&Role> = self.catalog.all_roles().iter().collect();
        info!(
            "Running full project analysis for '{}' with {} roles",
            context.project_name,
            roles.len()
        );

        self.run(
            ReportLabel::Analysis(FULL_PROJECT_ANALYSIS.to_string()),
            TaskType::FullAnalysis,
            roles,
            context,
        )
        .await
    }

    /// Consult the roles routed to `task_type`.
    ///
    /// Unknown task types use the full roster.
    pub async fn analyze_with_roles(
        &self,
        task_type: &str,
        context: &AnalysisContext,
    ) -> OrchestratorResult<AnalysisReport> {
        let task = self.catalog.resolve_task_or_default(task_type);
        if self.catalog.resolve_task(task_type).is_none() {
            warn!("Unknown task type '{}', using {}", task_type, task);
        }

        let roles = self.catalog.roles_for(task);
        info!(
            "Running {} analysis for '{}' with roles {:?}",
            task,
            context.project_name,
            roles.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()
        );

        self.run(
            ReportLabel::Task(task_type.to_string()),
            task,
            roles,
            context,
        )
        .await
    }

    /// Ask a single role a direct question.
    ///
    /// Unlike batch runs, a failed call is returned as an error.
    pub async fn ask_role(
        &self,
        role_id: &str,
        question: &str,
        context: Option<&AnalysisContext>,
    ) -> OrchestratorResult<RoleAnswer> {
        let role = self
            .catalog
            .get_role(role_id)
            .ok_or_else(|| OrchestratorError::RoleNotFound {
                role_id: role_id.to_string(),
            })?;

        info!("Asking role {}", role.id);
        let user_prompt = self.prompts.build_question(role, question, context);
        let started = Instant::now();

        let answer = self
            .executor
            .call_with_timeout(role, role.full_system_prompt(), user_prompt)
            .await
            .map_err(|source| OrchestratorError::Gateway {
                role_id: role.id.clone(),
                source,
            })?;

        let structured = extract_structured(&answer).structured().cloned();

        Ok(RoleAnswer {
            role_id: role.id.clone(),
            role_display_name: role.display_name.clone(),
            localized_name: role.localized_name.clone(),
            question: question.to_string(),
            answer,
            structured,
            duration_ms: started.elapsed().as_millis() as u64,
            model: self.gateway.model_name().to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn run(
        &self,
        label: ReportLabel,
        task: TaskType,
        roles: Vec<&Role>,
        context: &AnalysisContext,
    ) -> OrchestratorResult<AnalysisReport> {
        if roles.is_empty() {
            return Err(OrchestratorError::NoRolesForTask {
                task_type: label.as_str().to_string(),
            });
        }

        let started = Instant::now();
        let results = self.executor.run_roles(&roles, context).await;
        let consolidated = self.consolidator.consolidate_for_task(task, &results);

        let total_duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "{} finished in {}ms: {}/{} roles succeeded",
            label,
            total_duration_ms,
            consolidated.summary.successful_role_count,
            consolidated.summary.total_role_count
        );

        Ok(AnalysisReport {
            label,
            metadata: ReportMetadata {
                roles_used: roles.iter().map(|r| r.id.clone()).collect(),
                total_duration_ms,
                model: self.gateway.model_name().to_string(),
                timestamp: Utc::now(),
            },
            results,
            consolidated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedGateway;
    use crate::models::LineItem;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn orchestrator(gateway: Arc<ScriptedGateway>) -> Orchestrator {
        Orchestrator::new(
            Arc::new(RoleCatalog::builtin()),
            gateway,
            OrchestratorSettings {
                batch: BatchConfig {
                    max_parallel: 3,
                    call_timeout: Duration::from_millis(500),
                },
                ..OrchestratorSettings::default()
            },
        )
    }

    fn echo_gateway() -> ScriptedGateway {
        RoleCatalog::builtin()
            .all_roles()
            .iter()
            .fold(ScriptedGateway::new(), |gw, role| {
                gw.reply(role.system_prompt.clone(), format!("OK from {}", role.id))
            })
    }

    fn context() -> AnalysisContext {
        AnalysisContext {
            line_items: vec![LineItem {
                quantity: Some(42.0),
                unit: Some("m3".to_string()),
                category: Some("concrete".to_string()),
                ..LineItem::new("Beton základů")
            }],
            ..AnalysisContext::new("Polyfunkční dům")
        }
    }

    #[tokio::test]
    async fn test_full_analysis_all_succeed() {
        let orchestrator = orchestrator(Arc::new(echo_gateway()));
        let report = assert_ok!(orchestrator.analyze_project(&context()).await);

        assert_eq!(report.label, ReportLabel::Analysis(FULL_PROJECT_ANALYSIS.to_string()));
        let summary = report.consolidated.summary;
        assert_eq!(summary.successful_role_count, 6);
        assert_eq!(summary.failed_role_count, 0);
        assert_eq!(summary.total_role_count, 6);
        assert_eq!(report.consolidated.recommendations.len(), 6);
        assert_eq!(report.results.len(), report.metadata.roles_used.len());
        assert_eq!(report.metadata.model, "scripted-model");
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let catalog = RoleCatalog::builtin();
        let roles = catalog.all_roles();
        let gateway = ScriptedGateway::new()
            .fail(roles[2].system_prompt.clone(), "backend unavailable")
            .fail(roles[4].system_prompt.clone(), "backend unavailable");
        let gateway = roles.iter().fold(gateway, |gw, role| {
            gw.reply(role.system_prompt.clone(), format!("OK from {}", role.id))
        });

        let report = assert_ok!(orchestrator(Arc::new(gateway)).analyze_project(&context()).await);

        let failed: Vec<&str> = report
            .consolidated
            .failed_analyses
            .iter()
            .map(|f| f.role_id.as_str())
            .collect();
        assert_eq!(failed, vec![roles[2].id.as_str(), roles[4].id.as_str()]);
        assert_eq!(report.consolidated.summary.successful_role_count, 4);
        assert_eq!(report.results.len(), 6);
        assert!(report.is_partial());
    }

    #[tokio::test]
    async fn test_unknown_role_ask_makes_no_call() {
        let gateway = Arc::new(echo_gateway());
        let orchestrator = orchestrator(gateway.clone());

        let err = assert_err!(orchestrator.ask_role("not_a_role", "question", None).await);
        assert!(matches!(err, OrchestratorError::RoleNotFound { .. }));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ask_role_success() {
        let gateway = Arc::new(echo_gateway());
        let orchestrator = orchestrator(gateway.clone());

        let answer = assert_ok!(
            orchestrator
                .ask_role("Rozpočtář", "Is the budget complete?", Some(&context()))
                .await
        );
        assert_eq!(answer.role_id, "rozpoctar");
        assert_eq!(answer.answer, "OK from rozpoctar");
        assert!(answer.structured.is_none());
        assert_eq!(gateway.call_count(), 1);
        assert!(gateway.calls()[0].user_prompt.ends_with("Question:\nIs the budget complete?"));
    }

    #[tokio::test]
    async fn test_ask_role_uses_same_system_prompt_as_batch() {
        let gateway = Arc::new(echo_gateway());
        let orchestrator = orchestrator(gateway.clone());

        assert_ok!(orchestrator.ask_role("statik", "q", None).await);
        assert_ok!(orchestrator.analyze_with_roles("reinforcement", &context()).await);

        let calls = gateway.calls();
        let expected = orchestrator
            .catalog()
            .get_role("statik")
            .unwrap()
            .full_system_prompt();
        assert_eq!(calls[0].system_prompt, expected);
        assert!(calls[1..].iter().any(|call| call.system_prompt == expected));
    }

    #[tokio::test]
    async fn test_ask_role_failure_propagates() {
        let catalog = RoleCatalog::builtin();
        let role = catalog.get_role("statik").unwrap();
        let gateway = Arc::new(ScriptedGateway::new().fail(role.system_prompt.clone(), "down"));

        let err = assert_err!(orchestrator(gateway).ask_role("statik", "q", None).await);
        assert!(
            matches!(err, OrchestratorError::Gateway { ref role_id, .. } if role_id == "statik")
        );
    }

    #[tokio::test]
    async fn test_task_routing() {
        let gateway = Arc::new(echo_gateway());
        let orchestrator = orchestrator(gateway.clone());

        let report = assert_ok!(orchestrator.analyze_with_roles("formwork", &context()).await);

        let expected: Vec<String> = orchestrator
            .catalog()
            .roles_for_task("formwork")
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(report.metadata.roles_used, expected);
        assert_eq!(report.label, ReportLabel::Task("formwork".to_string()));
        assert_eq!(gateway.call_count(), expected.len());
        assert!(report.consolidated.formwork_systems.is_some());
        assert!(report.consolidated.turnover_schedule.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["task_type"], "formwork");
    }

    #[tokio::test]
    async fn test_unknown_task_uses_full_roster() {
        let gateway = Arc::new(echo_gateway());
        let report = assert_ok!(
            orchestrator(gateway.clone())
                .analyze_with_roles("totally_unknown_task", &context())
                .await
        );
        assert_eq!(report.metadata.roles_used.len(), 6);
        assert_eq!(report.label.as_str(), "totally_unknown_task");
    }

    #[tokio::test]
    async fn test_empty_role_set_fails_fast() {
        let catalog = RoleCatalog::new(Vec::new(), &[]);
        let gateway = Arc::new(echo_gateway());
        let orchestrator = Orchestrator::new(
            Arc::new(catalog),
            gateway.clone(),
            OrchestratorSettings::default(),
        );

        let err = assert_err!(orchestrator.analyze_with_roles("formwork", &context()).await);
        assert!(matches!(err, OrchestratorError::NoRolesForTask { .. }));
        assert_eq!(gateway.call_count(), 0);
    }
}
