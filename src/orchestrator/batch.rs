//! Bounded-concurrency role execution.
//!
//! Roles are split into consecutive windows of `max_parallel` roles. Windows
//! run one after another; the calls of one window run concurrently and the
//! next window starts only when all of them have settled. Output order
//! always matches input order.

use crate::llm::{CompletionGateway, CompletionRequest, GatewayError, TaskKind};
use crate::models::{AnalysisContext, RoleExecutionResult};
use crate::prompt::PromptBuilder;
use crate::roles::Role;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Settings for [`BatchExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Calls in flight per window.
    pub max_parallel: usize,
    /// Upper bound on a single call.
    pub call_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Runs role prompts against a gateway in sequential windows.
#[derive(Clone)]
pub struct BatchExecutor {
    gateway: Arc<dyn CompletionGateway>,
    prompts: PromptBuilder,
    config: BatchConfig,
}

impl BatchExecutor {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        prompts: PromptBuilder,
        config: BatchConfig,
    ) -> Self {
        Self {
            gateway,
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run every role once and return one result per role, in input order.
    pub async fn run_roles(
        &self,
        roles: &[&Role],
        context: &AnalysisContext,
    ) -> Vec<RoleExecutionResult> {
        let window_size = self.config.max_parallel.max(1);
        let mut results = Vec::with_capacity(roles.len());

        for (wave, window) in roles.chunks(window_size).enumerate() {
            debug!(
                "Starting wave {} with {} roles: {:?}",
                wave + 1,
                window.len(),
                window.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()
            );

            let settled = join_all(window.iter().map(|role| self.run_role(role, context))).await;

            let failures = settled.iter().filter(|r| !r.is_success()).count();
            debug!(
                "Wave {} settled: {} succeeded, {} failed",
                wave + 1,
                settled.len() - failures,
                failures
            );

            results.extend(settled);
        }

        results
    }

    /// One role call; every failure becomes a failed result.
    async fn run_role(&self, role: &Role, context: &AnalysisContext) -> RoleExecutionResult {
        let user_prompt = self.prompts.build_prompt(role, context);
        let started = Instant::now();

        let outcome = self
            .call_with_timeout(role, role.full_system_prompt(), user_prompt)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(answer) => {
                info!("Role {} answered in {}ms", role.id, duration_ms);
                RoleExecutionResult::success(&role.id, &role.display_name, answer, duration_ms)
            }
            Err(e) => {
                warn!("Role {} failed after {}ms: {}", role.id, duration_ms, e);
                RoleExecutionResult::failure(
                    &role.id,
                    &role.display_name,
                    e.to_string(),
                    duration_ms,
                )
            }
        }
    }

    /// Issue one gateway call bounded by the configured timeout.
    pub(crate) async fn call_with_timeout(
        &self,
        role: &Role,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<String, GatewayError> {
        let request = CompletionRequest {
            task_kind: TaskKind::ComplexReasoning,
            system_prompt,
            user_prompt,
            temperature: role.temperature,
            max_tokens: role.max_output_tokens,
            timeout: self.config.call_timeout,
        };

        tokio::time::timeout(self.config.call_timeout, self.gateway.complete(request))
            .await
            .map_err(|_| GatewayError::Timeout(self.config.call_timeout))
            .and_then(|inner| inner)
    }
}
