//! Consolidation of per-role answers.
//!
//! Successful answers are mined for `recommendations`, `warnings` and
//! `actions` arrays; answers without them contribute their (truncated) text
//! as a single recommendation. Failed roles are listed verbatim.

use crate::analysis::extract::{extract_structured, Extracted};
use crate::analysis::task_fields;
use crate::models::{
    ConsolidatedReport, ConsolidationSummary, FailedAnalysis, Finding, RoleExecutionResult,
    RoleOutcome,
};
use crate::roles::TaskType;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

const RECOMMENDATION_KEYS: &[&str] = &["recommendations", "doporuceni"];
const WARNING_KEYS: &[&str] = &["warnings", "varovani", "rizika"];
const ACTION_KEYS: &[&str] = &["actions", "suggested_actions", "akce"];

/// Tunables for consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationLimits {
    /// Characters of raw text kept when an answer has no structured arrays.
    pub raw_fallback_chars: usize,
    /// Characters compared when deduplicating.
    pub dedup_prefix_chars: usize,
}

impl Default for ConsolidationLimits {
    fn default() -> Self {
        Self {
            raw_fallback_chars: 500,
            dedup_prefix_chars: 100,
        }
    }
}

/// Merges role results into a [`ConsolidatedReport`].
#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    limits: ConsolidationLimits,
}

impl Consolidator {
    pub fn new(limits: ConsolidationLimits) -> Self {
        Self { limits }
    }

    /// Generic consolidation.
    pub fn consolidate(&self, results: &[RoleExecutionResult]) -> ConsolidatedReport {
        let mut recommendations = Vec::new();
        let mut warnings = Vec::new();
        let mut suggested_actions = Vec::new();
        let mut failed_analyses = Vec::new();

        for result in results {
            match &result.outcome {
                RoleOutcome::Failure { error_message } => {
                    failed_analyses.push(FailedAnalysis {
                        role_id: result.role_id.clone(),
                        error_message: error_message.clone(),
                    });
                }
                RoleOutcome::Success { raw_response } => {
                    let structured = match extract_structured(raw_response) {
                        Extracted::Structured(value) => Some(value),
                        Extracted::Unstructured(_) => {
                            debug!("No structured data in answer from {}", result.role_id);
                            None
                        }
                    };

                    let recs = structured
                        .as_ref()
                        .and_then(|v| array_field(v, RECOMMENDATION_KEYS));
                    let warns = structured.as_ref().and_then(|v| array_field(v, WARNING_KEYS));
                    let acts = structured.as_ref().and_then(|v| array_field(v, ACTION_KEYS));

                    if recs.is_none() && warns.is_none() && acts.is_none() {
                        recommendations.push(Finding::text(
                            &result.role_id,
                            truncate_chars(raw_response, self.limits.raw_fallback_chars),
                        ));
                        continue;
                    }

                    let to_findings = |items: Option<&Vec<Value>>| -> Vec<Finding> {
                        items
                            .into_iter()
                            .flatten()
                            .map(|item| Finding::from_value(&result.role_id, item))
                            .collect()
                    };
                    recommendations.extend(to_findings(recs));
                    warnings.extend(to_findings(warns));
                    suggested_actions.extend(to_findings(acts));
                }
            }
        }

        let successful_role_count = results.iter().filter(|r| r.is_success()).count();
        let report = ConsolidatedReport {
            summary: ConsolidationSummary {
                successful_role_count,
                failed_role_count: results.len() - successful_role_count,
                total_role_count: results.len(),
            },
            recommendations: dedup_findings(recommendations, self.limits.dedup_prefix_chars),
            warnings: dedup_findings(warnings, self.limits.dedup_prefix_chars),
            suggested_actions,
            failed_analyses,
            ..ConsolidatedReport::default()
        };

        debug!(
            "Consolidated {} results: {} recommendations, {} warnings, {} actions",
            results.len(),
            report.recommendations.len(),
            report.warnings.len(),
            report.suggested_actions.len()
        );

        report
    }

    /// Generic consolidation plus the fields defined for `task`.
    pub fn consolidate_for_task(
        &self,
        task: TaskType,
        results: &[RoleExecutionResult],
    ) -> ConsolidatedReport {
        let mut report = self.consolidate(results);

        match task {
            TaskType::ConcretePhases => {
                report.phases = Some(task_fields::extract_phases(results));
                report.joints = Some(task_fields::extract_joints(results));
                report.sequence = Some(task_fields::extract_sequence(results));
            }
            TaskType::Formwork => {
                report.formwork_systems = Some(task_fields::extract_formwork_systems(results));
                report.turnover_schedule = Some(task_fields::extract_turnover_schedule(results));
            }
            TaskType::Schedule => {
                report.milestones = Some(task_fields::extract_milestones(results));
                report.critical_path = Some(task_fields::extract_critical_path(results));
            }
            TaskType::FullAnalysis
            | TaskType::Reinforcement
            | TaskType::CostEstimate
            | TaskType::ComplianceCheck => {}
        }

        report
    }
}

/// First array found under any of `keys` in a JSON object.
pub(crate) fn array_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_array))
}

/// At most `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Case-insensitive prefix used for deduplication.
pub fn dedup_key(finding: &Finding, prefix_chars: usize) -> String {
    finding
        .comparison_text()
        .chars()
        .take(prefix_chars)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Drop findings whose dedup key was already seen; the first occurrence wins.
pub fn dedup_findings(findings: Vec<Finding>, prefix_chars: usize) -> Vec<Finding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|finding| seen.insert(dedup_key(finding, prefix_chars)))
        .collect()
}
