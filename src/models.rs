//! Data models for the role orchestrator.
//!
//! This module contains the core data structures passed between the
//! catalog, the batch executor, the consolidator and the report generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single line item (position) of a construction estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Free-text description of the work or material.
    pub description: String,
    /// Quantity in `unit`, if known.
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Unit of measure (m3, m2, t, ks, ...).
    #[serde(default)]
    pub unit: Option<String>,
    /// Explicit category assigned by the caller.
    #[serde(default)]
    pub category: Option<String>,
    /// Work type detected during import; used when no category is set.
    #[serde(default)]
    pub work_type: Option<String>,
}

impl LineItem {
    /// Creates an item with only a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Returns the key used to group this item in prompts.
    ///
    /// Category wins over work type; blank values count as missing.
    pub fn group_key(&self) -> &str {
        [self.category.as_deref(), self.work_type.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(OTHER_GROUP)
    }
}

/// Bucket name for items with neither a category nor a work type.
pub const OTHER_GROUP: &str = "other";

/// Input snapshot for one orchestration call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Name of the project being analyzed.
    pub project_name: String,
    /// Building type (residential, industrial, bridge, ...).
    #[serde(default)]
    pub building_type: Option<String>,
    /// Number of storeys above ground.
    #[serde(default)]
    pub storeys: Option<u32>,
    /// Structural systems in use.
    #[serde(default)]
    pub structural_systems: Vec<String>,
    /// Line items of the estimate.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Optional free document text (technical report, tender notes).
    #[serde(default)]
    pub document_text: Option<String>,
}

impl AnalysisContext {
    /// Creates an empty context for the named project.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a single role call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoleOutcome {
    /// The gateway returned an answer.
    Success {
        /// The model's answer, untouched.
        raw_response: String,
    },
    /// The call failed, timed out or returned a non-success response.
    Failure {
        /// Human-readable failure reason.
        error_message: String,
    },
}

/// Result of executing one role within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleExecutionResult {
    /// Stable role id.
    pub role_id: String,
    /// Display name of the role.
    pub role_display_name: String,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
    /// Success or failure payload.
    #[serde(flatten)]
    pub outcome: RoleOutcome,
}

impl RoleExecutionResult {
    /// Creates a successful result.
    pub fn success(
        role_id: impl Into<String>,
        role_display_name: impl Into<String>,
        raw_response: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            role_display_name: role_display_name.into(),
            duration_ms,
            outcome: RoleOutcome::Success {
                raw_response: raw_response.into(),
            },
        }
    }

    /// Creates a failed result.
    pub fn failure(
        role_id: impl Into<String>,
        role_display_name: impl Into<String>,
        error_message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            role_display_name: role_display_name.into(),
            duration_ms,
            outcome: RoleOutcome::Failure {
                error_message: error_message.into(),
            },
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RoleOutcome::Success { .. })
    }

    /// The raw answer, if the call succeeded.
    pub fn raw_response(&self) -> Option<&str> {
        match &self.outcome {
            RoleOutcome::Success { raw_response } => Some(raw_response),
            RoleOutcome::Failure { .. } => None,
        }
    }

    /// The failure reason, if the call failed.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            RoleOutcome::Success { .. } => None,
            RoleOutcome::Failure { error_message } => Some(error_message),
        }
    }
}

/// One recommendation, warning, action or task-specific entry, attributed to a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Role that produced the entry.
    pub role_id: String,
    /// Readable text of the entry.
    pub text: String,
    /// Original structured entry when the model returned an object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl Finding {
    /// Creates a plain-text finding.
    pub fn text(role_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            text: text.into(),
            detail: None,
        }
    }

    /// Creates a finding from a JSON entry of a structured answer.
    ///
    /// Strings become plain text; objects keep their structure in `detail`
    /// and borrow a readable label from common text fields.
    pub fn from_value(role_id: impl Into<String>, value: &Value) -> Self {
        let role_id = role_id.into();
        match value {
            Value::String(s) => Self::text(role_id, s.clone()),
            other => {
                let label = other
                    .as_object()
                    .and_then(|obj| {
                        ["text", "description", "title", "name", "popis", "nazev"]
                            .iter()
                            .find_map(|key| obj.get(*key).and_then(Value::as_str))
                    })
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string());
                Self {
                    role_id,
                    text: label,
                    detail: Some(other.clone()),
                }
            }
        }
    }

    /// Text compared during deduplication.
    ///
    /// Structured entries compare by their serialized form.
    pub fn comparison_text(&self) -> String {
        match &self.detail {
            Some(detail) => detail.to_string(),
            None => self.text.clone(),
        }
    }
}

/// A role whose call failed, as listed in the consolidated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAnalysis {
    /// Role id.
    pub role_id: String,
    /// Failure reason copied from the execution result.
    pub error_message: String,
}

/// Success/failure counts of a consolidated report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationSummary {
    /// Roles that returned an answer.
    pub successful_role_count: usize,
    /// Roles whose call failed.
    pub failed_role_count: usize,
    /// All roles consulted.
    pub total_role_count: usize,
}

/// Merged view of all role answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    /// Success/failure counts.
    pub summary: ConsolidationSummary,
    /// Deduplicated recommendations.
    pub recommendations: Vec<Finding>,
    /// Deduplicated warnings.
    pub warnings: Vec<Finding>,
    /// Suggested follow-up actions.
    pub suggested_actions: Vec<Finding>,
    /// Roles whose call failed.
    pub failed_analyses: Vec<FailedAnalysis>,

    /// Concreting phases (concrete_phases task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<Finding>>,
    /// Construction and dilatation joints (concrete_phases task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joints: Option<Vec<Finding>>,
    /// Pour sequence (concrete_phases task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<Finding>>,
    /// Proposed formwork systems (formwork task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formwork_systems: Option<Vec<Finding>>,
    /// Formwork turnover schedule (formwork task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnover_schedule: Option<Vec<Finding>>,
    /// Schedule milestones (schedule task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestones: Option<Vec<Finding>>,
    /// Critical path activities (schedule task).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_path: Option<Vec<Finding>>,
}

/// Label of a report: the task type for routed calls, the analysis type
/// for the full-roster call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportLabel {
    #[serde(rename = "task_type")]
    Task(String),
    #[serde(rename = "analysis_type")]
    Analysis(String),
}

impl ReportLabel {
    /// The label value.
    pub fn as_str(&self) -> &str {
        match self {
            ReportLabel::Task(s) | ReportLabel::Analysis(s) => s,
        }
    }
}

impl fmt::Display for ReportLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution metadata of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Role ids consulted, in execution order.
    pub roles_used: Vec<String>,
    /// Duration of the whole orchestration in milliseconds.
    pub total_duration_ms: u64,
    /// Model that served the calls.
    pub model: String,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
}

/// Top-level result of `analyze_project` and `analyze_with_roles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Task or analysis type.
    #[serde(flatten)]
    pub label: ReportLabel,
    /// Per-role results in role order.
    pub results: Vec<RoleExecutionResult>,
    /// Consolidated summary.
    pub consolidated: ConsolidatedReport,
    /// Execution metadata.
    pub metadata: ReportMetadata,
}

impl AnalysisReport {
    /// Whether any role failed.
    pub fn is_partial(&self) -> bool {
        self.consolidated.summary.failed_role_count > 0
    }
}

/// Answer of a single role to a direct question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAnswer {
    /// Role id.
    pub role_id: String,
    /// Display name of the role.
    pub role_display_name: String,
    /// Localized name of the role.
    pub localized_name: String,
    /// The question asked.
    pub question: String,
    /// The model's answer, untouched.
    pub answer: String,
    /// Structured data recovered from the answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    /// Duration of the call in milliseconds.
    pub duration_ms: u64,
    /// Model that served the call.
    pub model: String,
    /// When the answer was produced.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_key_precedence() {
        let mut item = LineItem::new("Beton C30/37");
        assert_eq!(item.group_key(), OTHER_GROUP);

        item.work_type = Some("concrete".to_string());
        assert_eq!(item.group_key(), "concrete");

        item.category = Some("  ".to_string());
        assert_eq!(item.group_key(), "concrete");

        item.category = Some("Foundations".to_string());
        assert_eq!(item.group_key(), "Foundations");
    }

    #[test]
    fn test_execution_result_accessors() {
        let ok = RoleExecutionResult::success("statik", "Structural Engineer", "fine", 12);
        assert!(ok.is_success());
        assert_eq!(ok.raw_response(), Some("fine"));
        assert_eq!(ok.error_message(), None);

        let failed = RoleExecutionResult::failure("statik", "Structural Engineer", "boom", 3);
        assert!(!failed.is_success());
        assert_eq!(failed.raw_response(), None);
        assert_eq!(failed.error_message(), Some("boom"));
    }

    #[test]
    fn test_execution_result_serialization() {
        let ok = RoleExecutionResult::success("statik", "Structural Engineer", "fine", 12);
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["raw_response"], "fine");
        assert_eq!(value["duration_ms"], 12);
    }

    #[test]
    fn test_finding_from_value() {
        let plain = Finding::from_value("statik", &json!("Check the slab"));
        assert_eq!(plain.text, "Check the slab");
        assert!(plain.detail.is_none());

        let structured = Finding::from_value(
            "statik",
            &json!({"title": "Slab deflection", "priority": "high"}),
        );
        assert_eq!(structured.text, "Slab deflection");
        assert!(structured.comparison_text().contains("priority"));

        let unlabeled = Finding::from_value("statik", &json!(42));
        assert_eq!(unlabeled.text, "42");
    }

    #[test]
    fn test_report_label_flattening() {
        let report = AnalysisReport {
            label: ReportLabel::Task("formwork".to_string()),
            results: vec![],
            consolidated: ConsolidatedReport::default(),
            metadata: ReportMetadata {
                roles_used: vec![],
                total_duration_ms: 0,
                model: "test".to_string(),
                timestamp: Utc::now(),
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["task_type"], "formwork");
        assert!(value.get("analysis_type").is_none());
        assert!(value["consolidated"].get("phases").is_none());
    }

    #[test]
    fn test_context_deserializes_with_defaults() {
        let ctx: AnalysisContext =
            serde_json::from_str(r#"{"project_name": "Bytový dům"}"#).unwrap();
        assert_eq!(ctx.project_name, "Bytový dům");
        assert!(ctx.line_items.is_empty());
        assert!(ctx.document_text.is_none());
    }
}
