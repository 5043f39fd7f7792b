//! Markdown and JSON report generation.
//!
//! This module renders [`AnalysisReport`]s and single-role [`RoleAnswer`]s
//! for the command line.

use crate::models::{
    AnalysisReport, ConsolidatedReport, Finding, ReportMetadata, RoleAnswer, RoleOutcome,
};
use anyhow::Result;
use serde::Serialize;

/// Rendering options.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Include each role's raw answer.
    pub include_raw_responses: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_raw_responses: true,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport, options: RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Expert Panel Report: {}\n\n", report.label));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.consolidated));
    output.push_str(&generate_findings_section(
        "Recommendations",
        &report.consolidated.recommendations,
    ));
    output.push_str(&generate_findings_section("Warnings", &report.consolidated.warnings));
    output.push_str(&generate_findings_section(
        "Suggested Actions",
        &report.consolidated.suggested_actions,
    ));
    output.push_str(&generate_task_sections(&report.consolidated));
    output.push_str(&generate_failures_section(&report.consolidated));

    if options.include_raw_responses {
        output.push_str(&generate_role_answers_section(report));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Date:** {}\n",
        metadata.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model));
    section.push_str(&format!("- **Roles:** {}\n", metadata.roles_used.join(", ")));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.total_duration_ms as f64 / 1000.0
    ));
    section.push('\n');

    section
}

/// Generate the success/failure summary table.
fn generate_summary_section(consolidated: &ConsolidatedReport) -> String {
    let summary = &consolidated.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Succeeded | Failed | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | **{}** |\n\n",
        summary.successful_role_count, summary.failed_role_count, summary.total_role_count
    ));

    if summary.failed_role_count > 0 {
        section.push_str("> ⚠️ Partial result: some roles did not answer.\n\n");
    }

    section
}

/// Generate a numbered list of findings, or nothing when empty.
fn generate_findings_section(title: &str, findings: &[Finding]) -> String {
    if findings.is_empty() {
        return String::new();
    }

    let mut section = format!("## {}\n\n", title);
    for (i, finding) in findings.iter().enumerate() {
        section.push_str(&format!(
            "{}. {} *({})*\n",
            i + 1,
            single_line(&finding.text),
            finding.role_id
        ));
    }
    section.push('\n');

    section
}

fn generate_task_sections(consolidated: &ConsolidatedReport) -> String {
    let fields = [
        ("Concreting Phases", &consolidated.phases),
        ("Joints", &consolidated.joints),
        ("Pour Sequence", &consolidated.sequence),
        ("Formwork Systems", &consolidated.formwork_systems),
        ("Formwork Turnover", &consolidated.turnover_schedule),
        ("Milestones", &consolidated.milestones),
        ("Critical Path", &consolidated.critical_path),
    ];

    let mut output = String::new();
    for (title, field) in fields {
        let Some(findings) = field else {
            continue;
        };
        if findings.is_empty() {
            output.push_str(&format!("## {}\n\nNo entries found.\n\n", title));
        } else {
            output.push_str(&generate_findings_section(title, findings));
        }
    }

    output
}

fn generate_failures_section(consolidated: &ConsolidatedReport) -> String {
    if consolidated.failed_analyses.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Failed Analyses\n\n");
    section.push_str("| Role | Error |\n");
    section.push_str("|:---|:---|\n");
    for failure in &consolidated.failed_analyses {
        section.push_str(&format!(
            "| `{}` | {} |\n",
            failure.role_id,
            single_line(&failure.error_message)
        ));
    }
    section.push('\n');

    section
}

fn generate_role_answers_section(report: &AnalysisReport) -> String {
    let mut section = String::new();
    section.push_str("## Role Answers\n\n");

    for result in &report.results {
        section.push_str(&format!(
            "### {} (`{}`)\n\n*{}ms*\n\n",
            result.role_display_name, result.role_id, result.duration_ms
        ));
        match &result.outcome {
            RoleOutcome::Success { raw_response } => {
                section.push_str("<details>\n<summary>View answer</summary>\n\n");
                section.push_str(raw_response.trim());
                section.push_str("\n\n</details>\n\n");
            }
            RoleOutcome::Failure { error_message } => {
                section.push_str(&format!("❌ {}\n\n", single_line(error_message)));
            }
        }
    }

    section
}

/// Generate a Markdown rendering of a single-role answer.
pub fn generate_markdown_answer(answer: &RoleAnswer) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# {} ({})\n\n",
        answer.role_display_name, answer.localized_name
    ));
    output.push_str(&format!("- **Model Used:** `{}`\n", answer.model));
    output.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        answer.duration_ms as f64 / 1000.0
    ));
    output.push_str(&format!("## Question\n\n{}\n\n", answer.question.trim()));
    output.push_str(&format!("## Answer\n\n{}\n\n", answer.answer.trim()));
    output.push_str(&generate_footer());

    output
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by RoleCouncil*\n".to_string()
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").replace('|', "\\|")
}

/// Generate a JSON rendering of any report value.
pub fn generate_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
