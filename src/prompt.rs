//! Per-role user prompt assembly.
//!
//! A prompt is an ordered list of [`PromptSection`]s. Each section renders
//! independently and may be absent; present sections are joined with a
//! blank line.

use crate::models::{AnalysisContext, LineItem};
use crate::roles::Role;

/// Limits applied while rendering prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    /// Items shown per category group before eliding the rest.
    pub max_items_per_group: usize,
    /// Characters of document text included before truncation.
    pub document_char_budget: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_items_per_group: 10,
            document_char_budget: 3000,
        }
    }
}

/// One block of a rendered prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSection {
    /// `Project: <name>`.
    Header,
    /// Building type, storeys and structural systems.
    Metadata,
    /// Line items grouped by category.
    LineItems,
    /// Truncated document text.
    DocumentExcerpt,
    /// Role-specific instructions.
    TaskInstructions,
}

impl PromptSection {
    /// Render this section, or `None` when there is nothing to say.
    pub fn render(
        &self,
        role: &Role,
        context: &AnalysisContext,
        limits: &PromptLimits,
    ) -> Option<String> {
        match self {
            PromptSection::Header => Some(render_header(context)),
            PromptSection::Metadata => render_metadata(context),
            PromptSection::LineItems => render_line_items(&context.line_items, limits),
            PromptSection::DocumentExcerpt => context
                .document_text
                .as_deref()
                .and_then(|text| render_document(text, limits.document_char_budget)),
            PromptSection::TaskInstructions => Some(render_instructions(role)),
        }
    }
}

/// Renders the user prompt sent with each role call.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
    limits: PromptLimits,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptLimits::default())
    }
}

impl PromptBuilder {
    /// Builder with the standard section order.
    pub fn new(limits: PromptLimits) -> Self {
        Self {
            sections: vec![
                PromptSection::Header,
                PromptSection::Metadata,
                PromptSection::LineItems,
                PromptSection::DocumentExcerpt,
                PromptSection::TaskInstructions,
            ],
            limits,
        }
    }

    pub fn limits(&self) -> &PromptLimits {
        &self.limits
    }

    /// Render the analysis prompt for a role.
    pub fn build_prompt(&self, role: &Role, context: &AnalysisContext) -> String {
        self.sections
            .iter()
            .filter_map(|section| section.render(role, context, &self.limits))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render a direct question, with the context sections when a context is given.
    pub fn build_question(
        &self,
        role: &Role,
        question: &str,
        context: Option<&AnalysisContext>,
    ) -> String {
        let question_block = format!("Question:\n{}", question.trim());

        let Some(context) = context else {
            return question_block;
        };

        self.sections
            .iter()
            .filter(|section| **section != PromptSection::TaskInstructions)
            .filter_map(|section| section.render(role, context, &self.limits))
            .chain(std::iter::once(question_block))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn render_header(context: &AnalysisContext) -> String {
    format!("Project: {}", context.project_name)
}

fn render_metadata(context: &AnalysisContext) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(building_type) = context
        .building_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        lines.push(format!("Building type: {}", building_type));
    }
    if let Some(storeys) = context.storeys {
        lines.push(format!("Storeys: {}", storeys));
    }
    if !context.structural_systems.is_empty() {
        lines.push(format!(
            "Structural systems: {}",
            context.structural_systems.join(", ")
        ));
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Group items by [`LineItem::group_key`], keeping first-appearance order.
pub fn group_line_items(items: &[LineItem]) -> Vec<(&str, Vec<&LineItem>)> {
    let mut groups: Vec<(&str, Vec<&LineItem>)> = Vec::new();

    for item in items {
        let key = item.group_key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(item),
            None => groups.push((key, vec![item])),
        }
    }

    groups
}

fn render_item(item: &LineItem) -> String {
    match (item.quantity, item.unit.as_deref()) {
        (Some(qty), Some(unit)) => format!("- {}: {} {}", item.description, qty, unit),
        (Some(qty), None) => format!("- {}: {}", item.description, qty),
        _ => format!("- {}", item.description),
    }
}

fn render_line_items(items: &[LineItem], limits: &PromptLimits) -> Option<String> {
    if items.is_empty() {
        return None;
    }

    let mut section = format!("Line items ({} total):", items.len());

    for (group, members) in group_line_items(items) {
        section.push_str(&format!("\n\n[{}] ({} items)", group, members.len()));
        for item in members.iter().take(limits.max_items_per_group) {
            section.push('\n');
            section.push_str(&render_item(item));
        }
        if members.len() > limits.max_items_per_group {
            section.push_str(&format!(
                "\n...and {} more",
                members.len() - limits.max_items_per_group
            ));
        }
    }

    Some(section)
}

fn render_document(text: &str, budget: usize) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let total = text.chars().count();
    if total <= budget {
        return Some(format!("Project documentation:\n{}", text));
    }

    let excerpt: String = text.chars().take(budget).collect();
    Some(format!(
        "Project documentation:\n{}\n[Document truncated: showing {} of {} characters]",
        excerpt, budget, total
    ))
}

fn render_instructions(role: &Role) -> String {
    match role_instructions(&role.id) {
        Some(text) => format!("Your task:\n{}", text),
        None => format!(
            "Your task:\nAnalyze the project from the perspective of your expertise ({}). \
List concrete recommendations, warnings and suggested actions.",
            role.expertise_tags.join(", ")
        ),
    }
}

fn role_instructions(role_id: &str) -> Option<&'static str> {
    let text = match crate::roles::fold_key(role_id).as_str() {
        "statik" => {
            "Review the structural systems and load-bearing positions. Flag members whose \
quantities look inconsistent with the building size, missing reinforcement positions and \
structural risks of the proposed execution."
        }
        "technolog" => {
            "Propose concreting phases with construction joints and a pour sequence. Specify \
concrete classes and exposure classes, curing measures and formwork stripping times."
        }
        "rozpoctar" => {
            "Check quantities against units, find missing or duplicated positions and \
comment on the main cost drivers and unit price risks."
        }
        "stavbyvedouci" => {
            "Assess executability: crews, equipment, formwork systems and their turnover, \
site logistics and execution risks."
        }
        "planovac" => {
            "Derive a construction schedule from the quantities: main activities with \
durations, milestones and the critical path."
        }
        "normovy_kontrolor" => {
            "Check the estimate and documentation against ČSN EN standards and Eurocodes. \
List missing requirements and inconsistencies."
        }
        _ => return None,
    };
    Some(text)
}
