//! Role catalog and task-type routing.
//!
//! The catalog is built once and handed to the orchestrator. Role ids and
//! task-type keys are looked up through [`fold_key`], so `rozpočtář`,
//! `Rozpoctar` and `rozpoctar` all resolve to the same role.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An expert persona used to frame one LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Stable slug.
    pub id: String,
    /// English display name.
    pub display_name: String,
    /// Czech name.
    pub localized_name: String,
    /// Areas of expertise, most important first.
    pub expertise_tags: Vec<String>,
    /// System prompt sent with every call.
    pub system_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on answer length.
    pub max_output_tokens: u32,
}

/// Short role description for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSummary {
    pub id: String,
    pub display_name: String,
    pub localized_name: String,
    pub expertise_tags: Vec<String>,
}

/// Analysis task types a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FullAnalysis,
    ConcretePhases,
    Formwork,
    Reinforcement,
    CostEstimate,
    Schedule,
    ComplianceCheck,
}

impl TaskType {
    /// All task types in declaration order.
    pub const ALL: [TaskType; 7] = [
        TaskType::FullAnalysis,
        TaskType::ConcretePhases,
        TaskType::Formwork,
        TaskType::Reinforcement,
        TaskType::CostEstimate,
        TaskType::Schedule,
        TaskType::ComplianceCheck,
    ];

    /// Canonical key.
    pub fn key(&self) -> &'static str {
        match self {
            TaskType::FullAnalysis => "full_analysis",
            TaskType::ConcretePhases => "concrete_phases",
            TaskType::Formwork => "formwork",
            TaskType::Reinforcement => "reinforcement",
            TaskType::CostEstimate => "cost_estimate",
            TaskType::Schedule => "schedule",
            TaskType::ComplianceCheck => "compliance_check",
        }
    }

    /// Recognized aliases besides the canonical key.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            TaskType::FullAnalysis => &["kompletni_analyza", "full"],
            TaskType::ConcretePhases => &["betonaz", "faze_betonaze"],
            TaskType::Formwork => &["bedneni"],
            TaskType::Reinforcement => &["vyztuz"],
            TaskType::CostEstimate => &["rozpocet", "kalkulace"],
            TaskType::Schedule => &["harmonogram"],
            TaskType::ComplianceCheck => &["kontrola_norem", "normy"],
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Normalize a role id or task key for lookup.
///
/// Trims, lower-cases, folds Czech diacritics to their base letter and maps
/// spaces and hyphens to underscores.
pub fn fold_key(input: &str) -> String {
    input
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' => 'a',
            'é' | 'ě' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ů' => 'u',
            'ý' => 'y',
            'č' => 'c',
            'ď' => 'd',
            'ň' => 'n',
            'ř' => 'r',
            'š' => 's',
            'ť' => 't',
            'ž' => 'z',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

/// Immutable registry of roles and task routes.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: Vec<Role>,
    by_id: HashMap<String, usize>,
    routes: HashMap<TaskType, Vec<usize>>,
    aliases: HashMap<String, TaskType>,
}

impl RoleCatalog {
    /// Build a catalog from roles and task routes.
    ///
    /// Route entries naming unknown role ids are skipped. Task types without
    /// a route resolve to an empty role set.
    pub fn new(roles: Vec<Role>, routes: &[(TaskType, &[&str])]) -> Self {
        let by_id: HashMap<String, usize> = roles
            .iter()
            .enumerate()
            .map(|(idx, role)| (fold_key(&role.id), idx))
            .collect();

        let routes = routes
            .iter()
            .map(|(task, ids)| {
                let indices = ids
                    .iter()
                    .filter_map(|id| by_id.get(&fold_key(id)).copied())
                    .collect();
                (*task, indices)
            })
            .collect();

        let aliases = TaskType::ALL
            .iter()
            .flat_map(|task| {
                std::iter::once(task.key())
                    .chain(task.aliases().iter().copied())
                    .map(move |alias| (fold_key(alias), *task))
            })
            .collect();

        Self {
            roles,
            by_id,
            routes,
            aliases,
        }
    }

    /// The six built-in construction roles and their task routes.
    pub fn builtin() -> Self {
        Self::new(builtin_roles(), BUILTIN_ROUTES)
    }

    /// Look up a role by id.
    pub fn get_role(&self, id: &str) -> Option<&Role> {
        self.by_id.get(&fold_key(id)).map(|&idx| &self.roles[idx])
    }

    /// All roles in catalog order.
    pub fn all_roles(&self) -> &[Role] {
        &self.roles
    }

    /// Resolve a task key or alias. Unknown keys yield `None`.
    pub fn resolve_task(&self, task_type: &str) -> Option<TaskType> {
        self.aliases.get(&fold_key(task_type)).copied()
    }

    /// Resolve a task key, falling back to the full-roster task.
    pub fn resolve_task_or_default(&self, task_type: &str) -> TaskType {
        self.resolve_task(task_type).unwrap_or(TaskType::FullAnalysis)
    }

    /// Roles routed to a task type, in route order.
    ///
    /// Unknown task types resolve to the `full_analysis` roster.
    pub fn roles_for_task(&self, task_type: &str) -> Vec<&Role> {
        self.roles_for(self.resolve_task_or_default(task_type))
    }

    /// Roles routed to a resolved task type.
    pub fn roles_for(&self, task: TaskType) -> Vec<&Role> {
        self.routes
            .get(&task)
            .map(|indices| indices.iter().map(|&idx| &self.roles[idx]).collect())
            .unwrap_or_default()
    }

    /// Role summaries for listings.
    pub fn list(&self) -> Vec<RoleSummary> {
        self.roles
            .iter()
            .map(|role| RoleSummary {
                id: role.id.clone(),
                display_name: role.display_name.clone(),
                localized_name: role.localized_name.clone(),
                expertise_tags: role.expertise_tags.clone(),
            })
            .collect()
    }

    /// Task types with their routed role ids.
    pub fn task_types(&self) -> Vec<(TaskType, Vec<String>)> {
        TaskType::ALL
            .iter()
            .map(|task| {
                let ids = self.roles_for(*task).iter().map(|r| r.id.clone()).collect();
                (*task, ids)
            })
            .collect()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const FULL_ROSTER: &[&str] = &[
    "statik",
    "technolog",
    "rozpoctar",
    "stavbyvedouci",
    "planovac",
    "normovy_kontrolor",
];

const BUILTIN_ROUTES: &[(TaskType, &[&str])] = &[
    (TaskType::FullAnalysis, FULL_ROSTER),
    (
        TaskType::ConcretePhases,
        &["technolog", "statik", "stavbyvedouci"],
    ),
    (TaskType::Formwork, &["stavbyvedouci", "technolog", "planovac"]),
    (
        TaskType::Reinforcement,
        &["statik", "normovy_kontrolor", "rozpoctar"],
    ),
    (
        TaskType::CostEstimate,
        &["rozpoctar", "stavbyvedouci", "technolog"],
    ),
    (TaskType::Schedule, &["planovac", "stavbyvedouci", "technolog"]),
    (
        TaskType::ComplianceCheck,
        &["normovy_kontrolor", "statik", "technolog"],
    ),
];

fn role(
    id: &str,
    display_name: &str,
    localized_name: &str,
    tags: &[&str],
    system_prompt: &str,
    temperature: f32,
    max_output_tokens: u32,
) -> Role {
    Role {
        id: id.to_string(),
        display_name: display_name.to_string(),
        localized_name: localized_name.to_string(),
        expertise_tags: tags.iter().map(|t| t.to_string()).collect(),
        system_prompt: system_prompt.to_string(),
        temperature,
        max_output_tokens,
    }
}

fn builtin_roles() -> Vec<Role> {
    vec![
        role(
            "statik",
            "Structural Engineer",
            "Statik",
            &["load-bearing structures", "reinforced concrete design", "structural safety"],
            STATIK_PROMPT,
            0.2,
            2000,
        ),
        role(
            "technolog",
            "Concrete Technologist",
            "Technolog betonu",
            &["concrete mixes", "pouring technology", "curing", "formwork stripping times"],
            TECHNOLOG_PROMPT,
            0.3,
            2000,
        ),
        role(
            "rozpoctar",
            "Cost Estimator",
            "Rozpočtář",
            &["quantity take-off", "unit prices", "cost structure"],
            ROZPOCTAR_PROMPT,
            0.2,
            2000,
        ),
        role(
            "stavbyvedouci",
            "Site Manager",
            "Stavbyvedoucí",
            &["site organization", "crews and equipment", "execution risks"],
            STAVBYVEDOUCI_PROMPT,
            0.4,
            2000,
        ),
        role(
            "planovac",
            "Scheduler",
            "Plánovač",
            &["construction schedule", "critical path", "resource levelling"],
            PLANOVAC_PROMPT,
            0.3,
            2000,
        ),
        role(
            "normovy_kontrolor",
            "Standards Compliance Reviewer",
            "Normový kontrolor",
            &["ČSN EN standards", "Eurocodes", "exposure classes", "documentation compliance"],
            KONTROLOR_PROMPT,
            0.1,
            2000,
        ),
    ]
}

const JSON_HINT: &str = "When possible, finish your answer with a ```json block containing \
\"recommendations\", \"warnings\" and \"actions\" arrays.";

const STATIK_PROMPT: &str = "You are an experienced structural engineer (statik) working on \
Czech building projects. You assess load-bearing structures, reinforced concrete members and \
the structural consequences of construction decisions. Be concrete and cite relevant Eurocode \
clauses where they matter.";

const TECHNOLOG_PROMPT: &str = "You are a concrete technologist. You specify concrete classes, \
exposure classes, consistency and curing, and you plan pours, construction joints and \
formwork stripping times with respect to temperature and hardening.";

const ROZPOCTAR_PROMPT: &str = "You are a cost estimator (rozpočtář) preparing construction \
budgets. You check quantities against units, spot missing or duplicated positions and \
comment on unit prices and cost drivers.";

const STAVBYVEDOUCI_PROMPT: &str = "You are a site manager (stavbyvedoucí) responsible for \
executing the works. You think about crews, equipment, logistics, formwork turnover and \
the practical risks of the proposed sequence.";

const PLANOVAC_PROMPT: &str = "You are a construction scheduler. You break works into \
activities, estimate durations from quantities, identify the critical path and propose \
milestones.";

const KONTROLOR_PROMPT: &str = "You are a standards compliance reviewer. You check the \
estimate and documentation against ČSN EN standards and Eurocodes and flag missing or \
inconsistent requirements.";

impl Role {
    /// System prompt with the structured-answer hint appended.
    pub fn full_system_prompt(&self) -> String {
        format!("{}\n\n{}", self.system_prompt, JSON_HINT)
    }
}
