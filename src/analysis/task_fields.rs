//! Task-specific report fields.
//!
//! Each extractor prefers a structured array under one of its keys and
//! otherwise collects list-item lines of the raw answer that mention one of
//! its keywords. Extractors never fail; no content yields an empty list.

use crate::analysis::consolidator::array_field;
use crate::analysis::extract::extract_structured;
use crate::models::{Finding, RoleExecutionResult};
use crate::roles::fold_key;

/// Keywords are matched against whole words of the folded line. A trailing
/// `*` turns a keyword into a stem that matches any word starting with it.
struct FieldSpec {
    keys: &'static [&'static str],
    keywords: &'static [&'static str],
}

const PHASES: FieldSpec = FieldSpec {
    keys: &["phases", "concreting_phases", "faze", "etapy"],
    keywords: &["phase*", "faz*", "etap*", "zaber*"],
};

const JOINTS: FieldSpec = FieldSpec {
    keys: &["joints", "construction_joints", "spary", "pracovni_spary"],
    keywords: &["joint*", "spar*"],
};

const SEQUENCE: FieldSpec = FieldSpec {
    keys: &["sequence", "pour_sequence", "postup", "poradi"],
    keywords: &["sequence*", "poradi", "postup*"],
};

const FORMWORK_SYSTEMS: FieldSpec = FieldSpec {
    keys: &["formwork_systems", "formwork", "systemy_bedneni", "bedneni"],
    keywords: &["formwork*", "bedn*", "peri", "doka"],
};

const TURNOVER_SCHEDULE: FieldSpec = FieldSpec {
    keys: &["turnover_schedule", "turnover", "obratkovost"],
    keywords: &["turnover*", "obratk*", "cycle", "cycles", "cykl*"],
};

const MILESTONES: FieldSpec = FieldSpec {
    keys: &["milestones", "milniky"],
    keywords: &["milestone*", "milnik*"],
};

const CRITICAL_PATH: FieldSpec = FieldSpec {
    keys: &["critical_path", "kriticka_cesta"],
    keywords: &["critical*", "kritick*"],
};

pub fn extract_phases(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &PHASES)
}

pub fn extract_joints(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &JOINTS)
}

pub fn extract_sequence(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &SEQUENCE)
}

pub fn extract_formwork_systems(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &FORMWORK_SYSTEMS)
}

pub fn extract_turnover_schedule(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &TURNOVER_SCHEDULE)
}

pub fn extract_milestones(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &MILESTONES)
}

pub fn extract_critical_path(results: &[RoleExecutionResult]) -> Vec<Finding> {
    extract_field(results, &CRITICAL_PATH)
}

fn extract_field(results: &[RoleExecutionResult], spec: &FieldSpec) -> Vec<Finding> {
    let mut findings = Vec::new();

    for result in results {
        let Some(raw) = result.raw_response() else {
            continue;
        };

        let extracted = extract_structured(raw);
        if let Some(items) = extracted
            .structured()
            .and_then(|value| array_field(value, spec.keys))
        {
            findings.extend(
                items
                    .iter()
                    .map(|item| Finding::from_value(&result.role_id, item)),
            );
            continue;
        }

        findings.extend(
            list_items(raw)
                .filter(|line| mentions_any(line, spec.keywords))
                .map(|line| Finding::text(&result.role_id, line)),
        );
    }

    findings
}

/// Bullet or numbered lines with their marker stripped.
fn list_items(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        let rest = if let Some(rest) = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .or_else(|| line.strip_prefix("• "))
        {
            rest
        } else {
            let digits = line.chars().take_while(char::is_ascii_digit).count();
            if digits == 0 {
                return None;
            }
            line[digits..]
                .strip_prefix(". ")
                .or_else(|| line[digits..].strip_prefix(") "))?
        };
        let rest = rest.trim();
        (!rest.is_empty()).then_some(rest)
    })
}

fn mentions_any(line: &str, keywords: &[&str]) -> bool {
    let folded = fold_key(line);
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    keywords.iter().any(|kw| match kw.strip_suffix('*') {
        Some(stem) => words.iter().any(|word| word.starts_with(stem)),
        None => words.contains(kw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(role: &str, text: &str) -> RoleExecutionResult {
        RoleExecutionResult::success(role, role, text, 1)
    }

    #[test]
    fn test_structured_phases() {
        let raw = r#"```json
{"phases": [{"name": "Základová deska", "volume_m3": 85}, "Stěny 1.NP"]}
```"#;
        let phases = extract_phases(&[ok("technolog", raw)]);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].text, "Základová deska");
        assert_eq!(phases[1].text, "Stěny 1.NP");
    }

    #[test]
    fn test_text_fallback_phases_and_joints() {
        let raw = "Proposal:\n\
- Fáze 1: základová deska\n\
- Fáze 2: stěny suterénu\n\
- Pracovní spára nad základovou deskou\n\
Some prose mentioning a phase outside a list.\n\
3. Etapa 3: stropní deska";
        let results = [ok("technolog", raw)];

        let phases = extract_phases(&results);
        let texts: Vec<&str> = phases.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Fáze 1: základová deska",
                "Fáze 2: stěny suterénu",
                "Etapa 3: stropní deska",
            ]
        );

        let joints = extract_joints(&results);
        assert_eq!(joints.len(), 1);
        assert_eq!(joints[0].role_id, "technolog");
    }

    #[test]
    fn test_failed_results_are_ignored() {
        let results = [RoleExecutionResult::failure(
            "planovac",
            "planovac",
            "- milestone: boom",
            1,
        )];
        assert!(extract_milestones(&results).is_empty());
    }

    #[test]
    fn test_no_relevant_content_is_empty() {
        let results = [ok("statik", "All good, nothing to report.")];
        assert!(extract_critical_path(&results).is_empty());
        assert!(extract_formwork_systems(&results).is_empty());
    }

    #[test]
    fn test_schedule_fields() {
        let raw = "{\"milestones\": [\"Hrubá stavba 06/2025\"], \"critical_path\": [\"Stropy\", \"Střecha\"]}";
        let results = [ok("planovac", raw)];
        assert_eq!(extract_milestones(&results).len(), 1);
        assert_eq!(extract_critical_path(&results).len(), 2);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let raw = "- Curing period of 7 days before loading\n\
- Check experience of the crew\n\
- Use recycled aggregate\n\
- PERI SKYDECK on slabs\n\
- Doka Framax for walls\n\
- Bednění stropů ve 2 taktech";
        let results = [ok("stavbyvedouci", raw)];

        let systems = extract_formwork_systems(&results);
        let texts: Vec<&str> = systems.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "PERI SKYDECK on slabs",
                "Doka Framax for walls",
                "Bednění stropů ve 2 taktech",
            ]
        );
        assert!(extract_turnover_schedule(&results).is_empty());
    }

    #[test]
    fn test_unrelated_bullets_are_not_formwork() {
        let raw = "- Curing period of 7 days before loading\n- Check experience of the crew";
        assert!(extract_formwork_systems(&[ok("technolog", raw)]).is_empty());
    }

    #[test]
    fn test_stems_match_inflections() {
        assert!(mentions_any("Obrátkovost bednění 3 cykly", &["obratk*"]));
        assert!(mentions_any("Two formwork cycles per floor", &["cycle", "cycles"]));
        assert!(!mentions_any("Recycled water", &["cycle", "cycles", "cykl*"]));
        assert!(mentions_any("Kritická cesta: stropy", &["kritick*"]));
    }

    #[test]
    fn test_list_items() {
        let text = "- a\n* b\n• c\n1. d\n2) e\n12 not a list\n-no space\n";
        let items: Vec<&str> = list_items(text).collect();
        assert_eq!(items, vec!["a", "b", "c", "d", "e"]);
    }
}
