//! Triage heuristics and the technician hand-off summary.

use std::collections::HashMap;

use crate::knowledge::common_symptoms;

/// Rough severity of the reported symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Match a caller's free-form description to a known symptom by word
/// overlap.  Returns the best match with its confidence in `0.0..=1.0`.
pub fn match_symptom(tag: &str, description: &str) -> Option<(&'static str, f64)> {
    let description = description.to_lowercase();
    let description_words: Vec<&str> = description.split_whitespace().collect();

    let mut best: Option<(&'static str, f64)> = None;
    for symptom in common_symptoms(tag) {
        let symptom_words: Vec<&str> = symptom.split_whitespace().collect();
        let overlap = symptom_words
            .iter()
            .filter(|w| description_words.contains(w))
            .count();
        if overlap == 0 {
            continue;
        }
        let score = overlap as f64 / symptom_words.len() as f64;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((symptom, score));
        }
    }
    best
}

/// Whether to recommend a technician visit.
///
/// Resolved issues never need one; high-severity symptoms always do; otherwise
/// two or more failed troubleshooting attempts tip the scale.
pub fn should_schedule_technician(
    steps_tried: &[String],
    issue_resolved: bool,
    severity: Severity,
) -> bool {
    if issue_resolved {
        return false;
    }
    if severity == Severity::High {
        return true;
    }
    steps_tried.len() >= 2
}

/// Human-readable summary of the diagnostic session for the technician.
pub fn diagnostic_summary(
    tag: &str,
    symptoms: &[String],
    steps_tried: &[String],
    step_results: &HashMap<String, String>,
) -> String {
    let mut parts = vec![
        format!("Appliance: {}", title_case(tag)),
        "\nReported Symptoms:".to_string(),
    ];

    for symptom in symptoms {
        parts.push(format!("  - {symptom}"));
    }

    if !steps_tried.is_empty() {
        parts.push("\nTroubleshooting Steps Attempted:".to_string());
        for step in steps_tried {
            let result = step_results
                .get(step)
                .map(String::as_str)
                .unwrap_or("Unknown result");
            parts.push(format!("  - {step}: {result}"));
        }
    }

    parts.join("\n")
}

/// `"water_heater"` → `"Water Heater"`.
fn title_case(tag: &str) -> String {
    tag.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
