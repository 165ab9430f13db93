// src/extractors/pests.rs

// --- Imports ---
use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::equipment::EquipmentCounts;
use super::lines::{find_first_index, starts_with_any, HEADER_BLOCK_TERMINATORS};
use super::services::ServiceSignals;

// --- Regex Patterns (Lazy Static) ---
static COVERED_PESTS_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^covered\s+pests").expect("Failed to compile COVERED_PESTS_HEADING_RE")
});

static NUMBERED_SERVICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^service\s+\d+").expect("Failed to compile NUMBERED_SERVICE_RE")
});

static BULLET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[•\-*]+\s*").expect("Failed to compile BULLET_RE")
});

/// Reads the explicit covered-pests list.
pub fn extract_covered_pests(lines: &[String]) -> Vec<String> {
    let Some(range) = locate_block(lines) else {
        return Vec::new();
    };

    let pests: Vec<String> = lines[range]
        .iter()
        .map(|line| BULLET_RE.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .flat_map(|line| split_comma_safe(&line))
        .map(|pest| pest.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    dedupe_case_insensitive(pests)
}

/// Lines after the "Covered Pests" heading up to the next section.
pub fn locate_block(lines: &[String]) -> Option<Range<usize>> {
    let heading = find_first_index(lines, |l| COVERED_PESTS_HEADING_RE.is_match(l))?;
    let end = lines
        .iter()
        .enumerate()
        .skip(heading + 1)
        .find(|(_, line)| {
            line.is_empty() || NUMBERED_SERVICE_RE.is_match(line) || starts_with_any(line, HEADER_BLOCK_TERMINATORS)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(lines.len());
    Some(heading + 1..end)
}

/// Explicit pests plus the pests implied by the recognized services and equipment.
pub fn derive_covered_pests(explicit: &[String], signals: &ServiceSignals, equipment: &EquipmentCounts) -> Vec<String> {
    let has_rodent = signals.has_rodent || equipment.bait_stations > 0 || equipment.multi_catch > 0;
    let has_ilt = signals.has_ilt || equipment.insect_light_traps > 0;

    let implied = [
        (signals.has_gpc, "Pavement Ants"),
        (has_rodent, "Common Rodents"),
        (signals.has_gpc, "Common Roaches"),
        (has_ilt, "Common House Fly"),
    ];

    let combined = explicit
        .iter()
        .cloned()
        .chain(implied.iter().filter(|(on, _)| *on).map(|(_, pest)| pest.to_string()))
        .collect();

    dedupe_case_insensitive(combined)
}

/// Splits on commas that are not inside parentheses.
fn split_comma_safe(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in value.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn dedupe_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_reads_bulleted_comma_list() {
        let lines = owned(&[
            "Covered Pests",
            "• Ants (Pavement, Odorous), Roaches",
            "- Mice,  Norway   Rats, roaches",
            "Service 1 General Pest Control",
            "Spiders",
        ]);
        assert_eq!(
            extract_covered_pests(&lines),
            vec!["Ants (Pavement, Odorous)", "Roaches", "Mice", "Norway Rats"]
        );
    }

    #[test]
    fn test_missing_heading_is_empty() {
        assert!(extract_covered_pests(&owned(&["Scope of Service", "Ants"])).is_empty());
    }

    #[test]
    fn test_derived_pests_follow_signals_and_equipment() {
        let signals = ServiceSignals { has_gpc: true, ..Default::default() };
        let equipment = EquipmentCounts { insect_light_traps: 2, ..Default::default() };
        let explicit = vec!["pavement ants".to_string()];

        assert_eq!(
            derive_covered_pests(&explicit, &signals, &equipment),
            vec!["pavement ants", "Common Roaches", "Common House Fly"]
        );
    }
}
