// src/extractors/equipment.rs

// --- Imports ---
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::lines::{find_first_index, first_dollar_amount, starts_with_any, HEADER_BLOCK_TERMINATORS};

// --- Constants ---
// How far above the total line the equipment table heading may sit.
const MAX_HEADING_LOOKBACK: usize = 30;

// --- Regex Patterns (Lazy Static) ---
static EQUIPMENT_TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^total\s+cost\s+of\s+equipment").expect("Failed to compile EQUIPMENT_TOTAL_RE")
});

static EQUIPMENT_SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)equipment\s+summary").expect("Failed to compile EQUIPMENT_SUMMARY_RE")
});

static EQUIPMENT_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bequipment\b").expect("Failed to compile EQUIPMENT_WORD_RE")
});

static ROUTINE_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)routine\s+management\s+services").expect("Failed to compile ROUTINE_HEADING_RE")
});

static SERVICE_FREQUENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)service\s+frequency").expect("Failed to compile SERVICE_FREQUENCY_RE")
});

static TRAILING_QTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*$").expect("Failed to compile TRAILING_QTY_RE")
});

static LEADING_QTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9]+)\s+(.*)$").expect("Failed to compile LEADING_QTY_RE")
});

static BAIT_STATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)bait\s+station|rodent\s+bait|\brbs\b|rodent\s+station|eradico")
        .expect("Failed to compile BAIT_STATION_RE")
});

static MULTI_CATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)multicatch|multi-catch|\bmrt\b|mouse\s+trap").expect("Failed to compile MULTI_CATCH_RE")
});

static LIGHT_TRAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)lumnia|insect\s+light\s+trap|\bilt\b|fly\s+light").expect("Failed to compile LIGHT_TRAP_RE")
});

// --- Data Structures ---
/// Device counts that drive default service injection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EquipmentCounts {
    pub multi_catch: u32,
    pub bait_stations: u32,
    pub insect_light_traps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentItem {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EquipmentSummary {
    pub counts: EquipmentCounts,
    pub other: Vec<EquipmentItem>,
    pub total_cost: Option<f64>,
}

impl EquipmentSummary {
    /// Short signature such as "4 MRT, 6 RBS, 2 ILT, 1 Door Sweep".
    pub fn signature(&self) -> String {
        let counts = [
            (self.counts.multi_catch, "MRT"),
            (self.counts.bait_stations, "RBS"),
            (self.counts.insect_light_traps, "ILT"),
        ];

        counts
            .iter()
            .filter(|(qty, _)| *qty > 0)
            .map(|(qty, label)| format!("{} {}", qty, label))
            .chain(self.other.iter().map(|item| match item.quantity {
                0 => item.name.clone(),
                qty => format!("{} {}", qty, item.name),
            }))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn categorize(&mut self, name: &str, quantity: u32) {
        if BAIT_STATION_RE.is_match(name) {
            self.counts.bait_stations = self.counts.bait_stations.saturating_add(quantity);
        } else if MULTI_CATCH_RE.is_match(name) {
            self.counts.multi_catch = self.counts.multi_catch.saturating_add(quantity);
        } else if LIGHT_TRAP_RE.is_match(name) {
            self.counts.insect_light_traps = self.counts.insect_light_traps.saturating_add(quantity);
        } else {
            self.other.push(EquipmentItem {
                name: name.to_string(),
                quantity,
            });
        }
    }
}

pub struct EquipmentExtractor;

impl Default for EquipmentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EquipmentExtractor {
    pub fn new() -> Self {
        Self {}
    }

    /// Reads the equipment table that ends in the "Total Cost of Equipment" row.
    pub fn extract(&self, lines: &[String]) -> EquipmentSummary {
        let mut summary = EquipmentSummary::default();

        let Some(range) = self.locate_block(lines) else {
            tracing::debug!("Equipment table not found, counts stay at zero");
            return summary;
        };
        let total_idx = range.end;

        for row in &lines[range.start + 1..total_idx] {
            if row.is_empty() || starts_with_any(row, HEADER_BLOCK_TERMINATORS) {
                continue;
            }
            if ROUTINE_HEADING_RE.is_match(row) {
                break;
            }
            if SERVICE_FREQUENCY_RE.is_match(row) {
                continue;
            }

            if let Some((name, quantity)) = parse_row(row) {
                tracing::trace!("Equipment row '{}' x{}", name, quantity);
                summary.categorize(&name, quantity);
            }
        }

        summary.total_cost = first_dollar_amount(&lines[total_idx]);
        tracing::debug!("Equipment: {} (total {:?})", summary.signature(), summary.total_cost);
        summary
    }

    /// Range from the table heading to the total row (exclusive of the total).
    pub fn locate_block(&self, lines: &[String]) -> Option<Range<usize>> {
        let total_idx = find_first_index(lines, |l| EQUIPMENT_TOTAL_RE.is_match(l))?;
        let floor = total_idx.saturating_sub(MAX_HEADING_LOOKBACK);

        // Anchor on the total row so table-of-contents mentions are never picked up.
        let start = (floor..total_idx).rev().find(|&idx| {
            let line = &lines[idx];
            !EQUIPMENT_SUMMARY_RE.is_match(line) && EQUIPMENT_WORD_RE.is_match(line)
        })?;

        Some(start..total_idx)
    }
}

/// Splits a table row into (name, quantity); quantity trails the name, or leads it.
fn parse_row(row: &str) -> Option<(String, u32)> {
    if let Some(mat) = TRAILING_QTY_RE.captures(row) {
        let whole = mat.get(0)?;
        let quantity = mat.get(1)?.as_str().parse::<f64>().ok()?;
        let name = row[..whole.start()].trim();
        if name.is_empty() {
            return None;
        }
        return Some((name.to_string(), quantity.round() as u32));
    }

    let caps = LEADING_QTY_RE.captures(row)?;
    let quantity = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let name = caps.get(2)?.as_str().trim();
    Some((name.to_string(), quantity))
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_extracts_counts_and_total() {
        let lines = owned(&[
            "Table of Contents",
            "Equipment Summary",
            "Equipment Quantity",
            "Multi-Catch Mouse Trap 4",
            "Eradico Rodent Bait Station 6",
            "Lumnia Insect Light Trap 2",
            "1 Door Sweep",
            "Total Cost of Equipment $1,240.00",
        ]);
        let summary = EquipmentExtractor::new().extract(&lines);

        assert_eq!(summary.counts, EquipmentCounts { multi_catch: 4, bait_stations: 6, insect_light_traps: 2 });
        assert_eq!(summary.other, vec![EquipmentItem { name: "Door Sweep".to_string(), quantity: 1 }]);
        assert_eq!(summary.total_cost, Some(1240.0));
        assert_eq!(summary.signature(), "4 MRT, 6 RBS, 2 ILT, 1 Door Sweep");
    }

    #[test]
    fn test_missing_total_row_yields_zero_counts() {
        let lines = owned(&["Equipment", "Multi-Catch Mouse Trap 4"]);
        let summary = EquipmentExtractor::new().extract(&lines);
        assert_eq!(summary, EquipmentSummary::default());
        assert_eq!(summary.signature(), "");
    }

    #[test]
    fn test_rows_stop_at_routine_services() {
        let lines = owned(&[
            "Equipment",
            "Multi-Catch 3",
            "Routine Management Services",
            "Insect Light Trap 5",
            "Total Cost of Equipment $300.00",
        ]);
        let summary = EquipmentExtractor::new().extract(&lines);
        assert_eq!(summary.counts.multi_catch, 3);
        assert_eq!(summary.counts.insect_light_traps, 0);
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let lines = owned(&[
            "Equipment",
            "Rodent Bait Station 99999999999",
            "Rodent Bait Station 1",
            "Total Cost of Equipment $1.00",
        ]);
        let summary = EquipmentExtractor::new().extract(&lines);
        assert_eq!(summary.counts.bait_stations, u32::MAX);
        assert_eq!(summary.total_cost, Some(1.0));
    }

    #[test]
    fn test_heading_must_be_near_total() {
        let mut lines = owned(&["Equipment"]);
        lines.extend((0..35).map(|i| format!("note {}", i)));
        lines.push("Total Cost of Equipment $10.00".to_string());
        assert_eq!(EquipmentExtractor::new().locate_block(&lines), None);
    }
}
