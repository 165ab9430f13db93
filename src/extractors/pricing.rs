// src/extractors/pricing.rs

// --- Imports ---
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::lines::{currency_values, find_first_index, find_first_index_from, first_currency};

// --- Constants ---
/// Block length used when no terminator follows the pricing heading.
pub const DEFAULT_PRICING_WINDOW: usize = 25;

// The column-header fallback lands on the value row's header; back up to
// include the table heading above it.
const HEADER_ROW_BACKTRACK: usize = 2;

// --- Regex Patterns (Lazy Static) ---
static INVESTMENT_SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)investment\s+summary").expect("Failed to compile INVESTMENT_SUMMARY_RE")
});

// Page numbers and table-of-contents rows start with a digit.
static LEADING_DIGIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+").expect("Failed to compile LEADING_DIGIT_RE")
});

static ONE_TIME_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)one[-\s]?time\s+cost").expect("Failed to compile ONE_TIME_COLUMN_RE")
});

static MONTHLY_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)monthly\s+cost").expect("Failed to compile MONTHLY_COLUMN_RE")
});

static PRICING_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:documentation|additional services|terms|page)")
        .expect("Failed to compile PRICING_END_RE")
});

// Keyword patterns for the label-directed fallback, one per field.
static FIELD_KEYWORD_RE: Lazy<Vec<(PricingField, Regex)>> = Lazy::new(|| {
    [
        (PricingField::OneTime, r"(?i)(?:one[-\s]?time|initial)\s+(?:cost|investment)"),
        (PricingField::InitialService, r"(?i)(?:initial\s+(?:svc|service)|start[-\s]?up)\s+(?:cost|investment)"),
        (PricingField::AvgMonthly, r"(?i)(?:avg|average|monthly)\s+(?:monthly\s+)?(?:cost|investment)"),
    ]
    .into_iter()
    .filter_map(|(field, pat)| Regex::new(pat).ok().map(|re| (field, re)))
    .collect()
});

// --- Data Structures ---
/// Pricing summary amounts. `None` means the value was not found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pricing {
    pub one_time_cost: Option<f64>,
    pub initial_service_cost: Option<f64>,
    pub avg_monthly_cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingField {
    OneTime,
    InitialService,
    AvgMonthly,
}

impl Pricing {
    fn slot(&mut self, field: PricingField) -> &mut Option<f64> {
        match field {
            PricingField::OneTime => &mut self.one_time_cost,
            PricingField::InitialService => &mut self.initial_service_cost,
            PricingField::AvgMonthly => &mut self.avg_monthly_cost,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.one_time_cost.is_none() && self.initial_service_cost.is_none() && self.avg_monthly_cost.is_none()
    }
}

// --- Extractor ---
pub struct PricingExtractor {
    window: usize,
}

impl Default for PricingExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PRICING_WINDOW)
    }
}

impl PricingExtractor {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Extracts the three pricing amounts from the pricing summary block.
    /// A document without a pricing block yields an all-absent record.
    pub fn extract(&self, lines: &[String]) -> Pricing {
        let Some(range) = self.locate_block(lines) else {
            tracing::debug!("No pricing block found, all prices absent");
            return Pricing::default();
        };

        let block = &lines[range];
        let mut pricing = Pricing::default();

        // Strategy A: first row carrying three amounts, assigned by column position.
        if let Some(values) = positional_row(block) {
            pricing.one_time_cost = Some(values[0]);
            pricing.initial_service_cost = Some(values[1]);
            pricing.avg_monthly_cost = Some(values[2]);
            tracing::debug!("Pricing resolved positionally: {:?}", values);
        }

        // Strategy B: label-directed lookup for whatever is still missing.
        for (field, pattern) in FIELD_KEYWORD_RE.iter() {
            let slot = pricing.slot(*field);
            if slot.is_none() {
                *slot = currency_after_keyword(block, pattern);
                tracing::trace!("Keyword fallback for {:?}: {:?}", field, slot);
            }
        }

        pricing
    }

    /// Locates the pricing summary block as a half-open line range.
    pub fn locate_block(&self, lines: &[String]) -> Option<Range<usize>> {
        let start = find_first_index(lines, |l| INVESTMENT_SUMMARY_RE.is_match(l) && !LEADING_DIGIT_RE.is_match(l))
            .or_else(|| {
                tracing::debug!("Investment summary heading not found, trying column headers");
                find_first_index(lines, |l| ONE_TIME_COLUMN_RE.is_match(l) && MONTHLY_COLUMN_RE.is_match(l))
                    .map(|idx| idx.saturating_sub(HEADER_ROW_BACKTRACK))
            })?;

        let end = find_first_index_from(lines, start + 1, |l| PRICING_END_RE.is_match(l))
            .unwrap_or_else(|| lines.len().min(start.saturating_add(self.window)));

        tracing::debug!("Pricing block spans lines {}..{}", start, end);
        Some(start..end)
    }
}

/// First line holding at least three currency amounts.
fn positional_row(block: &[String]) -> Option<Vec<f64>> {
    block
        .iter()
        .map(|line| currency_values(line))
        .find(|values| values.len() >= 3)
}

/// First amount on (or just after) a line matching `pattern`.
fn currency_after_keyword(block: &[String], pattern: &Regex) -> Option<f64> {
    block.iter().enumerate().find_map(|(idx, line)| {
        if !pattern.is_match(line) {
            return None;
        }
        let next = block.get(idx + 1).map(String::as_str).unwrap_or("");
        first_currency(&format!("{} {}", line, next))
    })
}
