// src/extractors/quote.rs

// --- Imports ---
use std::ops::Range;

use serde::Serialize;

use super::equipment::{EquipmentCounts, EquipmentExtractor, EquipmentSummary};
use super::header::{self, extract_account_executive, extract_customer_header, AccountExecutive, CustomerHeader};
use super::lines::{round_currency, split_document};
use super::pests::{self, derive_covered_pests, extract_covered_pests};
use super::pricing::{Pricing, PricingExtractor, DEFAULT_PRICING_WINDOW};
use super::schedule::{extract_requested_start, RequestedStart};
use super::services::{Frequency, ServiceCode, ServiceRecord, ServiceSignals, ServicesExtractor};
use crate::utils::error::ExtractError;

// --- Configuration ---
/// Per-field equipment counts that replace what the document says.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentOverrides {
    pub multi_catch: Option<u32>,
    pub bait_stations: Option<u32>,
    pub insect_light_traps: Option<u32>,
}

impl EquipmentOverrides {
    pub fn apply(&self, counts: EquipmentCounts) -> EquipmentCounts {
        EquipmentCounts {
            multi_catch: self.multi_catch.unwrap_or(counts.multi_catch),
            bait_stations: self.bait_stations.unwrap_or(counts.bait_stations),
            insect_light_traps: self.insect_light_traps.unwrap_or(counts.insect_light_traps),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Lines kept after the pricing heading when no terminator follows it.
    pub pricing_window: usize,
    pub equipment_overrides: EquipmentOverrides,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            pricing_window: DEFAULT_PRICING_WINDOW,
            equipment_overrides: EquipmentOverrides::default(),
        }
    }
}

// --- Data Structures ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobType {
    Contract,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuoteTotals {
    pub equipment_one_time: Option<f64>,
    pub services_initial: Option<f64>,
    pub combined_initial: Option<f64>,
    pub monthly: Option<f64>,
    pub annual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteDraft {
    pub customer: CustomerHeader,
    pub prepared_by: AccountExecutive,
    pub pricing: Pricing,
    pub totals: QuoteTotals,
    pub equipment: EquipmentSummary,
    pub equipment_signature: String,
    pub services: Vec<ServiceRecord>,
    pub signals: ServiceSignals,
    pub covered_pests: Vec<String>,
    pub requested_start: RequestedStart,
    pub job_type: Option<JobType>,
    pub initial_service_description: String,
    pub maintenance_description: String,
}

// --- Main Extractor Structure ---
pub struct QuoteExtractor {
    config: ExtractorConfig,
    pricing: PricingExtractor,
    services: ServicesExtractor,
    equipment: EquipmentExtractor,
}

impl QuoteExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            pricing: PricingExtractor::new(config.pricing_window),
            services: ServicesExtractor::new(),
            equipment: EquipmentExtractor::new(),
        }
    }

    /// Splits the document text into lines and extracts a quote draft.
    /// Only a document with no text at all is an error.
    pub fn extract(&self, text: &str) -> Result<QuoteDraft, ExtractError> {
        let lines = split_document(text);
        if lines.is_empty() {
            return Err(ExtractError::EmptyDocument);
        }
        Ok(self.extract_lines(&lines))
    }

    pub fn extract_lines(&self, lines: &[String]) -> QuoteDraft {
        let equipment = self.equipment.extract(lines);
        let counts = self.config.equipment_overrides.apply(equipment.counts);
        if counts != equipment.counts {
            tracing::info!("Equipment counts overridden: {:?} -> {:?}", equipment.counts, counts);
        }

        let customer = extract_customer_header(lines);
        let prepared_by = extract_account_executive(lines);
        let pricing = self.pricing.extract(lines);
        let routine = self.services.extract(lines, &counts);
        let explicit_pests = extract_covered_pests(lines);
        let covered_pests = derive_covered_pests(&explicit_pests, &routine.signals, &counts);
        let requested_start = extract_requested_start(lines);

        let totals = compute_totals(&pricing, equipment.total_cost);
        let job_type = totals.monthly.filter(|m| *m > 0.0).map(|_| JobType::Contract);

        tracing::info!(
            "Extracted {} services, {} covered pests, monthly {:?}",
            routine.services.len(),
            covered_pests.len(),
            totals.monthly
        );

        QuoteDraft {
            initial_service_description: initial_service_description(&counts, totals.services_initial),
            maintenance_description: maintenance_description(&routine.services),
            equipment_signature: equipment.signature(),
            customer,
            prepared_by,
            pricing,
            totals,
            equipment,
            services: routine.services,
            signals: routine.signals,
            covered_pests,
            requested_start,
            job_type,
        }
    }

    /// Line ranges of every located section, labeled for debug output.
    pub fn locate_blocks(&self, lines: &[String]) -> Vec<(Range<usize>, &'static str)> {
        [
            (header::locate_prepared_by_block(lines), "prepared-by"),
            (header::locate_customer_block(lines), "customer"),
            (self.pricing.locate_block(lines), "pricing"),
            (self.services.locate_block(lines), "services"),
            (self.equipment.locate_block(lines), "equipment"),
            (pests::locate_block(lines), "covered-pests"),
        ]
        .into_iter()
        .filter_map(|(range, label)| range.map(|r| (r, label)))
        .collect()
    }
}

/// The equipment total stands in for a missing one-time cost; absent parts of
/// the combined initial total count as zero unless both are absent.
fn compute_totals(pricing: &Pricing, equipment_total: Option<f64>) -> QuoteTotals {
    let equipment_one_time = pricing.one_time_cost.or(equipment_total);
    let services_initial = pricing.initial_service_cost;

    let combined_initial = match (equipment_one_time, services_initial) {
        (None, None) => None,
        (one_time, initial) => Some(round_currency(one_time.unwrap_or(0.0) + initial.unwrap_or(0.0))),
    };

    QuoteTotals {
        equipment_one_time,
        services_initial,
        combined_initial,
        monthly: pricing.avg_monthly_cost,
        annual: pricing.avg_monthly_cost.map(|m| round_currency(m * 12.0)),
    }
}

pub fn initial_service_description(counts: &EquipmentCounts, initial_cost: Option<f64>) -> String {
    let parts: Vec<String> = [
        (counts.multi_catch, "MRT"),
        (counts.bait_stations, "RBS"),
        (counts.insect_light_traps, "ILT"),
    ]
    .iter()
    .filter(|(qty, _)| *qty > 0)
    .map(|(qty, label)| format!("{} {}", qty, label))
    .collect();

    match parts.as_slice() {
        [] if initial_cost.map_or(false, |c| c > 0.0) => "Initial service".to_string(),
        [] => "Standard Initial Setup".to_string(),
        [only] => format!("Initial service and install {}", only),
        [head @ .., last] => format!("Initial service and install {}, & {}", head.join(", "), last),
    }
}

/// One phrase per routine service, e.g. "Monthly GPC & Semi-Monthly Interior Rodent Monitoring".
pub fn maintenance_description(services: &[ServiceRecord]) -> String {
    if services.is_empty() {
        return "Monthly GPC".to_string();
    }

    // Maintenance phrasing lists exterior work before interior.
    let order = |code: ServiceCode| match code {
        ServiceCode::Gpc => 0,
        ServiceCode::Rbs => 1,
        ServiceCode::Mrt => 2,
        ServiceCode::Ilt => 3,
    };
    let label = |code: ServiceCode| match code {
        ServiceCode::Gpc => "GPC",
        ServiceCode::Rbs => "Exterior Rodent Monitoring",
        ServiceCode::Mrt => "Interior Rodent Monitoring",
        ServiceCode::Ilt => "ILT Maintenance",
    };

    let mut ordered: Vec<&ServiceRecord> = services.iter().collect();
    ordered.sort_by_key(|s| order(s.code));
    ordered.dedup_by_key(|s| s.code);

    let phrases: Vec<String> = ordered
        .iter()
        .map(|s| {
            let frequency = if s.code == ServiceCode::Ilt && s.visits_per_year >= 24 {
                Frequency::SemiMonthly
            } else {
                s.frequency
            };
            format!("{} {}", frequency, label(s.code))
        })
        .collect();

    let joined = match phrases.as_slice() {
        [head @ .., last] if !head.is_empty() => format!("{} & {}", head.join(", "), last),
        _ => phrases.join(""),
    };

    if services.iter().any(|s| s.after_hours) {
        format!("{} (Includes After Hours Service)", joined)
    } else {
        joined
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_QUOTE: &str = "\
PREPARED BY: Sam Carter sam.carter@presto-x.com
TAILORED FOR:
Acme Foods
Jane Roe
jane.roe@acmefoods.com
123 Main Street
Springfield, IL 62704
Table of Contents
4 Investment Summary
Equipment
Multi-Catch Mouse Trap 4
Eradico Rodent Bait Station 6
Total Cost of Equipment $1,240.00
Routine Management Services
General Pest Control Service Frequency - Monthly $89.00 After Hours Service? Yes
Interior Rodent Monitoring Service Frequency - Semi-Monthly $45.00 Exterior Rodent Monitoring Service Frequency - Monthly $30.00
Covered Pests
Ants, Roaches
Investment Summary
One-Time Cost Initial Svc Cost Avg Monthly Cost
$1,240.00 $250.00 $164.00
Documentation
";

    #[test]
    fn test_full_quote_draft() {
        let draft = QuoteExtractor::new(ExtractorConfig::default())
            .extract(SAMPLE_QUOTE)
            .expect("sample quote has text");

        assert_eq!(draft.customer.account_name.as_deref(), Some("Acme Foods"));
        assert_eq!(draft.customer.contact_name.as_deref(), Some("Jane Roe"));
        assert_eq!(draft.customer.contact_email.as_deref(), Some("jane.roe@acmefoods.com"));
        assert_eq!(draft.customer.service_address.line1.as_deref(), Some("123 Main Street"));
        assert_eq!(draft.customer.service_address.state.as_deref(), Some("IL"));
        assert_eq!(draft.prepared_by.name.as_deref(), Some("Sam Carter"));
        assert_eq!(draft.prepared_by.email.as_deref(), Some("sam.carter@presto-x.com"));

        assert_eq!(draft.pricing.one_time_cost, Some(1240.0));
        assert_eq!(draft.pricing.initial_service_cost, Some(250.0));
        assert_eq!(draft.pricing.avg_monthly_cost, Some(164.0));
        assert_eq!(draft.totals.combined_initial, Some(1490.0));
        assert_eq!(draft.totals.annual, Some(1968.0));
        assert_eq!(draft.job_type, Some(JobType::Contract));

        assert_eq!(draft.equipment_signature, "4 MRT, 6 RBS");
        let codes: Vec<ServiceCode> = draft.services.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec![ServiceCode::Gpc, ServiceCode::Mrt, ServiceCode::Rbs]);
        assert!(draft.signals.has_after_hours);

        assert_eq!(
            draft.covered_pests,
            vec!["Ants", "Roaches", "Pavement Ants", "Common Rodents", "Common Roaches"]
        );
        assert_eq!(draft.initial_service_description, "Initial service and install 4 MRT, & 6 RBS");
        assert_eq!(
            draft.maintenance_description,
            "Monthly GPC, Monthly Exterior Rodent Monitoring & Semi-Monthly Interior Rodent Monitoring (Includes After Hours Service)"
        );
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let extractor = QuoteExtractor::new(ExtractorConfig::default());
        assert!(matches!(extractor.extract(" \n\r\n "), Err(ExtractError::EmptyDocument)));
    }

    #[test]
    fn test_equipment_total_backfills_one_time_cost() {
        let pricing = Pricing { avg_monthly_cost: Some(0.0), ..Default::default() };
        let totals = compute_totals(&pricing, Some(400.0));
        assert_eq!(totals.equipment_one_time, Some(400.0));
        assert_eq!(totals.combined_initial, Some(400.0));
        assert_eq!(totals.annual, Some(0.0));

        assert_eq!(compute_totals(&Pricing::default(), None), QuoteTotals::default());
    }

    #[test]
    fn test_overrides_replace_document_counts() {
        let config = ExtractorConfig {
            equipment_overrides: EquipmentOverrides { insect_light_traps: Some(2), ..Default::default() },
            ..Default::default()
        };
        let lines: Vec<String> = ["Routine Management Services", "Timeline"].iter().map(|s| s.to_string()).collect();
        let draft = QuoteExtractor::new(config).extract_lines(&lines);

        let codes: Vec<ServiceCode> = draft.services.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec![ServiceCode::Gpc, ServiceCode::Ilt]);
        assert_eq!(draft.job_type, None);
        assert_eq!(draft.maintenance_description, "Monthly GPC & Monthly ILT Maintenance");
    }

    #[test]
    fn test_initial_description_variants() {
        let none = EquipmentCounts::default();
        assert_eq!(initial_service_description(&none, Some(90.0)), "Initial service");
        assert_eq!(initial_service_description(&none, None), "Standard Initial Setup");
        let one = EquipmentCounts { insect_light_traps: 3, ..Default::default() };
        assert_eq!(initial_service_description(&one, None), "Initial service and install 3 ILT");
    }

    #[test]
    fn test_locate_blocks_reports_found_sections() {
        let extractor = QuoteExtractor::new(ExtractorConfig::default());
        let lines = split_document(SAMPLE_QUOTE);
        let labels: Vec<&str> = extractor.locate_blocks(&lines).into_iter().map(|(_, l)| l).collect();
        assert_eq!(
            labels,
            vec!["prepared-by", "customer", "pricing", "services", "equipment", "covered-pests"]
        );
    }
}
