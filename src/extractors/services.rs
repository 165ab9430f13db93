// src/extractors/services.rs

// --- Imports ---
use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::equipment::EquipmentCounts;
use super::lines::{find_first_index, find_first_index_from, starts_with_any};

// --- Constants ---
/// Lowercased prefixes that close the routine services section.
pub const ROUTINE_SECTION_TERMINATORS: &[&str] = &[
    "investment summary",
    "plan limitations",
    "scope of service",
    "equipment summary",
    "covered pests",
    "timeline",
    "requested start date",
    "about presto-x",
    "innovation & technology",
];

// --- Regex Patterns (Lazy Static) ---
static ROUTINE_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)routine\s+management\s+services").expect("Failed to compile ROUTINE_HEADING_RE")
});

// Dollar amounts are removed so price columns never leak into frequency text.
static EMBEDDED_CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$[\d,.]+").expect("Failed to compile EMBEDDED_CURRENCY_RE")
});

// Two service rows flattened onto one physical line.
static MERGED_ROWS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)interior.*monthly.*exterior.*monthly").expect("Failed to compile MERGED_ROWS_RE")
});

static SPLIT_AFTER_MONTHLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*?monthly)(.*)$").expect("Failed to compile SPLIT_AFTER_MONTHLY_RE")
});

static FREQUENCY_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(.+?)\s+(?:service|svc)?\s*frequency\s*[-:]*\s*([A-Za-z0-9\-()\s]+)")
        .expect("Failed to compile FREQUENCY_LABEL_RE")
});

static AFTER_HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)after\s+hours\s+service\??\s*(?:yes|- yes)").expect("Failed to compile AFTER_HOURS_RE")
});

static PER_YEAR_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\((\d+)\s*x\)").expect("Failed to compile PER_YEAR_MARKER_RE")
});

// Service name recognition, checked in order.
static SERVICE_NAME_RE: Lazy<Vec<(ServiceCode, Regex)>> = Lazy::new(|| {
    [
        (ServiceCode::Gpc, r"(?i)general\s+pest|\bgpc\b"),
        (ServiceCode::Mrt, r"(?i)interior\s+(?:rodent\s+)?monitoring|multi[-\s]?catch|\bmrt\b"),
        (ServiceCode::Rbs, r"(?i)exterior\s+(?:rodent\s+)?monitoring|bait\s+station|\brbs\b"),
        (ServiceCode::Ilt, r"(?i)insect\s+light\s+trap|light\s+trap\s+maintenance|\bilt\b"),
    ]
    .into_iter()
    .filter_map(|(code, pat)| Regex::new(pat).ok().map(|re| (code, re)))
    .collect()
});

// Ordered rule chain; the first rule that recognizes a part wins.
static SERVICE_RULES: Lazy<Vec<Box<dyn ServiceRule>>> = Lazy::new(|| {
    let keyword = |code, name, subject: &str, hint: Option<&str>, frequency| -> Box<dyn ServiceRule> {
        Box::new(KeywordRule {
            code,
            name,
            subject: Regex::new(subject).expect("Failed to compile keyword rule subject"),
            hint: hint.map(|h| Regex::new(h).expect("Failed to compile keyword rule hint")),
            frequency,
        })
    };

    vec![
        Box::new(FrequencyLabelRule) as Box<dyn ServiceRule>,
        keyword(
            ServiceCode::Rbs,
            "Exterior Rodent Monitoring",
            r"(?i)exterior\s+(?:rodent\s+)?monitoring",
            Some(r"(?i)monthly"),
            Frequency::Monthly,
        ),
        keyword(
            ServiceCode::Mrt,
            "Interior Rodent Monitoring",
            r"(?i)interior\s+(?:rodent\s+)?monitoring",
            Some(r"(?i)semi"),
            Frequency::SemiMonthly,
        ),
        keyword(
            ServiceCode::Gpc,
            "General Pest Control",
            r"(?i)general\s+pest",
            Some(r"(?i)monthly"),
            Frequency::Monthly,
        ),
        keyword(
            ServiceCode::Ilt,
            "Insect Light Trap Maintenance",
            r"(?i)insect\s+light\s+trap\s+maintenance",
            None,
            Frequency::Monthly,
        ),
    ]
});

// --- Closed Sets ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceCode {
    Gpc,
    Mrt,
    Rbs,
    Ilt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PestCategory {
    #[serde(rename = "GPC")]
    GeneralPest,
    Rodent,
    Fly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceLocation {
    Interior,
    Exterior,
    /// Service tied to a fixed program rather than a side of the building.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    Weekly,
    #[serde(rename = "Bi-Weekly")]
    BiWeekly,
    #[serde(rename = "Semi-Monthly")]
    SemiMonthly,
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-Annual")]
    SemiAnnual,
    Annual,
}

impl ServiceCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCode::Gpc => "GPC",
            ServiceCode::Mrt => "MRT",
            ServiceCode::Rbs => "RBS",
            ServiceCode::Ilt => "ILT",
        }
    }

    /// Display priority; lower sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            ServiceCode::Gpc => 0,
            ServiceCode::Mrt => 1,
            ServiceCode::Rbs => 2,
            ServiceCode::Ilt => 3,
        }
    }

    pub fn category(&self) -> PestCategory {
        match self {
            ServiceCode::Gpc => PestCategory::GeneralPest,
            ServiceCode::Mrt | ServiceCode::Rbs => PestCategory::Rodent,
            ServiceCode::Ilt => PestCategory::Fly,
        }
    }

    pub fn location(&self) -> ServiceLocation {
        match self {
            ServiceCode::Mrt => ServiceLocation::Interior,
            ServiceCode::Rbs => ServiceLocation::Exterior,
            ServiceCode::Gpc | ServiceCode::Ilt => ServiceLocation::Fixed,
        }
    }

    /// Frequency assumed when a recognized row carries unreadable frequency text.
    pub fn default_frequency(&self) -> Frequency {
        match self {
            ServiceCode::Mrt => Frequency::SemiMonthly,
            _ => Frequency::Monthly,
        }
    }

    /// Maps free-form service text to a code.
    pub fn from_label(label: &str) -> Option<Self> {
        SERVICE_NAME_RE
            .iter()
            .find(|(_, re)| re.is_match(label))
            .map(|(code, _)| *code)
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Frequency {
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Weekly => "Weekly",
            Frequency::BiWeekly => "Bi-Weekly",
            Frequency::SemiMonthly => "Semi-Monthly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::SemiAnnual => "Semi-Annual",
            Frequency::Annual => "Annual",
        }
    }

    pub fn visits_per_year(&self) -> u32 {
        match self {
            Frequency::Weekly => 52,
            Frequency::BiWeekly => 26,
            Frequency::SemiMonthly => 24,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::SemiAnnual => 2,
            Frequency::Annual => 1,
        }
    }

    /// Normalizes captured frequency text ("Semi–Monthly (24x)", "monthly after hours")
    /// to a canonical frequency. Text after an opening parenthesis is ignored.
    pub fn from_text(text: &str) -> Option<Self> {
        let head = text.split('(').next().unwrap_or("");
        let normalized = head
            .to_lowercase()
            .replace(['-', '–', '—'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        // Compound forms before their suffixes: "semi monthly" also contains "monthly".
        let table: [(&[&str], Frequency); 7] = [
            (&["semi monthly", "semimonthly", "twice monthly"], Frequency::SemiMonthly),
            (&["bi weekly", "biweekly"], Frequency::BiWeekly),
            (&["weekly"], Frequency::Weekly),
            (&["monthly"], Frequency::Monthly),
            (&["quarter"], Frequency::Quarterly),
            (&["semi annual", "semiannual"], Frequency::SemiAnnual),
            (&["annual", "yearly"], Frequency::Annual),
        ];

        table
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| normalized.contains(n)))
            .map(|(_, frequency)| *frequency)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub code: ServiceCode,
    pub category: PestCategory,
    pub location: ServiceLocation,
    pub frequency: Frequency,
    pub visits_per_year: u32,
    pub after_hours: bool,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>, code: ServiceCode, frequency: Frequency, visits_per_year: u32) -> Self {
        Self {
            name: name.into(),
            code,
            category: code.category(),
            location: code.location(),
            frequency,
            visits_per_year,
            after_hours: false,
        }
    }

    /// Record injected when equipment implies a service the text never listed.
    pub fn default_for(code: ServiceCode) -> Self {
        match code {
            ServiceCode::Mrt => Self::new("Interior Rodent Monitoring", code, Frequency::SemiMonthly, 24),
            ServiceCode::Rbs => Self::new("Exterior Rodent Monitoring", code, Frequency::Monthly, 12),
            ServiceCode::Ilt => Self::new("Insect Light Trap", code, Frequency::Monthly, 12),
            ServiceCode::Gpc => Self::new("General Pest Control", code, Frequency::Monthly, 12),
        }
    }
}

/// Facts gathered while scanning the services block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceSignals {
    pub has_gpc: bool,
    pub has_rodent: bool,
    pub has_ilt: bool,
    pub has_after_hours: bool,
    pub matched_lines: usize,
}

impl ServiceSignals {
    fn record(mut self, service: &ServiceRecord) -> Self {
        match service.code {
            ServiceCode::Gpc => self.has_gpc = true,
            ServiceCode::Mrt | ServiceCode::Rbs => self.has_rodent = true,
            ServiceCode::Ilt => self.has_ilt = true,
        }
        self.has_after_hours |= service.after_hours;
        self.matched_lines += 1;
        self
    }
}

/// Service records keyed by code; inserting an existing code replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceList {
    records: Vec<ServiceRecord>,
}

impl ServiceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: ServiceRecord) {
        match self.records.iter_mut().find(|existing| existing.code == record.code) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn contains(&self, code: ServiceCode) -> bool {
        self.records.iter().any(|r| r.code == code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds the default record for each service the equipment implies but the
    /// text never listed. General pest control is always present afterwards.
    pub fn inject_defaults(&mut self, equipment: &EquipmentCounts) {
        let implied = [
            (ServiceCode::Mrt, equipment.multi_catch > 0),
            (ServiceCode::Rbs, equipment.bait_stations > 0),
            (ServiceCode::Ilt, equipment.insect_light_traps > 0),
            (ServiceCode::Gpc, true),
        ];

        for (code, present) in implied {
            if present && !self.contains(code) {
                tracing::debug!("Injecting default {} service", code);
                self.upsert(ServiceRecord::default_for(code));
            }
        }
    }

    /// Sorts by the fixed display priority of each service code.
    pub fn sort_by_priority(&mut self) {
        self.records.sort_by_key(|r| r.code.priority());
    }

    pub fn into_vec(self) -> Vec<ServiceRecord> {
        self.records
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServicesResult {
    pub services: Vec<ServiceRecord>,
    pub signals: ServiceSignals,
}

// --- Rules ---
/// A recognized service mention within one line part.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceMatch {
    pub code: ServiceCode,
    pub name: String,
    pub frequency_text: String,
}

/// One heuristic in the service recognition chain.
pub trait ServiceRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, part: &str) -> Option<ServiceMatch>;
}

/// "<service name> ... frequency - <frequency text>" rows.
struct FrequencyLabelRule;

impl ServiceRule for FrequencyLabelRule {
    fn name(&self) -> &'static str {
        "frequency-label"
    }

    fn apply(&self, part: &str) -> Option<ServiceMatch> {
        let caps = FREQUENCY_LABEL_RE.captures(part)?;
        let label = caps.get(1)?.as_str().trim();
        let code = ServiceCode::from_label(label)?;
        Some(ServiceMatch {
            code,
            name: label.to_string(),
            frequency_text: caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
        })
    }
}

/// Fixed recognizer: subject keywords plus an optional frequency hint.
struct KeywordRule {
    code: ServiceCode,
    name: &'static str,
    subject: Regex,
    hint: Option<Regex>,
    frequency: Frequency,
}

impl ServiceRule for KeywordRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, part: &str) -> Option<ServiceMatch> {
        let hinted = self.hint.as_ref().map_or(true, |hint| hint.is_match(part));
        if !(self.subject.is_match(part) && hinted) {
            return None;
        }
        Some(ServiceMatch {
            code: self.code,
            name: self.name.to_string(),
            frequency_text: self.frequency.label().to_string(),
        })
    }
}

// --- Scan ---
#[derive(Debug, Default)]
struct ServiceScan {
    services: ServiceList,
    signals: ServiceSignals,
}

pub struct ServicesExtractor;

impl Default for ServicesExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ServicesExtractor {
    pub fn new() -> Self {
        Self {}
    }

    /// Extracts the routine service list, fills in equipment-implied defaults,
    /// and orders the result by display priority. A document without the
    /// routine services heading yields an empty list and blank signals.
    pub fn extract(&self, lines: &[String], equipment: &EquipmentCounts) -> ServicesResult {
        let Some(range) = self.locate_block(lines) else {
            tracing::debug!("Routine management services heading not found");
            return ServicesResult::default();
        };

        let scan = lines[range]
            .iter()
            .fold(ServiceScan::default(), |scan, line| scan_line(scan, line));

        let ServiceScan { mut services, signals } = scan;
        tracing::debug!("Recognized {} services from {} matched lines", services.len(), signals.matched_lines);

        if services.is_empty() {
            tracing::debug!("No routine services listed, falling back to defaults");
        }
        services.inject_defaults(equipment);
        services.sort_by_priority();

        ServicesResult {
            services: services.into_vec(),
            signals,
        }
    }

    /// Locates the lines after the routine services heading, up to the next
    /// section terminator or the end of input.
    pub fn locate_block(&self, lines: &[String]) -> Option<Range<usize>> {
        let heading = find_first_index(lines, |l| ROUTINE_HEADING_RE.is_match(l))?;
        let end = find_first_index_from(lines, heading + 1, |l| starts_with_any(l, ROUTINE_SECTION_TERMINATORS))
            .unwrap_or(lines.len());
        tracing::debug!("Routine services block spans lines {}..{}", heading + 1, end);
        Some(heading + 1..end)
    }
}

fn scan_line(mut scan: ServiceScan, line: &str) -> ServiceScan {
    if line.trim().is_empty() {
        return scan;
    }

    let cleaned = EMBEDDED_CURRENCY_RE.replace_all(line, "");
    let cleaned = cleaned.trim();

    for part in split_merged_rows(cleaned) {
        let Some((rule, found)) = SERVICE_RULES.iter().find_map(|rule| rule.apply(part).map(|m| (rule, m))) else {
            continue;
        };
        tracing::trace!("Rule '{}' matched '{}' as {}", rule.name(), part, found.code);

        let mut record = build_record(found);
        record.after_hours = AFTER_HOURS_RE.is_match(part);

        scan.signals = std::mem::take(&mut scan.signals).record(&record);
        scan.services.upsert(record);
    }

    scan
}

/// Splits "interior ... monthly ... exterior ... monthly" rows after the first "monthly".
fn split_merged_rows(line: &str) -> Vec<&str> {
    if MERGED_ROWS_RE.is_match(line) {
        if let Some(caps) = SPLIT_AFTER_MONTHLY_RE.captures(line) {
            if let (Some(first), Some(rest)) = (caps.get(1), caps.get(2)) {
                return vec![first.as_str().trim(), rest.as_str().trim()];
            }
        }
    }
    vec![line]
}

fn build_record(found: ServiceMatch) -> ServiceRecord {
    let frequency = Frequency::from_text(&found.frequency_text).unwrap_or_else(|| {
        tracing::debug!(
            "Unrecognized frequency '{}' for {}, using default",
            found.frequency_text,
            found.code
        );
        found.code.default_frequency()
    });

    let visits_per_year = PER_YEAR_MARKER_RE
        .captures(&found.frequency_text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or_else(|| frequency.visits_per_year());

    ServiceRecord::new(found.name, found.code, frequency, visits_per_year)
}
