// src/extractors/lines.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

// --- Constants ---
// Lines longer than this that still carry wide gaps are treated as several
// columns flattened onto one physical line.
const MERGED_LINE_MIN_LEN: usize = 140;

/// Lowercased prefixes of the headings that open a new top-level quote section.
pub const HEADER_BLOCK_TERMINATORS: &[&str] = &[
    "prepared by",
    "equipment",
    "total cost of equipment",
    "investment summary",
    "covered pests",
    "scope of service",
    "service specifications",
    "service frequency",
    "plan limitations",
    "documentation",
    "terms & conditions",
    "about presto-x",
    "experienced service personnel",
    "technical leadership",
    "corporate responsibility",
    "innovation & technology",
    "table of contents",
];

// --- Regex Patterns (Lazy Static) ---
static MERGED_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:PREPARED\s+BY:|TAILORED\s+FOR:)").expect("Failed to compile MERGED_LABEL_RE")
});

static WIDE_GAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s{2,}").expect("Failed to compile WIDE_GAP_RE")
});

// Optional "$", digit groups with commas, exactly two decimals.
static CURRENCY_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\$\s*)?([0-9,]+\.[0-9]{2})").expect("Failed to compile CURRENCY_TOKEN_RE")
});

// Dollar-prefixed amount, cents optional.
static DOLLAR_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([0-9][0-9,]*(?:\.[0-9]{2})?)").expect("Failed to compile DOLLAR_AMOUNT_RE")
});

/// Splits raw document text into the trimmed, non-empty line sequence the
/// extractors operate on, expanding lines that hold several merged fields.
pub fn split_document(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let trimmed: Vec<String> = normalized
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let expanded = expand_lines(&trimmed);
    tracing::debug!("Split document into {} lines ({} before expansion)", expanded.len(), trimmed.len());
    expanded
}

/// Breaks merged header labels and wide multi-column lines into separate lines.
pub fn expand_lines(lines: &[String]) -> Vec<String> {
    let mut result = Vec::with_capacity(lines.len());

    for line in lines {
        if line.is_empty() {
            continue;
        }

        if MERGED_LABEL_RE.is_match(line) {
            // Every label starts a new line; text before the first label stays on its own.
            let mut cut = 0;
            for mat in MERGED_LABEL_RE.find_iter(line) {
                push_trimmed(&mut result, &line[cut..mat.start()]);
                cut = mat.start();
            }
            push_trimmed(&mut result, &line[cut..]);
        } else if line.len() > MERGED_LINE_MIN_LEN && WIDE_GAP_RE.is_match(line) {
            for part in WIDE_GAP_RE.split(line) {
                push_trimmed(&mut result, part);
            }
        } else {
            result.push(line.clone());
        }
    }

    result
}

fn push_trimmed(target: &mut Vec<String>, part: &str) {
    let part = part.trim();
    if !part.is_empty() {
        target.push(part.to_string());
    }
}

/// Index of the first line satisfying `predicate`.
pub fn find_first_index<F>(lines: &[String], predicate: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    find_first_index_from(lines, 0, predicate)
}

/// Index of the first line at or after `start` satisfying `predicate`.
pub fn find_first_index_from<F>(lines: &[String], start: usize, predicate: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| predicate(line.as_str()))
        .map(|(idx, _)| idx)
}

/// True when the lowercased `line` begins with one of `prefixes`.
pub fn starts_with_any(line: &str, prefixes: &[&str]) -> bool {
    let lower = line.to_lowercase();
    prefixes.iter().any(|prefix| lower.starts_with(prefix))
}

/// All currency tokens on a line, in order of appearance.
pub fn currency_values(text: &str) -> Vec<f64> {
    CURRENCY_TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_amount(m.as_str()))
        .collect()
}

/// First currency token in `text`.
pub fn first_currency(text: &str) -> Option<f64> {
    CURRENCY_TOKEN_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

/// First `$`-prefixed amount in `text`; cents are optional.
pub fn first_dollar_amount(text: &str) -> Option<f64> {
    DOLLAR_AMOUNT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok().map(round_currency)
}

pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
