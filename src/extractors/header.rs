// src/extractors/header.rs

// --- Imports ---
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::lines::{find_first_index, find_first_index_from, starts_with_any, HEADER_BLOCK_TERMINATORS};

// --- Constants ---
const CUSTOMER_BLOCK_LIMIT: usize = 15;
const PREPARED_BY_BLOCK_LIMIT: usize = 8;

// Longer lines are prose, not an account name.
const MAX_ACCOUNT_NAME_LEN: usize = 80;

// Normalized label prefixes that open the customer block ("4" reads as "for").
const CUSTOMER_ANCHORS: &[&str] = &["tailoredfor", "tailorfor", "taylorfor", "preparedfor"];

// --- Regex Patterns (Lazy Static) ---
static ACCOUNT_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:account|customer)\s+name").expect("Failed to compile ACCOUNT_LABEL_RE")
});

// Label prefixes removed from customer block lines; only the first match is stripped.
static HEADER_LABEL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(?:tailor(?:ed)?|taylor)\s*(?:for|4)\b",
        r"(?i)^prepared\s+for\b",
        r"(?i)^account\s+name\b",
        r"(?i)^customer\s+name\b",
    ]
    .into_iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static LABEL_PUNCT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[:\s,-]+").expect("Failed to compile LABEL_PUNCT_RE")
});

static PREPARED_BY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)prepared\s+by\b").expect("Failed to compile PREPARED_BY_RE")
});

static PREPARED_BY_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^prepared\s+by[:\s-]*").expect("Failed to compile PREPARED_BY_PREFIX_RE")
});

static CUSTOMER_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:tailored|prepared)\s+for").expect("Failed to compile CUSTOMER_LABEL_RE")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})").expect("Failed to compile EMAIL_RE")
});

// Street line: leading house number and a street-type word somewhere after it.
static ADDRESS_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[0-9].*\b(?:st|street|rd|road|dr|drive|ln|lane|blvd|boulevard|ave|avenue|hwy|highway|way|trail|trl|terrace|ter|pkwy|parkway|court|ct|cir|circle|loop|suite|ste|unit)\b",
    )
    .expect("Failed to compile ADDRESS_LINE_RE")
});

// "City, ST 12345"; state codes are uppercase only.
static CITY_STATE_ZIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?),\s*([A-Z]{2})[,\s]*([0-9]{5})(?:-?[0-9]{4})?").expect("Failed to compile CITY_STATE_ZIP_RE")
});

static STATE_ZIP_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]{2})[,\s]*([0-9]{5}(?:-?[0-9]{4})?)\s*$").expect("Failed to compile STATE_ZIP_TAIL_RE")
});

static TRAILING_PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+\d{1,2}\s*$").expect("Failed to compile TRAILING_PAGE_NUMBER_RE")
});

static STREET_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:Road|Rd|Street|St|Drive|Dr|Lane|Ln|Boulevard|Blvd|Avenue|Ave|Way|Court|Ct|Trail|Trl|Parkway|Pkwy|Circle|Cir)\b",
    )
    .expect("Failed to compile STREET_SUFFIX_RE")
});

static PAGE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^page\s+\d+").expect("Failed to compile PAGE_LINE_RE")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://").expect("Failed to compile URL_RE")
});

static DIGITS_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+$").expect("Failed to compile DIGITS_ONLY_RE")
});

// --- Data Structures ---
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceAddress {
    pub line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Customer fields read from the "Tailored for" block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerHeader {
    pub account_name: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub service_address: ServiceAddress,
}

/// The account executive named in the "Prepared by" block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountExecutive {
    pub name: Option<String>,
    pub email: Option<String>,
}

// --- Customer block ---
/// Reads account, contact and service address from the customer block.
pub fn extract_customer_header(lines: &[String]) -> CustomerHeader {
    let mut header = CustomerHeader::default();

    let Some(range) = locate_customer_block(lines) else {
        tracing::debug!("Customer block not found");
        return header;
    };

    let sanitized = sanitize_header_block(&lines[range]);
    header.contact_email = find_first_email(&sanitized);

    let candidates: Vec<String> = sanitized
        .iter()
        .map(|line| EMAIL_RE.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .flat_map(|line| split_merged_header_line(&line))
        .collect();

    // Account first, then the contact somewhere after it.
    let account_idx = candidates.iter().position(|c| looks_like_account_name(c));
    if let Some(idx) = account_idx {
        header.account_name = Some(candidates[idx].clone());
        header.contact_name = candidates[idx + 1..]
            .iter()
            .find(|c| looks_like_contact_name(c))
            .cloned();
    }

    header.service_address = find_service_address(&candidates);
    tracing::debug!("Customer header: {:?}", header);
    header
}

/// Range of the customer block: the anchor line plus up to 14 following lines,
/// ending at the next top-level heading.
pub fn locate_customer_block(lines: &[String]) -> Option<Range<usize>> {
    let start = find_first_index(lines, |l| is_customer_anchor(l) || ACCOUNT_LABEL_RE.is_match(l))?;
    Some(gather_block(lines, start, CUSTOMER_BLOCK_LIMIT, |l| {
        starts_with_any(l, HEADER_BLOCK_TERMINATORS)
    }))
}

fn is_customer_anchor(line: &str) -> bool {
    let normalized: String = line
        .to_lowercase()
        .replace('4', "for")
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    CUSTOMER_ANCHORS.iter().any(|anchor| normalized.starts_with(anchor))
}

/// Strips label prefixes and drops headings, page markers, URLs and bare numbers.
fn sanitize_header_block(block: &[String]) -> Vec<String> {
    block
        .iter()
        .map(|line| strip_label_prefix(line))
        .filter(|line| {
            !line.is_empty()
                && !starts_with_any(line, HEADER_BLOCK_TERMINATORS)
                && !PAGE_LINE_RE.is_match(line)
                && !URL_RE.is_match(line)
                && !DIGITS_ONLY_RE.is_match(line)
        })
        .collect()
}

fn strip_label_prefix(line: &str) -> String {
    let trimmed = line.trim();
    let unlabeled = HEADER_LABEL_RES
        .iter()
        .find(|re| re.is_match(trimmed))
        .map(|re| re.replace(trimmed, "").trim().to_string())
        .unwrap_or_else(|| trimmed.to_string());
    LABEL_PUNCT_RE.replace(&unlabeled, "").to_string()
}

fn find_first_email<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    lines.iter().find_map(|line| {
        EMAIL_RE
            .captures(line.as_ref())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn is_address_like(text: &str) -> bool {
    ADDRESS_LINE_RE.is_match(text) || CITY_STATE_ZIP_RE.is_match(text)
}

/// Splits "Account Contact 123 Main St" into its parts. Street and city lines stay whole.
fn split_merged_header_line(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if is_address_like(trimmed) {
        return vec![trimmed.to_string()];
    }

    match trimmed.find(|c: char| c.is_ascii_digit()) {
        Some(pos) if pos > 0 => {
            let (before, after) = trimmed.split_at(pos);
            let mut parts = split_account_and_contact(before.trim());
            parts.push(after.trim().to_string());
            parts.retain(|p| !p.is_empty());
            parts
        }
        _ => split_account_and_contact(trimmed),
    }
}

/// Splits off the shortest account prefix whose remainder reads as a person's name.
fn split_account_and_contact(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if is_address_like(text) {
        return vec![text.to_string()];
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 3 {
        return vec![text.to_string()];
    }

    (1..=tokens.len() - 2)
        .map(|split| (tokens[..split].join(" "), tokens[split..].join(" ")))
        .find(|(_, contact)| looks_like_contact_name(contact))
        .map(|(account, contact)| vec![account, contact])
        .unwrap_or_else(|| vec![text.to_string()])
}

fn looks_like_account_name(value: &str) -> bool {
    !value.is_empty()
        && !value.contains('@')
        && !value.starts_with(|c: char| c.is_ascii_digit())
        && value.len() <= MAX_ACCOUNT_NAME_LEN
}

/// Two to five words, the first starting with a letter.
fn looks_like_contact_name(value: &str) -> bool {
    if value.contains('@') {
        return false;
    }
    let words: Vec<&str> = value.split_whitespace().collect();
    (2..=5).contains(&words.len()) && words[0].starts_with(|c: char| c.is_ascii_alphabetic())
}

/// First street line; city, state and zip come from the same line or the next one.
fn find_service_address(lines: &[String]) -> ServiceAddress {
    let Some(idx) = lines.iter().position(|l| ADDRESS_LINE_RE.is_match(l)) else {
        return ServiceAddress::default();
    };
    let line = &lines[idx];

    if let Some(address) = parse_inline_address(line) {
        return address;
    }

    let mut address = ServiceAddress {
        line1: Some(line.clone()),
        ..Default::default()
    };
    if let Some(caps) = lines.get(idx + 1).and_then(|next| CITY_STATE_ZIP_RE.captures(next)) {
        address.city = caps.get(1).map(|m| m.as_str().trim().to_string());
        address.state = caps.get(2).map(|m| m.as_str().to_string());
        address.zip = caps.get(3).map(|m| m.as_str().to_string());
    }
    address
}

/// Parses "123 Main St Springfield, IL 62704" held on a single line.
pub fn parse_inline_address(line: &str) -> Option<ServiceAddress> {
    let cleaned = TRAILING_PAGE_NUMBER_RE.replace(line, "");
    let cleaned = cleaned.trim();
    let caps = STATE_ZIP_TAIL_RE.captures(cleaned)?;
    let tail = caps.get(0)?;

    let before_state = cleaned[..tail.start()]
        .trim()
        .trim_end_matches(|c: char| c == ',' || c.is_whitespace());

    let (street, city) = split_street_and_city(before_state);
    let street = if street.is_empty() { before_state.to_string() } else { street };

    Some(ServiceAddress {
        line1: Some(street),
        city,
        state: caps.get(1).map(|m| m.as_str().to_string()),
        zip: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

// City follows the last street suffix, else the last comma, else it is the last word.
fn split_street_and_city(text: &str) -> (String, Option<String>) {
    if let Some(suffix) = STREET_SUFFIX_RE.find_iter(text).last() {
        let rest = text[suffix.end()..].trim();
        let city = rest.strip_prefix(',').unwrap_or(rest).trim();
        if !city.is_empty() {
            return (text[..suffix.end()].trim().to_string(), Some(city.to_string()));
        }
    }

    if let Some(comma) = text.rfind(',') {
        let city = text[comma + 1..].trim();
        if !city.is_empty() {
            return (text[..comma].trim().to_string(), Some(city.to_string()));
        }
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.split_last() {
        Some((city, street)) if !street.is_empty() => (street.join(" "), Some(city.to_string())),
        _ => (text.to_string(), None),
    }
}

// --- Prepared-by block ---
/// Reads the account executive's name and email from the "Prepared by" block.
pub fn extract_account_executive(lines: &[String]) -> AccountExecutive {
    let mut ae = AccountExecutive::default();

    let Some(range) = locate_prepared_by_block(lines) else {
        tracing::debug!("Prepared-by block not found");
        return ae;
    };
    let block = &lines[range];

    // Name and email may share the label line.
    let inline = PREPARED_BY_PREFIX_RE.replace(&block[0], "").trim().to_string();
    if !inline.is_empty() {
        ae.email = find_first_email(&[inline.as_str()]);
        let name = EMAIL_RE.replace(&inline, "").trim().to_string();
        if !name.is_empty() && !name.contains('@') {
            ae.name = Some(name);
        }
    }

    for line in &block[1..] {
        let mut line = line.trim().to_string();
        if ae.email.is_none() {
            if let Some(email) = find_first_email(&[line.as_str()]) {
                ae.email = Some(email);
                line = EMAIL_RE.replace(&line, "").trim().to_string();
            }
        }
        if ae.name.is_none() {
            let candidate = EMAIL_RE.replace(&line, "").trim().to_string();
            if !candidate.is_empty() && !candidate.contains('@') {
                ae.name = Some(candidate);
            }
        }
    }

    tracing::debug!("Account executive: {:?}", ae);
    ae
}

/// Range of the prepared-by block: up to 8 lines, ending at the customer label
/// or the next top-level heading.
pub fn locate_prepared_by_block(lines: &[String]) -> Option<Range<usize>> {
    let start = find_first_index(lines, |l| PREPARED_BY_RE.is_match(l))?;
    Some(gather_block(lines, start, PREPARED_BY_BLOCK_LIMIT, |l| {
        CUSTOMER_LABEL_RE.is_match(l) || starts_with_any(l, HEADER_BLOCK_TERMINATORS)
    }))
}

/// From `start` up to the first later line satisfying `stop`, at most `limit` lines.
fn gather_block<F>(lines: &[String], start: usize, limit: usize, stop: F) -> Range<usize>
where
    F: Fn(&str) -> bool,
{
    let end = find_first_index_from(lines, start + 1, stop).unwrap_or(lines.len());
    start..end.min(start.saturating_add(limit))
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_customer_block_on_separate_lines() {
        let lines = owned(&[
            "TAILORED FOR:",
            "Acme Foods",
            "Jane Roe",
            "jane.roe@acmefoods.com",
            "123 Main Street",
            "Springfield, IL 62704",
            "Table of Contents",
            "42 Oak Road Shelbyville, IL 62565",
        ]);
        let header = extract_customer_header(&lines);

        assert_eq!(header.account_name.as_deref(), Some("Acme Foods"));
        assert_eq!(header.contact_name.as_deref(), Some("Jane Roe"));
        assert_eq!(header.contact_email.as_deref(), Some("jane.roe@acmefoods.com"));
        assert_eq!(
            header.service_address,
            ServiceAddress {
                line1: Some("123 Main Street".to_string()),
                city: Some("Springfield".to_string()),
                state: Some("IL".to_string()),
                zip: Some("62704".to_string()),
            }
        );
    }

    #[test]
    fn test_merged_customer_line_is_split() {
        let lines = owned(&["Tailor 4: Acme Jane Roe 55 Elm Ave", "Springfield, IL 62704-1234", "Investment Summary"]);
        let header = extract_customer_header(&lines);

        assert_eq!(header.account_name.as_deref(), Some("Acme"));
        assert_eq!(header.contact_name.as_deref(), Some("Jane Roe"));
        assert_eq!(header.contact_email, None);
        assert_eq!(header.service_address.line1.as_deref(), Some("55 Elm Ave"));
        assert_eq!(header.service_address.city.as_deref(), Some("Springfield"));
        assert_eq!(header.service_address.zip.as_deref(), Some("62704"));
    }

    #[test]
    fn test_sanitize_drops_noise_lines() {
        let block = owned(&["Account Name: Acme Foods", "Page 2", "https://example.com", "17", "Equipment"]);
        assert_eq!(sanitize_header_block(&block), vec!["Acme Foods"]);
    }

    #[test]
    fn test_missing_customer_block() {
        let lines = owned(&["Investment Summary", "$1.00 $2.00 $3.00"]);
        assert_eq!(extract_customer_header(&lines), CustomerHeader::default());
        assert_eq!(locate_customer_block(&lines), None);
    }

    #[test]
    fn test_inline_address_fallbacks() {
        let by_comma = parse_inline_address("9 Hilltop, Dayton OH 45402").expect("address");
        assert_eq!(by_comma.line1.as_deref(), Some("9 Hilltop"));
        assert_eq!(by_comma.city.as_deref(), Some("Dayton"));
        assert_eq!(by_comma.state.as_deref(), Some("OH"));

        let by_word = parse_inline_address("9 Hilltop Dayton OH 45402").expect("address");
        assert_eq!(by_word.line1.as_deref(), Some("9 Hilltop"));
        assert_eq!(by_word.city.as_deref(), Some("Dayton"));

        let by_suffix = parse_inline_address("123 Main St Springfield, IL 62704-1234 3").expect("address");
        assert_eq!(by_suffix.line1.as_deref(), Some("123 Main St"));
        assert_eq!(by_suffix.city.as_deref(), Some("Springfield"));
        assert_eq!(by_suffix.zip.as_deref(), Some("62704-1234"));

        assert_eq!(parse_inline_address("9 Hilltop Dayton"), None);
    }

    #[test]
    fn test_account_executive_inline() {
        let lines = owned(&["PREPARED BY: Sam Carter sam.carter@presto-x.com", "TAILORED FOR:", "Acme Foods"]);
        let ae = extract_account_executive(&lines);
        assert_eq!(ae.name.as_deref(), Some("Sam Carter"));
        assert_eq!(ae.email.as_deref(), Some("sam.carter@presto-x.com"));
        assert_eq!(locate_prepared_by_block(&lines), Some(0..1));
    }

    #[test]
    fn test_account_executive_on_following_lines() {
        let lines = owned(&["Prepared by", "Sam Carter", "sam.carter@presto-x.com", "Prepared for", "Jane Roe"]);
        let ae = extract_account_executive(&lines);
        assert_eq!(ae.name.as_deref(), Some("Sam Carter"));
        assert_eq!(ae.email.as_deref(), Some("sam.carter@presto-x.com"));
    }
}
