use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::bibliography::render_label;
use crate::error::AppError;
use crate::registry::CitationRegistry;

mod scan;

pub use scan::{scan_markers, split_sentences, ScannedMarker, Sentence};

/// Heading that separates prose from the bibliography section.
pub const BIBLIOGRAPHY_HEADING: &str = "## References";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    GapInSequence,
    DuplicateNumber,
    OutOfOrder,
    MissingCitation,
    BibliographyOrderMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewFinding {
    pub kind: FindingKind,
    pub message: String,
    pub context: Option<String>,
}

impl ReviewFinding {
    fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Accumulated result of one review pass. Never an error: a single pass
/// reports every problem instead of failing fast.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewReport {
    pub findings: Vec<ReviewFinding>,
}

impl ReviewReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn of_kind(&self, kind: FindingKind) -> Vec<&ReviewFinding> {
        self.findings.iter().filter(|f| f.kind == kind).collect()
    }

    pub fn count_of(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }
}

/// Split a document into prose body and the optional trailing
/// bibliography section (everything after `## References`).
pub fn split_document(text: &str) -> (&str, Option<&str>) {
    if let Some(rest) = text.strip_prefix(BIBLIOGRAPHY_HEADING) {
        return ("", Some(rest));
    }
    let needle = format!("\n{BIBLIOGRAPHY_HEADING}");
    match text.find(&needle) {
        Some(idx) => (&text[..idx], Some(&text[idx + needle.len()..])),
        None => (text, None),
    }
}

fn parse_bibliography_numbers(section: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for line in section.lines() {
        let line = line.trim_start();
        let Some(rest) = line.strip_prefix('[') else {
            continue;
        };
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            continue;
        }
        if !rest[digits.len()..].starts_with("] ") {
            continue;
        }
        if let Ok(n) = digits.parse::<u32>() {
            out.push(n);
        }
    }
    out
}

/// Validate citation integrity of a document against its registry.
///
/// Scans markers left to right, rebuilds the first-appearance order of
/// source ids, and checks numbering, sentence coverage and the
/// bibliography. Never mutates the document.
pub fn review(document_text: &str, registry: &CitationRegistry) -> ReviewReport {
    let mut report = ReviewReport::default();
    let (body, bib_section) = split_document(document_text);

    let markers = scan_markers(body);
    let duplicates = registry.duplicate_numbers();
    let ambiguous: BTreeSet<u32> = duplicates.iter().map(|(n, _)| *n).collect();

    // First appearance order of resolvable source ids by position.
    let mut first_order: Vec<String> = Vec::new();
    let mut declared: BTreeMap<String, u32> = BTreeMap::new();
    for m in markers.iter() {
        if ambiguous.contains(&m.number) {
            continue;
        }
        if let Some(sid) = registry.source_for(m.number) {
            if !first_order.iter().any(|s| s == sid) {
                first_order.push(sid.to_string());
            }
            declared.entry(sid.to_string()).or_insert(m.number);
        }
    }

    // Declared numbers vs first-appearance ranks.
    for (rank0, sid) in first_order.iter().enumerate() {
        let expected = rank0 as u32 + 1;
        let got = declared[sid];
        if got != expected {
            report.findings.push(
                ReviewFinding::new(
                    FindingKind::OutOfOrder,
                    "Citation number does not match first-appearance rank",
                )
                .with_context(format!("source_id={sid}; declared={got}; expected={expected}")),
            );
        }
    }

    // A number claimed by two distinct source ids in the registry.
    let cited_numbers: BTreeSet<u32> = markers.iter().map(|m| m.number).collect();
    for (number, ids) in duplicates {
        if cited_numbers.contains(&number) {
            report.findings.push(
                ReviewFinding::new(
                    FindingKind::DuplicateNumber,
                    "Citation number is used by more than one source",
                )
                .with_context(format!("number={number}; source_ids={}", ids.join(","))),
            );
        }
    }

    // Gaps in the declared number sequence.
    if let Some(max) = cited_numbers.iter().max().copied() {
        for n in 1..=max {
            if !cited_numbers.contains(&n) {
                report.findings.push(
                    ReviewFinding::new(
                        FindingKind::GapInSequence,
                        "Citation number sequence has a gap",
                    )
                    .with_context(format!("missing={n}")),
                );
            }
        }
    }

    // Every terminated sentence must end with a citation block.
    for sentence in split_sentences(body) {
        if !sentence.terminated {
            continue;
        }
        if !ends_with_citation_block(&sentence.text) {
            report.findings.push(
                ReviewFinding::new(
                    FindingKind::MissingCitation,
                    "Sentence has no trailing citation block",
                )
                .with_context(sentence.text.trim().to_string()),
            );
        }
    }

    // Bibliography check: every cited number has an entry, entries sorted
    // by first-mention rank (ascending numbers once numbering is repaired).
    if !markers.is_empty() {
        match bib_section {
            None => {
                report.findings.push(ReviewFinding::new(
                    FindingKind::BibliographyOrderMismatch,
                    "Document cites sources but has no bibliography section",
                ));
            }
            Some(section) => {
                let entry_numbers = parse_bibliography_numbers(section);
                let entry_set: BTreeSet<u32> = entry_numbers.iter().copied().collect();
                let missing: Vec<String> = cited_numbers
                    .iter()
                    .filter(|n| !entry_set.contains(n))
                    .map(|n| n.to_string())
                    .collect();
                if !missing.is_empty() {
                    report.findings.push(
                        ReviewFinding::new(
                            FindingKind::BibliographyOrderMismatch,
                            "Cited numbers missing from the bibliography",
                        )
                        .with_context(format!("missing={}", missing.join(","))),
                    );
                }
                if entry_numbers.windows(2).any(|w| w[0] >= w[1]) {
                    report.findings.push(
                        ReviewFinding::new(
                            FindingKind::BibliographyOrderMismatch,
                            "Bibliography entries are not sorted by first-mention rank",
                        )
                        .with_context(format!(
                            "order={}",
                            entry_numbers
                                .iter()
                                .map(|n| n.to_string())
                                .collect::<Vec<_>>()
                                .join(",")
                        )),
                    );
                }
            }
        }
    }

    report
}

/// True when the sentence's last marker is separated from the terminal
/// punctuation by nothing but closing quotes/whitespace.
fn ends_with_citation_block(sentence: &str) -> bool {
    let markers = scan_markers(sentence);
    let Some(last) = markers.last() else {
        return false;
    };
    sentence[last.end..]
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '.' | '!' | '?' | ')' | '"' | '\u{201d}' | '\''))
}

/// Repair numbering so citation numbers equal first-appearance ranks.
///
/// Two passes: pass 1 scans the body and builds the ordered set of
/// source ids by position; pass 2 renumbers the registry and rewrites
/// every marker and bibliography entry to match. Idempotent: a second
/// pass produces no further changes.
pub fn repair(document_text: &str, registry: &mut CitationRegistry) -> Result<String, AppError> {
    let (body, bib_section) = split_document(document_text);

    let markers = scan_markers(body);

    // Snapshot number -> source id before renumbering. Ambiguous numbers
    // resolve to the smallest id.
    let mut old_map: BTreeMap<u32, String> = BTreeMap::new();
    for (sid, n) in registry.citation_order() {
        old_map.entry(n).or_insert(sid);
    }

    let mut order: Vec<String> = Vec::new();
    for m in markers.iter() {
        if let Some(sid) = old_map.get(&m.number) {
            if !order.iter().any(|s| s == sid) {
                order.push(sid.clone());
            }
        }
    }

    registry.renumber_by_first_appearance(&order)?;

    // Rewrite markers in place; unresolvable numbers are left verbatim.
    let mut rewritten = String::with_capacity(body.len());
    let mut cursor = 0usize;
    for m in markers.iter() {
        rewritten.push_str(&body[cursor..m.start]);
        match old_map.get(&m.number).and_then(|sid| registry.number_for(sid)) {
            Some(new_number) => rewritten.push_str(&render_label(new_number, m.page)),
            None => rewritten.push_str(&body[m.start..m.end]),
        }
        cursor = m.end;
    }
    rewritten.push_str(&body[cursor..]);

    let Some(section) = bib_section else {
        return Ok(rewritten);
    };

    // Renumber bibliography entry lines, then restore rank order.
    let mut entries: Vec<(u32, String)> = Vec::new();
    for line in section.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let renumbered = trimmed
            .strip_prefix('[')
            .and_then(|rest| {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                let tail = rest[digits.len()..].strip_prefix("] ")?;
                let old: u32 = digits.parse().ok()?;
                let sid = old_map.get(&old)?;
                let new_number = registry.number_for(sid)?;
                Some((new_number, format!("[{new_number}] {tail}")))
            });
        match renumbered {
            Some(entry) => entries.push(entry),
            None => entries.push((u32::MAX, trimmed.to_string())),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut out = rewritten.trim_end().to_string();
    out.push_str("\n\n");
    out.push_str(BIBLIOGRAPHY_HEADING);
    out.push_str("\n\n");
    for (i, (_, line)) in entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }
    out.push('\n');
    Ok(out)
}
