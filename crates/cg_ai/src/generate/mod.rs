mod prompts;

pub use prompts::{answer_prompt, chapter_prompt};

use std::collections::{BTreeMap, BTreeSet};

use cg_core::bibliography::render_label;
use cg_core::error::AppError;
use cg_core::registry::CitationRegistry;
use cg_core::review::split_sentences;
use serde::{Deserialize, Serialize};

use crate::llm::Llm;
use crate::retrieve::RetrievedChunk;

const MAX_SNIPPET_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Answer { question: String },
    ChapterParagraph { title: String, topic: String },
}

/// A sentence removed from the draft, with the reason it was removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlaggedSentence {
    pub text: String,
    /// `GROUNDING_VIOLATION` or `MISSING_CITATION`.
    pub reason: String,
}

/// Finished draft: numbered text plus everything the guardrails cut.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub flagged: Vec<FlaggedSentence>,
    /// Source ids in first-appearance order.
    pub cited_sources: Vec<String>,
}

/// Provisional marker emitted by the model: `[[src:<id>]]` or
/// `[[src:<id>, p. N]]`. Resolved to numeric labels on acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceMarker {
    source_id: String,
    page: Option<u32>,
    start: usize,
    end: usize,
}

fn scan_source_markers(text: &str) -> Vec<SourceMarker> {
    const OPEN: &str = "[[src:";
    let mut out = Vec::new();
    let mut i = 0usize;
    while let Some(found) = text[i..].find(OPEN) {
        let start = i + found;
        let id_from = start + OPEN.len();
        let rest = &text[id_from..];
        let id_len = rest
            .find(|c: char| c == ']' || c == ',' || c.is_whitespace())
            .unwrap_or(rest.len());
        let source_id = &rest[..id_len];
        if source_id.is_empty() {
            i = id_from;
            continue;
        }
        let after_id = id_from + id_len;
        // Bare form: [[src:<id>]]
        if text[after_id..].starts_with("]]") {
            out.push(SourceMarker {
                source_id: source_id.to_string(),
                page: None,
                start,
                end: after_id + 2,
            });
            i = after_id + 2;
            continue;
        }
        // Paged form: [[src:<id>, p. N]]
        if let Some(page_rest) = text[after_id..].strip_prefix(", p. ") {
            let digits: String = page_rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() && page_rest[digits.len()..].starts_with("]]") {
                if let Ok(page) = digits.parse::<u32>() {
                    let end = after_id + 5 + digits.len() + 2;
                    out.push(SourceMarker {
                        source_id: source_id.to_string(),
                        page: Some(page),
                        start,
                        end,
                    });
                    i = end;
                    continue;
                }
            }
        }
        i = id_from;
    }
    out
}

fn context_blocks(context: &[RetrievedChunk]) -> String {
    let mut out = String::new();
    for rc in context {
        let marker = match rc.chunk.page {
            Some(p) => format!("[[src:{}, p. {p}]]", rc.source_id),
            None => format!("[[src:{}]]", rc.source_id),
        };
        out.push_str("--- ");
        out.push_str(&marker);
        out.push('\n');
        out.push_str(rc.chunk.text.trim());
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

/// True when nothing but closing punctuation follows the last marker.
fn ends_with_marker_block(sentence: &str, markers: &[SourceMarker]) -> bool {
    let Some(last) = markers.last() else {
        return false;
    };
    sentence[last.end..]
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '.' | '!' | '?' | ')' | '"' | '\u{201d}' | '\''))
}

/// Draft text with the model, then enforce grounding and numbering.
///
/// The model never sees or chooses citation numbers: it cites by
/// source marker, and numbers are assigned from the registry only for
/// sentences that survive the guardrails.
pub fn generate(
    llm: &dyn Llm,
    model: &str,
    kind: &PromptKind,
    context: &[RetrievedChunk],
    registry: &mut CitationRegistry,
) -> Result<Draft, AppError> {
    if context.is_empty() {
        return Err(AppError::new(
            "GROUNDING_EMPTY_CONTEXT",
            "Cannot generate without retrieved context",
        ));
    }
    let blocks = context_blocks(context);
    let prompt = match kind {
        PromptKind::Answer { question } => answer_prompt(question, &blocks),
        PromptKind::ChapterParagraph { title, topic } => chapter_prompt(title, topic, &blocks),
    };
    let raw = llm.generate(model, &prompt)?;
    postprocess(&raw, context, registry)
}

/// Validate a raw model draft sentence by sentence, then commit.
///
/// Phase 1 never touches the registry: sentences citing sources outside
/// the provided context are dropped and flagged `GROUNDING_VIOLATION`;
/// sentences without a trailing citation block are dropped and flagged
/// `MISSING_CITATION`. Markdown headings pass through verbatim.
/// Phase 2 registers the surviving sources in reading order and
/// rewrites markers to numeric labels, so rejected sentences never
/// consume a citation number.
pub fn postprocess(
    raw: &str,
    context: &[RetrievedChunk],
    registry: &mut CitationRegistry,
) -> Result<Draft, AppError> {
    let allowed: BTreeSet<&str> = context.iter().map(|c| c.source_id.as_str()).collect();
    let mut flagged: Vec<FlaggedSentence> = Vec::new();
    let mut accepted_lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !accepted_lines.last().map(String::is_empty).unwrap_or(true) {
                accepted_lines.push(String::new());
            }
            continue;
        }
        if trimmed.starts_with('#') {
            accepted_lines.push(trimmed.to_string());
            continue;
        }
        let mut kept: Vec<String> = Vec::new();
        for sentence in split_sentences(trimmed) {
            let text = sentence.text.trim().to_string();
            let markers = scan_source_markers(&text);
            let ungrounded: Vec<&str> = markers
                .iter()
                .map(|m| m.source_id.as_str())
                .filter(|sid| !allowed.contains(sid))
                .collect();
            if !ungrounded.is_empty() {
                flagged.push(FlaggedSentence {
                    text,
                    reason: "GROUNDING_VIOLATION".to_string(),
                });
                continue;
            }
            if !ends_with_marker_block(&text, &markers) {
                flagged.push(FlaggedSentence {
                    text,
                    reason: "MISSING_CITATION".to_string(),
                });
                continue;
            }
            kept.push(text);
        }
        if !kept.is_empty() {
            accepted_lines.push(kept.join(" "));
        }
    }
    while accepted_lines.last().map(String::is_empty).unwrap_or(false) {
        accepted_lines.pop();
    }
    let accepted = accepted_lines.join("\n");

    // Commit phase: numbers follow reading order of the accepted text.
    let markers = scan_source_markers(&accepted);
    let mut numbers: BTreeMap<String, u32> = BTreeMap::new();
    let mut cited_sources: Vec<String> = Vec::new();
    for m in markers.iter() {
        let n = registry.register(&m.source_id)?;
        numbers.insert(m.source_id.clone(), n);
        if !cited_sources.iter().any(|s| s == &m.source_id) {
            cited_sources.push(m.source_id.clone());
        }
    }

    let mut text = String::with_capacity(accepted.len());
    let mut cursor = 0usize;
    for m in markers.iter() {
        text.push_str(&accepted[cursor..m.start]);
        match numbers.get(&m.source_id) {
            Some(&n) => text.push_str(&render_label(n, m.page)),
            None => text.push_str(&accepted[m.start..m.end]),
        }
        cursor = m.end;
    }
    text.push_str(&accepted[cursor..]);

    Ok(Draft {
        text,
        flagged,
        cited_sources,
    })
}

fn first_snippet(text: &str) -> String {
    let sentences = split_sentences(text);
    let raw = match sentences.first() {
        Some(s) => s.text.as_str(),
        None => text,
    };
    let words: Vec<&str> = raw.split_whitespace().collect();
    let joined = words.join(" ");
    let cleaned = joined.trim_end_matches(['.', '!', '?']);
    cleaned.chars().take(MAX_SNIPPET_CHARS).collect::<String>().trim_end().to_string()
}

/// Offline composition: quote the leading snippet of each evidence
/// chunk with its citation. No model involved, so the output is fully
/// deterministic and grounded by construction.
pub fn compose_extractive(
    kind: &PromptKind,
    context: &[RetrievedChunk],
    registry: &mut CitationRegistry,
) -> Result<Draft, AppError> {
    if context.is_empty() {
        return Err(AppError::new(
            "GROUNDING_EMPTY_CONTEXT",
            "Cannot compose without retrieved context",
        ));
    }
    let mut sentences: Vec<String> = Vec::new();
    let mut cited_sources: Vec<String> = Vec::new();
    for rc in context {
        let snippet = first_snippet(&rc.chunk.text);
        if snippet.is_empty() {
            continue;
        }
        let n = registry.register(&rc.source_id)?;
        let label = render_label(n, rc.chunk.page);
        sentences.push(format!("{snippet} {label}."));
        if !cited_sources.iter().any(|s| s == &rc.source_id) {
            cited_sources.push(rc.source_id.clone());
        }
    }
    let body = sentences.join(" ");
    let text = match kind {
        PromptKind::Answer { .. } => body,
        PromptKind::ChapterParagraph { title, .. } => format!("## {title}\n\n{body}"),
    };
    Ok(Draft {
        text,
        flagged: Vec::new(),
        cited_sources,
    })
}
