use cg_ai::corpus::Chunk;
use cg_ai::generate::{compose_extractive, generate, postprocess, Draft, PromptKind};
use cg_ai::llm::Llm;
use cg_ai::retrieve::RetrievedChunk;
use cg_core::error::AppError;
use cg_core::registry::CitationRegistry;
use pretty_assertions::assert_eq;

struct MockLlm {
    response: String,
}

impl MockLlm {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

impl Llm for MockLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
        Ok(self.response.clone())
    }
}

fn evidence(source_id: &str, text: &str, page: Option<u32>) -> RetrievedChunk {
    RetrievedChunk {
        chunk: Chunk {
            chunk_id: format!("chunk-{source_id}"),
            source_id: source_id.to_string(),
            offset: 0,
            page,
            text: text.to_string(),
            text_sha256: String::new(),
        },
        source_id: source_id.to_string(),
        score: 0.9,
    }
}

fn answer() -> PromptKind {
    PromptKind::Answer {
        question: "What is studied?".to_string(),
    }
}

#[test]
fn accepted_sentences_get_numbers_in_reading_order() {
    let context = vec![
        evidence("src-a", "First evidence.", None),
        evidence("src-b", "Second evidence.", None),
    ];
    let llm = MockLlm::new("Claim from b [[src:src-b]]. Claim from a [[src:src-a]].");
    let mut registry = CitationRegistry::new();

    let draft = generate(&llm, "m", &answer(), &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "Claim from b [1]. Claim from a [2].");
    assert!(draft.flagged.is_empty());
    assert_eq!(draft.cited_sources, vec!["src-b".to_string(), "src-a".to_string()]);
    assert_eq!(registry.number_for("src-b"), Some(1));
    assert_eq!(registry.number_for("src-a"), Some(2));
}

#[test]
fn ungrounded_sentences_are_dropped_and_flagged() {
    let context = vec![evidence("src-a", "Evidence.", None)];
    let llm = MockLlm::new("Good claim [[src:src-a]]. Invented claim [[src:src-zzz]].");
    let mut registry = CitationRegistry::new();

    let draft = generate(&llm, "m", &answer(), &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "Good claim [1].");
    assert_eq!(draft.flagged.len(), 1);
    assert_eq!(draft.flagged[0].reason, "GROUNDING_VIOLATION");
    assert!(draft.flagged[0].text.contains("Invented claim"));
    // Rejected sentences never consume a citation number.
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.number_for("src-zzz"), None);
}

#[test]
fn uncited_sentences_are_dropped_and_flagged() {
    let context = vec![evidence("src-a", "Evidence.", None)];
    let llm = MockLlm::new("Cited claim [[src:src-a]]. Bare claim with no support.");
    let mut registry = CitationRegistry::new();

    let draft = generate(&llm, "m", &answer(), &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "Cited claim [1].");
    assert_eq!(draft.flagged.len(), 1);
    assert_eq!(draft.flagged[0].reason, "MISSING_CITATION");
}

#[test]
fn citation_block_must_end_the_sentence() {
    let context = vec![evidence("src-a", "Evidence.", None)];
    let llm = MockLlm::new("A claim [[src:src-a]] trailing prose after the block.");
    let mut registry = CitationRegistry::new();

    let draft = generate(&llm, "m", &answer(), &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "");
    assert_eq!(draft.flagged[0].reason, "MISSING_CITATION");
}

#[test]
fn repeated_citations_share_one_number() {
    let context = vec![evidence("src-a", "Evidence.", None)];
    let llm = MockLlm::new("One [[src:src-a]]. Two [[src:src-a]].");
    let mut registry = CitationRegistry::new();

    let draft = generate(&llm, "m", &answer(), &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "One [1]. Two [1].");
    assert_eq!(draft.cited_sources, vec!["src-a".to_string()]);
}

#[test]
fn page_locators_survive_number_resolution() {
    let context = vec![evidence("src-a", "Evidence.", Some(12))];
    let llm = MockLlm::new("Paged claim [[src:src-a, p. 12]].");
    let mut registry = CitationRegistry::new();

    let draft = generate(&llm, "m", &answer(), &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "Paged claim [1, p. 12].");
}

#[test]
fn markdown_headings_pass_through_unflagged() {
    let context = vec![evidence("src-a", "Evidence.", None)];
    let llm = MockLlm::new("## Background\nGrounded claim [[src:src-a]].");
    let mut registry = CitationRegistry::new();

    let kind = PromptKind::ChapterParagraph {
        title: "Background".to_string(),
        topic: "context".to_string(),
    };
    let draft = generate(&llm, "m", &kind, &context, &mut registry).expect("generate");
    assert_eq!(draft.text, "## Background\nGrounded claim [1].");
    assert!(draft.flagged.is_empty());
}

#[test]
fn empty_context_refuses_to_generate() {
    let llm = MockLlm::new("Anything.");
    let mut registry = CitationRegistry::new();
    let err = generate(&llm, "m", &answer(), &[], &mut registry).expect_err("no context");
    assert_eq!(err.code, "GROUNDING_EMPTY_CONTEXT");
}

#[test]
fn finalized_registry_blocks_new_citations() {
    let context = vec![evidence("src-a", "Evidence.", None)];
    let mut registry = CitationRegistry::new();
    registry.finalize();

    let err = postprocess("Claim [[src:src-a]].", &context, &mut registry).expect_err("closed");
    assert_eq!(err.code, "REGISTRY_CLOSED");
}

#[test]
fn extractive_composition_is_grounded_by_construction() {
    let context = vec![
        evidence("src-a", "Alpha finding holds. More text.", Some(3)),
        evidence("src-b", "Beta finding differs. More text.", None),
    ];
    let mut registry = CitationRegistry::new();

    let draft: Draft = compose_extractive(&answer(), &context, &mut registry).expect("compose");
    assert_eq!(draft.text, "Alpha finding holds [1, p. 3]. Beta finding differs [2].");
    assert!(draft.flagged.is_empty());
    assert_eq!(draft.cited_sources, vec!["src-a".to_string(), "src-b".to_string()]);
}

#[test]
fn extractive_chapter_carries_its_heading() {
    let context = vec![evidence("src-a", "Alpha finding holds.", None)];
    let mut registry = CitationRegistry::new();
    let kind = PromptKind::ChapterParagraph {
        title: "Findings".to_string(),
        topic: "alpha".to_string(),
    };

    let draft = compose_extractive(&kind, &context, &mut registry).expect("compose");
    assert!(draft.text.starts_with("## Findings\n\n"));
    assert!(draft.text.contains("[1]"));
}
