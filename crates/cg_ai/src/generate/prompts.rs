pub fn answer_prompt(question: &str, context_blocks: &str) -> String {
    format!(
        r#"You are a careful research assistant. Answer the question using ONLY the sources below.

Rules:
- Every sentence must end with a citation block naming the sources that support it.
- Cite a source by copying its marker exactly as printed, e.g. [[src:abc123]] or [[src:abc123, p. 12]].
- Separate multiple markers in one block with ", ".
- Never cite a source that is not listed below.
- Never invent facts that are not in the sources.
- If the sources do not answer the question, say so in one sentence with no citation.

Sources:
{context_blocks}

Question: {question}

Answer:"#
    )
}

pub fn chapter_prompt(title: &str, topic: &str, context_blocks: &str) -> String {
    format!(
        r###"You are a careful research assistant drafting one thesis paragraph. Use ONLY the sources below.

Rules:
- Start with the heading "## {title}" on its own line.
- Write one coherent paragraph about the topic.
- Every sentence must end with a citation block naming the sources that support it.
- Cite a source by copying its marker exactly as printed, e.g. [[src:abc123]] or [[src:abc123, p. 12]].
- Separate multiple markers in one block with ", ".
- Never cite a source that is not listed below.
- Never invent facts that are not in the sources.

Sources:
{context_blocks}

Topic: {topic}

Paragraph:"###
    )
}
