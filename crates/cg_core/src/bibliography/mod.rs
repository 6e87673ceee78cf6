use crate::domain::{SourceCatalog, SourceDocument};
use crate::registry::CitationRegistry;

/// Render an inline citation label.
///
/// Grammar (bit-exact, user-facing): `"[" number ("," " p." page)? "]"`,
/// e.g. `[1]` or `[2, p. 45]`.
pub fn render_label(number: u32, page: Option<u32>) -> String {
    match page {
        Some(p) => format!("[{number}, p. {p}]"),
        None => format!("[{number}]"),
    }
}

/// Render one IEEE-style bibliography entry.
///
/// Report form: `[n] authors, “title”, publisher, year.`
/// Journal form adds container title, `vol. X` and `pp. Y` in IEEE field
/// order instead of the publisher.
pub fn render_entry(number: u32, doc: &SourceDocument) -> String {
    let authors = if doc.authors.is_empty() {
        "Unknown".to_string()
    } else {
        doc.authors.join(", ")
    };

    let mut fields: Vec<String> = vec![authors, format!("\u{201c}{}\u{201d}", doc.title)];
    if let Some(container) = doc.container_title.as_ref() {
        fields.push(container.clone());
        if let Some(volume) = doc.volume.as_ref() {
            fields.push(format!("vol. {volume}"));
        }
        if let Some(pages) = doc.pages.as_ref() {
            fields.push(format!("pp. {pages}"));
        }
    } else if let Some(publisher) = doc.publisher.as_ref() {
        fields.push(publisher.clone());
    }
    if let Some(year) = doc.year {
        fields.push(year.to_string());
    }

    format!("[{number}] {}.", fields.join(", "))
}

/// Render the full bibliography sorted by citation number.
///
/// Source ids missing from the catalog get a metadata-less placeholder
/// entry; the integrity reviewer surfaces the inconsistency as a
/// finding, rendering never panics.
pub fn render_bibliography(registry: &CitationRegistry, catalog: &SourceCatalog) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    for (source_id, number) in registry.citation_order() {
        match catalog.get(&source_id) {
            Some(doc) => entries.push(render_entry(number, doc)),
            None => entries.push(render_entry(number, &SourceDocument::new(&source_id, &source_id))),
        }
    }
    entries
}
