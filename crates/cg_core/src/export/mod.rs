use crate::review::BIBLIOGRAPHY_HEADING;

/// Append (or replace) the bibliography section of a markdown document.
///
/// The core guarantees only that the text + bibliography pair is
/// internally consistent; conversion to an output format is the export
/// collaborator's job. Returns the markdown unchanged when there are no
/// entries. Replacing an existing section keeps the operation
/// idempotent.
pub fn append_bibliography(markdown: &str, entries: &[String]) -> String {
    if entries.is_empty() {
        return markdown.to_string();
    }

    let body = match markdown.strip_prefix(BIBLIOGRAPHY_HEADING) {
        Some(_) => "",
        None => {
            let needle = format!("\n{BIBLIOGRAPHY_HEADING}");
            match markdown.find(&needle) {
                Some(idx) => &markdown[..idx],
                None => markdown,
            }
        }
    };

    let mut out = body.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(BIBLIOGRAPHY_HEADING);
    out.push_str("\n\n");
    out.push_str(&entries.join("\n"));
    out.push('\n');
    out
}
