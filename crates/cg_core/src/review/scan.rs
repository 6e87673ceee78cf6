/// One citation marker found in document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedMarker {
    pub number: u32,
    pub page: Option<u32>,
    /// Byte offset of the opening bracket.
    pub start: usize,
    /// Byte offset just past the closing bracket.
    pub end: usize,
}

/// One sentence of prose, located by byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub offset: usize,
    pub text: String,
    /// False for a trailing fragment without terminal punctuation.
    pub terminated: bool,
}

// Abbreviations whose trailing period does not end a sentence. `p.`
// and `pp.` also keep page locators inside citation markers intact.
const ABBREVIATIONS: [&str; 7] = ["Fig.", "cf.", "e.g.", "i.e.", "al.", "p.", "pp."];

fn parse_digits(bytes: &[u8], from: usize) -> Option<(u32, usize)> {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == from {
        return None;
    }
    let digits = std::str::from_utf8(&bytes[from..i]).ok()?;
    let value: u32 = digits.parse().ok()?;
    Some((value, i))
}

/// Scan text left to right for citation markers `[n]` / `[n, p. x]`.
pub fn scan_markers(text: &str) -> Vec<ScannedMarker> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let start = i;
        let Some((number, after_digits)) = parse_digits(bytes, i + 1) else {
            i += 1;
            continue;
        };
        // Bare form: [n]
        if bytes.get(after_digits) == Some(&b']') {
            out.push(ScannedMarker {
                number,
                page: None,
                start,
                end: after_digits + 1,
            });
            i = after_digits + 1;
            continue;
        }
        // Paged form: [n, p. x]
        if bytes[after_digits..].starts_with(b", p. ") {
            let page_from = after_digits + 5;
            if let Some((page, after_page)) = parse_digits(bytes, page_from) {
                if bytes.get(after_page) == Some(&b']') {
                    out.push(ScannedMarker {
                        number,
                        page: Some(page),
                        start,
                        end: after_page + 1,
                    });
                    i = after_page + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    out
}

fn last_token(text: &str) -> &str {
    text.rsplit(char::is_whitespace).next().unwrap_or(text)
}

/// Split text into sentences on terminal punctuation (`.`, `!`, `?`)
/// followed by whitespace or end of input. Periods closing a known
/// abbreviation do not end a sentence. A trailing fragment without
/// terminal punctuation is returned with `terminated == false`.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();
    while let Some((idx, ch)) = iter.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = match iter.peek() {
            None => true,
            Some((_, next)) => next.is_whitespace(),
        };
        if !at_boundary {
            continue;
        }
        let end = idx + ch.len_utf8();
        let candidate = &text[start..end];
        if ch == '.' && ABBREVIATIONS.contains(&last_token(candidate)) {
            continue;
        }
        if !candidate.trim().is_empty() {
            out.push(Sentence {
                offset: start,
                text: candidate.to_string(),
                terminated: true,
            });
        }
        start = end;
    }
    let tail = &text[start..];
    if !tail.trim().is_empty() {
        out.push(Sentence {
            offset: start,
            text: tail.to_string(),
            terminated: false,
        });
    }
    out
}
