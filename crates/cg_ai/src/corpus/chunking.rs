use cg_core::error::AppError;

const PAGE_BREAK: char = '\u{c}';

#[derive(Debug, Clone)]
pub(crate) struct ChunkDraft {
    pub offset: u32,
    pub page: Option<u32>,
    pub text: String,
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split text into fixed-size windows sharing `overlap` characters, so
/// no sentence is fully orphaned at a window boundary.
///
/// Window starts are byte offsets (snapped to char boundaries). When the
/// text carries form-feed page breaks, each window records the page it
/// starts on.
pub(crate) fn window_chunks(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<ChunkDraft>, AppError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(AppError::new(
            "INGEST_INVALID",
            "Chunk overlap must be smaller than the chunk size",
        )
        .with_details(format!("chunk_size={chunk_size}; overlap={overlap}")));
    }
    if text.trim().is_empty() {
        return Err(AppError::new("INGEST_EMPTY", "Document text is empty"));
    }

    let has_pages = text.contains(PAGE_BREAK);
    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let mut end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
        if end <= start {
            end = ceil_char_boundary(text, start + 1);
        }
        let page = if has_pages {
            // A window starting on a page break belongs to the new page.
            let before = text[..start].matches(PAGE_BREAK).count();
            let leading = usize::from(text[start..].starts_with(PAGE_BREAK));
            Some((before + leading) as u32 + 1)
        } else {
            None
        };
        out.push(ChunkDraft {
            offset: start as u32,
            page,
            text: text[start..end].to_string(),
        });
        if end >= text.len() {
            break;
        }
        let mut next = floor_char_boundary(text, end - overlap);
        if next <= start {
            next = end;
        }
        start = next;
    }
    Ok(out)
}
