//! Text chunking with configurable size and overlap.

use crate::types::Fragment;
use semdoc_core::{AppError, AppResult};

/// Check that a window size and overlap can be used together.
pub fn validate_window(size: usize, overlap: usize) -> AppResult<()> {
    if size == 0 {
        return Err(AppError::InvalidArgument(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= size {
        return Err(AppError::InvalidArgument(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }
    Ok(())
}

/// Chunk text into overlapping windows of at most `size` characters.
///
/// Window `i + 1` starts `size - overlap` characters after window `i`. The
/// last window is the first one that reaches the end of the text, so it may be
/// shorter than `size`. Sizes count characters, not bytes.
///
/// Returns an empty vector for empty or whitespace-only text.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> AppResult<Vec<Fragment>> {
    validate_window(size, overlap)?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every character, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;
    let step = size - overlap;

    let mut fragments = Vec::with_capacity(char_count / step + 1);
    let mut start = 0;

    loop {
        let end = (start + size).min(char_count);

        fragments.push(Fragment {
            position: fragments.len(),
            start,
            text: text[bounds[start]..bounds[end]].to_string(),
        });

        if end == char_count {
            break;
        }
        start += step;
    }

    tracing::debug!(
        "Chunked {} characters into {} fragments (size: {}, overlap: {})",
        char_count,
        fragments.len(),
        size,
        overlap
    );

    Ok(fragments)
}
