//! Greedy packing of sentences into synthesis-sized chunks.
//!
//! Lengths are measured in characters, not bytes, so accented text never gets
//! sliced in the middle of a code point.

use crate::tts::segmentation::split_into_sentences;

/// Default chunk ceiling in characters.
pub const DEFAULT_MAX_LENGTH: usize = 150;

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Pack ordered sentences into chunks of at most `max_length` characters.
///
/// Sentences are joined with a single space while they fit. A sentence that is
/// longer than `max_length` on its own is emitted as consecutive fixed-width
/// slices (the last one may be shorter) and never shares a chunk with its
/// neighbours.
pub fn pack_chunks<S: AsRef<str>>(sentences: &[S], max_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences {
        let sentence = sentence.as_ref();
        let sentence_len = char_len(sentence);

        if current_len + 1 + sentence_len <= max_length {
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(sentence);
            current_len += sentence_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if sentence_len > max_length {
            chunks.extend(slice_fixed_width(sentence, max_length));
        } else {
            current.push_str(sentence);
            current_len = sentence_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

/// Split text into sentences and pack them into chunks.
pub fn split_text_for_tts(text: &str, max_length: usize) -> Vec<String> {
    pack_chunks(&split_into_sentences(text), max_length)
}

fn slice_fixed_width(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|slice| slice.iter().collect())
        .collect()
}

/// Split `text` at its character midpoint.
pub(crate) fn bisect(text: &str) -> (&str, &str) {
    let mid = char_len(text) / 2;
    let byte_mid = text
        .char_indices()
        .nth(mid)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    text.split_at(byte_mid)
}
