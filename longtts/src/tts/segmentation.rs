/// Sentence segmentation for chunked TTS.
///
/// A sentence ends at `.`, `!` or `?` when the next character is whitespace.
/// Punctuation followed by anything else (decimals like `3.14`, `¿Qué?!`,
/// closing quotes) stays inside the current sentence. The trailing fragment
/// without a boundary becomes the last sentence.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current_sentence = String::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        current_sentence.push(ch);

        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.get(i + 1).is_some_and(|next| next.is_whitespace());

        if at_boundary {
            // The separating whitespace belongs to neither sentence
            while i + 1 < chars.len() && chars[i + 1].is_whitespace() {
                i += 1;
            }

            let trimmed = current_sentence.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current_sentence.clear();
        }

        i += 1;
    }

    let trimmed = current_sentence.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}
