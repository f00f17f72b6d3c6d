use lazy_static::lazy_static;
use std::collections::HashMap;

/// Symbol table of the Kokoro v1.0 model: padding, punctuation, ASCII letters
/// and IPA symbols, indexed by position.
pub fn get_vocab() -> HashMap<char, usize> {
    let pad = "$";
    let punctuation = ";:,.!?\u{00A1}\u{00BF}\u{2014}\u{2026}\"\u{00AB}\u{00BB}\u{201C}\u{201D} ";
    let letters = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let letters_ipa = "ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘'̩'ᵻ";

    [pad, punctuation, letters, letters_ipa]
        .concat()
        .chars()
        .enumerate()
        .map(|(idx, c)| (c, idx))
        .collect()
}

lazy_static! {
    pub static ref VOCAB: HashMap<char, usize> = get_vocab();
}

/// Map phoneme characters to token ids. Characters outside the vocabulary
/// are dropped.
pub fn tokenize(phonemes: &str) -> Vec<i64> {
    let mut tokens = Vec::with_capacity(phonemes.len());
    let mut dropped = Vec::new();

    for c in phonemes.chars() {
        match VOCAB.get(&c) {
            Some(&idx) => tokens.push(idx as i64),
            None => dropped.push(c),
        }
    }

    if !dropped.is_empty() {
        tracing::debug!("dropped {} characters not in vocabulary: {:?}", dropped.len(), dropped);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("heɪ ðɪs ɪz ˈlʌvliː!");
        assert_eq!(tokens.len(), 19);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_pad_and_space_ids() {
        assert_eq!(VOCAB[&'$'], 0);
        assert_eq!(tokenize(";"), vec![1]);
    }

    #[test]
    fn test_unknown_characters_are_dropped() {
        assert_eq!(tokenize("a\u{4E2D}b").len(), 2);
    }
}
