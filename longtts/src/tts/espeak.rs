use espeak_rs::text_to_phonemes;
use tracing::debug;

use crate::error::TokenizerError;
use crate::tts::capability::{Phonemes, SegmentStream, TokenizedSegment, Tokenizer, TokenizerOutput};

/// eSpeak-ng grapheme-to-phoneme tokenizer.
///
/// Produces a single candidate covering the whole input. The voice id does not
/// influence phonemization; the language is fixed at construction.
#[derive(Debug, Clone)]
pub struct EspeakTokenizer {
    lang: String,
}

impl EspeakTokenizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn phonemize(&self, text: &str) -> Result<String, TokenizerError> {
        let phonemes = text_to_phonemes(text, &self.lang, None, true, false)
            .map_err(|e| TokenizerError::Phonemize {
                lang: self.lang.clone(),
                message: e.to_string(),
            })?
            .join("");
        debug!(lang = %self.lang, "phonemized {:?} -> {:?}", text, phonemes);
        Ok(phonemes)
    }
}

impl Default for EspeakTokenizer {
    fn default() -> Self {
        Self::new("es")
    }
}

impl Tokenizer for EspeakTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str, _voice_id: &'a str) -> Result<SegmentStream<'a>, TokenizerError> {
        let phonemes = self.phonemize(text)?;
        let segment = TokenizedSegment {
            graphemes: text.to_string(),
            phonemes: TokenizerOutput::Plain(Phonemes::new(phonemes)),
            duration: None,
        };
        Ok(Box::new(std::iter::once(Ok(segment))))
    }
}
