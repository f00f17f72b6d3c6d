//! Collaborator contracts consumed by the synthesis pipeline.
//!
//! The pipeline never phonemizes, runs a model or reads voice files itself.
//! It talks to these traits, and concrete backends (eSpeak, the Kokoro ONNX
//! model, NPZ voice packs) implement them.

use ndarray::ArrayD;

use crate::error::{SynthesisError, TokenizerError, VoiceError};

/// Canonical phoneme sequence handed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phonemes(String);

impl Phonemes {
    pub fn new(phonemes: impl Into<String>) -> Self {
        Self(phonemes.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in phoneme characters.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw phoneme value as delivered by a tokenizer.
///
/// Some tokenizers hand back the phonemes bare, others pair them with
/// auxiliary data (token ids, alignment hints). Both shapes are resolved once
/// through [`TokenizerOutput::into_phonemes`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizerOutput {
    Plain(Phonemes),
    Paired(Phonemes, Vec<i64>),
}

impl TokenizerOutput {
    pub fn into_phonemes(self) -> Phonemes {
        match self {
            TokenizerOutput::Plain(phonemes) => phonemes,
            TokenizerOutput::Paired(phonemes, _) => phonemes,
        }
    }
}

/// One segmentation candidate produced by a tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedSegment {
    /// Source text covered by this candidate.
    pub graphemes: String,
    pub phonemes: TokenizerOutput,
    /// Predicted duration in seconds, when the tokenizer knows it.
    pub duration: Option<f32>,
}

pub type SegmentStream<'a> = Box<dyn Iterator<Item = Result<TokenizedSegment, TokenizerError>> + 'a>;

/// Text to phonemes.
pub trait Tokenizer {
    /// Lazily produce segmentation candidates for `text` spoken by `voice_id`.
    fn tokenize<'a>(&'a self, text: &'a str, voice_id: &'a str) -> Result<SegmentStream<'a>, TokenizerError>;
}

/// Audio produced by one synthesis call.
#[derive(Debug, Clone)]
pub enum AudioBuffer {
    Samples(Vec<f32>),
    /// Tensor output still in the model's layout, e.g. `[1, n]`.
    Tensor(ArrayD<f32>),
}

impl AudioBuffer {
    /// Materialize into a flat host sample vector.
    pub fn into_samples(self) -> Vec<f32> {
        match self {
            AudioBuffer::Samples(samples) => samples,
            AudioBuffer::Tensor(tensor) => tensor.iter().copied().collect(),
        }
    }
}

/// Phonemes plus a reference embedding to audio.
pub trait SpeechSynthesizer {
    /// Fails with [`SynthesisError::CapacityExceeded`] when `phonemes` are too
    /// long for a single call.
    fn synthesize(
        &mut self,
        phonemes: &Phonemes,
        reference: &[f32],
        speed: f32,
    ) -> Result<AudioBuffer, SynthesisError>;
}

/// Per-voice table of reference embeddings, indexed by phoneme length.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceReferenceTable {
    rows: Vec<Vec<f32>>,
}

impl VoiceReferenceTable {
    pub fn new(rows: Vec<Vec<f32>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&[f32]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Reference row for a phoneme sequence of `phoneme_len` characters:
    /// `min(phoneme_len - 1, len - 1)`, never below zero.
    pub fn reference_for(&self, phoneme_len: usize) -> Option<&[f32]> {
        let last = self.rows.len().checked_sub(1)?;
        let idx = phoneme_len.saturating_sub(1).min(last);
        self.get(idx)
    }
}

pub trait VoiceLoader {
    fn load_voice(&self, voice_id: &str) -> Result<VoiceReferenceTable, VoiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_tokenizer_output_normalizes_both_shapes() {
        let plain = TokenizerOutput::Plain(Phonemes::new("ola"));
        let paired = TokenizerOutput::Paired(Phonemes::new("ola"), vec![1, 2, 3]);
        assert_eq!(plain.into_phonemes(), Phonemes::new("ola"));
        assert_eq!(paired.into_phonemes(), Phonemes::new("ola"));
    }

    #[test]
    fn test_phoneme_length_counts_characters() {
        let ps = Phonemes::new("ˈoʎa");
        assert_eq!(ps.len(), 4);
        assert!(Phonemes::new("").is_empty());
    }

    #[test]
    fn test_reference_index_is_clamped() {
        let table = VoiceReferenceTable::new(vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert_eq!(table.reference_for(0), Some(&[0.0][..]));
        assert_eq!(table.reference_for(1), Some(&[0.0][..]));
        assert_eq!(table.reference_for(2), Some(&[1.0][..]));
        assert_eq!(table.reference_for(500), Some(&[2.0][..]));
        assert_eq!(VoiceReferenceTable::new(Vec::new()).reference_for(3), None);
    }

    #[test]
    fn test_tensor_buffer_materializes_flat() {
        let tensor = ArrayD::from_shape_vec(IxDyn(&[1, 3]), vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(AudioBuffer::Tensor(tensor).into_samples(), vec![0.1, 0.2, 0.3]);
        assert_eq!(AudioBuffer::Samples(vec![0.5]).into_samples(), vec![0.5]);
    }
}
