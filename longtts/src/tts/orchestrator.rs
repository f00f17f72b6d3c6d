//! Per-chunk synthesis with capacity-failure recovery.
//!
//! A chunk the synthesizer rejects as too long is cut at its character
//! midpoint and both halves are retried, left before right, until every piece
//! either synthesizes or falls to the granularity floor. Retries run off an
//! explicit work-list so the call stack stays flat whatever the input.

use tracing::{debug, warn};

use crate::error::{PipelineError, SynthesisError, TokenizerError, VoiceError};
use crate::tts::capability::{Phonemes, SpeechSynthesizer, Tokenizer, VoiceReferenceTable};
use crate::tts::chunking::{bisect, char_len};

/// Chunks at or below this many characters are not bisected further.
pub const MINIMUM_GRANULARITY: usize = 50;

/// Characters of chunk text kept in diagnostics.
const PREVIEW_CHARS: usize = 30;

/// Read-only state shared by every synthesis call of one request.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub voice_id: &'a str,
    pub voices: &'a VoiceReferenceTable,
    pub speed: f32,
}

/// Audio for one surviving (possibly bisected) chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub text: String,
    pub samples: Vec<f32>,
}

/// A chunk abandoned at the granularity floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrreducibleChunk {
    pub preview: String,
    pub len: usize,
    pub depth: u32,
}

impl IrreducibleChunk {
    fn new(text: &str, depth: u32) -> Self {
        Self {
            preview: preview(text),
            len: char_len(text),
            depth,
        }
    }
}

impl std::fmt::Display for IrreducibleChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "could not synthesize chunk: {}... (len={})", self.preview, self.len)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkOutcome {
    pub segments: Vec<AudioSegment>,
    pub irreducible: Vec<IrreducibleChunk>,
    /// Deepest bisection level reached.
    pub max_depth: u32,
}

/// Number of halvings after which a chunk of `len` characters is at or below
/// `floor`, i.e. `ceil(log2(len / floor))` for `len > floor`, else zero.
pub fn max_bisection_depth(len: usize, floor: usize) -> u32 {
    let floor = floor.max(1);
    let mut remaining = len;
    let mut depth = 0;
    while remaining > floor {
        // the right half is the larger one
        remaining -= remaining / 2;
        depth += 1;
    }
    depth
}

struct WorkItem {
    text: String,
    depth: u32,
}

enum Attempt {
    Capacity(SynthesisError),
    Fatal(PipelineError),
}

impl From<TokenizerError> for Attempt {
    fn from(err: TokenizerError) -> Self {
        Attempt::Fatal(err.into())
    }
}

impl From<VoiceError> for Attempt {
    fn from(err: VoiceError) -> Self {
        Attempt::Fatal(err.into())
    }
}

/// Drives a tokenizer and a synthesizer over chunks of text.
pub struct Orchestrator<'a, T: ?Sized, S: ?Sized> {
    tokenizer: &'a T,
    synthesizer: &'a mut S,
    minimum_granularity: usize,
}

impl<'a, T, S> Orchestrator<'a, T, S>
where
    T: Tokenizer + ?Sized,
    S: SpeechSynthesizer + ?Sized,
{
    pub fn new(tokenizer: &'a T, synthesizer: &'a mut S) -> Self {
        Self {
            tokenizer,
            synthesizer,
            minimum_granularity: MINIMUM_GRANULARITY,
        }
    }

    pub fn with_minimum_granularity(mut self, minimum_granularity: usize) -> Self {
        self.minimum_granularity = minimum_granularity.max(1);
        self
    }

    /// Synthesize one chunk, bisecting on capacity failures.
    ///
    /// Irreducible pieces are reported in the outcome, not as errors. Any other
    /// collaborator failure aborts and is returned.
    pub fn synthesize_chunk(
        &mut self,
        ctx: &SynthesisContext<'_>,
        chunk: &str,
    ) -> Result<ChunkOutcome, PipelineError> {
        let depth_bound = max_bisection_depth(char_len(chunk), self.minimum_granularity);
        let mut outcome = ChunkOutcome::default();
        let mut work = vec![WorkItem {
            text: chunk.to_string(),
            depth: 0,
        }];

        while let Some(item) = work.pop() {
            outcome.max_depth = outcome.max_depth.max(item.depth);

            match self.attempt(ctx, &item.text) {
                Ok(samples) => {
                    debug!(
                        depth = item.depth,
                        chars = char_len(&item.text),
                        samples = samples.len(),
                        "synthesized chunk"
                    );
                    outcome.segments.push(AudioSegment {
                        text: item.text,
                        samples,
                    });
                }
                Err(Attempt::Capacity(err)) => {
                    let len = char_len(&item.text);
                    if len > self.minimum_granularity && item.depth < depth_bound {
                        debug!(depth = item.depth, chars = len, %err, "bisecting chunk");
                        let (left, right) = bisect(&item.text);
                        // LIFO: push right first so the left half runs first
                        work.push(WorkItem {
                            text: right.to_string(),
                            depth: item.depth + 1,
                        });
                        work.push(WorkItem {
                            text: left.to_string(),
                            depth: item.depth + 1,
                        });
                    } else {
                        let irreducible = IrreducibleChunk::new(&item.text, item.depth);
                        warn!("{irreducible}");
                        outcome.irreducible.push(irreducible);
                    }
                }
                Err(Attempt::Fatal(err)) => return Err(err),
            }
        }

        Ok(outcome)
    }

    fn attempt(&mut self, ctx: &SynthesisContext<'_>, text: &str) -> Result<Vec<f32>, Attempt> {
        let phonemes = self.first_candidate(text, ctx.voice_id)?;
        let reference = ctx
            .voices
            .reference_for(phonemes.len())
            .ok_or_else(|| VoiceError::Empty(ctx.voice_id.to_string()))?;

        match self.synthesizer.synthesize(&phonemes, reference, ctx.speed) {
            Ok(audio) => Ok(audio.into_samples()),
            Err(err @ SynthesisError::CapacityExceeded { .. }) => Err(Attempt::Capacity(err)),
            Err(err) => Err(Attempt::Fatal(PipelineError::Synthesis(err))),
        }
    }

    /// Only the first candidate is used, later ones are dropped unread.
    fn first_candidate(&self, text: &str, voice_id: &str) -> Result<Phonemes, TokenizerError> {
        let mut candidates = self.tokenizer.tokenize(text, voice_id)?;
        let first = candidates
            .next()
            .ok_or_else(|| TokenizerError::NoCandidate(preview(text)))??;
        Ok(first.phonemes.into_phonemes())
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::capability::{AudioBuffer, SegmentStream, TokenizedSegment, TokenizerOutput};
    use std::cell::RefCell;

    /// Phonemes are the text itself, plus a junk second candidate.
    #[derive(Default)]
    struct EchoTokenizer {
        calls: RefCell<Vec<String>>,
    }

    impl Tokenizer for EchoTokenizer {
        fn tokenize<'a>(&'a self, text: &'a str, _voice_id: &'a str) -> Result<SegmentStream<'a>, TokenizerError> {
            self.calls.borrow_mut().push(text.to_string());
            let candidates = vec![
                Ok(TokenizedSegment {
                    graphemes: text.to_string(),
                    phonemes: TokenizerOutput::Paired(Phonemes::new(text), vec![0]),
                    duration: None,
                }),
                Ok(TokenizedSegment {
                    graphemes: String::new(),
                    phonemes: TokenizerOutput::Plain(Phonemes::new("ignored")),
                    duration: None,
                }),
            ];
            Ok(Box::new(candidates.into_iter()))
        }
    }

    struct EmptyTokenizer;

    impl Tokenizer for EmptyTokenizer {
        fn tokenize<'a>(&'a self, _text: &'a str, _voice_id: &'a str) -> Result<SegmentStream<'a>, TokenizerError> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    /// One sample per phoneme character; rejects anything longer than `limit`.
    struct LimitedSynth {
        limit: usize,
        fail_with_inference: bool,
        references: Vec<f32>,
    }

    impl LimitedSynth {
        fn new(limit: usize) -> Self {
            Self {
                limit,
                fail_with_inference: false,
                references: Vec::new(),
            }
        }
    }

    impl SpeechSynthesizer for LimitedSynth {
        fn synthesize(
            &mut self,
            phonemes: &Phonemes,
            reference: &[f32],
            _speed: f32,
        ) -> Result<AudioBuffer, SynthesisError> {
            if self.fail_with_inference {
                return Err(SynthesisError::Inference("session lost".into()));
            }
            if phonemes.len() > self.limit {
                return Err(SynthesisError::CapacityExceeded {
                    len: phonemes.len(),
                    limit: self.limit,
                });
            }
            self.references.push(reference[0]);
            Ok(AudioBuffer::Samples(vec![0.25; phonemes.len()]))
        }
    }

    fn table() -> VoiceReferenceTable {
        VoiceReferenceTable::new((0..200).map(|i| vec![i as f32]).collect())
    }

    fn ctx(voices: &VoiceReferenceTable) -> SynthesisContext<'_> {
        SynthesisContext {
            voice_id: "ef_dora",
            voices,
            speed: 1.0,
        }
    }

    #[test]
    fn test_fitting_chunk_yields_one_segment() {
        let tokenizer = EchoTokenizer::default();
        let mut synth = LimitedSynth::new(500);
        let voices = table();
        let outcome = Orchestrator::new(&tokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), "Hola. Adiós.")
            .unwrap();
        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].samples.len(), 12);
        assert!(outcome.irreducible.is_empty());
        assert_eq!(outcome.max_depth, 0);
        // reference row is phoneme length - 1
        assert_eq!(synth.references, vec![11.0]);
    }

    #[test]
    fn test_capacity_failure_bisects_down_to_floor() {
        let tokenizer = EchoTokenizer::default();
        let mut synth = LimitedSynth::new(50);
        let voices = table();
        let chunk: String = ('a'..='z').cycle().take(151).collect();
        let outcome = Orchestrator::new(&tokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), &chunk)
            .unwrap();

        let texts: Vec<&str> = outcome.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts.concat(), chunk, "segments keep source order");
        assert!(outcome.segments.len() >= 2);
        assert!(outcome.segments.iter().all(|s| char_len(&s.text) <= 50));
        assert!(outcome.irreducible.is_empty());
        assert_eq!(outcome.max_depth, 2);
        assert!(outcome.max_depth <= max_bisection_depth(151, 50));

        let calls = tokenizer.calls.borrow();
        assert_eq!(char_len(&calls[0]), 151);
        assert_eq!(char_len(&calls[1]), 75);
        assert_eq!(char_len(&calls[2]), 37);
    }

    #[test]
    fn test_unconditional_capacity_failure_is_irreducible() {
        let tokenizer = EchoTokenizer::default();
        let mut synth = LimitedSynth::new(0);
        let voices = table();
        let chunk = "x".repeat(120);
        let outcome = Orchestrator::new(&tokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), &chunk)
            .unwrap();
        assert!(outcome.segments.is_empty());
        // 120 -> 60 + 60 -> 30 + 30 + 30 + 30
        assert_eq!(outcome.irreducible.len(), 4);
        assert!(outcome.irreducible.iter().all(|c| c.len == 30 && c.depth == 2));
        assert_eq!(outcome.irreducible[0].preview, "x".repeat(30));
    }

    #[test]
    fn test_short_chunk_failure_is_not_retried() {
        let tokenizer = EchoTokenizer::default();
        let mut synth = LimitedSynth::new(3);
        let voices = table();
        let outcome = Orchestrator::new(&tokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), "corto")
            .unwrap();
        assert_eq!(tokenizer.calls.borrow().len(), 1);
        assert_eq!(outcome.irreducible, vec![IrreducibleChunk {
            preview: "corto".into(),
            len: 5,
            depth: 0,
        }]);
    }

    #[test]
    fn test_other_synthesis_failure_propagates() {
        let tokenizer = EchoTokenizer::default();
        let mut synth = LimitedSynth::new(500);
        synth.fail_with_inference = true;
        let voices = table();
        let err = Orchestrator::new(&tokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), &"y".repeat(140))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis(SynthesisError::Inference(_))));
        assert_eq!(tokenizer.calls.borrow().len(), 1);
    }

    #[test]
    fn test_missing_candidate_is_external_failure() {
        let mut synth = LimitedSynth::new(500);
        let voices = table();
        let err = Orchestrator::new(&EmptyTokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), "hola")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Tokenizer(TokenizerError::NoCandidate(_))));
        assert!(err.is_external());
    }

    #[test]
    fn test_empty_voice_table_is_external_failure() {
        let tokenizer = EchoTokenizer::default();
        let mut synth = LimitedSynth::new(500);
        let voices = VoiceReferenceTable::new(Vec::new());
        let err = Orchestrator::new(&tokenizer, &mut synth)
            .synthesize_chunk(&ctx(&voices), "hola")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Voice(VoiceError::Empty(_))));
    }

    #[test]
    fn test_max_bisection_depth_matches_log2_bound() {
        assert_eq!(max_bisection_depth(50, 50), 0);
        assert_eq!(max_bisection_depth(51, 50), 1);
        assert_eq!(max_bisection_depth(100, 50), 1);
        assert_eq!(max_bisection_depth(101, 50), 2);
        assert_eq!(max_bisection_depth(151, 50), 2);
        assert_eq!(max_bisection_depth(400, 50), 3);
        for len in 1..2000usize {
            let expected = if len <= 50 { 0 } else { (len as f64 / 50.0).log2().ceil() as u32 };
            assert_eq!(max_bisection_depth(len, 50), expected, "len {len}");
        }
    }
}
