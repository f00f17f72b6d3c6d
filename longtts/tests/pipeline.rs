use std::cell::Cell;

use longtts::tts::capability::{
    AudioBuffer, Phonemes, SegmentStream, SpeechSynthesizer, TokenizedSegment, Tokenizer, TokenizerOutput,
    VoiceLoader, VoiceReferenceTable,
};
use longtts::{LongformPipeline, PipelineConfig, PipelineError, SynthesisError, TokenizerError, VoiceError};

/// Uses the text itself as phonemes.
struct IdentityTokenizer;

impl Tokenizer for IdentityTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str, _voice_id: &'a str) -> Result<SegmentStream<'a>, TokenizerError> {
        Ok(Box::new(std::iter::once(Ok(TokenizedSegment {
            graphemes: text.to_string(),
            phonemes: TokenizerOutput::Plain(Phonemes::new(text)),
            duration: None,
        }))))
    }
}

struct FailingTokenizer;

impl Tokenizer for FailingTokenizer {
    fn tokenize<'a>(&'a self, _text: &'a str, _voice_id: &'a str) -> Result<SegmentStream<'a>, TokenizerError> {
        Err(TokenizerError::Phonemize {
            lang: "es".into(),
            message: "espeak-ng not installed".into(),
        })
    }
}

/// Ten samples per phoneme character, rejecting input above `limit`.
///
/// Every sample carries the code point of the first phoneme, so the order of
/// the source text can be read back from the track.
struct CappedSynth {
    limit: usize,
}

impl CappedSynth {
    fn new(limit: usize) -> Self {
        Self { limit }
    }
}

fn marker(c: char) -> f32 {
    c as u32 as f32
}

/// Markers of a track with consecutive repeats collapsed.
fn marker_runs(samples: &[f32]) -> Vec<char> {
    let mut runs: Vec<char> = Vec::new();
    for &sample in samples {
        let c = char::from_u32(sample as u32).unwrap();
        if runs.last() != Some(&c) {
            runs.push(c);
        }
    }
    runs
}

impl SpeechSynthesizer for CappedSynth {
    fn synthesize(
        &mut self,
        phonemes: &Phonemes,
        _reference: &[f32],
        _speed: f32,
    ) -> Result<AudioBuffer, SynthesisError> {
        if phonemes.len() > self.limit {
            return Err(SynthesisError::CapacityExceeded {
                len: phonemes.len(),
                limit: self.limit,
            });
        }
        let first = phonemes.as_str().chars().next().unwrap_or(' ');
        Ok(AudioBuffer::Samples(vec![marker(first); phonemes.len() * 10]))
    }
}

struct FixedVoices {
    loads: Cell<usize>,
}

impl VoiceLoader for FixedVoices {
    fn load_voice(&self, voice_id: &str) -> Result<VoiceReferenceTable, VoiceError> {
        self.loads.set(self.loads.get() + 1);
        if voice_id != "ef_dora" {
            return Err(VoiceError::NotFound {
                id: voice_id.to_string(),
                available: vec!["ef_dora".into()],
            });
        }
        Ok(voices())
    }
}

fn voices() -> VoiceReferenceTable {
    VoiceReferenceTable::new(vec![vec![0.0; 256]; 510])
}

fn pipeline(limit: usize) -> LongformPipeline<IdentityTokenizer, CappedSynth> {
    LongformPipeline::new(IdentityTokenizer, CappedSynth::new(limit), PipelineConfig::default()).unwrap()
}

#[test]
fn short_text_produces_single_segment_track() {
    let mut tts = pipeline(510);
    assert_eq!(tts.chunks("Hola. Adiós."), vec!["Hola. Adiós."]);

    let report = tts.synthesize("Hola. Adiós.", "ef_dora", &voices()).unwrap();
    assert_eq!(report.chunk_count, 1);
    assert!(report.irreducible.is_empty());
    let track = report.into_track().unwrap();
    assert_eq!(track.segment_count(), 1);
    assert_eq!(track.sample_count(), 120);
    assert_eq!(track.sample_rate(), 24000);
}

#[test]
fn unpunctuated_text_is_sliced_into_fixed_chunks() {
    let tts = pipeline(510);
    let text = "b".repeat(400);
    let lens: Vec<usize> = tts.chunks(&text).iter().map(|c| c.chars().count()).collect();
    assert_eq!(lens, vec![150, 150, 100]);
}

#[test]
fn capacity_failures_are_bisected_until_they_fit() {
    let mut tts = pipeline(50);
    let text = "c".repeat(151);
    let report = tts.synthesize(&text, "ef_dora", &voices()).unwrap();

    assert_eq!(report.chunk_count, 2);
    assert!(report.irreducible.is_empty());
    let track = report.into_track().unwrap();
    // 150 -> 75 + 75 -> 4 x ~37, and the single trailing character
    assert_eq!(track.segment_count(), 5);
    assert_eq!(track.sample_count(), 1510);
}

#[test]
fn everything_irreducible_completes_without_audio() {
    let mut tts = pipeline(0);
    let text = "Primera frase del informe. Segunda frase del informe!";
    let report = tts.synthesize(text, "ef_dora", &voices()).unwrap();

    // one 53-character chunk, bisected once into two pieces under the floor
    assert!(report.track.is_none());
    assert_eq!(report.chunk_count, 1);
    assert_eq!(report.irreducible.len(), 2);
    assert!(matches!(report.into_track(), Err(PipelineError::AbsentAudio)));
}

#[test]
fn partial_failure_keeps_remaining_audio_in_order() {
    // 60-character sentences split into 30-character halves, which fit
    let mut tts = LongformPipeline::new(
        IdentityTokenizer,
        CappedSynth::new(30),
        PipelineConfig {
            max_length: 70,
            ..PipelineConfig::default()
        },
    )
    .unwrap();
    let first = format!("{}.", "a".repeat(59));
    let second = format!("{}.", "b".repeat(40));
    let text = format!("{first} {second}");
    let report = tts.synthesize(&text, "ef_dora", &voices()).unwrap();

    // the 41-character chunk sits under the floor and is dropped
    assert_eq!(report.irreducible.len(), 1);
    assert_eq!(report.irreducible[0].len, 41);
    let track = report.into_track().unwrap();
    assert_eq!(track.segment_count(), 2);
    assert_eq!(track.sample_count(), 600);
    assert_eq!(marker_runs(track.samples()), vec!['a']);
}

#[test]
fn chunks_are_assembled_in_text_order() {
    let mut tts = LongformPipeline::new(
        IdentityTokenizer,
        CappedSynth::new(510),
        PipelineConfig {
            max_length: 40,
            ..PipelineConfig::default()
        },
    )
    .unwrap();
    let text = ['x', 'y', 'z']
        .iter()
        .map(|&c| format!("{}.", c.to_string().repeat(29)))
        .collect::<Vec<_>>()
        .join(" ");
    let report = tts.synthesize(&text, "ef_dora", &voices()).unwrap();

    assert_eq!(report.chunk_count, 3);
    let track = report.into_track().unwrap();
    assert_eq!(track.segment_count(), 3);
    assert_eq!(marker_runs(track.samples()), vec!['x', 'y', 'z']);
}

#[test]
fn bisected_halves_keep_text_order_across_chunks() {
    // two 80-character sentences, each bisected once into 40 + 40
    let mut tts = LongformPipeline::new(
        IdentityTokenizer,
        CappedSynth::new(45),
        PipelineConfig {
            max_length: 100,
            minimum_granularity: 10,
            ..PipelineConfig::default()
        },
    )
    .unwrap();
    let first = format!("{}{}", "m".repeat(40), "n".repeat(39)) + ".";
    let second = format!("{}{}", "p".repeat(40), "q".repeat(39)) + ".";
    let report = tts
        .synthesize(&format!("{first} {second}"), "ef_dora", &voices())
        .unwrap();

    assert_eq!(report.chunk_count, 2);
    assert!(report.irreducible.is_empty());
    let track = report.into_track().unwrap();
    assert_eq!(track.segment_count(), 4);
    assert_eq!(marker_runs(track.samples()), vec!['m', 'n', 'p', 'q']);
}

#[test]
fn empty_input_is_rejected_before_synthesis() {
    let mut tts = pipeline(510);
    assert!(matches!(
        tts.synthesize("   \n ", "ef_dora", &voices()),
        Err(PipelineError::EmptyInput)
    ));

    let loader = FixedVoices { loads: Cell::new(0) };
    assert!(matches!(
        tts.synthesize_with_loader("", "ef_dora", &loader),
        Err(PipelineError::EmptyInput)
    ));
    assert_eq!(loader.loads.get(), 0);
}

#[test]
fn tokenizer_failure_aborts_the_request() {
    let mut tts =
        LongformPipeline::new(FailingTokenizer, CappedSynth::new(510), PipelineConfig::default()).unwrap();
    let err = tts.synthesize("Hola. Adiós.", "ef_dora", &voices()).unwrap_err();
    assert!(matches!(err, PipelineError::Tokenizer(_)));
    assert!(err.is_external());
}

#[test]
fn voices_are_loaded_through_the_loader() {
    let mut tts = pipeline(510);
    let loader = FixedVoices { loads: Cell::new(0) };

    let report = tts.synthesize_with_loader("Buenos días.", "ef_dora", &loader).unwrap();
    assert!(report.track.is_some());
    assert_eq!(loader.loads.get(), 1);

    let err = tts.synthesize_with_loader("Buenos días.", "af_heart", &loader).unwrap_err();
    assert!(matches!(err, PipelineError::Voice(VoiceError::NotFound { .. })));
}

#[test]
fn invalid_config_is_rejected() {
    let config = PipelineConfig {
        max_length: 0,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        LongformPipeline::new(IdentityTokenizer, CappedSynth::new(1), config),
        Err(PipelineError::Config(_))
    ));
}
