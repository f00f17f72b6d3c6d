//! Text in, one audio track out.

use tracing::{debug, info};

use crate::error::{ConfigError, PipelineError};
use crate::tts::assembler::{assemble, AudioTrack, SAMPLE_RATE};
use crate::tts::capability::{SpeechSynthesizer, Tokenizer, VoiceLoader, VoiceReferenceTable};
use crate::tts::chunking::{pack_chunks, DEFAULT_MAX_LENGTH};
use crate::tts::orchestrator::{IrreducibleChunk, Orchestrator, SynthesisContext, MINIMUM_GRANULARITY};
use crate::tts::segmentation::split_into_sentences;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Chunk ceiling in characters.
    pub max_length: usize,
    /// Bisection floor in characters.
    pub minimum_granularity: usize,
    pub sample_rate: u32,
    pub speed: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            minimum_granularity: MINIMUM_GRANULARITY,
            sample_rate: SAMPLE_RATE,
            speed: 1.0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_length == 0 {
            return Err(ConfigError::ZeroMaxLength);
        }
        if self.minimum_granularity == 0 {
            return Err(ConfigError::ZeroGranularity);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        Ok(())
    }
}

/// Result of a completed run. `track` is `None` when no chunk survived.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisReport {
    pub track: Option<AudioTrack>,
    pub chunk_count: usize,
    pub irreducible: Vec<IrreducibleChunk>,
}

impl SynthesisReport {
    pub fn into_track(self) -> Result<AudioTrack, PipelineError> {
        self.track.ok_or(PipelineError::AbsentAudio)
    }
}

/// Fail with [`PipelineError::EmptyInput`] when `text` holds no sentence.
pub fn ensure_speakable(text: &str) -> Result<(), PipelineError> {
    if split_into_sentences(text).is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(())
}

/// Sentence splitting, chunk packing, per-chunk synthesis with recovery and
/// final assembly over a tokenizer and a synthesizer.
pub struct LongformPipeline<T, S> {
    tokenizer: T,
    synthesizer: S,
    config: PipelineConfig,
}

impl<T: Tokenizer, S: SpeechSynthesizer> LongformPipeline<T, S> {
    pub fn new(tokenizer: T, synthesizer: S, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            tokenizer,
            synthesizer,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Split `text` into synthesis-sized chunks.
    pub fn chunks(&self, text: &str) -> Vec<String> {
        pack_chunks(&split_into_sentences(text), self.config.max_length)
    }

    pub fn synthesize(
        &mut self,
        text: &str,
        voice_id: &str,
        voices: &VoiceReferenceTable,
    ) -> Result<SynthesisReport, PipelineError> {
        let chunks = self.chunks(text);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        debug!(chunks = chunks.len(), max_length = self.config.max_length, "split text");

        let ctx = SynthesisContext {
            voice_id,
            voices,
            speed: self.config.speed,
        };
        let mut orchestrator = Orchestrator::new(&self.tokenizer, &mut self.synthesizer)
            .with_minimum_granularity(self.config.minimum_granularity);

        let mut segments = Vec::new();
        let mut irreducible = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            debug!("chunk {}/{}: {} chars", i + 1, chunks.len(), chunk.chars().count());
            let outcome = orchestrator.synthesize_chunk(&ctx, chunk)?;
            segments.extend(outcome.segments);
            irreducible.extend(outcome.irreducible);
        }

        let track = assemble(segments, self.config.sample_rate);
        match &track {
            Some(track) => info!(
                segments = track.segment_count(),
                samples = track.sample_count(),
                seconds = track.duration_secs(),
                skipped = irreducible.len(),
                "assembled audio track"
            ),
            None => info!(skipped = irreducible.len(), "no audio produced"),
        }

        Ok(SynthesisReport {
            track,
            chunk_count: chunks.len(),
            irreducible,
        })
    }

    /// Load `voice_id` through `loader`, then synthesize.
    pub fn synthesize_with_loader<L: VoiceLoader + ?Sized>(
        &mut self,
        text: &str,
        voice_id: &str,
        loader: &L,
    ) -> Result<SynthesisReport, PipelineError> {
        ensure_speakable(text)?;
        let voices = loader.load_voice(voice_id)?;
        self.synthesize(text, voice_id, &voices)
    }
}
