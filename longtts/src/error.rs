use thiserror::Error;

/// Failure raised by a speech synthesizer for one call.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The phoneme sequence does not fit the model's context.
    #[error("phoneme sequence of length {len} exceeds synthesis capacity {limit}")]
    CapacityExceeded { len: usize, limit: usize },

    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("phonemization failed for language '{lang}': {message}")]
    Phonemize { lang: String, message: String },

    #[error("tokenizer produced no candidate for text: {0:?}")]
    NoCandidate(String),
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice '{id}' not found, available voices: {available:?}")]
    NotFound { id: String, available: Vec<String> },

    #[error("voice table '{0}' is empty")]
    Empty(String),

    #[error("failed to read voices file {path}: {message}")]
    Read { path: String, message: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_length must be greater than zero")]
    ZeroMaxLength,

    #[error("minimum_granularity must be greater than zero")]
    ZeroGranularity,

    #[error("sample_rate must be greater than zero")]
    ZeroSampleRate,

    #[error("speed must be a positive finite number, got {0}")]
    InvalidSpeed(f32),
}

/// Errors that abort a whole synthesis request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input text contains nothing to synthesize")]
    EmptyInput,

    #[error("no audio produced: every chunk failed to synthesize")]
    AbsentAudio,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("tokenizer call failed: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("synthesis call failed: {0}")]
    Synthesis(SynthesisError),

    #[error("voice loading failed: {0}")]
    Voice(#[from] VoiceError),
}

impl PipelineError {
    /// True for failures coming from an external collaborator call.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            PipelineError::Tokenizer(_) | PipelineError::Synthesis(_) | PipelineError::Voice(_)
        )
    }
}
