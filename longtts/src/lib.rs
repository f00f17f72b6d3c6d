pub mod error;
pub mod onn;
pub mod tts;
pub mod utils;

pub use error::{ConfigError, PipelineError, SynthesisError, TokenizerError, VoiceError};
pub use tts::assembler::{AudioTrack, SAMPLE_RATE};
pub use tts::pipeline::{ensure_speakable, LongformPipeline, PipelineConfig, SynthesisReport};
