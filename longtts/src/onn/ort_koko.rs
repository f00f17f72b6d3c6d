use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::debug;

use crate::error::SynthesisError;
use crate::onn::vocab::tokenize;
use crate::tts::capability::{AudioBuffer, Phonemes, SpeechSynthesizer};

/// Token context of the Kokoro model, including the two padding tokens.
pub const CONTEXT_LENGTH: usize = 512;

/// Dimension of one style (voice reference) vector.
pub const STYLE_DIM: usize = 256;

fn inference_error(stage: &str, err: impl std::fmt::Display) -> SynthesisError {
    SynthesisError::Inference(format!("{stage}: {err}"))
}

/// Kokoro v1.0 ONNX model.
pub struct OrtKoko {
    session: Session,
}

impl OrtKoko {
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self, SynthesisError> {
        let model_path = model_path.as_ref();
        let session = Session::builder()
            .map_err(|e| inference_error("failed to create session", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| inference_error("failed to set optimization level", e))?
            .commit_from_file(model_path)
            .map_err(|e| inference_error(&format!("failed to load {}", model_path.display()), e))?;
        Ok(Self { session })
    }

    /// Run the model on already padded token ids.
    pub fn infer(&mut self, tokens: Vec<i64>, style: &[f32], speed: f32) -> Result<ArrayD<f32>, SynthesisError> {
        if style.len() != STYLE_DIM {
            return Err(SynthesisError::Inference(format!(
                "style vector has {} values, expected {STYLE_DIM}",
                style.len()
            )));
        }

        let seq_len = tokens.len();
        let tokens = Tensor::from_array(([1usize, seq_len], tokens))
            .map_err(|e| inference_error("failed to create tokens tensor", e))?;
        let style = Tensor::from_array(([1usize, STYLE_DIM], style.to_vec()))
            .map_err(|e| inference_error("failed to create style tensor", e))?;
        let speed = Tensor::from_array(([1usize], vec![speed]))
            .map_err(|e| inference_error("failed to create speed tensor", e))?;

        let outputs = self
            .session
            .run(ort::inputs![
                "tokens" => tokens,
                "style" => style,
                "speed" => speed
            ])
            .map_err(|e| inference_error("inference failed", e))?;

        let (shape, audio) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_error("failed to extract output", e))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();

        ArrayD::from_shape_vec(IxDyn(&dims), audio.to_vec())
            .map_err(|e| inference_error("unexpected output shape", e))
    }
}

/// Pad token ids with the `$` token on both sides and check them against the
/// model context.
pub fn prepare_tokens(phonemes: &Phonemes) -> Result<Vec<i64>, SynthesisError> {
    let tokens = tokenize(phonemes.as_str());
    if tokens.len() + 2 > CONTEXT_LENGTH {
        return Err(SynthesisError::CapacityExceeded {
            len: tokens.len(),
            limit: CONTEXT_LENGTH - 2,
        });
    }

    let mut padded = Vec::with_capacity(tokens.len() + 2);
    padded.push(0);
    padded.extend(tokens);
    padded.push(0);
    Ok(padded)
}

impl SpeechSynthesizer for OrtKoko {
    fn synthesize(
        &mut self,
        phonemes: &Phonemes,
        reference: &[f32],
        speed: f32,
    ) -> Result<AudioBuffer, SynthesisError> {
        let tokens = prepare_tokens(phonemes)?;
        debug!(tokens = tokens.len(), speed, "running kokoro inference");
        self.infer(tokens, reference, speed).map(AudioBuffer::Tensor)
    }
}
