use crate::tts::orchestrator::AudioSegment;

/// Kokoro output sample rate.
pub const SAMPLE_RATE: u32 = 24000;

/// The ordered concatenation of every synthesized segment of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    samples: Vec<f32>,
    sample_rate: u32,
    segment_count: usize,
}

impl AudioTrack {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Size of the raw 32-bit float PCM data.
    pub fn size_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }
}

/// Concatenate segments in order.
///
/// Returns `None` when there is nothing to assemble; a zero-segment run never
/// produces an empty track.
pub fn assemble(segments: Vec<AudioSegment>, sample_rate: u32) -> Option<AudioTrack> {
    if segments.is_empty() {
        return None;
    }

    let total: usize = segments.iter().map(|s| s.samples.len()).sum();
    let segment_count = segments.len();
    let mut samples = Vec::with_capacity(total);
    for segment in segments {
        samples.extend_from_slice(&segment.samples);
    }

    Some(AudioTrack {
        samples,
        sample_rate,
        segment_count,
    })
}
