use std::path::Path;

use crate::tts::assembler::AudioTrack;

/// Write `track` as a 32-bit float WAV file. Stereo output duplicates every
/// sample into both channels.
pub fn write_wav(track: &AudioTrack, path: impl AsRef<Path>, mono: bool) -> Result<(), hound::Error> {
    let channels = if mono { 1 } else { 2 };
    let spec = hound::WavSpec {
        channels,
        sample_rate: track.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in track.samples() {
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::assembler::{assemble, SAMPLE_RATE};
    use crate::tts::orchestrator::AudioSegment;

    fn track() -> AudioTrack {
        let segment = AudioSegment {
            text: "hola".into(),
            samples: vec![0.0, 0.5, -0.5],
        };
        assemble(vec![segment], SAMPLE_RATE).unwrap()
    }

    #[test]
    fn test_mono_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav(&track(), &path, true).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 24000);
        let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_stereo_duplicates_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav(&track(), &path, false).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 6);
    }
}
