use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use ndarray_npy::NpzReader;
use tracing::debug;

use crate::error::VoiceError;
use crate::tts::capability::{VoiceLoader, VoiceReferenceTable};

/// Loads voice reference tables from a Kokoro `voices-v1.0.bin` NPZ archive.
///
/// Every entry is a `[N, 1, 256]` float array named after the voice id.
#[derive(Debug, Clone)]
pub struct NpzVoiceLoader {
    path: PathBuf,
}

fn voice_name(entry: &str) -> &str {
    entry.strip_suffix(".npy").unwrap_or(entry)
}

impl NpzVoiceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, err: impl std::fmt::Display) -> VoiceError {
        VoiceError::Read {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn open(&self) -> Result<(NpzReader<File>, Vec<String>), VoiceError> {
        let file = File::open(&self.path).map_err(|e| self.read_error(e))?;
        let mut npz = NpzReader::new(file).map_err(|e| self.read_error(e))?;
        let names = npz.names().map_err(|e| self.read_error(e))?;
        Ok((npz, names))
    }

    /// Sorted ids of every voice in the archive.
    pub fn available_voices(&self) -> Result<Vec<String>, VoiceError> {
        let (_, names) = self.open()?;
        let mut voices: Vec<String> = names.iter().map(|n| voice_name(n).to_string()).collect();
        voices.sort();
        Ok(voices)
    }
}

impl VoiceLoader for NpzVoiceLoader {
    fn load_voice(&self, voice_id: &str) -> Result<VoiceReferenceTable, VoiceError> {
        let (mut npz, names) = self.open()?;
        let Some(entry) = names.iter().find(|n| voice_name(n) == voice_id) else {
            let mut available: Vec<String> = names.iter().map(|n| voice_name(n).to_string()).collect();
            available.sort();
            return Err(VoiceError::NotFound {
                id: voice_id.to_string(),
                available,
            });
        };

        let data: Array3<f32> = npz.by_name(entry).map_err(|e| self.read_error(e))?;
        let rows: Vec<Vec<f32>> = data
            .outer_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        if rows.is_empty() {
            return Err(VoiceError::Empty(voice_id.to_string()));
        }
        debug!(voice = voice_id, rows = rows.len(), "loaded voice reference table");
        Ok(VoiceReferenceTable::new(rows))
    }
}
