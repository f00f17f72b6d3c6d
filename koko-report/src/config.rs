//! Configuration management for koko-report
//!
//! Configuration priority (highest to lowest):
//! 1. Command line arguments
//! 2. Config file specified via --config flag
//! 3. Environment variables (KOKO_REPORT_*)
//! 4. Local config file (./config.toml)
//! 5. Global config file ($XDG_CONFIG_HOME/koko-report/config.toml or ~/.config/koko-report/config.toml)

use config::{Config, ConfigError, Environment, File};
use longtts::PipelineConfig;
use serde::Deserialize;
use std::path::PathBuf;

pub const MODEL_URL: &str =
    "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0/kokoro-v1.0.onnx";
pub const VOICES_URL: &str =
    "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0/voices-v1.0.bin";

/// Application configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Output directory for generated audio files
    pub output_dir: String,

    /// Kokoro voice id
    pub voice: String,

    /// eSpeak language code used for phonemization
    pub language: String,

    pub speed: f32,

    /// Maximum characters per synthesis chunk
    pub max_length: usize,

    pub mono: bool,

    /// Play the track after writing it
    pub play: bool,

    /// Path to a custom model file
    pub model_path: Option<String>,

    /// Path to a custom voices file
    pub voices_path: Option<String>,

    pub verbose: bool,

    pub weather: WeatherConfig,

    pub llm: LlmConfig,
}

/// OpenWeatherMap settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeatherConfig {
    pub city: String,
    pub units: String,
    pub lang: String,
    /// Falls back to the OPENWEATHER_KEY environment variable
    pub api_key: Option<String>,
}

/// Ollama text generation settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: "tmp".to_string(),
            voice: "ef_dora".to_string(),
            language: "es".to_string(),
            speed: 1.0,
            max_length: 150,
            mono: false,
            play: false,
            model_path: None,
            voices_path: None,
            verbose: false,
            weather: WeatherConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: "Montevideo,UY".to_string(),
            units: "metric".to_string(),
            lang: "es".to_string(),
            api_key: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/generate".to_string(),
            model: "gemma3:4b".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Get the XDG config directory ($XDG_CONFIG_HOME or ~/.config)
pub fn xdg_config_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg);
        }
    }
    dirs::home_dir()
        .map(|h| h.join(".config"))
        .unwrap_or_else(|| PathBuf::from(".config"))
}

/// Get the XDG data directory ($XDG_DATA_HOME or ~/.local/share)
pub fn xdg_data_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg);
        }
    }
    dirs::home_dir()
        .map(|h| h.join(".local").join("share"))
        .unwrap_or_else(|| PathBuf::from(".local/share"))
}

impl AppConfig {
    pub fn global_config_dir() -> PathBuf {
        xdg_config_home().join("koko-report")
    }

    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    pub fn local_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Directory for downloaded model and voices files
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("koko-report")
    }

    /// Load configuration with proper priority chain
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::from_str(
            include_str!("default_config.toml"),
            config::FileFormat::Toml,
        ));

        let global_path = Self::global_config_path();
        if global_path.exists() {
            builder = builder.add_source(File::from(global_path).required(false));
        }

        let local_path = Self::local_config_path();
        if local_path.exists() {
            builder = builder.add_source(File::from(local_path).required(false));
        }

        // e.g. KOKO_REPORT_VOICE, KOKO_REPORT_WEATHER__CITY
        builder = builder.add_source(
            Environment::with_prefix("KOKO_REPORT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(config_path) = config_file {
            let expanded = expand_path(config_path);
            builder = builder.add_source(File::with_name(&expanded).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Ensure the global config directory exists and create default config if needed
    pub fn ensure_config_exists() -> std::io::Result<PathBuf> {
        let config_dir = Self::global_config_dir();
        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)?;
        }

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            std::fs::write(&config_path, include_str!("default_config.toml"))?;
        }
        Ok(config_path)
    }

    pub fn output_path(&self, filename: &str) -> String {
        format!("{}/{}", expand_path(&self.output_dir), filename)
    }

    /// Model file, either configured or in the data directory
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path
            .as_deref()
            .map(|p| PathBuf::from(expand_path(p)))
            .unwrap_or_else(|| Self::data_dir().join("kokoro-v1.0.onnx"))
    }

    /// Voices file, either configured or in the data directory
    pub fn resolved_voices_path(&self) -> PathBuf {
        self.voices_path
            .as_deref()
            .map(|p| PathBuf::from(expand_path(p)))
            .unwrap_or_else(|| Self::data_dir().join("voices-v1.0.bin"))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_length: self.max_length,
            speed: self.speed,
            ..PipelineConfig::default()
        }
    }

    pub fn print_paths() {
        eprintln!("Configuration paths:");
        eprintln!("  Config dir:  {}", Self::global_config_dir().display());
        eprintln!("  Config file: {}", Self::global_config_path().display());
        eprintln!("  Data dir:    {}", Self::data_dir().display());
    }
}

/// Expand shell-like paths (~ and environment variables)
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
