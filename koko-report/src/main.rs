use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use longtts::onn::{init_ort, ort_koko::OrtKoko};
use longtts::tts::espeak::EspeakTokenizer;
use longtts::utils::{fileio::download_file_from_url, voices::NpzVoiceLoader, wav::write_wav};
use longtts::{ensure_speakable, AudioTrack, LongformPipeline};
use rodio::{buffer::SamplesBuffer, OutputStream, Sink};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod weather;

use config::{AppConfig, MODEL_URL, VOICES_URL};

#[derive(Subcommand, Debug, Clone)]
enum Mode {
    /// Generate speech for a string of text
    #[command(alias = "t")]
    Text {
        /// Text to generate speech for
        text: String,

        /// Path to output the WAV file to
        /// Default: {output_dir}/output.wav (from config)
        #[arg(short = 'o', long = "output", value_name = "OUTPUT_PATH")]
        save_path: Option<String>,
    },

    /// Read a whole file and generate one speech file for it
    #[command(alias = "f")]
    File {
        /// Filesystem path to read text from
        input_path: String,

        /// Default: {output_dir}/output.wav (from config)
        #[arg(short = 'o', long = "output", value_name = "OUTPUT_PATH")]
        save_path: Option<String>,
    },

    /// Fetch the current weather, have a local LLM write a report and read it aloud
    #[command(alias = "w")]
    Weather {
        /// City query for OpenWeatherMap, e.g. "Montevideo,UY"
        #[arg(long)]
        city: Option<String>,

        /// Default: {output_dir}/weather_report.wav (from config)
        #[arg(short = 'o', long = "output", value_name = "OUTPUT_PATH")]
        save_path: Option<String>,
    },

    /// Show configuration paths and current settings
    #[command(name = "config", alias = "cfg")]
    Config {
        /// Show all configuration paths
        #[arg(long)]
        paths: bool,

        /// Initialize config file in global config directory
        #[arg(long)]
        init: bool,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "koko-report")]
#[command(version)]
#[command(about = "Read long texts and weather reports aloud with the Kokoro model")]
#[command(after_help = "Configuration files are loaded from (highest to lowest priority):
  1. --config <file>
  2. Environment variables (KOKO_REPORT_*)
  3. ./config.toml (local)
  4. $XDG_CONFIG_HOME/koko-report/config.toml (global)")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Path to a configuration file
    #[arg(long = "config", global = true, value_name = "CONFIG_FILE")]
    config_file: Option<String>,

    /// Kokoro voice id, e.g. ef_dora
    #[arg(long, global = true)]
    voice: Option<String>,

    /// eSpeak language code used for phonemization, e.g. es
    #[arg(short = 'l', long = "lan", global = true)]
    language: Option<String>,

    #[arg(short = 's', long, global = true)]
    speed: Option<f32>,

    /// Maximum characters per synthesis chunk
    #[arg(long, global = true)]
    max_length: Option<usize>,

    #[arg(long = "model", global = true, value_name = "MODEL_PATH")]
    model_path: Option<String>,

    #[arg(long = "data", global = true, value_name = "VOICES_PATH")]
    voices_path: Option<String>,

    /// Write mono instead of stereo audio
    #[arg(long, global = true)]
    mono: bool,

    /// Play the audio after writing it
    #[arg(long, global = true)]
    play: bool,

    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

impl Cli {
    /// Command line flags win over every configuration source.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(voice) = &self.voice {
            config.voice = voice.clone();
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        if self.model_path.is_some() {
            config.model_path = self.model_path.clone();
        }
        if self.voices_path.is_some() {
            config.voices_path = self.voices_path.clone();
        }
        config.mono |= self.mono;
        config.play |= self.play;
        config.verbose |= self.verbose;
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_parent_dir_exists(file_path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Download the model and voices files if they are not on disk yet.
async fn ensure_assets(config: &AppConfig) -> Result<(PathBuf, PathBuf)> {
    let model_path = config.resolved_model_path();
    let voices_path = config.resolved_voices_path();

    for (path, url) in [(&model_path, MODEL_URL), (&voices_path, VOICES_URL)] {
        if !path.exists() {
            download_file_from_url(url, path)
                .await
                .with_context(|| format!("failed to fetch {}", path.display()))?;
        }
    }
    Ok((model_path, voices_path))
}

fn play(track: AudioTrack) -> Result<()> {
    let (_stream, handle) = OutputStream::try_default().context("no audio output device")?;
    let sink = Sink::try_new(&handle).context("failed to open audio sink")?;
    let sample_rate = track.sample_rate();
    sink.append(SamplesBuffer::new(1, sample_rate, track.into_samples()));
    sink.sleep_until_end();
    Ok(())
}

/// Synthesize `text` into `output_path`. Nothing is written when no audio
/// came out.
async fn speak(config: &AppConfig, text: &str, output_path: &str) -> Result<()> {
    ensure_speakable(text)?;
    let (model_path, voices_path) = ensure_assets(config).await?;
    init_ort(None)?;

    let tokenizer = EspeakTokenizer::new(config.language.clone());
    info!(lang = tokenizer.lang(), voice = %config.voice, "loading {}", model_path.display());
    let model = OrtKoko::new(&model_path)?;
    let voices = NpzVoiceLoader::new(voices_path);
    let mut pipeline = LongformPipeline::new(tokenizer, model, config.pipeline_config())?;
    info!(
        max_length = pipeline.config().max_length,
        speed = pipeline.config().speed,
        "synthesizing {} characters",
        text.chars().count()
    );

    let started = Instant::now();
    let report = pipeline.synthesize_with_loader(text, &config.voice, &voices)?;
    let elapsed = started.elapsed();

    let Some(track) = report.track else {
        println!("No audio generated.");
        return Ok(());
    };

    println!(
        "Kokoro TTS: {:.2}s audio from {} chunks, time: {:.2}s, skipped chunks: {}",
        track.duration_secs(),
        report.chunk_count,
        elapsed.as_secs_f32(),
        report.irreducible.len()
    );

    ensure_parent_dir_exists(output_path)?;
    write_wav(&track, output_path, config.mono).with_context(|| format!("failed to write {output_path}"))?;
    println!("Audio saved to {output_path}");

    if config.play {
        play_or_warn(track);
    }
    Ok(())
}

/// Playback is best effort once the file is saved.
fn play_or_warn(track: AudioTrack) {
    if let Err(err) = play(track) {
        warn!("could not play audio: {err:#}");
    }
}

/// Voice ids in the voices file, if it has been downloaded.
fn voices_summary(config: &AppConfig) -> Vec<String> {
    let loader = NpzVoiceLoader::new(config.resolved_voices_path());
    if !loader.path().exists() {
        return vec![format!("  Voices file: {} (not downloaded)", loader.path().display())];
    }
    let voices = match loader.available_voices() {
        Ok(voices) => voices.join(", "),
        Err(err) => format!("unreadable ({err})"),
    };
    vec![
        format!("  Voices file: {}", loader.path().display()),
        format!("  Voices:      {voices}"),
    ]
}

async fn run(cli: Cli) -> Result<()> {
    if let Mode::Config { paths, init } = &cli.mode {
        if *init {
            let path = AppConfig::ensure_config_exists()?;
            eprintln!("Config file: {}", path.display());
        }
        let config = AppConfig::load(cli.config_file.as_deref())?;
        if *paths || !*init {
            AppConfig::print_paths();
            for line in voices_summary(&config) {
                eprintln!("{line}");
            }
        }
        if !*paths && !*init {
            println!("{config:#?}");
        }
        return Ok(());
    }

    let mut config = AppConfig::load(cli.config_file.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);
    init_logging(config.verbose);

    match &cli.mode {
        Mode::Config { .. } => unreachable!("handled above"),

        Mode::Text { text, save_path } => {
            let output = save_path.clone().unwrap_or_else(|| config.output_path("output.wav"));
            speak(&config, text, &output).await?;
        }

        Mode::File { input_path, save_path } => {
            let text = fs::read_to_string(input_path).with_context(|| format!("failed to read {input_path}"))?;
            let output = save_path.clone().unwrap_or_else(|| config.output_path("output.wav"));
            speak(&config, &text, &output).await?;
        }

        Mode::Weather { city, save_path } => {
            if let Some(city) = city {
                config.weather.city = city.clone();
            }
            let api_key = match config.weather.api_key.clone() {
                Some(key) if !key.is_empty() => key,
                _ => std::env::var("OPENWEATHER_KEY").unwrap_or_default(),
            };
            if api_key.is_empty() {
                bail!("OPENWEATHER_KEY environment variable not set.");
            }

            let client = reqwest::Client::new();
            let current = weather::fetch_weather(&client, &config.weather, &api_key).await?;
            let report = weather::generate_report(&client, &config.llm, &weather::build_prompt(&current)).await?;
            info!("weather report generated ({} characters)", report.chars().count());
            println!("\nWeather report:\n{report}\n");

            let output = save_path
                .clone()
                .unwrap_or_else(|| config.output_path("weather_report.wav"));
            speak(&config, &report, &output).await?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("Received termination signal, exiting immediately.");
        std::process::exit(0);
    })
    .context("failed to set Ctrl-C handler")?;

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}
