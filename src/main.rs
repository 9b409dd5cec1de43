//! Console entry point — listen, print, repeat until the stop phrase.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line; `--list-devices` prints inputs and exits.
//! 3. Load [`AppConfig`] (writing defaults on first run) and apply CLI
//!    overrides.
//! 4. Resolve the capture rate (device default unless configured).
//! 5. Load the Whisper model and wrap it in an [`UtteranceRecognizer`].
//! 6. Run the [`UtteranceLoop`] until the stop phrase is recognized.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use mic_stream_asr::{
    audio::{AudioBackend, CpalBackend, DeviceSelector, StreamParams},
    config::{AppConfig, AppPaths},
    pipeline::UtteranceLoop,
    stt::{TranscribeParams, UtteranceRecognizer, WhisperEngine},
};

#[derive(Debug, Parser)]
#[command(name = "mic-stream-asr", about = "Transcribe the microphone until a stop phrase is spoken")]
struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Whisper GGML model name or path.
    #[arg(long)]
    model: Option<String>,

    /// Input device name (substring match).
    #[arg(long)]
    device: Option<String>,

    /// Capture rate in Hz (defaults to the device rate).
    #[arg(long = "sample-rate")]
    sample_rate: Option<u32>,

    /// Samples per captured block.
    #[arg(long = "chunk-size")]
    chunk_size: Option<usize>,

    /// Recognition language (ISO-639-1 or "auto").
    #[arg(long)]
    language: Option<String>,

    /// Phrase that ends the program.
    #[arg(long = "stop-phrase")]
    stop_phrase: Option<String>,

    /// List input devices and exit.
    #[arg(long = "list-devices", default_value_t = false)]
    list_devices: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.stt.model = model.clone();
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(rate) = self.sample_rate {
            config.audio.sample_rate = Some(rate);
        }
        if let Some(size) = self.chunk_size {
            config.audio.chunk_size = size;
        }
        if let Some(language) = &self.language {
            config.stt.language = language.clone();
        }
        if let Some(phrase) = &self.stop_phrase {
            config.session.stop_phrase = phrase.clone();
        }
    }
}

fn list_devices(backend: &CpalBackend) -> Result<()> {
    let devices = backend.list_input_devices()?;
    if devices.is_empty() {
        println!("no input devices found");
    }
    for (name, is_default) in devices {
        let marker = if is_default { " (default)" } else { "" };
        println!("{name}{marker}");
    }
    Ok(())
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();
    let backend = CpalBackend::new();
    if cli.list_devices {
        return list_devices(&backend);
    }

    // 3. Configuration
    let paths = AppPaths::new();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let config = AppConfig::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config ({e}); using defaults");
                AppConfig::default()
            });
            if !paths.settings_file.exists() {
                match config.save() {
                    Ok(()) => log::info!("wrote default settings to {}", paths.settings_file.display()),
                    Err(e) => log::warn!("could not write {}: {e}", paths.settings_file.display()),
                }
            }
            config
        }
    };
    cli.apply(&mut config);

    // 4. Capture parameters
    let selector = DeviceSelector::from_name(config.audio.device.as_deref());
    let sample_rate = match config.audio.sample_rate {
        Some(rate) => rate,
        None => backend
            .default_input_sample_rate(&selector)
            .context("failed to query the input device")?,
    };
    let params = StreamParams {
        sample_rate,
        block_size: config.audio.chunk_size,
    };
    log::info!(
        "capturing from {selector} at {} Hz, {} samples per block",
        params.sample_rate,
        params.block_size
    );

    // 5. Recognizer
    let model_path = config.model_path(&paths);
    let engine = WhisperEngine::load(&model_path, TranscribeParams::from(&config.stt))
        .with_context(|| format!("failed to load Whisper model {}", model_path.display()))?;
    log::info!("Whisper model loaded: {}", model_path.display());
    let mut recognizer = UtteranceRecognizer::new(Arc::new(engine), sample_rate, &config.vad);

    // 6. Loop
    let runner = UtteranceLoop::new(&backend, params, selector, config.session.clone());
    let mut stdout = std::io::stdout();
    runner.run(&mut recognizer, &mut stdout)?;
    Ok(())
}
