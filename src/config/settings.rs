//! Application settings structs, defaults and TOML persistence.
//!
//! Every section implements `Serialize`, `Deserialize`, `Default` and
//! `Clone`, and is `#[serde(default)]` so a partial `settings.toml` only
//! overrides the keys it names.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Capture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sampling rate in Hz.  `None` uses the input device's default rate.
    pub sample_rate: Option<u32>,
    /// Samples per captured block.
    pub chunk_size: usize,
    /// Input device name (case-insensitive substring).  `None` means the
    /// system default input.
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            chunk_size: 8_000,
            device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Whisper engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Model file stem under the models directory (`ggml-<model>.bin`), or a
    /// path to a GGML file.
    pub model: String,
    /// ISO-639-1 code, or `"auto"`.
    pub language: String,
    /// Inference threads.  `None` picks from available parallelism.
    pub n_threads: Option<i32>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "base".into(),
            language: "ja".into(),
            n_threads: None,
        }
    }
}

// ---------------------------------------------------------------------------
// VadConfig
// ---------------------------------------------------------------------------

/// Ambient-noise calibration and end-of-utterance timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Leading audio of each utterance used to measure room noise.
    pub calibration_secs: f32,
    /// Speech threshold as a multiple of the measured ambient RMS.
    pub dynamic_energy_ratio: f32,
    /// Floor for the speech threshold (RMS, 0.0 – 1.0).
    pub min_energy_threshold: f32,
    /// Silence after speech that ends an utterance.
    pub pause_secs: f32,
    /// Speech shorter than this is ignored as noise.
    pub min_speech_secs: f32,
    /// Utterances are cut at this length.
    pub max_utterance_secs: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            calibration_secs: 1.0,
            dynamic_energy_ratio: 1.5,
            min_energy_threshold: 0.01,
            pause_secs: 0.8,
            min_speech_secs: 0.3,
            max_utterance_secs: 30.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Console loop behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Saying this phrase ends the program.
    pub stop_phrase: String,
    /// Remove all whitespace from recognized text before printing and
    /// comparing with the stop phrase.
    pub strip_whitespace: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_phrase: "終わり".into(),
            strip_whitespace: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use mic_stream_asr::config::AppConfig;
///
/// // Returns Default when the file is missing
/// let config = AppConfig::load().unwrap();
/// println!("stop phrase: {}", config.session.stop_phrase);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub vad: VadConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load from the platform `settings.toml`; a missing file yields
    /// defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to the platform `settings.toml`, creating parent directories.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve [`SttConfig::model`] to a file path.
    ///
    /// Values that look like paths (contain a separator or end in `.bin`)
    /// are used as-is; anything else names `ggml-<model>.bin` in the models
    /// directory.
    pub fn model_path(&self, paths: &AppPaths) -> PathBuf {
        let model = self.stt.model.as_str();
        let as_path = Path::new(model);
        if as_path.components().count() > 1 || as_path.extension().is_some_and(|e| e == "bin") {
            as_path.to_path_buf()
        } else {
            paths.model_file(model)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
