//! Where settings and models live on disk.
//!
//! | | Linux | macOS | Windows |
//! |---|---|---|---|
//! | settings | `~/.config/mic-stream-asr/` | `~/Library/Application Support/mic-stream-asr/` | `%APPDATA%\mic-stream-asr\` |
//! | models | `~/.local/share/mic-stream-asr/models/` | `~/Library/Application Support/mic-stream-asr/models/` | `%LOCALAPPDATA%\mic-stream-asr\models\` |

use std::path::{Path, PathBuf};

const APP_DIR: &str = "mic-stream-asr";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// Searched for `ggml-<name>.bin` when a model is given by name.
    pub models_dir: PathBuf,
}

impl AppPaths {
    /// Platform directories, or the working directory on platforms without
    /// them.
    pub fn new() -> Self {
        let base = |dir: Option<PathBuf>| dir.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR);
        Self::rooted(&base(dirs::config_dir()), &base(dirs::data_local_dir()))
    }

    /// Layout under explicit roots.
    pub fn rooted(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            settings_file: config_dir.join(SETTINGS_FILE),
            models_dir: data_dir.join("models"),
        }
    }

    /// File name whisper.cpp's download script gives model `name`.
    pub fn model_file(&self, name: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{name}.bin"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
