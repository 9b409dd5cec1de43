//! Configuration: [`AppConfig`] and its per-subsystem sections, TOML
//! persistence via [`AppConfig::load`] / [`AppConfig::save`], and
//! [`AppPaths`] for platform data directories.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, SessionConfig, SttConfig, VadConfig};
