//! Continuous microphone recognition: capture audio on the driver thread,
//! hand it to the recognition loop through a queue, print what was said.

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod stt;
