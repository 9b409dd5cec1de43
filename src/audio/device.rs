//! [`AudioBackend`] implementation on top of `cpal`.
//!
//! The stream is opened with the device's own channel count and sample
//! format at the requested rate; the data callback downmixes, converts to
//! `i16` and re-blocks through a [`Reblocker`] so the session sees exact
//! `block_size` blocks no matter what buffer size the driver picks.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};

use super::block::Reblocker;
use super::capture::{
    AudioBackend, BlockCallback, CaptureError, DeviceSelector, InputStream, StatusCallback,
    StreamParams, StreamStatus,
};

// ---------------------------------------------------------------------------
// CpalStream
// ---------------------------------------------------------------------------

/// RAII guard around a playing `cpal::Stream`.
struct CpalStream {
    stream: cpal::Stream,
}

impl InputStream for CpalStream {
    fn pause(&mut self) -> Result<(), CaptureError> {
        self.stream.pause()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CpalBackend
// ---------------------------------------------------------------------------

/// Input devices of the platform's default cpal host.
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Names of all input devices, paired with whether each is the default.
    pub fn list_input_devices(&self) -> Result<Vec<(String, bool)>, CaptureError> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let mut names = Vec::new();
        for device in self.host.input_devices()? {
            match device.name() {
                Ok(name) => {
                    let is_default = default_name.as_deref() == Some(name.as_str());
                    names.push((name, is_default));
                }
                Err(e) => log::debug!("skipping input device without a name: {e}"),
            }
        }
        Ok(names)
    }

    fn find_device(&self, selector: &DeviceSelector) -> Result<cpal::Device, CaptureError> {
        match selector {
            DeviceSelector::Default => self.host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device".into())
            }),
            DeviceSelector::Named(_) => {
                for device in self.host.input_devices()? {
                    if let Ok(name) = device.name() {
                        if selector.matches(&name) {
                            log::debug!("selected input device {name:?}");
                            return Ok(device);
                        }
                    }
                }
                Err(CaptureError::DeviceUnavailable(selector.to_string()))
            }
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn default_input_sample_rate(&self, selector: &DeviceSelector) -> Result<u32, CaptureError> {
        let device = self.find_device(selector)?;
        Ok(device.default_input_config()?.sample_rate().0)
    }

    fn open_input_stream(
        &self,
        params: StreamParams,
        selector: &DeviceSelector,
        on_block: BlockCallback,
        on_status: StatusCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError> {
        params.validate()?;
        let device = self.find_device(selector)?;
        let supported = device.default_input_config()?;

        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build::<f32>(&device, &config, params, on_block, on_status),
            SampleFormat::I16 => build::<i16>(&device, &config, params, on_block, on_status),
            SampleFormat::U16 => build::<u16>(&device, &config, params, on_block, on_status),
            other => Err(CaptureError::DeviceOpen(format!(
                "unsupported sample format {other:?}"
            ))),
        }?;

        stream
            .play()
            .map_err(|e| CaptureError::DeviceOpen(format!("failed to start stream: {e}")))?;

        Ok(Box::new(CpalStream { stream }))
    }
}

fn build<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: StreamParams,
    mut on_block: BlockCallback,
    mut on_status: StatusCallback,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut reblocker = Reblocker::new(params.block_size);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                reblocker.push_frames(data, channels, |block| on_block(block));
            },
            move |err: cpal::StreamError| match err {
                cpal::StreamError::DeviceNotAvailable => {
                    on_status(StreamStatus::Lost(err.to_string()))
                }
                other => on_status(StreamStatus::Warning(other.to_string())),
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceOpen(e.to_string()))
}
