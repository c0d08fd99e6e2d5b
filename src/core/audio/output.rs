use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info};

use super::FrameSink;
use crate::core::mixer::Frame;

/// Frames buffered between `render` and the device callback
pub const DEVICE_QUEUE_FRAMES: usize = 2;

/// Plays frames on a cpal output device
pub struct CpalSink {
    frames: Sender<Frame>,
    _stream: Stream,
}

impl CpalSink {
    /// Names of the output devices on the default host
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        Ok(host
            .output_devices()
            .context("Failed to enumerate output devices")?
            .filter_map(|device| device.name().ok())
            .collect())
    }

    /// Open `device_name`, or the default output device, at `sample_rate`
    pub fn open(sample_rate: u32, device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        info!("Using audio host: {}", host.id().name());

        let device = match device_name {
            Some(name) => host
                .output_devices()?
                .find(|device| device.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("Output device '{}' not found", name))?,
            None => host
                .default_output_device()
                .ok_or_else(|| anyhow!("No output device available"))?,
        };
        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        let default_config = device
            .default_output_config()
            .context("Output device has no default configuration")?;
        let sample_format = default_config.sample_format();
        let config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        info!(
            "Stream config: {} Hz, {} channel(s), {:?}",
            sample_rate, config.channels, sample_format
        );

        let (sender, receiver) = bounded(DEVICE_QUEUE_FRAMES);
        let reader = FrameReader::new(receiver);
        let stream = match sample_format {
            SampleFormat::F32 => create_stream::<f32>(&device, &config, reader),
            SampleFormat::I16 => create_stream::<i16>(&device, &config, reader),
            SampleFormat::U16 => create_stream::<u16>(&device, &config, reader),
            other => bail!("Unsupported sample format {:?}", other),
        }?;
        stream.play().context("Failed to start audio stream")?;
        info!("Audio stream started");

        Ok(Self {
            frames: sender,
            _stream: stream,
        })
    }
}

impl FrameSink for CpalSink {
    fn render(&mut self, frame: Frame) -> Result<()> {
        // Blocks while the device still has a full queue
        self.frames
            .send(frame)
            .map_err(|_| anyhow!("Audio stream stopped accepting frames"))
    }
}

/// Turns queued frames back into a sample stream for the device callback.
/// Plays silence when no frame is ready; the callback must not block.
pub struct FrameReader {
    receiver: Receiver<Frame>,
    current: Frame,
    position: usize,
    underruns: u64,
}

impl FrameReader {
    pub fn new(receiver: Receiver<Frame>) -> Self {
        Self {
            receiver,
            current: Frame::default(),
            position: 0,
            underruns: 0,
        }
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    pub fn next_sample(&mut self) -> i16 {
        if self.position >= self.current.len() {
            match self.receiver.try_recv() {
                Ok(frame) => {
                    self.current = frame;
                    self.position = 0;
                }
                Err(_) => {
                    self.underruns += 1;
                    return 0;
                }
            }
        }
        let sample = self.current.get(self.position).copied().unwrap_or(0);
        self.position += 1;
        sample
    }
}

fn create_stream<T>(device: &cpal::Device, config: &cpal::StreamConfig, mut reader: FrameReader) -> Result<Stream>
where
    T: SizedSample + FromSample<i16> + Send + 'static,
{
    let channels = config.channels as usize;
    let err_fn = |err| error!("an error occurred on the audio stream: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // Mono in, same sample on every channel
            for frame in data.chunks_mut(channels) {
                let value = T::from_sample(reader.next_sample());
                for sample in frame.iter_mut() {
                    *sample = value;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
