//! # Audio Capture Module
//!
//! Real-time audio capture using CPAL (Cross-Platform Audio Library).
//!
//! The platform stream lives on a dedicated capture thread. The device
//! callback down-mixes each buffer to mono and forwards it over a bounded
//! channel; the sampling loop drains that channel once per frame. Dropping
//! the [`CaptureStream`] signals the thread to pause and release the stream.
//!
//! The [`AudioInput`] trait is the seam between the session and the
//! hardware, so sessions can be driven by a synthetic source in tests.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender};

use crate::config::CaptureConfig;
use crate::error::{Result, TunerError};

/// Chunks buffered between the device callback and the sampling loop.
/// At ~10 ms per device buffer this covers well over one display frame;
/// anything beyond it is dropped rather than queued.
const CHUNK_QUEUE_DEPTH: usize = 64;

/// An open input stream delivering mono samples.
pub trait CaptureStream: Send {
    /// Sample rate the stream actually runs at, in Hz.
    fn sample_rate(&self) -> u32;

    /// Moves every sample received since the last call into `out`.
    fn drain_into(&mut self, out: &mut Vec<f32>);
}

/// Something that can open an input stream: the default microphone, or a
/// synthetic source.
pub trait AudioInput {
    fn open(&mut self, config: &CaptureConfig) -> Result<Box<dyn CaptureStream>>;
}

/// The host's default input device.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInput;

impl AudioInput for DefaultInput {
    fn open(&mut self, config: &CaptureConfig) -> Result<Box<dyn CaptureStream>> {
        let stream = CpalCapture::start(config.preferred_sample_rate)?;
        Ok(Box::new(stream))
    }
}

/// Handle to a running CPAL capture thread.
#[derive(Debug)]
pub struct CpalCapture {
    sample_rate: u32,
    samples: Receiver<Vec<f32>>,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CpalCapture {
    /// Starts capture from the default input device.
    ///
    /// Blocks until the capture thread reports whether the stream opened,
    /// so setup failures surface here rather than on the first frame.
    ///
    /// # Returns
    /// * `Ok(capture)` - Running capture handle
    /// * `Err(e)` - No device, no usable format, or the stream failed to start
    pub fn start(preferred_sample_rate: u32) -> Result<Self> {
        let (sample_tx, sample_rx) = crossbeam_channel::bounded(CHUNK_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_handle = thread::Builder::new()
            .name("concert-a-capture".into())
            .spawn(move || {
                log::debug!("[AUDIO-THREAD] Starting capture thread...");
                let (stream, sample_rate) = match open_default_stream(preferred_sample_rate, sample_tx) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(sample_rate));

                // Park until the owner drops its handle or asks us to stop.
                let _ = shutdown_rx.recv();

                log::debug!("[AUDIO-THREAD] Stopping stream and exiting...");
                if let Err(e) = stream.pause() {
                    log::warn!("[AUDIO-THREAD] Error pausing stream: {}", e);
                }
                drop(stream);
                log::debug!("[AUDIO-THREAD] Capture thread finished");
            })?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(TunerError::WorkerDisconnected);
            }
        };

        Ok(Self {
            sample_rate,
            samples: sample_rx,
            shutdown_tx,
            thread_handle: Some(thread_handle),
        })
    }
}

impl CaptureStream for CpalCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn drain_into(&mut self, out: &mut Vec<f32>) {
        while let Ok(chunk) = self.samples.try_recv() {
            out.extend_from_slice(&chunk);
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[AUDIO] Capture thread panicked during shutdown");
            }
        }
        log::info!("[AUDIO] Input stream released");
    }
}

/// Opens and starts the default input stream. Runs on the capture thread.
fn open_default_stream(
    preferred_sample_rate: u32,
    sender: Sender<Vec<f32>>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(TunerError::NoInputDevice)?;

    let device_name = device.name()?;
    log::info!("[AUDIO] Using audio input device: {}", device_name);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, preferred_sample_rate)
        .ok_or(TunerError::UnsupportedFormat {
            device: device_name,
        })?;

    let sample_rate = cpal::SampleRate(clamp_sample_rate(&supported_config, preferred_sample_rate));
    let config: cpal::StreamConfig = supported_config.with_sample_rate(sample_rate).into();
    let channels = config.channels as usize;

    log::info!(
        "[AUDIO] Selected sample rate: {} Hz, {} channel(s)",
        sample_rate.0,
        channels
    );

    let err_fn = |err| log::error!("[AUDIO] An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Drop the chunk if the loop has fallen behind.
            let _ = sender.try_send(downmix(data, channels));
        },
        err_fn,
        Some(Duration::from_secs(2)),
    )?;

    stream.play()?;

    Ok((stream, sample_rate.0))
}

/// Averages interleaved frames down to a single channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Picks the rate closest to `target_rate` that the range supports.
fn clamp_sample_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}

/// Finds the best supported input configuration.
///
/// Only `f32` formats are considered. Among those, the one whose range lies
/// closest to `target_rate` wins, then the one with fewer channels.
///
/// # Returns
/// * `Some(config)` - Best matching configuration
/// * `None` - No `f32` configuration offered
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let distance = target_rate.abs_diff(clamp_sample_rate(c, target_rate));
            (distance, c.channels())
        })
}
