//! cpal-based audio interface.
//!
//! [`CpalInterface`] drives a sound card through [cpal](https://crates.io/crates/cpal)
//! (ALSA, CoreAudio, WASAPI). Playback and capture run as two streams on the
//! device's native channel count; the requested channels are mapped in and
//! out of the interleaved buffers.
//!
//! Capture starts with the first output callback, so the recording contains
//! the device round-trip latency. Measure against a loopback reference
//! channel when absolute timing matters.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sfc_io::{AudioInterface, CpalInterface};
//! use ndarray::Array2;
//!
//! let mut interface = CpalInterface::new().with_device("Fireface");
//! let signal = Array2::zeros((48000, 1));
//! let rec = interface.play_and_record(signal.view(), &[1], &[1, 2], 48000)?;
//! rec.status.report();
//! ```

use crate::backend::{AudioInterface, Recording, StreamStatus, check_channels, check_signal};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream};
use ndarray::{Array2, ArrayView2};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Input,
    Output,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Status flags written from the stream error callbacks.
#[derive(Default)]
struct SharedFlags {
    input: AtomicBool,
    output: AtomicBool,
}

impl SharedFlags {
    fn status(&self) -> StreamStatus {
        StreamStatus {
            input_overflow: self.input.load(Ordering::SeqCst),
            output_underflow: self.output.load(Ordering::SeqCst),
            ..StreamStatus::default()
        }
    }
}

/// Blocking play/record over cpal streams.
///
/// Devices are matched by case-insensitive substring; without a name the
/// host's default devices are used. cpal only reports stream errors, not
/// individual xruns, so an error on the capture stream raises
/// `input_overflow` and one on the playback stream `output_underflow`.
pub struct CpalInterface {
    host: Host,
    input_device: Option<String>,
    output_device: Option<String>,
    timeout_margin: Duration,
}

impl CpalInterface {
    /// Create an interface on the platform's default audio host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal interface initialized");
        Self {
            host,
            input_device: None,
            output_device: None,
            timeout_margin: Duration::from_secs(2),
        }
    }

    /// Use the device matching `name` for both playback and capture.
    #[must_use]
    pub fn with_device(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with_input_device(name.clone()).with_output_device(name)
    }

    /// Use the device matching `name` for capture.
    #[must_use]
    pub fn with_input_device(mut self, name: impl Into<String>) -> Self {
        self.input_device = Some(name.into());
        self
    }

    /// Use the device matching `name` for playback.
    #[must_use]
    pub fn with_output_device(mut self, name: impl Into<String>) -> Self {
        self.output_device = Some(name.into());
        self
    }

    /// Extra time allowed beyond the signal duration before giving up.
    #[must_use]
    pub fn with_timeout_margin(mut self, margin: Duration) -> Self {
        self.timeout_margin = margin;
        self
    }

    /// Names of all devices the host reports.
    pub fn device_names(&self) -> Result<Vec<String>> {
        let devices = self
            .host
            .devices()
            .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(devices.filter_map(|d| device_name(&d).ok()).collect())
    }

    fn find_device(&self, direction: Direction) -> Result<Device> {
        let (name, default) = match direction {
            Direction::Input => (self.input_device.as_deref(), self.host.default_input_device()),
            Direction::Output => (
                self.output_device.as_deref(),
                self.host.default_output_device(),
            ),
        };
        let Some(search) = name else {
            return default.ok_or(Error::NoDevice);
        };

        let search_lower = search.to_lowercase();
        let devices = match direction {
            Direction::Input => self.host.input_devices(),
            Direction::Output => self.host.output_devices(),
        }
        .map_err(|e| Error::Stream(e.to_string()))?;

        for device in devices {
            if let Ok(dev_name) = device_name(&device)
                && dev_name.to_lowercase().contains(&search_lower)
            {
                return Ok(device);
            }
        }
        Err(Error::DeviceNotFound(format!(
            "no {} device matching '{}'",
            direction.label(),
            search
        )))
    }

    fn device_channels(device: &Device, direction: Direction) -> Result<u16> {
        let config = match direction {
            Direction::Input => device.default_input_config(),
            Direction::Output => device.default_output_config(),
        }
        .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(config.channels())
    }

    fn timeout(&self, frames: usize, sample_rate: u32) -> Duration {
        Duration::from_secs_f64(frames as f64 / f64::from(sample_rate)) + self.timeout_margin
    }
}

impl Default for CpalInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioInterface for CpalInterface {
    fn play_and_record(
        &mut self,
        signal: ArrayView2<'_, f64>,
        output_channels: &[u16],
        input_channels: &[u16],
        sample_rate: u32,
    ) -> Result<Recording> {
        check_signal(&signal, output_channels)?;
        let output = self.find_device(Direction::Output)?;
        let input = self.find_device(Direction::Input)?;
        let out_width = Self::device_channels(&output, Direction::Output)?;
        let in_width = Self::device_channels(&input, Direction::Input)?;
        check_channels("output", output_channels, out_width)?;
        check_channels("input", input_channels, in_width)?;

        let frames = signal.nrows();
        let playback = interleave(signal, output_channels, usize::from(out_width));
        let flags = Arc::new(SharedFlags::default());
        let started = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let capture = input_stream(
            &input,
            in_width,
            sample_rate,
            Arc::clone(&started),
            Arc::clone(&flags),
            tx,
        )?;
        let playback = output_stream(
            &output,
            out_width,
            sample_rate,
            playback,
            started,
            Arc::clone(&flags),
        )?;

        capture.play().map_err(|e| Error::Stream(e.to_string()))?;
        playback.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            frames,
            outputs = output_channels.len(),
            inputs = input_channels.len(),
            sample_rate,
            "play and record started"
        );

        let samples = collect(
            &rx,
            frames,
            usize::from(in_width),
            input_channels,
            self.timeout(frames, sample_rate),
        )?;
        drop(playback);
        drop(capture);
        tracing::info!(frames, "play and record finished");

        Ok(Recording {
            samples,
            status: flags.status(),
        })
    }

    fn record(
        &mut self,
        frames: usize,
        sample_rate: u32,
        input_channels: &[u16],
    ) -> Result<Recording> {
        let input = self.find_device(Direction::Input)?;
        let in_width = Self::device_channels(&input, Direction::Input)?;
        check_channels("input", input_channels, in_width)?;

        let flags = Arc::new(SharedFlags::default());
        let (tx, rx) = mpsc::channel();
        let capture = input_stream(
            &input,
            in_width,
            sample_rate,
            Arc::new(AtomicBool::new(true)),
            Arc::clone(&flags),
            tx,
        )?;

        capture.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            frames,
            inputs = input_channels.len(),
            sample_rate,
            "recording started"
        );

        let samples = collect(
            &rx,
            frames,
            usize::from(in_width),
            input_channels,
            self.timeout(frames, sample_rate),
        )?;
        drop(capture);
        tracing::info!(frames, "recording finished");

        Ok(Recording {
            samples,
            status: flags.status(),
        })
    }
}

fn stream_config(channels: u16, sample_rate: u32) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    }
}

fn input_stream(
    device: &Device,
    channels: u16,
    sample_rate: u32,
    started: Arc<AtomicBool>,
    flags: Arc<SharedFlags>,
    tx: mpsc::Sender<Vec<f32>>,
) -> Result<Stream> {
    device
        .build_input_stream(
            &stream_config(channels, sample_rate),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if started.load(Ordering::SeqCst) {
                    // The receiver hangs up once it has enough frames
                    let _ = tx.send(data.to_vec());
                }
            },
            move |err| {
                tracing::warn!(error = %err, "input stream error");
                flags.input.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| Error::Stream(e.to_string()))
}

fn output_stream(
    device: &Device,
    channels: u16,
    sample_rate: u32,
    playback: Vec<f32>,
    started: Arc<AtomicBool>,
    flags: Arc<SharedFlags>,
) -> Result<Stream> {
    let mut cursor = 0;
    device
        .build_output_stream(
            &stream_config(channels, sample_rate),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                started.store(true, Ordering::SeqCst);
                let n = data.len().min(playback.len() - cursor);
                data[..n].copy_from_slice(&playback[cursor..cursor + n]);
                data[n..].fill(0.0);
                cursor += n;
            },
            move |err| {
                tracing::warn!(error = %err, "output stream error");
                flags.output.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| Error::Stream(e.to_string()))
}

/// Spread the columns of `signal` over a device-wide interleaved buffer.
fn interleave(signal: ArrayView2<'_, f64>, channels: &[u16], width: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; signal.nrows() * width];
    for (frame, row) in out.chunks_exact_mut(width).zip(signal.rows()) {
        for (&ch, &v) in channels.iter().zip(row.iter()) {
            frame[usize::from(ch) - 1] = v as f32;
        }
    }
    out
}

/// Pick the requested channels out of a device-wide interleaved buffer.
fn deinterleave(interleaved: &[f32], frames: usize, width: usize, channels: &[u16]) -> Array2<f64> {
    Array2::from_shape_fn((frames, channels.len()), |(t, k)| {
        f64::from(interleaved[t * width + usize::from(channels[k]) - 1])
    })
}

fn collect(
    rx: &mpsc::Receiver<Vec<f32>>,
    frames: usize,
    width: usize,
    channels: &[u16],
    timeout: Duration,
) -> Result<Array2<f64>> {
    let needed = frames * width;
    let deadline = Instant::now() + timeout;
    let mut interleaved = Vec::with_capacity(needed);

    while interleaved.len() < needed {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => interleaved.extend(chunk),
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(Error::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(Error::Stream("input stream closed".into()));
            }
        }
    }

    Ok(deinterleave(&interleaved, frames, width, channels))
}
