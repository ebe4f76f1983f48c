//! WAV file reading and writing.

use crate::{Error, Result};
use hound::{WavReader, WavWriter};
use ndarray::{Array2, Array4, ArrayBase, ArrayView2, Axis, Data, Ix2, s};
use std::path::Path;

/// Sample encoding used when writing a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 32-bit IEEE float.
    #[default]
    Float32,
    /// 16-bit linear PCM.
    Pcm16,
    /// 24-bit linear PCM.
    Pcm24,
    /// 32-bit linear PCM.
    Pcm32,
}

impl SampleFormat {
    /// Bits per sample of this encoding.
    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleFormat::Pcm16 => 16,
            SampleFormat::Pcm24 => 24,
            SampleFormat::Float32 | SampleFormat::Pcm32 => 32,
        }
    }

    fn hound_format(self) -> hound::SampleFormat {
        match self {
            SampleFormat::Float32 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        }
    }
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Whether samples are stored as floats.
    pub is_float: bool,
}

/// Read WAV metadata without loading sample data.
pub fn read_audio_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
        is_float: spec.sample_format == hound::SampleFormat::Float,
    })
}

/// Read a WAV file as `(frames, channels)` samples in `[-1, 1)` plus its
/// sample rate.
pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<(Array2<f64>, u32)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let full_scale = f64::from(1u32 << (spec.bits_per_sample - 1));
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / full_scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let frames = samples.len() / channels;
    let data = Array2::from_shape_vec((frames, channels), samples)
        .map_err(|e| Error::InvalidArgument(format!("truncated WAV data: {e}")))?;
    tracing::debug!(frames, channels, sample_rate = spec.sample_rate, "read audio");
    Ok((data, spec.sample_rate))
}

/// Write `(frames, channels)` samples to a WAV file.
///
/// Integer formats clip to full scale.
pub fn write_audio<P, S>(
    path: P,
    samples: &ArrayBase<S, Ix2>,
    sample_rate: u32,
    format: SampleFormat,
) -> Result<()>
where
    P: AsRef<Path>,
    S: Data<Elem = f64>,
{
    let channels = u16::try_from(samples.ncols())
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "cannot write {} channels to a WAV file",
                samples.ncols()
            ))
        })?;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: format.bits_per_sample(),
        sample_format: format.hound_format(),
    };
    let mut writer = WavWriter::create(path, spec)?;

    // Rows are frames, so iterating in logical order interleaves channels
    if format == SampleFormat::Float32 {
        for &sample in samples {
            writer.write_sample(sample as f32)?;
        }
    } else {
        let max_val = f64::from(1u32 << (format.bits_per_sample() - 1));
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Cut a serial recording into `(n_samp, n_in, n_ch, n_reps)` segments.
///
/// The recording holds `n_ch` blocks, one per output channel, each with
/// `n_reps` consecutive repetitions of `n_samp` samples. Trailing samples that
/// do not fill a whole segment are dropped.
pub fn split_recording(data: ArrayView2<'_, f64>, n_ch: usize, n_reps: usize) -> Result<Array4<f64>> {
    if n_ch == 0 || n_reps == 0 {
        return Err(Error::InvalidArgument(format!(
            "need at least one channel and repetition, got n_ch={n_ch}, n_reps={n_reps}"
        )));
    }
    let segments = n_ch * n_reps;
    let n_samp = data.nrows() / segments;
    let n_in = data.ncols();
    if data.nrows() % segments != 0 {
        tracing::debug!(
            dropped = data.nrows() % segments,
            "recording length not divisible by segment count"
        );
    }

    let mut out = Array4::zeros((n_samp, n_in, n_ch, n_reps));
    for ch in 0..n_ch {
        for rep in 0..n_reps {
            let begin = (ch * n_reps + rep) * n_samp;
            out.slice_mut(s![.., .., ch, rep])
                .assign(&data.slice(s![begin..begin + n_samp, ..]));
        }
    }
    Ok(out)
}

/// A serial front-end recording cut into segments.
#[derive(Debug, Clone)]
pub struct BkRecording {
    /// Reference channel `(n_samp, 1, n_ch, n_reps)`, when recorded.
    pub reference: Option<Array4<f64>>,
    /// Microphone signals `(n_samp, n_in, n_ch, n_reps)`.
    pub microphones: Array4<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Load a multichannel front-end recording and cut it with [`split_recording`].
///
/// With `has_reference` the first file channel is split off as the
/// reference signal.
pub fn load_bk_wav_recording<P: AsRef<Path>>(
    path: P,
    n_ch: usize,
    n_reps: usize,
    has_reference: bool,
) -> Result<BkRecording> {
    let (data, sample_rate) = read_audio(path)?;
    let segments = split_recording(data.view(), n_ch, n_reps)?;

    let (reference, microphones) = if has_reference {
        let (reference, microphones) = segments.view().split_at(Axis(1), 1);
        (Some(reference.to_owned()), microphones.to_owned())
    } else {
        (None, segments)
    };

    Ok(BkRecording {
        reference,
        microphones,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sine(frames: usize, channels: usize) -> Array2<f64> {
        Array2::from_shape_fn((frames, channels), |(i, c)| {
            0.9 * ((i as f64) / 50.0 * (c as f64 + 1.0)).sin()
        })
    }

    #[test]
    fn test_roundtrip_float() {
        let samples = sine(1000, 3);
        let file = NamedTempFile::new().unwrap();
        write_audio(file.path(), &samples, 48000, SampleFormat::Float32).unwrap();

        let (loaded, sr) = read_audio(file.path()).unwrap();
        assert_eq!(sr, 48000);
        assert_eq!(loaded.dim(), (1000, 3));
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_roundtrip_pcm() {
        let samples = sine(500, 2);
        for (format, tol) in [
            (SampleFormat::Pcm16, 1e-4),
            (SampleFormat::Pcm24, 1e-6),
            (SampleFormat::Pcm32, 1e-8),
        ] {
            let file = NamedTempFile::new().unwrap();
            write_audio(file.path(), &samples, 44100, format).unwrap();
            let (loaded, _) = read_audio(file.path()).unwrap();
            for (a, b) in samples.iter().zip(loaded.iter()) {
                assert!((a - b).abs() < tol, "{format:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_pcm_clips_full_scale() {
        let samples = Array2::from_shape_vec((2, 1), vec![2.0, -2.0]).unwrap();
        let file = NamedTempFile::new().unwrap();
        write_audio(file.path(), &samples, 8000, SampleFormat::Pcm16).unwrap();
        let (loaded, _) = read_audio(file.path()).unwrap();
        assert!((loaded[[0, 0]] - 32767.0 / 32768.0).abs() < 1e-12);
        assert_eq!(loaded[[1, 0]], -1.0);
    }

    #[test]
    fn test_info() {
        let file = NamedTempFile::new().unwrap();
        write_audio(file.path(), &sine(4800, 2), 48000, SampleFormat::Pcm24).unwrap();
        let info = read_audio_info(file.path()).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 24);
        assert_eq!(info.num_frames, 4800);
        assert!((info.duration_secs - 0.1).abs() < 1e-12);
        assert!(!info.is_float);
    }

    #[test]
    fn test_zero_channels_rejected() {
        let file = NamedTempFile::new().unwrap();
        let empty = Array2::<f64>::zeros((10, 0));
        assert!(write_audio(file.path(), &empty, 48000, SampleFormat::Float32).is_err());
    }

    #[test]
    fn test_split_layout_and_trailing_samples() {
        // 2 channels x 3 reps x 4 samples, plus 5 trailing samples
        let data = Array2::from_shape_fn((29, 2), |(i, c)| (i * 10 + c) as f64);
        let out = split_recording(data.view(), 2, 3).unwrap();
        assert_eq!(out.dim(), (4, 2, 2, 3));
        // channel 1, repetition 2 starts at (1 * 3 + 2) * 4 = 20
        assert_eq!(out[[0, 0, 1, 2]], 200.0);
        assert_eq!(out[[3, 1, 1, 2]], 231.0);
        assert_eq!(out[[1, 0, 0, 1]], 50.0);
    }

    #[test]
    fn test_split_rejects_zero_counts() {
        let data = Array2::<f64>::zeros((8, 1));
        assert!(split_recording(data.view(), 0, 1).is_err());
        assert!(split_recording(data.view(), 1, 0).is_err());
    }
}
