//! Repeated multi-system measurements through an audio interface.

use crate::backend::AudioInterface;
use crate::{Error, Result};
use ndarray::{Array, Array4, ArrayD, ArrayView2, Axis, Dimension, s};

/// Play each excitation over its output set `n_reps` times and record the
/// inputs.
///
/// `signals[i]` (shape `(frames, n_out)`) is played on `output_sets[i]`. When
/// both lists have the same length they are paired; a single signal is played
/// over every output set, and a single output set is used for every signal.
/// All signals must have the same number of frames.
///
/// Returns recordings of shape `(frames, n_in, n_sys, n_reps)`. Device status
/// flags are reported as warnings after each run.
pub fn measure<I>(
    interface: &mut I,
    signals: &[ArrayView2<'_, f64>],
    output_sets: &[Vec<u16>],
    input_channels: &[u16],
    n_reps: usize,
    sample_rate: u32,
) -> Result<Array4<f64>>
where
    I: AudioInterface + ?Sized,
{
    let n_sys = match (signals.len(), output_sets.len()) {
        (0, _) | (_, 0) => {
            return Err(Error::InvalidArgument(
                "need at least one signal and one output set".into(),
            ));
        }
        (a, b) if a == b => a,
        (1, b) => b,
        (a, 1) => a,
        (a, b) => {
            return Err(Error::InvalidArgument(format!(
                "{a} signals cannot be paired with {b} output sets"
            )));
        }
    };
    if n_reps == 0 {
        return Err(Error::InvalidArgument("n_reps must be at least 1".into()));
    }

    let frames = signals[0].nrows();
    if let Some(other) = signals.iter().find(|x| x.nrows() != frames) {
        return Err(Error::InvalidArgument(format!(
            "signals differ in length: {frames} and {} frames",
            other.nrows()
        )));
    }

    let mut data = Array4::zeros((frames, input_channels.len(), n_sys, n_reps));
    for sys in 0..n_sys {
        let signal = signals[if signals.len() == 1 { 0 } else { sys }];
        let outputs = &output_sets[if output_sets.len() == 1 { 0 } else { sys }];

        for rep in 0..n_reps {
            tracing::info!(system = sys, repetition = rep, ?outputs, "measuring");
            let recording =
                interface.play_and_record(signal, outputs, input_channels, sample_rate)?;
            recording.status.report();

            if recording.samples.dim() != (frames, input_channels.len()) {
                return Err(Error::Stream(format!(
                    "interface returned {:?} samples, expected {:?}",
                    recording.samples.dim(),
                    (frames, input_channels.len())
                )));
            }
            data.slice_mut(s![.., .., sys, rep]).assign(&recording.samples);
        }
    }

    Ok(data)
}

/// Remove all axes of length one.
pub fn squeeze<A, D>(array: Array<A, D>) -> ArrayD<A>
where
    D: Dimension,
{
    let mut array = array.into_dyn();
    for axis in (0..array.ndim()).rev() {
        if array.len_of(Axis(axis)) == 1 {
            array = array.index_axis_move(Axis(axis), 0);
        }
    }
    array
}
