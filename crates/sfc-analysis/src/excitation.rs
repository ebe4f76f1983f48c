//! Serial multichannel excitation.

use crate::{Error, Result};
use ndarray::{Array2, ArrayBase, Axis, Data, Dimension, s};

/// Lay out a single-channel excitation for serial playback on `n_ch` outputs.
///
/// Channel `c` plays `n_reps` back-to-back copies of `x` in the sample block
/// `[c * n_reps * N, (c + 1) * n_reps * N)` and is silent elsewhere. The
/// result has shape `(n_ch * n_reps * N, n_ch)`, or `n_ch + 1` columns when
/// `add_reference` is set; the extra last column is the sum of all channels.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `x` is not one-dimensional.
pub fn multichannel_signal<S, D>(
    x: &ArrayBase<S, D>,
    n_ch: usize,
    n_reps: usize,
    add_reference: bool,
) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if x.ndim() != 1 {
        return Err(Error::invalid(
            "x",
            format!("expected a one-dimensional signal, got shape {:?}", x.shape()),
        ));
    }

    let n = x.len();
    let block = n_reps * n;
    let columns = if add_reference { n_ch + 1 } else { n_ch };
    let mut signal = Array2::zeros((n_ch * block, columns));

    for ch in 0..n_ch {
        for rep in 0..n_reps {
            let begin = ch * block + rep * n;
            signal
                .slice_mut(s![begin..begin + n, ch])
                .iter_mut()
                .zip(x.iter())
                .for_each(|(o, &v)| *o = v);
        }
    }

    if add_reference {
        let reference = signal.slice(s![.., ..n_ch]).sum_axis(Axis(1));
        signal.column_mut(n_ch).assign(&reference);
    }

    Ok(signal)
}
