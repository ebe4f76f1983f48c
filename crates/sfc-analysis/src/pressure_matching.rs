//! Pressure matching filter design.
//!
//! For every frequency bin independently, finds source weights `w` that
//! minimize `||H·w - h_target||² + reg·||w||²`, where `H` holds the transfer
//! functions from `ns` sources to `nm` control microphones.

use crate::regularization::Regularization;
use crate::{Error, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayBase, Data, Ix2, Ix3, IxDyn};
use rustfft::num_complex::Complex64;

/// Complex source weights by regularized least squares.
///
/// `h` has shape `(nf, nm, ns)`, `h_target` has shape `(nf, nm)` and the
/// result has shape `(nf, ns)`. `reg` is a scalar or broadcasts against
/// `(nf,)`.
///
/// Each bin solves the augmented problem `[H; √reg·I]·w ≈ [h_target; 0]`
/// with an SVD based solver. Singular values below
/// `ε·max(rows, cols)·σ_max` are treated as zero, so rank-deficient bins
/// get the minimum-norm solution.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for mismatched shapes or a negative
/// regularization, [`Error::Broadcast`] if `reg` does not broadcast against
/// `(nf,)` and [`Error::Solve`] if the solver fails for a bin.
pub fn pressure_matching<S1, S2>(
    h: &ArrayBase<S1, Ix3>,
    h_target: &ArrayBase<S2, Ix2>,
    reg: &Regularization,
) -> Result<Array2<Complex64>>
where
    S1: Data<Elem = Complex64>,
    S2: Data<Elem = Complex64>,
{
    let (nf, nm, ns) = h.dim();
    if h_target.dim() != (nf, nm) {
        return Err(Error::invalid(
            "h_target",
            format!(
                "expected shape [{nf}, {nm}] to match H {:?}, got {:?}",
                h.shape(),
                h_target.shape()
            ),
        ));
    }

    let reg = reg.to_array();
    let reg = reg.broadcast(IxDyn(&[nf])).ok_or_else(|| Error::Broadcast {
        lhs: reg.shape().to_vec(),
        rhs: vec![nf],
    })?;
    let reg: Vec<f64> = reg.iter().copied().collect();
    if reg.iter().any(|&r| r < 0.0) {
        return Err(Error::invalid("reg", "regularization must be non-negative"));
    }

    tracing::debug!(bins = nf, mics = nm, sources = ns, "pressure matching");
    if ns == 0 {
        return Ok(Array2::zeros((nf, 0)));
    }

    let rows = nm + ns;
    let mut weights = Array2::zeros((nf, ns));

    for (bin, mut w) in weights.outer_iter_mut().enumerate() {
        let sqrt_reg = Complex64::new(reg[bin].sqrt(), 0.0);
        let a = DMatrix::from_fn(rows, ns, |r, c| {
            if r < nm {
                h[[bin, r, c]]
            } else if r - nm == c {
                sqrt_reg
            } else {
                Complex64::default()
            }
        });
        let b = DVector::from_fn(rows, |r, _| {
            if r < nm {
                h_target[[bin, r]]
            } else {
                Complex64::default()
            }
        });

        let svd = a.svd(true, true);
        let sigma_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
        let eps = f64::EPSILON * rows.max(ns) as f64 * sigma_max;
        let solution = svd.solve(&b, eps).map_err(|reason| Error::Solve {
            bin,
            reason: reason.to_string(),
        })?;

        for (dst, src) in w.iter_mut().zip(solution.iter()) {
            *dst = *src;
        }
    }

    Ok(weights)
}
