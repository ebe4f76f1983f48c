//! Shape helpers shared by the axis-aware routines.

use crate::{Error, Result};
use ndarray::{ArrayViewD, Axis, IxDyn};

/// Resolve the broadcast shape of two operands (trailing axes aligned).
pub(crate) fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let ndim = lhs.len().max(rhs.len());
    let mut shape = vec![0; ndim];

    for i in 0..ndim {
        // Walk from the last axis backwards
        let l = lhs.len().checked_sub(i + 1).map_or(1, |j| lhs[j]);
        let r = rhs.len().checked_sub(i + 1).map_or(1, |j| rhs[j]);
        shape[ndim - 1 - i] = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(Error::Broadcast {
                    lhs: lhs.to_vec(),
                    rhs: rhs.to_vec(),
                });
            }
        };
    }

    Ok(shape)
}

/// Move axis `src` of a view to position `dst`, keeping the order of the rest.
pub(crate) fn move_axis<A>(view: ArrayViewD<'_, A>, src: usize, dst: usize) -> ArrayViewD<'_, A> {
    let mut order: Vec<usize> = (0..view.ndim()).filter(|&i| i != src).collect();
    order.insert(dst, src);
    view.permuted_axes(IxDyn(&order))
}

/// Validate an axis index against an array rank.
pub(crate) fn checked_axis(ndim: usize, axis: usize, arg: &'static str) -> Result<Axis> {
    if axis < ndim {
        Ok(Axis(axis))
    } else {
        Err(Error::invalid(
            arg,
            format!("axis {axis} is out of bounds for an array of dimension {ndim}"),
        ))
    }
}
