//! Spectral products for the overlap-add engine.
//!
//! Every segment spectrum is combined with the filter spectrum through a
//! [`SpectralProduct`]. [`Elementwise`] covers the single-channel case;
//! [`Subscripts`] interprets an index-contraction pattern such as
//! `"nlmk,nk->nl"` for batched multichannel filtering.
//!
//! # Subscript notation
//!
//! A pattern names every axis of the filter and the signal spectrum with a
//! letter, followed by `->` and the letters of the output axes:
//!
//! - the first letter of all three groups must be the same, it labels the
//!   frequency axis;
//! - output letters are unique and appear in at least one operand;
//! - letters repeated within one operand select its diagonal;
//! - letters missing from the output are summed over;
//! - axes of size 1 broadcast against the other operand.
//!
//! Ellipses are not supported.

use crate::{Error, Result};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use rustfft::num_complex::Complex64;
use std::fmt;
use std::ops::{AddAssign, Mul};
use std::str::FromStr;

/// Combines a filter spectrum with a segment spectrum.
///
/// Both operands have frequency bins along axis 0, and so must the result.
pub trait SpectralProduct {
    /// Shape of the product for the given operand shapes.
    fn output_shape(&self, b: &[usize], x: &[usize]) -> Result<Vec<usize>>;

    /// Compute the product.
    fn apply(
        &self,
        b: &ArrayViewD<'_, Complex64>,
        x: &ArrayViewD<'_, Complex64>,
    ) -> Result<ArrayD<Complex64>>;
}

/// Bin-by-bin product of two one-dimensional spectra.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Elementwise;

impl SpectralProduct for Elementwise {
    fn output_shape(&self, b: &[usize], x: &[usize]) -> Result<Vec<usize>> {
        if b.len() != 1 || x.len() != 1 {
            return Err(Error::invalid(
                "subscripts",
                format!(
                    "multichannel filtering (filter {b:?}, signal {x:?}) needs contraction subscripts"
                ),
            ));
        }
        if b[0] != x[0] {
            return Err(Error::Broadcast {
                lhs: b.to_vec(),
                rhs: x.to_vec(),
            });
        }
        Ok(b.to_vec())
    }

    fn apply(
        &self,
        b: &ArrayViewD<'_, Complex64>,
        x: &ArrayViewD<'_, Complex64>,
    ) -> Result<ArrayD<Complex64>> {
        self.output_shape(b.shape(), x.shape())?;
        Ok(b * x)
    }
}

/// A parsed two-operand contraction pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscripts {
    pattern: String,
    operands: [Vec<char>; 2],
    output: Vec<char>,
}

impl Subscripts {
    /// Parse a pattern like `"nlmk,nk->nl"`. Whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Subscripts`] if the pattern is malformed.
    pub fn parse(pattern: &str) -> Result<Self> {
        let fail = |reason: &str| Error::subscripts(pattern, reason);
        let compact: String = pattern.chars().filter(|c| !c.is_whitespace()).collect();

        if compact.contains('.') {
            return Err(fail("ellipses are not supported"));
        }
        let (inputs, output) = compact
            .split_once("->")
            .ok_or_else(|| fail("missing '->' before the output subscripts"))?;
        if output.contains("->") {
            return Err(fail("more than one '->'"));
        }

        let groups: Vec<&str> = inputs.split(',').collect();
        let [b, x] = groups[..] else {
            return Err(fail("expected exactly two operands"));
        };

        let labels = |group: &str| -> Result<Vec<char>> {
            match group.chars().find(|c| !c.is_ascii_alphabetic()) {
                Some(c) => Err(fail(&format!("invalid subscript character '{c}'"))),
                None => Ok(group.chars().collect()),
            }
        };
        let b = labels(b)?;
        let x = labels(x)?;
        let output = labels(output)?;

        for (i, label) in output.iter().enumerate() {
            if output[..i].contains(label) {
                return Err(fail(&format!("output subscript '{label}' appears more than once")));
            }
            if !b.contains(label) && !x.contains(label) {
                return Err(fail(&format!(
                    "output subscript '{label}' does not appear in the operands"
                )));
            }
        }

        match (b.first(), x.first(), output.first()) {
            (Some(lb), Some(lx), Some(lo)) if lb == lx && lx == lo => {}
            _ => {
                return Err(fail(
                    "filter, signal and output must start with the same (frequency) subscript",
                ));
            }
        }

        Ok(Self {
            pattern: pattern.to_string(),
            operands: [b, x],
            output,
        })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Unique labels in order of first appearance, with their extents.
    fn extents(&self, shapes: [&[usize]; 2]) -> Result<Vec<(char, usize)>> {
        let mut extents: Vec<(char, usize)> = Vec::new();

        for (labels, shape) in self.operands.iter().zip(shapes) {
            if labels.len() != shape.len() {
                return Err(Error::subscripts(
                    &self.pattern,
                    format!(
                        "'{}' names {} axes but the operand has shape {shape:?}",
                        labels.iter().collect::<String>(),
                        labels.len()
                    ),
                ));
            }
            for (&label, &size) in labels.iter().zip(shape) {
                match extents.iter_mut().find(|(l, _)| *l == label) {
                    None => extents.push((label, size)),
                    Some((_, extent)) if *extent == size || size == 1 => {}
                    Some((_, extent)) if *extent == 1 => *extent = size,
                    Some((_, extent)) => {
                        return Err(Error::subscripts(
                            &self.pattern,
                            format!("subscript '{label}' has conflicting sizes {extent} and {size}"),
                        ));
                    }
                }
            }
        }

        Ok(extents)
    }

    /// Contract two operands according to the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Subscripts`] if the operand ranks or sizes do not fit
    /// the pattern.
    pub fn contract<T>(&self, b: &ArrayViewD<'_, T>, x: &ArrayViewD<'_, T>) -> Result<ArrayD<T>>
    where
        T: Copy + Default + AddAssign + Mul<Output = T>,
    {
        let extents = self.extents([b.shape(), x.shape()])?;
        let position = |label: char| extents.iter().position(|(l, _)| *l == label).unwrap_or(0);
        let b_map: Vec<usize> = self.operands[0].iter().map(|&l| position(l)).collect();
        let x_map: Vec<usize> = self.operands[1].iter().map(|&l| position(l)).collect();
        let out_map: Vec<usize> = self.output.iter().map(|&l| position(l)).collect();

        let out_shape: Vec<usize> = out_map.iter().map(|&i| extents[i].1).collect();
        let mut out = ArrayD::from_elem(IxDyn(&out_shape), T::default());
        if extents.iter().any(|&(_, size)| size == 0) {
            return Ok(out);
        }

        // Broadcast axes always read index 0
        let index = |map: &[usize], shape: &[usize], counter: &[usize], idx: &mut Vec<usize>| {
            for (axis, (&label, &size)) in map.iter().zip(shape).enumerate() {
                idx[axis] = if size == 1 { 0 } else { counter[label] };
            }
        };

        let mut counter = vec![0usize; extents.len()];
        let mut b_idx = vec![0usize; b.ndim()];
        let mut x_idx = vec![0usize; x.ndim()];
        let mut out_idx = vec![0usize; out.ndim()];

        loop {
            index(&b_map, b.shape(), &counter, &mut b_idx);
            index(&x_map, x.shape(), &counter, &mut x_idx);
            for (axis, &label) in out_map.iter().enumerate() {
                out_idx[axis] = counter[label];
            }
            out[out_idx.as_slice()] += b[b_idx.as_slice()] * x[x_idx.as_slice()];

            // Advance the odometer over all labels
            let mut digit = extents.len();
            loop {
                if digit == 0 {
                    return Ok(out);
                }
                digit -= 1;
                counter[digit] += 1;
                if counter[digit] < extents[digit].1 {
                    break;
                }
                counter[digit] = 0;
            }
        }
    }
}

impl FromStr for Subscripts {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Subscripts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl SpectralProduct for Subscripts {
    fn output_shape(&self, b: &[usize], x: &[usize]) -> Result<Vec<usize>> {
        let extents = self.extents([b, x])?;
        Ok(self
            .output
            .iter()
            .filter_map(|&label| extents.iter().find(|(l, _)| *l == label))
            .map(|&(_, size)| size)
            .collect())
    }

    fn apply(
        &self,
        b: &ArrayViewD<'_, Complex64>,
        x: &ArrayViewD<'_, Complex64>,
    ) -> Result<ArrayD<Complex64>> {
        self.contract(b, x)
    }
}
