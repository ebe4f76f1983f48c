//! Microphone array geometry.

use ndarray::{Array1, Array2};

/// Number of grid columns of the planar array.
pub const BK_PLANAR_COLUMNS: usize = 10;
/// Number of grid rows of the planar array.
pub const BK_PLANAR_ROWS: usize = 6;

const BK_PLANAR_WIDTH: f64 = 0.675;
const BK_PLANAR_HEIGHT: f64 = 0.375;

/// Cartesian coordinates in metres of the 60 microphones of the planar
/// 10 × 6 array, one `(x, y)` row per microphone.
///
/// `x` runs from 0 to 0.675 m and `y` from 0.375 m down to 0. Microphones are
/// ordered column by column: index `i * 6 + j` sits at column `i`, row `j`.
pub fn bk_planar_array_mic_positions() -> Array2<f64> {
    let x = Array1::linspace(0.0, BK_PLANAR_WIDTH, BK_PLANAR_COLUMNS);
    let y = Array1::linspace(BK_PLANAR_HEIGHT, 0.0, BK_PLANAR_ROWS);

    Array2::from_shape_fn((BK_PLANAR_COLUMNS * BK_PLANAR_ROWS, 2), |(mic, coord)| {
        let (i, j) = (mic / BK_PLANAR_ROWS, mic % BK_PLANAR_ROWS);
        if coord == 0 { x[i] } else { y[j] }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_shape_and_corners() {
        let r = bk_planar_array_mic_positions();
        assert_eq!(r.dim(), (60, 2));
        let close = |mic: usize, x: f64, y: f64| {
            (r[[mic, 0]] - x).abs() < 1e-12 && (r[[mic, 1]] - y).abs() < 1e-12
        };
        assert!(close(0, 0.0, 0.375));
        assert!(close(5, 0.0, 0.0));
        assert!(close(6, 0.075, 0.375));
        assert!(close(59, 0.675, 0.0));
    }

    #[test]
    fn uniform_spacing() {
        let r = bk_planar_array_mic_positions();
        for mic in 1..6 {
            assert!((r[[mic - 1, 1]] - r[[mic, 1]] - 0.075).abs() < 1e-12);
        }
        for col in 1..10 {
            assert!((r[[col * 6, 0]] - r[[(col - 1) * 6, 0]] - 0.075).abs() < 1e-12);
        }
    }
}
