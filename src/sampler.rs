//! Sub-pixel bilinear sampling over strided buffers.

use crate::tensor::{Element, TensorView};

/// Bilinear interpolation at column `x`, row `y` on plane 0 of `view`.
///
/// The four neighbours come from `floor`/`ceil` on each axis. An axis whose
/// coordinate is integral collapses to a single read, so integral
/// coordinates return the stored element exactly.
///
/// # Contract
///
/// No bounds checking against the view extents is done. The caller must
/// keep `floor`/`ceil` of both coordinates inside the view, normally by
/// validating an R-pixel margin around the sampling circle beforehand.
/// Coordinates outside the backing slice panic.
#[inline]
pub fn sample_bilinear<T: Element>(view: &TensorView<'_, T>, x: f64, y: f64) -> T {
    debug_assert!(x >= 0.0 && y >= 0.0, "negative sample coordinate");

    let xl = x.floor();
    let xh = x.ceil();
    let yl = y.floor();
    let yh = y.ceil();

    let (cl, ch) = (xl as usize, xh as usize);
    let (rl, rh) = (yl as usize, yh as usize);

    let read = |row: usize, col: usize| view.at(row, col).to_f64();
    let along_row = |row: usize| {
        let left = read(row, cl);
        if cl == ch {
            left
        } else {
            left + (x - xl) * (read(row, ch) - left)
        }
    };

    let low = along_row(rl);
    let value = if rl == rh {
        low
    } else {
        let high = along_row(rh);
        low + (y - yl) * (high - low)
    };

    T::from_interpolated(value)
}
