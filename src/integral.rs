//! Model-grid to sub-window geometry over integral images.
//!
//! A detector trained on a small canonical grid ("model") is evaluated on
//! sub-windows of arbitrary size. [`IntegralFactors`] maps every model cell
//! onto the sub-window once per geometry and stores the four integral-image
//! corner offsets of the rescaled cell plus its pixel area, so cell sums cost
//! four reads regardless of the window size.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::tensor::{Element, Tensor, TensorView};
use crate::types::Size2D;

/// Integral-image corner offsets of one rescaled model cell.
///
/// Offsets are linear, relative to the sub-window origin, and already
/// multiplied by the row and column strides given at rebuild time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCorners {
    pub top_left: usize,
    pub top_right: usize,
    pub bottom_left: usize,
    pub bottom_right: usize,
    /// Pixel count of the cell, `(bottom - top) * (right - left)`.
    pub cell_size: usize,
}

/// Geometry cache shared by operators that evaluate a model grid.
///
/// Construct one per process (or per worker) and pass it to the operators
/// that need it. Resizing needs `&mut`, so concurrent users must serialize
/// resizes themselves; reads against a stable cache can be shared freely.
#[derive(Debug, Default)]
pub struct IntegralFactors {
    model: Size2D,
    sub_window: Size2D,
    row_stride: usize,
    col_stride: usize,
    /// `model.width * model.height` entries, cell (i, j) at `i * model.height + j`.
    cells: Vec<CellCorners>,
    generation: u64,
}

impl IntegralFactors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_size(&self) -> Size2D {
        self.model
    }

    pub fn sub_window_size(&self) -> Size2D {
        self.sub_window
    }

    /// `(row_stride, col_stride)` used by the last sub-window rebuild.
    pub fn strides(&self) -> (usize, usize) {
        (self.row_stride, self.col_stride)
    }

    /// Number of rebuilds performed so far. No-op resizes leave it unchanged.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[CellCorners] {
        &self.cells
    }

    /// Corners of model cell (`i` = column, `j` = row).
    pub fn cell(&self, i: usize, j: usize) -> Option<CellCorners> {
        if i >= self.model.width || j >= self.model.height {
            return None;
        }
        self.cells.get(i * self.model.height + j).copied()
    }

    /// Reallocate for a `width` x `height` model grid.
    ///
    /// Requesting the current size does nothing. A zero dimension releases
    /// all storage and resets the model size to (0, 0). Any real change
    /// zeroes the cells and forgets the cached sub-window, so the next
    /// [`resize_sub_window`](Self::resize_sub_window) recomputes them.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn resize_model(&mut self, width: usize, height: usize) {
        let requested = Size2D::new(width, height);
        if requested == self.model {
            return;
        }

        if requested.is_empty() {
            self.model = Size2D::default();
            self.cells = Vec::new();
        } else {
            self.model = requested;
            self.cells = vec![CellCorners::default(); requested.area()];
        }
        self.sub_window = Size2D::default();
        self.generation += 1;
    }

    /// Release all storage, equivalent to `resize_model(0, 0)`.
    pub fn release(&mut self) {
        self.resize_model(0, 0);
    }

    /// Recompute corner offsets for a `width` x `height` sub-window.
    ///
    /// Skipped when the size equals the cached one. A change of strides
    /// alone does not trigger a rebuild: callers that switch to an input
    /// with a different layout at the same window size must resize through
    /// another size first (or rebuild the cache).
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn resize_sub_window(
        &mut self,
        width: usize,
        height: usize,
        row_stride: usize,
        col_stride: usize,
    ) {
        let requested = Size2D::new(width, height);
        if requested == self.sub_window {
            return;
        }

        self.sub_window = requested;
        self.row_stride = row_stride;
        self.col_stride = col_stride;
        self.generation += 1;

        if self.model.is_empty() || requested.is_empty() {
            self.cells.fill(CellCorners::default());
            return;
        }

        let scale_w = width as f64 / self.model.width as f64;
        let scale_h = height as f64 / self.model.height as f64;
        let model_h = self.model.height;

        let mut min_x = -0.5;
        let mut max_x = scale_w + 1.0;
        for i in 0..self.model.width {
            let l = clamp_index(min_x, width);
            let r = clamp_index(max_x, width);

            let mut min_y = -0.5;
            let mut max_y = scale_h + 1.0;
            for j in 0..model_h {
                let t = clamp_index(min_y, height);
                let b = clamp_index(max_y, height);

                self.cells[i * model_h + j] = CellCorners {
                    top_left: t * row_stride + l * col_stride,
                    top_right: t * row_stride + r * col_stride,
                    bottom_left: b * row_stride + l * col_stride,
                    bottom_right: b * row_stride + r * col_stride,
                    cell_size: (b - t) * (r - l),
                };

                min_y += scale_h;
                max_y += scale_h;
            }

            min_x += scale_w;
            max_x += scale_w;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            model_w = self.model.width,
            model_h = self.model.height,
            sub_w = width,
            sub_h = height,
            "integral factors rebuilt"
        );
    }
}

/// Truncate toward zero, then clamp into `[0, len - 1]`. `len` must be > 0.
#[inline]
fn clamp_index(coord: f64, len: usize) -> usize {
    (coord as i64).clamp(0, len as i64 - 1) as usize
}

/// Inclusive summed-area table of plane 0 of `view`.
///
/// Entry (r, c) holds the sum of all elements at rows `<= r` and columns
/// `<= c`. The sum over rows `(t, b]` and columns `(l, r]` is then
/// `I[b][r] - I[t][r] - I[b][l] + I[t][l]`, which is what [`CellCorners`]
/// addresses.
pub fn integral_image<T: Element>(view: &TensorView<'_, T>) -> Tensor<f64> {
    let (h, w) = (view.height(), view.width());
    let mut out = Tensor::from_fn(w, h, |_, _| 0.0f64);
    for row in 0..h {
        let mut row_sum = 0.0;
        for col in 0..w {
            row_sum += view.at(row, col).to_f64();
            let above = if row > 0 { out.at(row - 1, col) } else { 0.0 };
            out.set(row, col, above + row_sum);
        }
    }
    out
}

/// Sum of a cell read through its corner offsets.
///
/// `origin` is the linear index of the sub-window's top-left element in
/// `integral` (see [`TensorView::linear_index`]).
#[inline]
pub fn cell_sum(integral: &TensorView<'_, f64>, origin: usize, cell: &CellCorners) -> f64 {
    let data = integral.data();
    data[origin + cell.bottom_right] - data[origin + cell.top_right] - data[origin + cell.bottom_left]
        + data[origin + cell.top_left]
}

/// Mean of a cell; zero-area cells yield 0.
#[inline]
pub fn cell_mean(integral: &TensorView<'_, f64>, origin: usize, cell: &CellCorners) -> f64 {
    if cell.cell_size == 0 {
        0.0
    } else {
        cell_sum(integral, origin, cell) / cell.cell_size as f64
    }
}
