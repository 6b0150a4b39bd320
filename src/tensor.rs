use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest rank a tensor view can describe.
pub const MAX_RANK: usize = 4;

/// Runtime tag for the element type stored in a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    F32,
    F64,
}

/// Numeric element that can be read, compared and interpolated.
///
/// Interpolation is carried out in `f64`. Integer types round the result to
/// nearest (add one half, then truncate) before narrowing back, floating
/// types take the interpolated value as is.
pub trait Element: Copy + PartialOrd + Default + Send + Sync + 'static {
    const TYPE: ElementType;
    const IS_INTEGER: bool;

    fn to_f64(self) -> f64;

    /// Narrowing `as` conversion (truncates toward zero, saturates).
    fn from_f64(value: f64) -> Self;

    #[inline]
    fn from_interpolated(value: f64) -> Self {
        if Self::IS_INTEGER {
            Self::from_f64(value + 0.5)
        } else {
            Self::from_f64(value)
        }
    }
}

macro_rules! impl_element {
    ($t:ty, $tag:ident, $integer:expr) => {
        impl Element for $t {
            const TYPE: ElementType = ElementType::$tag;
            const IS_INTEGER: bool = $integer;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_element!(i8, I8, true);
impl_element!(u8, U8, true);
impl_element!(i16, I16, true);
impl_element!(u16, U16, true);
impl_element!(i32, I32, true);
impl_element!(u32, U32, true);
impl_element!(i64, I64, true);
impl_element!(f32, F32, false);
impl_element!(f64, F64, false);

/// Borrowed n-dimensional view with per-dimension extents and element strides.
///
/// Dimension 0 is rows (height), dimension 1 is columns (width) and an
/// optional dimension 2 indexes stacked planes. Strides are in elements.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    offset: usize,
    rank: usize,
    sizes: [usize; MAX_RANK],
    strides: [usize; MAX_RANK],
}

impl<'a, T: Element> TensorView<'a, T> {
    /// Contiguous row-major view over `data`.
    pub fn from_slice(sizes: &[usize], data: &'a [T]) -> Result<Self> {
        let strides = contiguous_strides(sizes)?;
        Self::from_strided(data, 0, sizes, &strides[..sizes.len()])
    }

    /// View with explicit starting offset and strides.
    ///
    /// Fails when the rank is outside `1..=MAX_RANK`, when sizes and strides
    /// disagree in length, or when the furthest addressed element falls
    /// outside `data`.
    pub fn from_strided(
        data: &'a [T],
        offset: usize,
        sizes: &[usize],
        strides: &[usize],
    ) -> Result<Self> {
        if sizes.is_empty() || sizes.len() > MAX_RANK {
            return Err(Error::InvalidStride(format!(
                "rank {} is outside 1..={}",
                sizes.len(),
                MAX_RANK
            )));
        }
        if sizes.len() != strides.len() {
            return Err(Error::InvalidStride(format!(
                "{} sizes but {} strides",
                sizes.len(),
                strides.len()
            )));
        }

        if sizes.iter().all(|&s| s > 0) {
            let last = sizes
                .iter()
                .zip(strides)
                .fold(offset, |acc, (&size, &stride)| acc + (size - 1) * stride);
            if last >= data.len() {
                return Err(Error::SizeMismatch {
                    expected: last + 1,
                    actual: data.len(),
                });
            }
        }

        let mut view = Self {
            data,
            offset,
            rank: sizes.len(),
            sizes: [0; MAX_RANK],
            strides: [0; MAX_RANK],
        };
        view.sizes[..sizes.len()].copy_from_slice(sizes);
        view.strides[..strides.len()].copy_from_slice(strides);
        Ok(view)
    }

    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes[..self.rank]
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides[..self.rank]
    }

    /// Extent of `dim`, or 0 past the rank.
    pub fn size(&self, dim: usize) -> usize {
        if dim < self.rank {
            self.sizes[dim]
        } else {
            0
        }
    }

    /// Stride of `dim`, or 0 past the rank.
    pub fn stride(&self, dim: usize) -> usize {
        if dim < self.rank {
            self.strides[dim]
        } else {
            0
        }
    }

    pub fn height(&self) -> usize {
        self.size(0)
    }

    pub fn width(&self) -> usize {
        if self.rank >= 2 {
            self.sizes[1]
        } else {
            1
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Linear index of (row, col) on plane 0.
    #[inline]
    pub fn linear_index(&self, row: usize, col: usize) -> usize {
        self.offset + row * self.strides[0] + col * self.strides[1]
    }

    /// Element at (row, col) on plane 0.
    ///
    /// # Panics
    ///
    /// Only the backing slice is bounds-checked; reading outside the view's
    /// extents is a caller contract violation.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> T {
        self.data[self.linear_index(row, col)]
    }

    /// Checked element access by full index.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.rank {
            return None;
        }
        let mut linear = self.offset;
        for (dim, &i) in index.iter().enumerate() {
            if i >= self.sizes[dim] {
                return None;
            }
            linear += i * self.strides[dim];
        }
        self.data.get(linear).copied()
    }

    /// Rank-2 view of plane `k` of a rank-3 tensor.
    pub fn plane(&self, k: usize) -> Result<TensorView<'a, T>> {
        if self.rank != 3 {
            return Err(Error::UnsupportedRank { rank: self.rank });
        }
        if k >= self.sizes[2] {
            return Err(Error::SizeMismatch {
                expected: self.sizes[2],
                actual: k + 1,
            });
        }
        TensorView::from_strided(
            self.data,
            self.offset + k * self.strides[2],
            &self.sizes[..2],
            &self.strides[..2],
        )
    }
}

fn contiguous_strides(sizes: &[usize]) -> Result<[usize; MAX_RANK]> {
    if sizes.is_empty() || sizes.len() > MAX_RANK {
        return Err(Error::InvalidStride(format!(
            "rank {} is outside 1..={}",
            sizes.len(),
            MAX_RANK
        )));
    }
    let mut strides = [0; MAX_RANK];
    let mut acc = 1usize;
    for dim in (0..sizes.len()).rev() {
        strides[dim] = acc;
        acc *= sizes[dim];
    }
    Ok(strides)
}

/// Owned, contiguous row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    rank: usize,
    sizes: [usize; MAX_RANK],
}

impl<T: Element> Tensor<T> {
    pub fn from_vec(sizes: &[usize], data: Vec<T>) -> Result<Self> {
        contiguous_strides(sizes)?;
        let expected = sizes.iter().product::<usize>();
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let mut shape = [0; MAX_RANK];
        shape[..sizes.len()].copy_from_slice(sizes);
        Ok(Self {
            data,
            rank: sizes.len(),
            sizes: shape,
        })
    }

    pub fn zeros(sizes: &[usize]) -> Result<Self> {
        let len = sizes.iter().product::<usize>();
        Self::from_vec(sizes, vec![T::default(); len])
    }

    /// Rank-2 tensor of `height` rows and `width` columns filled by `f(x, y)`.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        let mut sizes = [0; MAX_RANK];
        sizes[0] = height;
        sizes[1] = width;
        Self {
            data,
            rank: 2,
            sizes,
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes[..self.rank]
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn as_view(&self) -> TensorView<'_, T> {
        let strides = contiguous_strides(self.sizes()).unwrap_or([0; MAX_RANK]);
        TensorView {
            data: &self.data,
            offset: 0,
            rank: self.rank,
            sizes: self.sizes,
            strides,
        }
    }

    /// Element at (row, col) of a rank-2 tensor.
    pub fn at(&self, row: usize, col: usize) -> T {
        self.data[row * self.sizes[1] + col]
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: T) {
        let width = self.sizes[1];
        self.data[row * width + col] = value;
    }
}
