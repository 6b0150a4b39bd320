//! # lbp-texture
//!
//! Local Binary Pattern (LBP) texture descriptors over strided numeric buffers.
//!
//! This crate provides:
//! - **Sampling**: generic sub-pixel bilinear interpolation for any numeric
//!   element type, rounding to nearest for integer types
//! - **Code tables**: rotation-invariant, uniform, uniform rotation-invariant
//!   and average-bit lookup tables for P-bit circular codes
//! - **LBP operator**: per-pixel codes, whole-image code maps and histograms,
//!   configured through four boolean options
//! - **Model geometry**: a cache mapping a canonical model grid onto sub-windows
//!   of arbitrary size as integral-image corner offsets, for multi-block codes
//!
//! ## Algorithm Overview
//!
//! 1. Sample P points on a circle of radius R around the center pixel
//!    (the 4- and 8-sample cases use the integer square neighbourhood)
//! 2. Compare each sample with the center, or with the ring mean when
//!    `ToAverage` is set, giving one bit per sample, first sample most
//!    significant
//! 3. Optionally append the center-vs-mean bit (`ToAverage` + `AddAvgBit`)
//! 4. Reduce the raw code through the lookup table selected by the options:
//!
//! | RotInvariant | Uniform | AddAvgBit and ToAverage | Table |
//! |---|---|---|---|
//! | on | on | any | uniform rotation-invariant |
//! | on | off | any | rotation-invariant |
//! | off | on | any | uniform |
//! | off | off | on | average bit |
//! | off | off | off | raw |
//!
//! ## Quick Start
//!
//! ```rust
//! use lbp_texture::{LbpOperatorBuilder, OptionName, Tensor};
//!
//! let image = Tensor::from_fn(64, 48, |x, y| ((x * 7 + y * 13) % 256) as u8);
//!
//! let mut op = LbpOperatorBuilder::new()
//!     .points(8)
//!     .radius(1)
//!     .uniform(true)
//!     .build()
//!     .unwrap();
//!
//! // One pixel
//! op.set_xy(10, 12).unwrap();
//! let code = op.process(&image.as_view()).unwrap();
//! assert!((code as usize) < op.symbol_count());
//!
//! // Whole image
//! op.set_option(OptionName::RotInvariant, true);
//! let hist = op.histogram(&image.as_view()).unwrap();
//! assert_eq!(hist.len(), 10);
//! ```
//!
//! ## Model Grids
//!
//! ```rust
//! use lbp_texture::{integral_image, IntegralFactors, LbpOperator, Region, Size2D, Tensor};
//!
//! let image = Tensor::from_fn(24, 24, |x, y| (x * y) as u16);
//! let integral = integral_image(&image.as_view());
//!
//! let mut cache = IntegralFactors::new();
//! let mut op = LbpOperator::new(8, 1).unwrap();
//! op.prepare_input(&integral.as_view()).unwrap();
//! op.set_model_size(&mut cache, Size2D::new(3, 3));
//! op.set_region(&mut cache, Region::new(0, 0, 24, 24));
//!
//! let code = op.model_cell_code(&cache, &integral.as_view(), 1, 1).unwrap();
//! assert!(code < 256);
//! ```

mod error;
mod integral;
mod lbp;
pub mod lut;
mod options;
mod sampler;
mod tensor;
mod types;

pub use error::{Error, Result};
pub use integral::{cell_mean, cell_sum, integral_image, CellCorners, IntegralFactors};
pub use lbp::{ring_offsets, LbpConfig, LbpOperator, LbpOperatorBuilder};
pub use lut::{LookupTables, MAX_POINTS};
pub use options::{LbpOptions, OptionName, TableKind};
pub use sampler::sample_bilinear;
pub use tensor::{Element, ElementType, Tensor, TensorView, MAX_RANK};
pub use types::{Point, Region, Size2D};
