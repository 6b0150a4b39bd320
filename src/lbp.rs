use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::{Error, Result};
use crate::integral::{cell_mean, IntegralFactors};
use crate::lut::{LookupTables, MAX_POINTS};
use crate::options::{LbpOptions, OptionName, TableKind};
use crate::sampler::sample_bilinear;
use crate::tensor::{Element, Tensor, TensorView};
use crate::types::{Point, Region, Size2D};

/// Offsets closer than this to a whole number are treated as whole.
const SNAP_EPSILON: f64 = 1e-9;

/// Persisted operator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbpConfig {
    pub points: u32,
    pub radius: u32,
    pub options: LbpOptions,
}

impl LbpConfig {
    pub fn new(points: u32, radius: u32) -> Self {
        Self {
            points,
            radius,
            options: LbpOptions::default(),
        }
    }

    /// Load a config from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let config: Self = bincode::deserialize(&bytes)?;
        Ok(config)
    }

    /// Save the config to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for LbpConfig {
    fn default() -> Self {
        Self::new(8, 1)
    }
}

/// Sampling offsets of `points` samples around a center at distance `radius`.
///
/// Sample k sits at angle `2πk/points`, starting on the +x axis and turning
/// clockwise on screen (y points down). Four and eight samples use the
/// classic square neighbourhood with integer offsets of ±radius; other
/// counts lie on the circle and are snapped to whole numbers when within
/// rounding noise of one.
pub fn ring_offsets(points: u32, radius: u32) -> Vec<Point> {
    let r = radius as f64;
    (0..points)
        .map(|k| {
            let theta = 2.0 * PI * k as f64 / points as f64;
            let (sin, cos) = theta.sin_cos();
            let unit = Point::new(cos, sin);
            if points == 4 || points == 8 {
                unit.round() * r
            } else {
                let p = unit * r;
                Point::new(snap(p.x), snap(p.y))
            }
        })
        .collect()
}

#[inline]
fn snap(v: f64) -> f64 {
    let rounded = v.round();
    if (v - rounded).abs() < SNAP_EPSILON {
        rounded
    } else {
        v
    }
}

/// Local Binary Pattern operator.
///
/// Holds the sample count P (fixed at construction), the radius R, the four
/// options with the lookup table they select, and the location the next
/// [`process`](Self::process) call evaluates.
///
/// # Usage
///
/// ```ignore
/// let mut op = LbpOperator::new(8, 1)?;
/// op.set_option(OptionName::Uniform, true);
/// op.set_xy(10, 12)?;
/// let code = op.process(&image.as_view())?;
/// ```
#[derive(Debug, Clone)]
pub struct LbpOperator {
    points: u32,
    radius: u32,
    options: LbpOptions,
    active: TableKind,
    tables: LookupTables,
    ring: Vec<Point>,

    x: usize,
    y: usize,

    /// Extents and (row, col) strides of the last input whose extents changed.
    input_size: Size2D,
    input_strides: (usize, usize),

    region: Region,
    model_size: Size2D,

    output: Option<Vec<u32>>,
}

impl LbpOperator {
    /// Operator with `points` samples at `radius`, all options off.
    pub fn new(points: u32, radius: u32) -> Result<Self> {
        if points == 0 || points > MAX_POINTS {
            return Err(Error::UnsupportedPointCount {
                points,
                max: MAX_POINTS,
            });
        }
        if radius == 0 {
            return Err(Error::InvalidRadius { radius });
        }

        let mut tables = LookupTables::new(points);
        tables.ensure(TableKind::Raw);

        Ok(Self {
            points,
            radius,
            options: LbpOptions::default(),
            active: TableKind::Raw,
            tables,
            ring: ring_offsets(points, radius),
            x: radius as usize,
            y: radius as usize,
            input_size: Size2D::default(),
            input_strides: (0, 0),
            region: Region::default(),
            model_size: Size2D::default(),
            output: None,
        })
    }

    pub fn from_config(config: &LbpConfig) -> Result<Self> {
        let mut op = Self::new(config.points, config.radius)?;
        op.set_options(config.options);
        Ok(op)
    }

    pub fn config(&self) -> LbpConfig {
        LbpConfig {
            points: self.points,
            radius: self.radius,
            options: self.options,
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn options(&self) -> LbpOptions {
        self.options
    }

    pub fn active_table(&self) -> TableKind {
        self.active
    }

    /// The lookup table currently applied to raw codes.
    pub fn table(&self) -> &[u32] {
        self.tables.get(self.active).unwrap_or_default()
    }

    /// Number of distinct output labels under the current options.
    pub fn symbol_count(&self) -> usize {
        self.active.symbol_count(self.points)
    }

    pub fn ring(&self) -> &[Point] {
        &self.ring
    }

    pub fn location(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn model_size(&self) -> Size2D {
        self.model_size
    }

    /// `(row, col)` strides cached from the input.
    pub fn input_strides(&self) -> (usize, usize) {
        self.input_strides
    }

    /// Single-element output written by [`process`](Self::process), once allocated.
    pub fn output(&self) -> Option<&[u32]> {
        self.output.as_deref()
    }

    /// Change the radius. Zero is rejected and leaves the operator unchanged.
    ///
    /// A stored location inside the new margin is moved out to it.
    pub fn set_radius(&mut self, radius: u32) -> Result<()> {
        if radius == 0 {
            return Err(Error::InvalidRadius { radius });
        }
        self.radius = radius;
        self.ring = ring_offsets(self.points, radius);
        let r = radius as usize;
        self.x = self.x.max(r);
        self.y = self.y.max(r);
        Ok(())
    }

    /// Set the evaluation location. Both coordinates must be at least R.
    pub fn set_xy(&mut self, x: usize, y: usize) -> Result<()> {
        let r = self.radius as usize;
        if x < r || y < r {
            return Err(Error::LocationOutOfMargin {
                x,
                y,
                radius: self.radius,
            });
        }
        self.x = x;
        self.y = y;
        Ok(())
    }

    pub fn get_option(&self, name: OptionName) -> bool {
        self.options.get(name)
    }

    pub fn set_option(&mut self, name: OptionName, value: bool) {
        self.options.set(name, value);
        self.option_changed();
    }

    /// Set an option by its string name (`ToAverage`, `AddAvgBit`,
    /// `Uniform`, `RotInvariant`).
    pub fn set_option_by_name(&mut self, name: &str, value: bool) -> Result<()> {
        let name: OptionName = name.parse()?;
        self.set_option(name, value);
        Ok(())
    }

    pub fn set_options(&mut self, options: LbpOptions) {
        self.options = options;
        self.option_changed();
    }

    /// Re-select the active table from the current options.
    fn option_changed(&mut self) {
        self.active = TableKind::from_options(&self.options);
        self.tables.ensure(self.active);

        #[cfg(feature = "tracing")]
        tracing::debug!(points = self.points, table = ?self.active, "LBP table selected");
    }

    /// Store the sub-window to process; the geometry cache is rebuilt only
    /// when its width or height differs from the stored one.
    ///
    /// Corner offsets use the strides cached by
    /// [`prepare_input`](Self::prepare_input), so prepare the integral image
    /// before setting the region. [`model_cell_code`](Self::model_cell_code)
    /// rejects a cache built with other strides.
    pub fn set_region(&mut self, cache: &mut IntegralFactors, region: Region) {
        let changed = region.size != self.region.size;
        self.region = region;
        if changed {
            let (row_stride, col_stride) = self.input_strides;
            cache.resize_sub_window(region.width(), region.height(), row_stride, col_stride);
        }
    }

    /// Store the model grid size; the geometry cache is reallocated only
    /// when it differs from the stored one.
    ///
    /// Reallocation drops the cache's sub-window geometry, so a stored
    /// region is mapped onto the new grid right away.
    pub fn set_model_size(&mut self, cache: &mut IntegralFactors, size: Size2D) {
        let changed = size != self.model_size;
        self.model_size = size;
        if changed {
            cache.resize_model(size.width, size.height);
            if !self.region.size.is_empty() {
                let (row_stride, col_stride) = self.input_strides;
                cache.resize_sub_window(
                    self.region.width(),
                    self.region.height(),
                    row_stride,
                    col_stride,
                );
            }
        }
    }

    /// Accepts rank 2 (rows x cols) and rank 3 (rows x cols x planes) inputs.
    pub fn check_input<T: Element>(&self, input: &TensorView<'_, T>) -> bool {
        matches!(input.rank(), 2 | 3)
    }

    /// Validate `input`, allocate the output on first use and refresh the
    /// cached strides when the input extents changed.
    pub fn prepare_input<T: Element>(&mut self, input: &TensorView<'_, T>) -> Result<()> {
        if !self.check_input(input) {
            return Err(Error::UnsupportedRank { rank: input.rank() });
        }

        self.output.get_or_insert_with(|| vec![0; 1]);

        let size = Size2D::new(input.width(), input.height());
        if size != self.input_size {
            self.input_size = size;
            self.input_strides = (input.stride(0), input.stride(1));
        }
        Ok(())
    }

    /// Compute the code at the stored location and write it to the output.
    ///
    /// The caller guarantees the input extends at least R past the location
    /// on every side.
    pub fn process<T: Element>(&mut self, input: &TensorView<'_, T>) -> Result<u32> {
        self.prepare_input(input)?;
        let code = self.compute_code(input, self.x, self.y);
        if let Some(output) = self.output.as_mut() {
            output[0] = code;
        }
        Ok(code)
    }

    /// LBP code of pixel (`x`, `y`) on plane 0 of `input`.
    ///
    /// # Contract
    ///
    /// `x >= R`, `y >= R`, and the input must extend at least R beyond
    /// (`x`, `y`) on the high side too. Margins are not checked here: a
    /// violation reads neighbouring memory of the view or panics when it
    /// leaves the backing slice.
    pub fn compute_code<T: Element>(&self, input: &TensorView<'_, T>, x: usize, y: usize) -> u32 {
        let center = input.at(y, x).to_f64();
        let mut samples = [0.0f64; MAX_POINTS as usize];
        for (slot, offset) in samples.iter_mut().zip(&self.ring) {
            *slot = sample_ring(input, x, y, offset);
        }
        self.encode(center, &samples[..self.ring.len()])
    }

    /// Codes for every pixel with an R margin on all sides.
    ///
    /// The result has `height - 2R` rows and `width - 2R` columns (empty
    /// when the input is too small).
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, input),
            fields(width = input.width(), height = input.height())
        )
    )]
    pub fn code_image<T: Element>(&self, input: &TensorView<'_, T>) -> Result<Tensor<u32>> {
        if !self.check_input(input) {
            return Err(Error::UnsupportedRank { rank: input.rank() });
        }

        let margin = 2 * self.radius as usize;
        let out_w = input.width().saturating_sub(margin);
        let out_h = input.height().saturating_sub(margin);
        let r = self.radius as usize;

        Ok(Tensor::from_fn(out_w, out_h, |x, y| {
            self.compute_code(input, x + r, y + r)
        }))
    }

    /// Histogram of [`code_image`](Self::code_image) over
    /// [`symbol_count`](Self::symbol_count) bins.
    pub fn histogram<T: Element>(&self, input: &TensorView<'_, T>) -> Result<Vec<u32>> {
        let codes = self.code_image(input)?;
        let mut hist = vec![0u32; self.symbol_count()];
        for &code in codes.data() {
            hist[code as usize] += 1;
        }
        Ok(hist)
    }

    /// Multi-block code of model cell (`i`, `j`) in the current region.
    ///
    /// Each cell is summarized by its mean over `integral` (an inclusive
    /// summed-area table, see [`crate::integral_image`]). The center cell is
    /// compared with the ring-neighbour cells, R cells away, through the
    /// same comparison and lookup steps as pixel codes. `cache` must have been
    /// sized through [`set_model_size`](Self::set_model_size) and
    /// [`set_region`](Self::set_region) after
    /// [`prepare_input`](Self::prepare_input) on `integral`; a cache without
    /// sub-window geometry or built for other strides is rejected.
    pub fn model_cell_code(
        &self,
        cache: &IntegralFactors,
        integral: &TensorView<'_, f64>,
        i: usize,
        j: usize,
    ) -> Result<u32> {
        if cache.is_empty() {
            return Err(Error::EmptyModel);
        }
        if cache.sub_window_size().is_empty() {
            return Err(Error::NoSubWindow);
        }
        let strides = (integral.stride(0), integral.stride(1));
        if cache.strides() != strides {
            return Err(Error::InvalidStride(format!(
                "geometry built for strides {:?}, integral image has {:?}",
                cache.strides(),
                strides
            )));
        }

        let model = cache.model_size();
        let r = self.radius as usize;
        if i < r || j < r || i + r >= model.width || j + r >= model.height {
            return Err(Error::LocationOutOfMargin {
                x: i,
                y: j,
                radius: self.radius,
            });
        }

        let origin = integral.linear_index(self.region.y, self.region.x);
        let mean_at = |ci: usize, cj: usize| {
            cache
                .cell(ci, cj)
                .map(|cell| cell_mean(integral, origin, &cell))
                .unwrap_or(0.0)
        };

        let center = mean_at(i, j);
        let mut samples = [0.0f64; MAX_POINTS as usize];
        for (slot, offset) in samples.iter_mut().zip(&self.ring) {
            let step = offset.round();
            let ci = (i as isize + step.x as isize) as usize;
            let cj = (j as isize + step.y as isize) as usize;
            *slot = mean_at(ci, cj);
        }
        Ok(self.encode(center, &samples[..self.ring.len()]))
    }

    /// Threshold the ring samples, append the average bit when the active
    /// table expects it, and look the code up.
    #[inline]
    fn encode(&self, center: f64, samples: &[f64]) -> u32 {
        let reference = if self.options.to_average {
            samples.iter().sum::<f64>() / samples.len() as f64
        } else {
            center
        };

        let mut code = samples
            .iter()
            .fold(0u32, |acc, &s| (acc << 1) | u32::from(s >= reference));
        if self.active.uses_average_bit() {
            code = (code << 1) | u32::from(center >= reference);
        }
        self.table()[code as usize]
    }
}

#[inline]
fn sample_ring<T: Element>(input: &TensorView<'_, T>, x: usize, y: usize, offset: &Point) -> f64 {
    let p = Point::new(x as f64, y as f64) + *offset;
    if offset.is_integral() {
        input.at(p.y as usize, p.x as usize).to_f64()
    } else {
        sample_bilinear(input, p.x, p.y).to_f64()
    }
}

/// Builder for an [`LbpOperator`].
pub struct LbpOperatorBuilder {
    config: LbpConfig,
}

impl LbpOperatorBuilder {
    pub fn new() -> Self {
        Self {
            config: LbpConfig::default(),
        }
    }

    pub fn points(mut self, points: u32) -> Self {
        self.config.points = points;
        self
    }

    pub fn radius(mut self, radius: u32) -> Self {
        self.config.radius = radius;
        self
    }

    pub fn options(mut self, options: LbpOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn to_average(mut self, on: bool) -> Self {
        self.config.options.to_average = on;
        self
    }

    pub fn add_avg_bit(mut self, on: bool) -> Self {
        self.config.options.add_avg_bit = on;
        self
    }

    pub fn uniform(mut self, on: bool) -> Self {
        self.config.options.uniform = on;
        self
    }

    pub fn rotation_invariant(mut self, on: bool) -> Self {
        self.config.options.rotation_invariant = on;
        self
    }

    pub fn build(self) -> Result<LbpOperator> {
        LbpOperator::from_config(&self.config)
    }
}

impl Default for LbpOperatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integral::integral_image;
    use crate::lut;

    fn ramp_5x5() -> Tensor<u8> {
        Tensor::from_fn(5, 5, |x, y| (y * 5 + x) as u8)
    }

    #[test]
    fn construction_validates_parameters() {
        assert!(matches!(
            LbpOperator::new(0, 1),
            Err(Error::UnsupportedPointCount { points: 0, .. })
        ));
        assert!(matches!(
            LbpOperator::new(17, 1),
            Err(Error::UnsupportedPointCount { points: 17, .. })
        ));
        assert!(matches!(
            LbpOperator::new(8, 0),
            Err(Error::InvalidRadius { radius: 0 })
        ));

        let op = LbpOperator::new(8, 2).unwrap();
        assert_eq!(op.active_table(), TableKind::Raw);
        assert_eq!(op.location(), (2, 2));
        assert_eq!(op.table().len(), 256);
        assert!(op.output().is_none());
    }

    #[test]
    fn failed_setters_leave_state_unchanged() {
        let mut op = LbpOperator::new(8, 2).unwrap();
        op.set_xy(4, 5).unwrap();

        assert!(op.set_xy(1, 9).is_err());
        assert!(op.set_xy(9, 1).is_err());
        assert_eq!(op.location(), (4, 5));

        assert!(op.set_radius(0).is_err());
        assert_eq!(op.radius(), 2);

        op.set_radius(6).unwrap();
        assert_eq!(op.radius(), 6);
        assert_eq!(op.location(), (6, 6));
    }

    #[test]
    fn square_rings_for_four_and_eight_points() {
        let ring8 = ring_offsets(8, 2);
        let expected = [
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (-2.0, 2.0),
            (-2.0, 0.0),
            (-2.0, -2.0),
            (0.0, -2.0),
            (2.0, -2.0),
        ];
        for (p, (ex, ey)) in ring8.iter().zip(expected) {
            assert_eq!((p.x, p.y), (ex, ey));
            assert!(p.is_integral());
        }

        let ring4 = ring_offsets(4, 3);
        let coords: Vec<(f64, f64)> = ring4.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(3.0, 0.0), (0.0, 3.0), (-3.0, 0.0), (0.0, -3.0)]);
    }

    #[test]
    fn circular_ring_for_other_counts() {
        let ring = ring_offsets(16, 2);
        assert_eq!(ring.len(), 16);
        assert_eq!((ring[0].x, ring[0].y), (2.0, 0.0));
        assert_eq!((ring[4].x, ring[4].y), (0.0, 2.0));
        assert!(!ring[1].is_integral());
        for p in &ring {
            assert!(((p.x * p.x + p.y * p.y).sqrt() - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn raw_code_on_ramp() {
        let img = ramp_5x5();
        let op = LbpOperator::new(8, 1).unwrap();
        // Right, down-right, down, down-left are brighter than the center.
        assert_eq!(op.compute_code(&img.as_view(), 2, 2), 0b1111_0000);
    }

    #[test]
    fn interpolated_ring_on_linear_ramp() {
        let img = Tensor::from_fn(7, 7, |x, _| x as f64 * 10.0);
        let op = LbpOperator::new(6, 2).unwrap();
        // Samples with cos >= 0 are at least as bright: k = 0, 1, 5.
        assert_eq!(op.compute_code(&img.as_view(), 3, 3), 0b110_001);
    }

    #[test]
    fn option_sequence_lands_on_rotation_invariant() {
        let mut op = LbpOperator::new(8, 1).unwrap();
        op.set_option(OptionName::Uniform, true);
        assert_eq!(op.active_table(), TableKind::Uniform);
        op.set_option(OptionName::RotInvariant, true);
        assert_eq!(op.active_table(), TableKind::UniformRotationInvariant);
        op.set_option(OptionName::Uniform, false);
        assert_eq!(op.active_table(), TableKind::RotationInvariant);
        assert_eq!(op.table(), lut::rotation_invariant(8).as_slice());
    }

    #[test]
    fn option_by_name() {
        let mut op = LbpOperator::new(4, 1).unwrap();
        op.set_option_by_name("Uniform", true).unwrap();
        assert!(op.get_option(OptionName::Uniform));
        assert!(op.set_option_by_name("Blur", true).is_err());
        assert_eq!(op.active_table(), TableKind::Uniform);
    }

    #[test]
    fn average_reference_and_average_bit() {
        let flat = Tensor::from_fn(3, 3, |_, _| 7u8);
        let view = flat.as_view();
        let mut op = LbpOperator::new(8, 1).unwrap();

        op.set_option(OptionName::ToAverage, true);
        assert_eq!(op.compute_code(&view, 1, 1), 0xFF);

        op.set_option(OptionName::AddAvgBit, true);
        assert_eq!(op.active_table(), TableKind::AverageBit);
        assert_eq!(op.compute_code(&view, 1, 1), 0x1FF);

        // Rotation invariance wins, so no bit is appended.
        op.set_option(OptionName::RotInvariant, true);
        assert_eq!(op.compute_code(&view, 1, 1), 0xFF);
    }

    #[test]
    fn average_bit_reflects_center() {
        // Dark center, bright ring: ring mean 100, center 0.
        let img = Tensor::from_fn(3, 3, |x, y| if x == 1 && y == 1 { 0u8 } else { 100 });
        let op = LbpOperatorBuilder::new()
            .to_average(true)
            .add_avg_bit(true)
            .build()
            .unwrap();
        assert_eq!(op.compute_code(&img.as_view(), 1, 1), 0b1_1111_1110);
    }

    #[test]
    fn process_writes_reused_output() {
        let img = ramp_5x5();
        let mut op = LbpOperator::new(8, 1).unwrap();
        op.set_xy(2, 2).unwrap();

        let code = op.process(&img.as_view()).unwrap();
        assert_eq!(op.output(), Some(&[code][..]));
        let first = op.output().unwrap().as_ptr();

        op.set_xy(1, 1).unwrap();
        let code = op.process(&img.as_view()).unwrap();
        assert_eq!(op.output().unwrap()[0], code);
        assert_eq!(op.output().unwrap().as_ptr(), first);
    }

    #[test]
    fn rejects_unsupported_ranks() {
        let data = vec![0u8; 16];
        let mut op = LbpOperator::new(8, 1).unwrap();

        let rank1 = TensorView::from_slice(&[16], &data).unwrap();
        assert!(!op.check_input(&rank1));
        assert!(matches!(
            op.process(&rank1),
            Err(Error::UnsupportedRank { rank: 1 })
        ));
        assert!(op.output().is_none());

        let rank4 = TensorView::from_slice(&[2, 2, 2, 2], &data).unwrap();
        assert!(op.code_image(&rank4).is_err());

        let rank3 = TensorView::from_slice(&[4, 4, 1], &data).unwrap();
        assert!(op.check_input(&rank3));
    }

    #[test]
    fn strides_refresh_only_on_extent_change() {
        let img = ramp_5x5();
        let mut op = LbpOperator::new(8, 1).unwrap();
        op.prepare_input(&img.as_view()).unwrap();
        assert_eq!(op.input_strides(), (5, 1));

        let padded = vec![0u8; 5 * 8];
        let same_size = TensorView::from_strided(&padded, 0, &[5, 5], &[8, 1]).unwrap();
        op.prepare_input(&same_size).unwrap();
        assert_eq!(op.input_strides(), (5, 1));

        let bigger = TensorView::from_strided(&padded, 0, &[5, 6], &[8, 1]).unwrap();
        op.prepare_input(&bigger).unwrap();
        assert_eq!(op.input_strides(), (8, 1));
    }

    #[test]
    fn rank3_input_uses_first_plane() {
        // Two planes: plane 0 is the ramp, plane 1 is its negation.
        let ramp = ramp_5x5();
        let mut data = Vec::with_capacity(50);
        for &v in ramp.data() {
            data.push(v as i16);
            data.push(-(v as i16));
        }
        let stacked = TensorView::from_slice(&[5, 5, 2], &data).unwrap();
        let op = LbpOperator::new(8, 1).unwrap();

        assert_eq!(op.compute_code(&stacked, 2, 2), 0b1111_0000);
        assert_eq!(op.compute_code(&stacked.plane(1).unwrap(), 2, 2), 0b0000_1111);
    }

    #[test]
    fn code_image_and_histogram() {
        let img = Tensor::from_fn(10, 8, |x, y| ((x * 37 + y * 91) % 251) as u8);
        let mut op = LbpOperator::new(8, 2).unwrap();
        op.set_option(OptionName::Uniform, true);
        op.set_option(OptionName::RotInvariant, true);

        let codes = op.code_image(&img.as_view()).unwrap();
        assert_eq!(codes.sizes(), &[4, 6]);
        assert_eq!(codes.at(1, 3), op.compute_code(&img.as_view(), 5, 3));

        let hist = op.histogram(&img.as_view()).unwrap();
        assert_eq!(hist.len(), 10);
        assert_eq!(hist.iter().sum::<u32>(), 24);

        let tiny = Tensor::from_fn(3, 3, |_, _| 0u8);
        assert_eq!(op.code_image(&tiny.as_view()).unwrap().data().len(), 0);
    }

    #[test]
    fn region_and_model_changes_are_memoized() {
        let mut cache = IntegralFactors::new();
        let mut op = LbpOperator::new(8, 1).unwrap();

        op.set_model_size(&mut cache, Size2D::new(3, 3));
        let generation = cache.generation();
        op.set_model_size(&mut cache, Size2D::new(3, 3));
        assert_eq!(cache.generation(), generation);

        op.set_region(&mut cache, Region::new(0, 0, 12, 12));
        let generation = cache.generation();
        op.set_region(&mut cache, Region::new(5, 7, 12, 12));
        assert_eq!(cache.generation(), generation);
        assert_eq!(op.region(), Region::new(5, 7, 12, 12));

        op.set_region(&mut cache, Region::new(5, 7, 24, 12));
        assert_eq!(cache.generation(), generation + 1);
    }

    #[test]
    fn model_cell_code_over_integral_image() {
        let img = Tensor::from_fn(12, 12, |x, _| x as f64);
        let integral = integral_image(&img.as_view());
        let iview = integral.as_view();

        let mut cache = IntegralFactors::new();
        let mut op = LbpOperator::new(8, 1).unwrap();
        assert!(matches!(
            op.model_cell_code(&cache, &iview, 1, 1),
            Err(Error::EmptyModel)
        ));

        op.prepare_input(&iview).unwrap();
        op.set_model_size(&mut cache, Size2D::new(3, 3));
        op.set_region(&mut cache, Region::new(0, 0, 12, 12));

        // Cell column means: left 3.0, center 6.5, right 9.5.
        assert_eq!(op.model_cell_code(&cache, &iview, 1, 1).unwrap(), 0b1110_0011);
        assert!(matches!(
            op.model_cell_code(&cache, &iview, 0, 1),
            Err(Error::LocationOutOfMargin { .. })
        ));
        assert!(op.model_cell_code(&cache, &iview, 1, 2).is_err());
    }

    #[test]
    fn model_change_remaps_stored_region() {
        let img = Tensor::from_fn(12, 12, |x, _| x as f64);
        let integral = integral_image(&img.as_view());
        let iview = integral.as_view();

        let mut cache = IntegralFactors::new();
        let mut op = LbpOperator::new(8, 1).unwrap();
        op.prepare_input(&iview).unwrap();
        op.set_model_size(&mut cache, Size2D::new(2, 2));
        op.set_region(&mut cache, Region::new(0, 0, 12, 12));

        let generation = cache.generation();
        op.set_model_size(&mut cache, Size2D::new(3, 3));
        assert_eq!(cache.sub_window_size(), Size2D::new(12, 12));
        assert!(cache.generation() > generation);

        // Same region again is memoized, the cells are already mapped.
        let generation = cache.generation();
        op.set_region(&mut cache, Region::new(0, 0, 12, 12));
        assert_eq!(cache.generation(), generation);
        assert_eq!(op.model_cell_code(&cache, &iview, 1, 1).unwrap(), 0b1110_0011);

        let mut fresh_cache = IntegralFactors::new();
        let mut fresh = LbpOperator::new(8, 1).unwrap();
        fresh.prepare_input(&iview).unwrap();
        fresh.set_model_size(&mut fresh_cache, Size2D::new(3, 3));
        fresh.set_region(&mut fresh_cache, Region::new(0, 0, 12, 12));
        assert_eq!(fresh_cache.cells(), cache.cells());
    }

    #[test]
    fn model_cell_code_rejects_unmapped_sub_window() {
        let img = Tensor::from_fn(12, 12, |x, _| x as f64);
        let integral = integral_image(&img.as_view());
        let iview = integral.as_view();

        let mut cache = IntegralFactors::new();
        let mut op = LbpOperator::new(8, 1).unwrap();
        op.prepare_input(&iview).unwrap();
        op.set_model_size(&mut cache, Size2D::new(3, 3));

        assert!(matches!(
            op.model_cell_code(&cache, &iview, 1, 1),
            Err(Error::NoSubWindow)
        ));
    }

    #[test]
    fn model_cell_code_rejects_region_set_before_input() {
        let img = Tensor::from_fn(12, 12, |x, _| x as f64);
        let integral = integral_image(&img.as_view());
        let iview = integral.as_view();

        let mut cache = IntegralFactors::new();
        let mut op = LbpOperator::new(8, 1).unwrap();
        op.set_model_size(&mut cache, Size2D::new(3, 3));
        op.set_region(&mut cache, Region::new(0, 0, 12, 12));
        assert_eq!(cache.strides(), (0, 0));

        op.prepare_input(&iview).unwrap();
        assert!(matches!(
            op.model_cell_code(&cache, &iview, 1, 1),
            Err(Error::InvalidStride(_))
        ));
    }

    #[test]
    fn config_round_trip() {
        let op = LbpOperatorBuilder::new()
            .points(16)
            .radius(2)
            .uniform(true)
            .build()
            .unwrap();
        let config = op.config();

        let temp_path = std::env::temp_dir().join("lbp_texture_config_test.bin");
        config.save(&temp_path).unwrap();
        let loaded = LbpConfig::load(&temp_path).unwrap();
        std::fs::remove_file(temp_path).ok();

        assert_eq!(loaded, config);
        let rebuilt = LbpOperator::from_config(&loaded).unwrap();
        assert_eq!(rebuilt.active_table(), TableKind::Uniform);
        assert_eq!(rebuilt.symbol_count(), 16 * 15 + 3);
    }
}
