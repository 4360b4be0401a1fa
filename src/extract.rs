//! # Data Extraction
//!
//! Reads the anomaly dataset and reduces it to what the renderer draws: one
//! peak-to-peak grid per calendar year, the year label of every monthly
//! sample, and the strided list of samples that become frames.
//!
//! ## Key Components
//!
//! - [`extract`]: Reads a [`GridSource`] and produces an [`Extraction`]
//! - [`mask_sentinels`]: Replaces sentinel values with `NaN`
//! - [`yearly_peak_to_peak`]: Reduces 12-month blocks at the surface level
//! - [`frame_selection`]: Strided frame indices

use crate::dataset::GridSource;
use crate::error::{Nc2GifError, Result};
use crate::input::VariableNames;
use crate::time::{TimeUnits, year_strings};
use log::{debug, info, warn};
use ndarray::{Array3, Array4, ArrayView1, Axis, s};

/// Raw values at or below this threshold mark missing data.
pub const SENTINEL_THRESHOLD: f32 = -900.0;

/// Monthly samples per reduced year.
pub const MONTHS_PER_YEAR: usize = 12;

/// Everything the renderer needs from the dataset.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Longitude coordinate
    pub lon: Vec<f64>,
    /// Latitude coordinate
    pub lat: Vec<f64>,
    /// Peak-to-peak anomaly per (year, lat, lon)
    pub yearly_range: Array3<f32>,
    /// Four-digit year of every monthly sample
    pub years: Vec<String>,
    /// Monthly sample indices selected for rendering
    pub frame_selection: Vec<usize>,
}

impl Extraction {
    /// Number of complete years in `yearly_range`.
    pub fn year_count(&self) -> usize {
        self.yearly_range.len_of(Axis(0))
    }

    /// Row of `yearly_range` a monthly sample index belongs to, if that year is complete.
    pub fn year_row(&self, sample_index: usize) -> Option<usize> {
        let row = sample_index / MONTHS_PER_YEAR;
        (row < self.year_count()).then_some(row)
    }
}

/// Reads the dataset and computes the yearly ranges and frame selection.
///
/// Variables are read in the order time, lat, lon, depth, anomaly; the first
/// one missing aborts the extraction.
///
/// # Errors
///
/// - [`Nc2GifError::MissingVariable`] / [`Nc2GifError::MissingAttribute`]
/// - [`Nc2GifError::TimeUnits`] when the time coordinate cannot be decoded
/// - [`Nc2GifError::ShapeMismatch`] when the field disagrees with its coordinates
/// - [`Nc2GifError::Config`] when `res` is zero
pub fn extract<S: GridSource + ?Sized>(
    source: &S,
    names: &VariableNames,
    res: usize,
) -> Result<Extraction> {
    let time = source.read_coordinate(&names.time)?;
    let units = source.read_text_attribute(&names.time, "units")?;
    let lat = source.read_coordinate(&names.lat)?;
    let lon = source.read_coordinate(&names.lon)?;
    let depth = source.read_coordinate(&names.depth)?;
    let raw = source.read_field(&names.anomaly)?;

    debug!("Time units: {}", units);
    let units = TimeUnits::parse(&units)?;
    let years = year_strings(&time, &units)?;

    check_field_shape(&raw, time.len(), depth.len(), lat.len(), lon.len())?;

    if time.len() % MONTHS_PER_YEAR != 0 {
        warn!(
            "{} monthly samples is not a whole number of years; the last {} are dropped from the yearly ranges",
            time.len(),
            time.len() % MONTHS_PER_YEAR
        );
    }

    let field = mask_sentinels(raw);
    let yearly_range = yearly_peak_to_peak(&field);
    let frame_selection = frame_selection(years.len(), res)?;

    info!(
        "Extracted {} years on a {}x{} grid ({} frames at resolution {})",
        yearly_range.len_of(Axis(0)),
        lat.len(),
        lon.len(),
        frame_selection.len(),
        res
    );

    Ok(Extraction {
        lon,
        lat,
        yearly_range,
        years,
        frame_selection,
    })
}

fn check_field_shape(
    field: &Array4<f32>,
    times: usize,
    depths: usize,
    lats: usize,
    lons: usize,
) -> Result<()> {
    let shape = field.shape();
    if shape[0] != times || shape[2] != lats || shape[3] != lons {
        return Err(Nc2GifError::ShapeMismatch(format!(
            "field shape {:?} does not match coordinates (time={}, lat={}, lon={})",
            shape, times, lats, lons
        )));
    }
    if shape[1] == 0 {
        return Err(Nc2GifError::ShapeMismatch(
            "field has no depth levels".to_string(),
        ));
    }
    if depths != shape[1] {
        warn!(
            "depth coordinate has {} values but the field has {} levels; only level 0 is used",
            depths, shape[1]
        );
    }
    Ok(())
}

/// Replaces every value at or below [`SENTINEL_THRESHOLD`] with `NaN`.
pub fn mask_sentinels(mut field: Array4<f32>) -> Array4<f32> {
    field.mapv_inplace(mask_value);
    field
}

/// Masking rule for a single value.
pub fn mask_value(v: f32) -> f32 {
    if v > SENTINEL_THRESHOLD { v } else { f32::NAN }
}

/// Peak-to-peak of each 12-month block at depth level 0.
///
/// Blocks start at sample 0; a trailing partial block is dropped.
pub fn yearly_peak_to_peak(field: &Array4<f32>) -> Array3<f32> {
    let (times, _, lats, lons) = field.dim();
    let years = times / MONTHS_PER_YEAR;
    let mut out = Array3::<f32>::from_elem((years, lats, lons), f32::NAN);

    for year in 0..years {
        let start = year * MONTHS_PER_YEAR;
        let block = field.slice(s![start..start + MONTHS_PER_YEAR, 0, .., ..]);
        let ranges = block.map_axis(Axis(0), peak_to_peak);
        out.slice_mut(s![year, .., ..]).assign(&ranges);
    }

    out
}

/// Maximum minus minimum; `NaN` if any sample is missing or the lane is empty.
pub fn peak_to_peak(samples: ArrayView1<f32>) -> f32 {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in samples.iter() {
        if v.is_nan() {
            return f32::NAN;
        }
        min = min.min(v);
        max = max.max(v);
    }
    if samples.is_empty() { f32::NAN } else { max - min }
}

/// Every `res`-th index in `0..samples`.
pub fn frame_selection(samples: usize, res: usize) -> Result<Vec<usize>> {
    if res == 0 {
        return Err(Nc2GifError::Config(
            "time resolution must be at least 1".to_string(),
        ));
    }
    Ok((0..samples).step_by(res).collect())
}
