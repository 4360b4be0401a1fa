//! Contour levels and the jet colour scale used for the filled contours.

use image::Rgba;

/// Lower bound of the temperature-range scale (°C)
pub const RANGE_MIN: f32 = 0.0;
/// Upper bound of the temperature-range scale (°C)
pub const RANGE_MAX: f32 = 28.0;

/// Piecewise-linear anchors of the jet colour map, per channel: (position, value).
const JET_RED: &[(f32, f32)] = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: &[(f32, f32)] = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: &[(f32, f32)] = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

/// Ordered contour levels; `n` levels define `n - 1` filled bands.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLevels {
    levels: Vec<f32>,
}

impl ContourLevels {
    /// Levels must be strictly increasing and at least two long.
    pub fn new(levels: Vec<f32>) -> Option<Self> {
        let increasing = levels.windows(2).all(|w| w[0] < w[1]);
        (levels.len() >= 2 && increasing).then_some(Self { levels })
    }

    /// 29 levels from 0 to 28 in steps of 1.
    pub fn temperature_range() -> Self {
        let count = (RANGE_MAX - RANGE_MIN) as usize + 1;
        Self {
            levels: (0..count).map(|i| RANGE_MIN + i as f32).collect(),
        }
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    pub fn band_count(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn min(&self) -> f32 {
        self.levels[0]
    }

    pub fn max(&self) -> f32 {
        self.levels[self.levels.len() - 1]
    }

    /// Band containing `value`; `None` for missing values or values outside the levels.
    ///
    /// Bands are closed above, `(l[i], l[i+1]]`, except the first which also
    /// includes its lower bound.
    pub fn band_index(&self, value: f32) -> Option<usize> {
        if value.is_nan() || value < self.min() || value > self.max() {
            return None;
        }
        Some(self.levels[1..].partition_point(|&upper| upper < value))
    }

    /// Colour of a band, sampled from jet at the band midpoint.
    pub fn band_color(&self, band: usize) -> Rgba<u8> {
        let mid = (self.levels[band] + self.levels[band + 1]) / 2.0;
        jet((mid - self.min()) / (self.max() - self.min()))
    }

    /// Colour for a data value, if it falls in a band.
    pub fn color_for(&self, value: f32) -> Option<Rgba<u8>> {
        self.band_index(value).map(|band| self.band_color(band))
    }
}

/// Samples the jet colour map at `t` in [0, 1].
pub fn jet(t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |anchors: &[(f32, f32)]| -> u8 {
        let value = interpolate(anchors, t);
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(JET_RED), channel(JET_GREEN), channel(JET_BLUE), 255])
}

fn interpolate(anchors: &[(f32, f32)], t: f32) -> f32 {
    for pair in anchors.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if t <= x1 {
            let frac = if x1 > x0 { (t - x0) / (x1 - x0) } else { 0.0 };
            return y0 + (y1 - y0) * frac;
        }
    }
    anchors[anchors.len() - 1].1
}
