//! Map frame rendering.
//!
//! A frame is drawn on an RGBA raster in layers: filled contours of the
//! yearly range, dotted graticule, coastlines, the projection outline, a
//! colorbar, and the title and colorbar labels. A DejaVu Sans font and a coarse
//! world coastline set are compiled in; `RenderOptions` can point at others.
//! Filled contours are produced per pixel: each map pixel is inverse-projected
//! to lon/lat, the grid is sampled bilinearly, and the value is binned into
//! the contour bands.

use crate::coastline::Coastlines;
use crate::colormap::ContourLevels;
use crate::error::{Nc2GifError, Result};
use crate::input::RenderOptions;
use crate::projection::{Bounds, Projection, ProjectionKind};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, warn};
use ndarray::ArrayView2;
use rusttype::{Font, Scale};
use std::fs;

/// DejaVu Sans, used when no font file is configured
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

pub const TITLE_PREFIX: &str = "Temperature Range - Year: ";
pub const TITLE_UNITS: &str = "(TMax - TMin [°C])";

/// Graticule latitudes, every 20° from -80 to 80
pub const GRID_LATITUDES: [f64; 9] = [-80.0, -60.0, -40.0, -20.0, 0.0, 20.0, 40.0, 60.0, 80.0];
/// Graticule longitudes, every 60° from -180 to 180
pub const GRID_LONGITUDES: [f64; 7] = [-180.0, -120.0, -60.0, 0.0, 60.0, 120.0, 180.0];

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Colorbar tick spacing, in contour levels
const COLORBAR_TICK_STEP: usize = 4;

/// Bilinear sampler over a regular lat/lon grid.
///
/// Longitude wraps around when the grid covers the full circle; latitude
/// outside the grid yields `NaN`.
pub struct GridSampler<'a> {
    values: ArrayView2<'a, f32>,
    lon: Axis,
    lat: Axis,
    lon_periodic: bool,
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    first: f64,
    step: f64,
    len: usize,
}

impl Axis {
    fn from_coords(coords: &[f64]) -> Self {
        let len = coords.len();
        let step = if len > 1 {
            (coords[len - 1] - coords[0]) / (len - 1) as f64
        } else {
            0.0
        };
        Self {
            first: coords.first().copied().unwrap_or(0.0),
            step,
            len,
        }
    }
}

impl<'a> GridSampler<'a> {
    pub fn new(values: ArrayView2<'a, f32>, lon: &[f64], lat: &[f64]) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != lat.len() || cols != lon.len() {
            return Err(Nc2GifError::ShapeMismatch(format!(
                "grid is {}x{} but coordinates are lat={} lon={}",
                rows,
                cols,
                lat.len(),
                lon.len()
            )));
        }
        let lon_axis = Axis::from_coords(lon);
        let lat_axis = Axis::from_coords(lat);
        let span = lon_axis.step.abs() * lon_axis.len as f64;
        let lon_periodic = lon_axis.len > 1 && (span - 360.0).abs() < 1e-3;
        Ok(Self {
            values,
            lon: lon_axis,
            lat: lat_axis,
            lon_periodic,
        })
    }

    pub fn is_lon_periodic(&self) -> bool {
        self.lon_periodic
    }

    /// Fractional column position and the index of the neighbouring column.
    fn lon_position(&self, lon: f64) -> Option<(usize, usize, f64)> {
        let axis = self.lon;
        if axis.len == 0 {
            return None;
        }
        if axis.len == 1 || axis.step == 0.0 {
            return Some((0, 0, 0.0));
        }
        let offset = (axis.step.signum() * (lon - axis.first)).rem_euclid(360.0);
        let mut t = offset / axis.step.abs();
        if self.lon_periodic {
            t = t.rem_euclid(axis.len as f64);
            let i0 = (t.floor() as usize).min(axis.len - 1);
            Some((i0, (i0 + 1) % axis.len, t - i0 as f64))
        } else {
            let last = (axis.len - 1) as f64;
            if t > last + 1e-9 {
                return None;
            }
            let t = t.min(last);
            let i0 = t.floor() as usize;
            Some((i0, (i0 + 1).min(axis.len - 1), t - i0 as f64))
        }
    }

    fn lat_position(&self, lat: f64) -> Option<(usize, usize, f64)> {
        let axis = self.lat;
        if axis.len == 0 {
            return None;
        }
        if axis.len == 1 || axis.step == 0.0 {
            return Some((0, 0, 0.0));
        }
        let last = (axis.len - 1) as f64;
        let t = (lat - axis.first) / axis.step;
        if t < -1e-9 || t > last + 1e-9 {
            return None;
        }
        let t = t.clamp(0.0, last);
        let i0 = (t.floor() as usize).min(axis.len - 1);
        Some((i0, (i0 + 1).min(axis.len - 1), t - i0 as f64))
    }

    /// Bilinear value at a geographic point; `NaN` outside the grid or next to missing cells.
    pub fn sample(&self, lon: f64, lat: f64) -> f32 {
        let (Some((x0, x1, fx)), Some((y0, y1, fy))) =
            (self.lon_position(lon), self.lat_position(lat))
        else {
            return f32::NAN;
        };
        let corners = [
            (y0, x0, (1.0 - fx) * (1.0 - fy)),
            (y0, x1, fx * (1.0 - fy)),
            (y1, x0, (1.0 - fx) * fy),
            (y1, x1, fx * fy),
        ];
        let mut value = 0.0f64;
        for (row, col, weight) in corners {
            if weight <= 0.0 {
                continue;
            }
            let v = self.values[[row, col]];
            if v.is_nan() {
                return f32::NAN;
            }
            value += weight * v as f64;
        }
        value as f32
    }
}

/// Pixel rectangle in floating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Placement of the frame's elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub map: Area,
    pub colorbar: Area,
    pub title_height: f64,
}

impl Layout {
    pub fn new(width: u32, height: u32) -> Self {
        let w = width as f64;
        let h = height as f64;
        let title_height = 0.10 * h;
        let map = Area {
            x: 0.04 * w,
            y: title_height + 0.02 * h,
            width: 0.76 * w,
            height: h - title_height - 0.06 * h,
        };
        let colorbar = Area {
            x: 0.84 * w,
            y: map.y + 0.1 * map.height,
            width: 0.04 * w,
            height: 0.8 * map.height,
        };
        Self {
            map,
            colorbar,
            title_height,
        }
    }
}

/// Affine mapping between projected coordinates and pixels, preserving aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    scale: f64,
    center_px: (f64, f64),
    center_xy: (f64, f64),
}

impl Viewport {
    pub fn fit(bounds: Bounds, area: Area) -> Self {
        let scale = (area.width / bounds.width()).min(area.height / bounds.height());
        Self {
            scale,
            center_px: (area.x + area.width / 2.0, area.y + area.height / 2.0),
            center_xy: (
                (bounds.min_x + bounds.max_x) / 2.0,
                (bounds.min_y + bounds.max_y) / 2.0,
            ),
        }
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        (
            (self.center_px.0 + (x - self.center_xy.0) * self.scale) as f32,
            (self.center_px.1 - (y - self.center_xy.1) * self.scale) as f32,
        )
    }

    pub fn from_pixel(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.center_xy.0 + (px - self.center_px.0) / self.scale,
            self.center_xy.1 - (py - self.center_px.1) / self.scale,
        )
    }
}

/// Renders frames for one projection and raster size.
///
/// Font, coastlines, and the per-pixel inverse projection are prepared once
/// and reused for every frame of a run.
pub struct FrameRenderer {
    kind: ProjectionKind,
    projection: Projection,
    levels: ContourLevels,
    width: u32,
    height: u32,
    layout: Layout,
    viewport: Viewport,
    font: Option<Font<'static>>,
    coastlines: Option<Coastlines>,
    /// Geographic coordinates of each pixel of the map area's bounding box, row-major
    pixel_coords: Vec<Option<(f64, f64)>>,
    map_origin: (u32, u32),
    map_size: (u32, u32),
}

impl FrameRenderer {
    pub fn new(kind: ProjectionKind, options: &RenderOptions) -> Result<Self> {
        let font = match &options.font_path {
            Some(path) => {
                let bytes = fs::read(path)?;
                let font = Font::try_from_vec(bytes).ok_or_else(|| {
                    Nc2GifError::Font(format!("{} is not a usable TrueType font", path.display()))
                })?;
                debug!("Loaded font {}", path.display());
                font
            }
            None => bundled_font()?,
        };
        let coastlines = match &options.coastline_path {
            Some(path) => Coastlines::from_file(path)?,
            None => Coastlines::bundled()?,
        };
        if coastlines.is_empty() {
            warn!("Coastline set is empty; frames are rendered without coastlines");
        }
        Ok(Self::with_parts(
            kind,
            options.width,
            options.height,
            Some(font),
            Some(coastlines),
        ))
    }

    /// Builds a renderer from already-loaded resources.
    pub fn with_parts(
        kind: ProjectionKind,
        width: u32,
        height: u32,
        font: Option<Font<'static>>,
        coastlines: Option<Coastlines>,
    ) -> Self {
        let projection = kind.projection();
        let layout = Layout::new(width, height);
        let viewport = Viewport::fit(projection.bounds(), layout.map);

        let x0 = layout.map.x.floor().max(0.0) as u32;
        let y0 = layout.map.y.floor().max(0.0) as u32;
        let x1 = ((layout.map.x + layout.map.width).ceil() as u32).min(width);
        let y1 = ((layout.map.y + layout.map.height).ceil() as u32).min(height);
        let map_size = (x1.saturating_sub(x0), y1.saturating_sub(y0));

        let mut pixel_coords = Vec::with_capacity((map_size.0 * map_size.1) as usize);
        for py in y0..y1 {
            for px in x0..x1 {
                let (x, y) = viewport.from_pixel(px as f64 + 0.5, py as f64 + 0.5);
                pixel_coords.push(projection.inverse(x, y));
            }
        }
        debug!(
            "Prepared {} projection for {}x{} frames ({} map pixels)",
            kind,
            width,
            height,
            pixel_coords.len()
        );

        Self {
            kind,
            projection,
            levels: ContourLevels::temperature_range(),
            width,
            height,
            layout,
            viewport,
            font,
            coastlines,
            pixel_coords,
            map_origin: (x0, y0),
            map_size,
        }
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn levels(&self) -> &ContourLevels {
        &self.levels
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Draws one frame from a (lat, lon) grid of yearly ranges.
    pub fn render(
        &self,
        values: ArrayView2<f32>,
        lon: &[f64],
        lat: &[f64],
        year: &str,
    ) -> Result<RgbaImage> {
        let sampler = GridSampler::new(values, lon, lat)?;
        let mut img: RgbaImage = ImageBuffer::from_pixel(self.width, self.height, BACKGROUND);

        self.fill_contours(&mut img, &sampler);
        self.draw_graticule(&mut img);
        self.draw_coastlines(&mut img);
        self.draw_outline(&mut img);
        self.draw_colorbar(&mut img);
        self.draw_title(&mut img, year);

        Ok(img)
    }

    fn fill_contours(&self, img: &mut RgbaImage, sampler: &GridSampler) {
        let (x0, y0) = self.map_origin;
        let (w, _) = self.map_size;
        for (i, coords) in self.pixel_coords.iter().enumerate() {
            let Some((lon, lat)) = coords else { continue };
            if let Some(color) = self.levels.color_for(sampler.sample(*lon, *lat)) {
                let px = x0 + (i as u32 % w);
                let py = y0 + (i as u32 / w);
                img.put_pixel(px, py, color);
            }
        }
    }

    /// Projects a geographic polyline to pixels; hidden points become `None`.
    fn project_line(&self, points: impl Iterator<Item = (f64, f64)>) -> Vec<Option<(f32, f32)>> {
        points
            .map(|(lon, lat)| {
                self.projection
                    .forward(lon, lat)
                    .map(|(x, y)| self.viewport.to_pixel(x, y))
            })
            .collect()
    }

    fn max_jump(&self) -> f32 {
        (self.layout.map.width.max(self.layout.map.height) / 4.0) as f32
    }

    fn draw_graticule(&self, img: &mut RgbaImage) {
        let dash = Dash { on: 2.0, off: 3.0 };
        let max_jump = self.max_jump();
        for &lat in &GRID_LATITUDES {
            let line = self.project_line((0..=360).map(|i| (-180.0 + i as f64, lat)));
            draw_polyline(img, &line, INK, Some(dash), max_jump);
        }
        for &lon in &GRID_LONGITUDES {
            let line = self.project_line((0..=180).map(|i| (lon, -90.0 + i as f64)));
            draw_polyline(img, &line, INK, Some(dash), max_jump);
        }
    }

    fn draw_coastlines(&self, img: &mut RgbaImage) {
        let Some(coastlines) = &self.coastlines else {
            return;
        };
        let max_jump = self.max_jump();
        for segment in &coastlines.segments {
            let line = self.project_line(segment.iter().copied());
            draw_polyline(img, &line, INK, None, max_jump);
        }
    }

    fn draw_outline(&self, img: &mut RgbaImage) {
        let ring: Vec<Option<(f32, f32)>> = self
            .projection
            .boundary()
            .into_iter()
            .map(|(x, y)| Some(self.viewport.to_pixel(x, y)))
            .collect();
        draw_polyline(img, &ring, INK, None, f32::INFINITY);
    }

    fn draw_colorbar(&self, img: &mut RgbaImage) {
        let bar = self.layout.colorbar;
        let bands = self.levels.band_count();
        let band_height = bar.height / bands as f64;
        let x = bar.x.round() as i32;
        let w = (bar.width.round() as u32).max(1);

        for band in 0..bands {
            let top = bar.y + bar.height - (band + 1) as f64 * band_height;
            let bottom = top + band_height;
            let y = top.round() as i32;
            let h = ((bottom.round() - top.round()) as u32).max(1);
            draw_filled_rect_mut(img, Rect::at(x, y).of_size(w, h), self.levels.band_color(band));
        }
        draw_hollow_rect_mut(
            img,
            Rect::at(x, bar.y.round() as i32).of_size(w, (bar.height.round() as u32).max(1)),
            INK,
        );

        let tick_len = (bar.width * 0.3) as f32;
        let right = (bar.x + bar.width) as f32;
        let scale = Scale::uniform((self.height as f32 * 0.025).max(8.0));
        for (i, level) in self.levels.levels().iter().enumerate().step_by(COLORBAR_TICK_STEP) {
            let y = (bar.y + bar.height - i as f64 * band_height) as f32;
            draw_line_segment_mut(img, (right, y), (right + tick_len, y), INK);
            if let Some(font) = &self.font {
                let label = format!("{}", level);
                let (_, text_h) = text_size(scale, font, &label);
                draw_text_mut(
                    img,
                    INK,
                    (right + tick_len * 1.5) as i32,
                    y as i32 - text_h / 2,
                    scale,
                    font,
                    &label,
                );
            }
        }
    }

    fn draw_title(&self, img: &mut RgbaImage, year: &str) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = Scale::uniform((self.height as f32 * 0.035).max(8.0));
        let lines = [format!("{}{}", TITLE_PREFIX, year), TITLE_UNITS.to_string()];
        let line_height = self.layout.title_height / lines.len() as f64;
        for (i, line) in lines.iter().enumerate() {
            let (text_w, text_h) = text_size(scale, font, line);
            let x = (self.width as i32 - text_w) / 2;
            let y = ((i as f64 + 0.5) * line_height) as i32 - text_h / 2;
            draw_text_mut(img, INK, x.max(0), y.max(0), scale, font, line);
        }
    }
}

/// Loads the compiled-in DejaVu Sans.
pub fn bundled_font() -> Result<Font<'static>> {
    Font::try_from_bytes(BUNDLED_FONT)
        .ok_or_else(|| Nc2GifError::Font("bundled DejaVu Sans could not be parsed".to_string()))
}

/// Renders a single frame without keeping the prepared renderer around.
pub fn render_frame(
    values: ArrayView2<f32>,
    lon: &[f64],
    lat: &[f64],
    year: &str,
    projection: ProjectionKind,
    options: &RenderOptions,
) -> Result<RgbaImage> {
    FrameRenderer::new(projection, options)?.render(values, lon, lat, year)
}

/// On/off lengths of a dashed line, in pixels.
#[derive(Debug, Clone, Copy)]
pub struct Dash {
    pub on: f32,
    pub off: f32,
}

/// Draws connected segments, breaking at hidden points and at jumps longer than `max_jump`.
pub fn draw_polyline(
    img: &mut RgbaImage,
    points: &[Option<(f32, f32)>],
    color: Rgba<u8>,
    dash: Option<Dash>,
    max_jump: f32,
) {
    let mut phase = 0.0f32;
    for pair in points.windows(2) {
        let (Some(a), Some(b)) = (pair[0], pair[1]) else {
            phase = 0.0;
            continue;
        };
        let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        if length > max_jump {
            phase = 0.0;
            continue;
        }
        match dash {
            Some(dash) => draw_dashed_segment(img, a, b, length, color, dash, &mut phase),
            None => draw_line_segment_mut(img, a, b, color),
        }
    }
}

fn draw_dashed_segment(
    img: &mut RgbaImage,
    a: (f32, f32),
    b: (f32, f32),
    length: f32,
    color: Rgba<u8>,
    dash: Dash,
    phase: &mut f32,
) {
    if length <= 0.0 {
        return;
    }
    let period = dash.on + dash.off;
    let at = |t: f32| (a.0 + (b.0 - a.0) * t / length, a.1 + (b.1 - a.1) * t / length);
    let mut t = 0.0f32;
    while t < length {
        let drawing = *phase < dash.on;
        let left_in_state = if drawing { dash.on - *phase } else { period - *phase };
        let step = left_in_state.min(length - t).max(1e-3);
        if drawing {
            draw_line_segment_mut(img, at(t), at((t + step).min(length)), color);
        }
        t += step;
        *phase = (*phase + step) % period;
    }
}
