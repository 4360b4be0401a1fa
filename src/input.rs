//! # Input Configuration Module
//!
//! This module provides configuration parsing and validation for nc2gif jobs.
//! A job names the anomaly dataset to read, how densely to sample it in time,
//! which map projection to draw on, and where the frames and the animation go.
//!
//! ## Configuration Structure
//!
//! - **nc_key**: Path to the input NetCDF file
//! - **output_dir**: Directory receiving PNG frames and the GIF (default `Fig`)
//! - **gif_name**: File name of the animation inside `output_dir` (default `map_1.gif`)
//! - **resolution**: Render every `resolution`-th monthly sample (default 1)
//! - **projection**: One of `LambertConformal`, `Orthographic`, `Mollweide`, `Mercator`
//! - **frame_duration**: Seconds each frame stays on screen (default 0.5)
//! - **variables**: Names of the dataset variables (defaults `time`, `lat`, `lon`, `z`, `anom`)
//! - **render**: Raster size and optional font / coastline sources
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nc2gif::input::JobConfig;
//!
//! let config = JobConfig::from_file("job.yaml")?;
//!
//! let json = r#"
//! {
//!   "nc_key": "NOAAGlobalTemp.nc",
//!   "resolution": 12,
//!   "projection": "Mollweide"
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{Nc2GifError, Result};
use crate::projection::ProjectionKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "Fig";
pub const DEFAULT_GIF_NAME: &str = "map_1.gif";
pub const DEFAULT_FRAME_DURATION: f64 = 0.5;
pub const DEFAULT_FRAME_SIZE: u32 = 600;

/// Smallest raster edge that still leaves room for the map, colorbar and title.
pub const MIN_FRAME_SIZE: u32 = 64;
/// Shortest frame duration a GIF can express: one centisecond
pub const MIN_FRAME_DURATION: f64 = 0.01;

/// Main configuration structure for nc2gif jobs.
///
/// # Examples
///
/// ```rust
/// use nc2gif::input::JobConfig;
/// use nc2gif::projection::ProjectionKind;
///
/// let config = JobConfig {
///     nc_key: "anomalies.nc".to_string(),
///     resolution: 12,
///     projection: ProjectionKind::Mercator,
///     ..JobConfig::default()
/// };
/// assert_eq!(config.output_dir, "Fig");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Path to the input NetCDF file
    pub nc_key: String,
    /// Directory that receives the PNG frames and the GIF
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// File name of the animation inside `output_dir`
    #[serde(default = "default_gif_name")]
    pub gif_name: String,
    /// Render every n-th monthly sample
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    /// Map projection used for every frame of the run
    #[serde(default)]
    pub projection: ProjectionKind,
    /// Display time of each animation frame, in seconds
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f64,
    /// Dataset variable names
    #[serde(default)]
    pub variables: VariableNames,
    /// Raster options
    #[serde(default)]
    pub render: RenderOptions,
}

/// Names of the variables read from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    /// Encoded time coordinate; must carry a `units` attribute
    pub time: String,
    /// Latitude coordinate
    pub lat: String,
    /// Longitude coordinate
    pub lon: String,
    /// Depth coordinate
    pub depth: String,
    /// 4-D anomaly field (time, depth, lat, lon)
    pub anomaly: String,
}

/// Raster options for rendered frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// TrueType font for the title and colorbar labels; DejaVu Sans is bundled
    pub font_path: Option<PathBuf>,
    /// GMT-style multi-segment coastline file; coarse world outlines are bundled
    pub coastline_path: Option<PathBuf>,
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_gif_name() -> String {
    DEFAULT_GIF_NAME.to_string()
}

fn default_resolution() -> usize {
    1
}

fn default_frame_duration() -> f64 {
    DEFAULT_FRAME_DURATION
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            nc_key: String::new(),
            output_dir: default_output_dir(),
            gif_name: default_gif_name(),
            resolution: default_resolution(),
            projection: ProjectionKind::default(),
            frame_duration: default_frame_duration(),
            variables: VariableNames::default(),
            render: RenderOptions::default(),
        }
    }
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            depth: "z".to_string(),
            anomaly: "anom".to_string(),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_SIZE,
            height: DEFAULT_FRAME_SIZE,
            font_path: None,
            coastline_path: None,
        }
    }
}

impl JobConfig {
    /// Loads a job configuration from a JSON or YAML file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use nc2gif::input::JobConfig;
    ///
    /// let config = JobConfig::from_file("globe.json")?;
    /// println!("Rendering {}", config.nc_key);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Loads a job configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: JobConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }

    /// Loads a job configuration from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let config: JobConfig = serde_yaml::from_str(yaml_str)?;
        Ok(config)
    }

    /// Checks the values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.nc_key.trim().is_empty() {
            return Err(Nc2GifError::Config("nc_key must not be empty".to_string()));
        }
        if self.resolution == 0 {
            return Err(Nc2GifError::Config(
                "resolution must be at least 1".to_string(),
            ));
        }
        validate_frame_duration(self.frame_duration)?;
        if self.gif_name.trim().is_empty() {
            return Err(Nc2GifError::Config("gif_name must not be empty".to_string()));
        }
        if self.render.width < MIN_FRAME_SIZE || self.render.height < MIN_FRAME_SIZE {
            return Err(Nc2GifError::Config(format!(
                "frame size {}x{} is below the {}px minimum",
                self.render.width, self.render.height, MIN_FRAME_SIZE
            )));
        }
        Ok(())
    }

    /// Full path of the animation artifact.
    pub fn gif_path(&self) -> PathBuf {
        Path::new(&self.output_dir).join(&self.gif_name)
    }
}

/// Rejects frame durations that cannot be expressed as a GIF delay.
pub fn validate_frame_duration(seconds: f64) -> Result<()> {
    if !seconds.is_finite() || seconds < MIN_FRAME_DURATION {
        return Err(Nc2GifError::Config(format!(
            "frame duration must be at least {} s (GIF delays are in centiseconds), got {}",
            MIN_FRAME_DURATION, seconds
        )));
    }
    Ok(())
}
