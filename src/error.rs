//! # Error Types
//!
//! A single error enum covers every stage of the pipeline: dataset access,
//! time decoding, reduction, rendering, and GIF assembly. Library functions
//! return [`Result`]; the binary wraps these with `anyhow` context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning a dataset into an animation
#[derive(Error, Debug)]
pub enum Nc2GifError {
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("Attribute '{attribute}' not found on variable '{variable}'")]
    MissingAttribute { variable: String, attribute: String },

    #[error("Cannot decode time values: {0}")]
    TimeUnits(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Coastline file {path}, line {line}: {message}")]
    Coastline {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No PNG frames found in {0}")]
    NoFrames(PathBuf),

    #[error("Frame {path} is {actual_width}x{actual_height}, expected {width}x{height}")]
    FrameSize {
        path: PathBuf,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Nc2GifError>;
