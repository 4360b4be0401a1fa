//! # nc2gif
//!
//! A Rust library for turning monthly temperature-anomaly NetCDF datasets into
//! animated maps of the yearly temperature range.
//!
//! ## Features
//!
//! - **Yearly ranges**: Peak-to-peak of every 12-month block at the surface level,
//!   with sentinel values masked out
//! - **Four projections**: Lambert conformal, orthographic, Mollweide and Mercator
//! - **Filled contours**: 0–28 °C on the jet colour scale, with colorbar and graticule
//! - **Looping GIF**: Frames stitched in render order with a fixed per-frame delay
//! - **Type safety**: One error enum for every stage of the pipeline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nc2gif::{process_job, input::JobConfig};
//!
//! let config = JobConfig::from_file("job.json").expect("Failed to load config");
//! let outcome = process_job(&config).expect("Failed to animate dataset");
//! println!("{} frames", outcome.animation.frame_count);
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "nc_key": "NOAAGlobalTemp.nc",
//!   "output_dir": "Fig",
//!   "resolution": 12,
//!   "projection": "Mollweide",
//!   "frame_duration": 0.5,
//!   "render": { "width": 800, "height": 500 }
//! }
//! ```

pub mod animate;
pub mod cli;
pub mod coastline;
pub mod colormap;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod info;
pub mod input;
pub mod log;
pub mod output;
pub mod projection;
pub mod render;
pub mod time;

#[cfg(test)]
mod tests;

use crate::animate::{AnimationArtifact, animate_manifest};
use crate::dataset::NetCdfSource;
use crate::error::Result;
use crate::extract::{Extraction, extract};
use crate::input::JobConfig;
use crate::output::{FrameFile, FrameManifest, write_frames};
use ::log::info;
use serde::Serialize;

/// Progress notifications emitted while a job runs.
pub enum JobEvent<'a> {
    /// The dataset has been reduced; the selection size is now known
    Extracted(&'a Extraction),
    /// A frame has been written to disk
    FrameWritten(&'a FrameFile),
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub manifest: FrameManifest,
    pub animation: AnimationArtifact,
}

/// Reads the dataset named by `config.nc_key` and reduces it.
pub fn extract_job(config: &JobConfig) -> Result<Extraction> {
    let source = NetCdfSource::open(&config.nc_key)?;
    let extraction = extract(&source, &config.variables, config.resolution)?;
    source.close()?;
    Ok(extraction)
}

/// Extracts the dataset and renders the selected frames.
pub fn render_job<F>(config: &JobConfig, mut on_event: F) -> Result<(Extraction, FrameManifest)>
where
    F: FnMut(JobEvent<'_>),
{
    config.validate()?;
    let extraction = extract_job(config)?;
    on_event(JobEvent::Extracted(&extraction));

    let manifest = write_frames(
        &extraction,
        config.projection,
        &config.output_dir,
        &config.render,
        |frame| on_event(JobEvent::FrameWritten(frame)),
    )?;
    Ok((extraction, manifest))
}

/// Runs the whole pipeline and reports progress through `on_event`.
pub fn run_job<F>(config: &JobConfig, on_event: F) -> Result<JobOutcome>
where
    F: FnMut(JobEvent<'_>),
{
    let (_, manifest) = render_job(config, on_event)?;
    let animation = animate_manifest(&manifest, config.gif_path(), config.frame_duration)?;
    info!(
        "Animated {} frames into {}",
        animation.frame_count,
        animation.path.display()
    );
    Ok(JobOutcome {
        manifest,
        animation,
    })
}

/// Processes a dataset according to the provided job configuration.
///
/// This function orchestrates the entire pipeline:
/// 1. Opens the NetCDF file and reads the configured variables
/// 2. Masks sentinel values and reduces each year to its range
/// 3. Clears the output directory of PNG files
/// 4. Renders one frame per selected sample
/// 5. Encodes the frames as a looping GIF
///
/// # Examples
///
/// ```rust,no_run
/// use nc2gif::{process_job, input::JobConfig};
///
/// let config = JobConfig::from_file("world.yaml")?;
/// process_job(&config)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// This function will return an error if:
/// - The NetCDF file cannot be opened or lacks a required variable
/// - The time units cannot be decoded
/// - A frame cannot be rendered or written
/// - No frames were produced, or the GIF cannot be written
pub fn process_job(config: &JobConfig) -> Result<JobOutcome> {
    run_job(config, |_| {})
}
