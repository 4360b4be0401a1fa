//! # Frame Output Module
//!
//! This module writes the rendered frames of a run to PNG files. Before a run
//! every existing `.png` in the output directory is removed, so a directory
//! only ever holds the frames of the latest run and the animator can pick them
//! up without mixing projections.
//!
//! ## File naming
//!
//! Frames are named `{year}{projection}{index}.png`, e.g. `1880Mollweide0.png`,
//! where `index` is the monthly sample the frame was drawn from.

use crate::error::Result;
use crate::extract::Extraction;
use crate::input::RenderOptions;
use crate::projection::ProjectionKind;
use crate::render::FrameRenderer;
use log::{debug, info, warn};
use ndarray::s;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One written frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameFile {
    /// Monthly sample index the frame was drawn from
    pub index: usize,
    /// Year shown in the title
    pub year: String,
    pub projection: ProjectionKind,
    pub path: PathBuf,
}

/// Frames written by one run, in rendering order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameManifest {
    pub frames: Vec<FrameFile>,
    /// Selected samples that were not drawn because their year is incomplete
    pub skipped: Vec<usize>,
}

impl FrameManifest {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|f| f.path.clone()).collect()
    }
}

/// File name of a frame.
pub fn frame_file_name(year: &str, projection: ProjectionKind, index: usize) -> String {
    format!("{}{}{}.png", year, projection.name(), index)
}

/// Removes every `.png` file directly inside `dir`. Returns how many were removed.
///
/// A missing directory counts as empty.
pub fn clear_png_frames<P: AsRef<Path>>(dir: P) -> Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_png(&path) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!("Removed {} stale frames from {}", removed, dir.display());
    }
    Ok(removed)
}

pub(crate) fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Renders and writes one PNG per selected sample.
///
/// The output directory is created if needed and cleared of PNG files first.
/// `on_frame` is called after each frame is written.
///
/// # Errors
///
/// Fails when the directory cannot be prepared, when the font or coastline
/// files cannot be loaded, or when a frame cannot be encoded.
pub fn write_frames<P, F>(
    extraction: &Extraction,
    projection: ProjectionKind,
    output_dir: P,
    options: &RenderOptions,
    on_frame: F,
) -> Result<FrameManifest>
where
    P: AsRef<Path>,
    F: FnMut(&FrameFile),
{
    let renderer = FrameRenderer::new(projection, options)?;
    write_frames_with(extraction, &renderer, output_dir, on_frame)
}

/// Like [`write_frames`], with a prepared renderer.
pub fn write_frames_with<P, F>(
    extraction: &Extraction,
    renderer: &FrameRenderer,
    output_dir: P,
    mut on_frame: F,
) -> Result<FrameManifest>
where
    P: AsRef<Path>,
    F: FnMut(&FrameFile),
{
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;
    clear_png_frames(output_dir)?;

    let mut manifest = FrameManifest::default();
    for &index in &extraction.frame_selection {
        let Some(row) = extraction.year_row(index) else {
            warn!(
                "Skipping sample {}: year {} has fewer than 12 months",
                index, extraction.years[index]
            );
            manifest.skipped.push(index);
            continue;
        };

        let year = &extraction.years[index];
        let grid = extraction.yearly_range.slice(s![row, .., ..]);
        let img = renderer.render(grid, &extraction.lon, &extraction.lat, year)?;

        let path = output_dir.join(frame_file_name(year, renderer.kind(), index));
        img.save(&path)?;
        debug!("Wrote {}", path.display());

        let frame = FrameFile {
            index,
            year: year.clone(),
            projection: renderer.kind(),
            path,
        };
        on_frame(&frame);
        manifest.frames.push(frame);
    }

    info!(
        "Wrote {} {} frames to {}",
        manifest.len(),
        renderer.kind(),
        output_dir.display()
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_file_name() {
        assert_eq!(
            frame_file_name("1880", ProjectionKind::Mollweide, 0),
            "1880Mollweide0.png"
        );
        assert_eq!(
            frame_file_name("1999", ProjectionKind::LambertConformal, 1428),
            "1999LambertConformal1428.png"
        );
    }

    #[test]
    fn test_clear_only_removes_png() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        fs::write(dir.path().join("b.PNG"), b"x").unwrap();
        fs::write(dir.path().join("map_1.gif"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        assert_eq!(clear_png_frames(dir.path()).unwrap(), 2);
        assert!(dir.path().join("map_1.gif").exists());
        assert!(dir.path().join("nested.png").is_dir());
    }

    #[test]
    fn test_clear_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(clear_png_frames(dir.path().join("absent")).unwrap(), 0);
    }
}
