//! GIF assembly.
//!
//! Frames come either from the manifest of a render run (already in render
//! order) or from a directory of PNG files, ordered by the sample index at the
//! end of each file name so that `...10.png` follows `...2.png`.

use crate::error::{Nc2GifError, Result};
use crate::input::validate_frame_duration;
use crate::output::{FrameManifest, is_png};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::Builder;

/// Quantisation speed handed to the GIF encoder (1 = best, 30 = fastest)
const GIF_SPEED: i32 = 10;

/// The written animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationArtifact {
    pub path: PathBuf,
    pub frame_count: usize,
    pub frame_delay: Duration,
    pub width: u32,
    pub height: u32,
}

/// Encodes the frames listed in a manifest, in manifest order.
pub fn animate_manifest<P: AsRef<Path>>(
    manifest: &FrameManifest,
    gif_path: P,
    frame_duration: f64,
) -> Result<AnimationArtifact> {
    if manifest.is_empty() {
        let dir = gif_path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        return Err(Nc2GifError::NoFrames(dir));
    }
    encode_gif(&manifest.paths(), gif_path.as_ref(), frame_duration)
}

/// Encodes every PNG in `dir` into `dir/gif_name`.
pub fn animate_directory<P: AsRef<Path>>(
    dir: P,
    gif_name: &str,
    frame_duration: f64,
) -> Result<AnimationArtifact> {
    let dir = dir.as_ref();
    let frames = collect_frames(dir)?;
    if frames.is_empty() {
        return Err(Nc2GifError::NoFrames(dir.to_path_buf()));
    }
    encode_gif(&frames, &dir.join(gif_name), frame_duration)
}

/// PNG files in `dir`, ordered by trailing frame index, then by name.
pub fn collect_frames<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file() && is_png(&path) {
            frames.push(path);
        }
    }
    frames.sort_by(|a, b| {
        frame_sort_key(a)
            .cmp(&frame_sort_key(b))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(frames)
}

fn frame_sort_key(path: &Path) -> usize {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(trailing_index)
        .unwrap_or(usize::MAX)
}

/// Number formed by the trailing ASCII digits of `stem`, if any.
pub fn trailing_index(stem: &str) -> Option<usize> {
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}

/// Width and height shared by every frame, read from the file headers.
fn frame_dimensions(frames: &[PathBuf]) -> Result<(u32, u32)> {
    let (width, height) = image::image_dimensions(&frames[0])?;
    for path in &frames[1..] {
        let (actual_width, actual_height) = image::image_dimensions(path)?;
        if (actual_width, actual_height) != (width, height) {
            return Err(Nc2GifError::FrameSize {
                path: path.clone(),
                width,
                height,
                actual_width,
                actual_height,
            });
        }
    }
    Ok((width, height))
}

/// Encodes into a temporary file next to `gif_path` and moves it into place
/// only once every frame is written, so a failed run keeps the previous GIF.
fn encode_gif(frames: &[PathBuf], gif_path: &Path, frame_duration: f64) -> Result<AnimationArtifact> {
    validate_frame_duration(frame_duration)?;
    let delay = Duration::from_secs_f64(frame_duration);
    let (width, height) = frame_dimensions(frames)?;

    let dir = gif_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut staging = Builder::new()
        .prefix(".nc2gif-")
        .suffix(".gif.part")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(staging.as_file_mut());
        {
            let mut encoder = GifEncoder::new_with_speed(&mut writer, GIF_SPEED);
            encoder.set_repeat(Repeat::Infinite)?;
            for path in frames {
                let img = image::open(path)?.to_rgba8();
                encoder.encode_frame(Frame::from_parts(
                    img,
                    0,
                    0,
                    Delay::from_saturating_duration(delay),
                ))?;
                debug!("Encoded {}", path.display());
            }
            // Dropping the encoder writes the GIF trailer
        }
        writer.flush()?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staging
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    staging.persist(gif_path).map_err(|e| e.error)?;

    info!(
        "Wrote {} ({} frames, {:.2}s per frame)",
        gif_path.display(),
        frames.len(),
        frame_duration
    );
    Ok(AnimationArtifact {
        path: gif_path.to_path_buf(),
        frame_count: frames.len(),
        frame_delay: delay,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_index() {
        assert_eq!(trailing_index("1880Mercator0"), Some(0));
        assert_eq!(trailing_index("1881Mercator12"), Some(12));
        assert_eq!(trailing_index("frame"), None);
        assert_eq!(trailing_index("1880"), Some(1880));
    }

    #[test]
    fn test_collect_frames_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1880Orthographic10.png", "1880Orthographic2.png", "legend.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = collect_frames(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["1880Orthographic2.png", "1880Orthographic10.png", "legend.png"]
        );
    }
}
