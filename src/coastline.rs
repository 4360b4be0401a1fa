//! Coastline geometry loaded from GMT-style multi-segment text files.
//!
//! Each non-comment line holds `lon lat` (whitespace or comma separated).
//! A line starting with `>` or a blank line ends the current segment; lines
//! starting with `#` are comments.

use crate::error::{Nc2GifError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Coarse world outlines compiled into the binary
const BUNDLED_COASTLINES: &str = include_str!("../assets/world_coastlines.txt");
const BUNDLED_NAME: &str = "assets/world_coastlines.txt";

/// A set of polylines in geographic coordinates (degrees).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coastlines {
    pub segments: Vec<Vec<(f64, f64)>>,
}

impl Coastlines {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let coastlines = Self::parse(&content).map_err(|(line, message)| Nc2GifError::Coastline {
            path: path.to_path_buf(),
            line,
            message,
        })?;
        debug!(
            "Loaded {} coastline segments ({} points) from {}",
            coastlines.segments.len(),
            coastlines.point_count(),
            path.display()
        );
        Ok(coastlines)
    }

    /// The compiled-in world coastlines, used when no file is configured.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_COASTLINES).map_err(|(line, message)| Nc2GifError::Coastline {
            path: PathBuf::from(BUNDLED_NAME),
            line,
            message,
        })
    }

    /// Parses the text format; errors carry the 1-based line number.
    pub fn parse(content: &str) -> std::result::Result<Self, (usize, String)> {
        let mut segments = Vec::new();
        let mut current: Vec<(f64, f64)> = Vec::new();

        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() || line.starts_with('>') {
                if current.len() > 1 {
                    segments.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                continue;
            }

            let mut fields = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty());
            let parse = |field: Option<&str>, what: &str| -> std::result::Result<f64, (usize, String)> {
                field
                    .ok_or_else(|| (i + 1, format!("missing {}", what)))?
                    .parse::<f64>()
                    .map_err(|_| (i + 1, format!("invalid {} in '{}'", what, line)))
            };
            let lon = parse(fields.next(), "longitude")?;
            let lat = parse(fields.next(), "latitude")?;
            if !(-90.0..=90.0).contains(&lat) {
                return Err((i + 1, format!("latitude {} out of range", lat)));
            }
            current.push((lon, lat));
        }
        if current.len() > 1 {
            segments.push(current);
        }

        Ok(Self { segments })
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
