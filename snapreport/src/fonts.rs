//! Font loading for the block rasterizer
//!
//! Print styling uses one fixed family in three cuts: regular, bold and
//! monospace. Font programs are kept as raw TTF bytes and parsed on demand
//! with ttf-parser; a missing bold or mono cut falls back to the regular
//! one so rasterization never depends on a complete family being
//! installed.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ttf_parser::Face;

/// Environment variable pointing at a directory of TTF files to prefer
/// over the conventional system locations.
pub const FONT_DIR_ENV: &str = "SNAPREPORT_FONT_DIR";

/// Errors raised while loading font programs.
#[derive(Error, Debug)]
pub enum FontError {
    #[error("IO error reading {path}: {source}", path = .0.display(), source = .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("font data could not be parsed: {path}", path = .0.display())]
    Parse(PathBuf),

    #[error("no usable font found in {dir}", dir = .0.display())]
    EmptyDir(PathBuf),
}

/// A single validated font program.
#[derive(Debug, Clone)]
pub struct FontData {
    bytes: Vec<u8>,
}

impl FontData {
    /// Validate and keep a TTF/OTF program.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        Face::parse(&bytes, 0).ok()?;
        Some(Self { bytes })
    }

    /// Read and validate a font file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| FontError::Io(path.to_path_buf(), e))?;
        Self::from_bytes(bytes).ok_or_else(|| FontError::Parse(path.to_path_buf()))
    }

    /// Parse a fresh face over the stored bytes.
    ///
    /// Parsing was validated at construction, so this cannot fail for a
    /// `FontData` obtained through the public constructors.
    pub fn face(&self) -> Face<'_> {
        // Validated in from_bytes; unreachable for constructed values.
        Face::parse(&self.bytes, 0).unwrap_or_else(|_| unreachable!("font validated on load"))
    }
}

/// The three cuts used by the print styling.
#[derive(Debug, Clone)]
pub struct FontSet {
    pub regular: FontData,
    pub bold: FontData,
    pub mono: FontData,
}

impl FontSet {
    /// Build a set from explicit files; bold and mono fall back to the
    /// regular cut when not given.
    pub fn from_files(
        regular: impl AsRef<Path>,
        bold: Option<&Path>,
        mono: Option<&Path>,
    ) -> Result<Self, FontError> {
        let regular = FontData::from_file(regular)?;
        let bold = match bold {
            Some(path) => FontData::from_file(path)?,
            None => regular.clone(),
        };
        let mono = match mono {
            Some(path) => FontData::from_file(path)?,
            None => regular.clone(),
        };
        Ok(Self {
            regular,
            bold,
            mono,
        })
    }

    /// Build a set from every TTF/OTF in a directory, classifying cuts by
    /// file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, FontError> {
        let dir = dir.as_ref();
        let mut regular: Option<FontData> = None;
        let mut bold: Option<FontData> = None;
        let mut mono: Option<FontData> = None;

        let entries = fs::read_dir(dir).map_err(|e| FontError::Io(dir.to_path_buf(), e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
                continue;
            };
            if !matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|v| v.to_str()) else {
                continue;
            };
            let name = name.to_ascii_lowercase();
            let Ok(data) = FontData::from_file(&path) else {
                continue;
            };
            if name.contains("mono") || name.contains("courier") {
                mono.get_or_insert(data);
            } else if name.contains("bold") {
                bold.get_or_insert(data);
            } else {
                regular.get_or_insert(data);
            }
        }

        let regular = regular.ok_or_else(|| FontError::EmptyDir(dir.to_path_buf()))?;
        let bold = bold.unwrap_or_else(|| regular.clone());
        let mono = mono.unwrap_or_else(|| regular.clone());
        Ok(Self {
            regular,
            bold,
            mono,
        })
    }

    /// Look for a usable family in `SNAPREPORT_FONT_DIR` and then in the
    /// conventional system font locations. Returns `None` when nothing is
    /// installed; callers decide whether that is fatal.
    pub fn discover() -> Option<Self> {
        if let Ok(dir) = std::env::var(FONT_DIR_ENV) {
            if let Ok(set) = Self::from_dir(&dir) {
                log::info!("using fonts from {}={}", FONT_DIR_ENV, dir);
                return Some(set);
            }
            log::warn!("{} set but unusable: {}", FONT_DIR_ENV, dir);
        }

        for (regular, bold, mono) in KNOWN_FAMILIES {
            let regular_path = Path::new(regular);
            if !regular_path.is_file() {
                continue;
            }
            let bold_path = Path::new(bold);
            let mono_path = Path::new(mono);
            let set = Self::from_files(
                regular_path,
                bold_path.is_file().then_some(bold_path),
                mono_path.is_file().then_some(mono_path),
            );
            match set {
                Ok(set) => {
                    log::info!("using system font family at {}", regular);
                    return Some(set);
                }
                Err(e) => log::warn!("skipping font family at {}: {}", regular, e),
            }
        }

        None
    }
}

/// Conventional (regular, bold, mono) system font locations, checked in
/// order.
const KNOWN_FAMILIES: &[(&str, &str, &str)] = &[
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    ),
    (
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/liberation/LiberationMono-Regular.ttf",
    ),
    (
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
        "/System/Library/Fonts/Supplemental/Courier New.ttf",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(FontData::from_bytes(vec![0, 1, 2, 3]).is_none());
    }

    #[test]
    fn test_discover_gives_parseable_faces() {
        let Some(set) = FontSet::discover() else {
            eprintln!("no system fonts installed; skipping");
            return;
        };
        assert!(set.regular.face().units_per_em() > 0);
        assert!(set.bold.face().units_per_em() > 0);
        assert!(set.mono.face().units_per_em() > 0);
    }
}
