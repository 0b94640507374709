//! TOML layout description.
//!
//! A layout file stands in for the page's key elements: one `[[key]]` table
//! per key, in row order, with its `kflag` and its offset rectangle in CSS
//! pixels, plus the viewport width those rectangles were measured at.
//!
//! ```toml
//! viewport_width = 1600
//!
//! [[key]]
//! kflag = 0
//! left = 0
//! top = 600
//! width = 100
//! height = 200
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchkey_core::{KeyElement, KeyRect, Kflag};

/// Viewport width assumed when a file does not give one.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1600;

/// Errors raised while loading a layout file.
#[derive(Debug, Error)]
pub enum LayoutFileError {
    #[error("failed to read layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse layout file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One key element: identity plus offset rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub kflag: Kflag,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl From<KeySpec> for KeyElement {
    fn from(key: KeySpec) -> Self {
        KeyElement {
            kflag: key.kflag,
            rect: KeyRect {
                left: key.left,
                top: key.top,
                width: key.width,
                height: key.height,
            },
        }
    }
}

/// A key row and the viewport it was laid out for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(rename = "key", default)]
    pub keys: Vec<KeySpec>,
}

fn default_viewport_width() -> u32 {
    DEFAULT_VIEWPORT_WIDTH
}

impl LayoutFile {
    pub fn from_toml(text: &str) -> Result<Self, LayoutFileError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| LayoutFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// `key_count` equal-width keys spanning the whole viewport in one row.
    pub fn even_row(key_count: usize, viewport_width: u32, top: i32, height: u32) -> Self {
        let count = key_count.max(1) as u64;
        let keys = (0..key_count)
            .map(|kflag| {
                let left = u64::from(viewport_width) * kflag as u64 / count;
                let right = u64::from(viewport_width) * (kflag as u64 + 1) / count;
                KeySpec {
                    kflag,
                    left: left as i32,
                    top,
                    width: (right - left) as u32,
                    height,
                }
            })
            .collect();
        Self {
            viewport_width,
            keys,
        }
    }

    /// Key elements in row order, ready for the resolver.
    pub fn elements(&self) -> Vec<KeyElement> {
        self.keys.iter().copied().map(KeyElement::from).collect()
    }

    /// The same row stretched horizontally to a new viewport width.
    ///
    /// Edges are scaled and rounded independently, so neighbours that touched
    /// before still touch afterwards.
    pub fn scaled_to(&self, viewport_width: u32) -> Self {
        if self.viewport_width == 0 {
            return Self {
                viewport_width,
                keys: self.keys.clone(),
            };
        }
        let ratio = f64::from(viewport_width) / f64::from(self.viewport_width);
        let scale = |edge: i64| (edge as f64 * ratio).round() as i64;
        let keys = self
            .keys
            .iter()
            .map(|key| {
                let left = scale(i64::from(key.left));
                let right = scale(i64::from(key.left) + i64::from(key.width));
                KeySpec {
                    left: left as i32,
                    width: (right - left).max(0) as u32,
                    ..*key
                }
            })
            .collect();
        Self {
            viewport_width,
            keys,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layout_file() {
        // Arrange
        let text = r#"
            viewport_width = 400

            [[key]]
            kflag = 0
            left = 0
            top = 10
            width = 200
            height = 50

            [[key]]
            kflag = 1
            left = 200
            top = 10
            width = 200
            height = 50
        "#;

        // Act
        let layout = LayoutFile::from_toml(text).unwrap();

        // Assert
        assert_eq!(layout.viewport_width, 400);
        assert_eq!(layout.keys.len(), 2);
        assert_eq!(layout.elements()[1].rect.left, 200);
    }

    #[test]
    fn test_missing_viewport_width_takes_default() {
        let layout = LayoutFile::from_toml("").unwrap();
        assert_eq!(layout.viewport_width, DEFAULT_VIEWPORT_WIDTH);
        assert!(layout.keys.is_empty());
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        assert!(matches!(
            LayoutFile::from_toml("[[key]]\nkflag = \"zero\"\n"),
            Err(LayoutFileError::Parse(_))
        ));
    }

    #[test]
    fn test_even_row_tiles_the_viewport() {
        let layout = LayoutFile::even_row(16, 1600, 0, 200);
        assert_eq!(layout.keys.len(), 16);
        assert_eq!(layout.keys[0].left, 0);
        assert_eq!(layout.keys[15].left + layout.keys[15].width as i32, 1600);
        for pair in layout.keys.windows(2) {
            assert_eq!(pair[0].left + pair[0].width as i32, pair[1].left);
        }
    }

    #[test]
    fn test_scaled_row_keeps_neighbours_touching() {
        // Arrange
        let layout = LayoutFile::even_row(3, 300, 0, 100);

        // Act
        let scaled = layout.scaled_to(500);

        // Assert
        assert_eq!(scaled.viewport_width, 500);
        for pair in scaled.keys.windows(2) {
            assert_eq!(pair[0].left + pair[0].width as i32, pair[1].left);
        }
        assert_eq!(scaled.keys[2].left + scaled.keys[2].width as i32, 500);
        assert_eq!(scaled.keys[1].top, 0);
    }
}
