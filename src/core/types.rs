//! Core type definitions used throughout the codebase

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell coordinate on the grid, `0 <= x < width`, `0 <= y < height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Chebyshev (king-move) distance between two cells
    pub fn chebyshev(&self, other: &Self) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Agent type identifier, numbered from 1 to the configured color count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u16);

impl Color {
    /// All colors `1..=count` in ascending order
    pub fn all(count: u16) -> impl Iterator<Item = Color> {
        (1..=count).map(Color)
    }

    /// Zero-based index into dense per-color tables
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0).saturating_sub(1)
    }

    /// Single-character glyph for text renderings (base-36 digit, `#` past 35)
    pub fn glyph(self) -> char {
        char::from_digit(u32::from(self.0), 36).unwrap_or('#')
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
