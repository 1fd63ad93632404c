//! Color model shared between draw options and batchers.
//!
//! Scope:
//! - 8-bit RGBA color with a cached packed value
//! - fill sources (one color, or one color per vertex)

pub mod color;

pub use color::Color;

/// Color source for a primitive's vertices.
///
/// Per-vertex fills wrap around when a primitive has more vertices than
/// colors, so a two-color fill alternates.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Color),
    PerVertex(Vec<Color>),
}

impl Fill {
    #[inline]
    pub fn solid(color: Color) -> Self {
        Fill::Solid(color)
    }

    /// Color for vertex `i`. An empty per-vertex list falls back to white.
    #[inline]
    pub fn at(&self, i: usize) -> Color {
        match self {
            Fill::Solid(c) => *c,
            Fill::PerVertex(colors) if colors.is_empty() => Color::WHITE,
            Fill::PerVertex(colors) => colors[i % colors.len()],
        }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        match self {
            Fill::Solid(c) => c.a() == 255,
            Fill::PerVertex(colors) => colors.iter().all(|c| c.a() == 255),
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Fill::Solid(Color::WHITE)
    }
}

impl From<Color> for Fill {
    fn from(c: Color) -> Self {
        Fill::Solid(c)
    }
}
