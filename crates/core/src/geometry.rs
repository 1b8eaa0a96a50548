//! Display-space points and the display → source coordinate mapping.
//!
//! Pointer locations arrive in viewport coordinates. [`to_display_point`]
//! makes them relative to the annotation surface, and [`to_source_space`]
//! scales a zone up to the native video resolution the analysis service
//! works in.

use serde::{Deserialize, Serialize};

/// A pixel position on the annotation surface (display space).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A raw pointer location in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPointer {
    pub client_x: f64,
    pub client_y: f64,
}

/// On-screen placement and size of the annotation surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBounds {
    pub left: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
}

impl SurfaceBounds {
    /// Bounds for a surface placed at the viewport origin.
    pub fn at_origin(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }
}

/// Translate a pointer location into surface-relative coordinates.
///
/// Negative results (pointer left of / above the surface) clamp to zero;
/// display-space points are never negative.
pub fn to_display_point(raw: RawPointer, bounds: &SurfaceBounds) -> Point {
    Point {
        x: (raw.client_x - bounds.left).max(0.0),
        y: (raw.client_y - bounds.top).max(0.0),
    }
}

/// Ratio between the native video resolution and the surface it is shown on.
///
/// Computed once per captured frame. Window resizes change the display
/// size but never the source resolution, so the factor is held by the
/// frame rather than recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Scale from `display_width` up to `native_width`.
    ///
    /// Returns `None` when either width is zero.
    pub fn between(native_width: u32, display_width: u32) -> Option<Self> {
        if native_width == 0 || display_width == 0 {
            return None;
        }
        Some(Self(f64::from(native_width) / f64::from(display_width)))
    }

    /// A fixed factor, e.g. when the caller already knows the ratio.
    pub fn fixed(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Scale every point by `scale` and round to the nearest integer pixel.
///
/// Order and count are preserved.
pub fn to_source_space(points: &[Point], scale: ScaleFactor) -> Vec<[i64; 2]> {
    points
        .iter()
        .map(|p| {
            [
                (p.x * scale.value()).round() as i64,
                (p.y * scale.value()).round() as i64,
            ]
        })
        .collect()
}
