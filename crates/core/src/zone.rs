//! Entry/exit zone polygons.

use serde::Serialize;

use crate::geometry::{to_source_space, Point, ScaleFactor};

/// Minimum number of points for a zone to close into a polygon.
pub const MIN_ZONE_POINTS: usize = 3;

/// Which of the two zones a polygon belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    Entry,
    Exit,
}

impl ZoneId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }

    /// Fixed stroke colour (`#008000` entry, `#0000FF` exit).
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Self::Entry => [0x00, 0x80, 0x00],
            Self::Exit => [0x00, 0x00, 0xFF],
        }
    }

    /// Multipart field the zone is sent under.
    pub fn form_field(&self) -> &'static str {
        match self {
            Self::Entry => "area1",
            Self::Exit => "area2",
        }
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered display-space points of one zone. Insertion order is the winding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    id: ZoneId,
    points: Vec<Point>,
}

impl Zone {
    pub fn new(id: ZoneId) -> Self {
        Self {
            id,
            points: Vec::new(),
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// `true` once the zone has enough points to be submitted.
    pub fn is_closeable(&self) -> bool {
        self.points.len() >= MIN_ZONE_POINTS
    }

    pub(crate) fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }

    /// The zone in source-resolution pixels, as `[x, y]` integer pairs.
    pub fn to_source_space(&self, scale: ScaleFactor) -> Vec<[i64; 2]> {
        to_source_space(&self.points, scale)
    }
}
