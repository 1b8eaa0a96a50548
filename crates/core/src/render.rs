//! Overlay rendering for the annotation surface.
//!
//! Every redraw starts from a transparent surface: zones with fewer than
//! [`MIN_ZONE_POINTS`](crate::zone::MIN_ZONE_POINTS) points are stroked as
//! open polylines, closeable zones as closed, semi-transparently filled
//! polygons. Each committed point gets a small disc.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut, Blend};

use crate::annotation::{AnnotationSession, PreviewSegment};
use crate::geometry::Point;
use crate::zone::Zone;

/// Alpha of the polygon fill (25%).
pub const FILL_ALPHA: u8 = 0x40;

/// Stroke width of outlines and the preview segment, in pixels.
pub const STROKE_WIDTH: u32 = 2;

/// Radius of the per-point marker disc.
pub const POINT_RADIUS: i32 = 4;

/// How a zone is drawn given its current point count.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneShape {
    Empty,
    /// Open path through the points in order.
    Polyline(Vec<Point>),
    /// Closed path; the last element repeats the first.
    Polygon(Vec<Point>),
}

impl ZoneShape {
    pub fn of(zone: &Zone) -> Self {
        let points = zone.points();
        if points.is_empty() {
            Self::Empty
        } else if zone.is_closeable() {
            let mut path = points.to_vec();
            path.push(points[0]);
            Self::Polygon(path)
        } else {
            Self::Polyline(points.to_vec())
        }
    }

    /// The stroked path.
    pub fn path(&self) -> &[Point] {
        match self {
            Self::Empty => &[],
            Self::Polyline(path) | Self::Polygon(path) => path,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Polygon(_))
    }
}

/// Clear-and-redraw the whole overlay for `session` at display size.
pub fn render_overlay(session: &AnnotationSession, width: u32, height: u32) -> RgbaImage {
    let mut surface = RgbaImage::new(width, height);
    draw_zone(&mut surface, session.entry());
    draw_zone(&mut surface, session.exit());
    if let Some(segment) = session.preview() {
        draw_preview(&mut surface, &segment);
    }
    surface
}

/// Composite `overlay` over `frame`. The frame is resized to the overlay
/// size first when the two differ.
pub fn compose(frame: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let mut base = if frame.dimensions() == overlay.dimensions() {
        frame.clone()
    } else {
        image::imageops::resize(
            frame,
            overlay.width(),
            overlay.height(),
            image::imageops::FilterType::Triangle,
        )
    };
    image::imageops::overlay(&mut base, overlay, 0, 0);
    base
}

fn draw_zone(surface: &mut RgbaImage, zone: &Zone) {
    let [r, g, b] = zone.id().rgb();
    let stroke = Rgba([r, g, b, 0xFF]);
    let shape = ZoneShape::of(zone);

    if shape.is_filled() {
        fill_polygon(surface, zone.points(), Rgba([r, g, b, FILL_ALPHA]));
    }

    for pair in shape.path().windows(2) {
        stroke_segment(surface, pair[0], pair[1], stroke);
    }

    for p in zone.points() {
        draw_filled_circle_mut(
            surface,
            (p.x.round() as i32, p.y.round() as i32),
            POINT_RADIUS,
            stroke,
        );
    }
}

fn draw_preview(surface: &mut RgbaImage, segment: &PreviewSegment) {
    let [r, g, b] = segment.zone.rgb();
    stroke_segment(surface, segment.from, segment.to, Rgba([r, g, b, 0xFF]));
}

fn stroke_segment(surface: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    for offset in 0..STROKE_WIDTH {
        let d = offset as f32;
        draw_line_segment_mut(
            surface,
            (from.x as f32 + d, from.y as f32),
            (to.x as f32 + d, to.y as f32),
            color,
        );
    }
}

fn fill_polygon(surface: &mut RgbaImage, points: &[Point], color: Rgba<u8>) {
    let mut vertices: Vec<imageproc::point::Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        let v = imageproc::point::Point::new(p.x.round() as i32, p.y.round() as i32);
        if vertices.last() != Some(&v) {
            vertices.push(v);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    // Degenerate after snapping to the pixel grid; the outline is enough.
    if vertices.len() < 3 {
        return;
    }

    let mut blended = Blend(std::mem::take(surface));
    draw_polygon_mut(&mut blended, &vertices, color);
    *surface = blended.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::PointerEvent;
    use crate::zone::ZoneId;

    fn session_with(entry: &[(f64, f64)], exit: &[(f64, f64)]) -> AnnotationSession {
        let mut s = AnnotationSession::new();
        for (zone, pts) in [(ZoneId::Entry, entry), (ZoneId::Exit, exit)] {
            s.set_active_zone(zone);
            for &(x, y) in pts {
                s.handle(PointerEvent::Click(Point::new(x, y)));
            }
        }
        s
    }

    #[test]
    fn polygon_path_closes_back_to_first_point() {
        let s = session_with(&[(10.0, 10.0), (100.0, 10.0), (100.0, 100.0), (10.0, 90.0)], &[]);
        let shape = ZoneShape::of(s.entry());
        assert!(shape.is_filled());
        let path = shape.path();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), path.last());
    }

    #[test]
    fn short_zone_is_open_polyline() {
        let s = session_with(&[(10.0, 10.0), (100.0, 10.0)], &[]);
        let shape = ZoneShape::of(s.entry());
        assert!(!shape.is_filled());
        assert_eq!(shape.path(), &[Point::new(10.0, 10.0), Point::new(100.0, 10.0)]);
        assert_eq!(ZoneShape::of(s.exit()), ZoneShape::Empty);
    }

    #[test]
    fn overlay_fills_polygon_interior_semi_transparently() {
        let s = session_with(
            &[(10.0, 10.0), (100.0, 10.0), (100.0, 100.0), (10.0, 100.0)],
            &[],
        );
        let overlay = render_overlay(&s, 200, 200);
        let inside = overlay.get_pixel(55, 55);
        assert_eq!((inside[0], inside[2]), (0, 0));
        assert!(inside[1] >= 0x7F);
        assert!(inside[3] > 0 && inside[3] < 0xFF);
        assert_eq!(overlay.get_pixel(150, 150)[3], 0);
    }

    #[test]
    fn open_polyline_is_not_filled() {
        let s = session_with(&[], &[(10.0, 10.0), (100.0, 100.0)]);
        let overlay = render_overlay(&s, 200, 200);
        // Off the diagonal, nothing drawn.
        assert_eq!(overlay.get_pixel(80, 20)[3], 0);
        // Point marker in exit blue.
        assert_eq!(*overlay.get_pixel(10, 10), Rgba([0, 0, 0xFF, 0xFF]));
    }

    #[test]
    fn preview_segment_is_drawn_in_active_colour() {
        let mut s = session_with(&[(10.0, 50.0)], &[]);
        s.set_active_zone(ZoneId::Entry);
        s.handle(PointerEvent::Down(Point::new(10.0, 50.0)));
        s.handle(PointerEvent::Move(Point::new(150.0, 50.0)));
        let overlay = render_overlay(&s, 200, 200);
        assert_eq!(*overlay.get_pixel(120, 50), Rgba([0, 0x80, 0, 0xFF]));
        assert_eq!(s.entry().len(), 1);
    }

    #[test]
    fn compose_resizes_frame_to_overlay() {
        let frame = RgbaImage::from_pixel(1280, 720, Rgba([10, 10, 10, 255]));
        let overlay = RgbaImage::new(800, 450);
        let out = compose(&frame, &overlay);
        assert_eq!(out.dimensions(), (800, 450));
    }
}
