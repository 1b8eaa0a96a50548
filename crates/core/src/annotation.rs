//! Zone annotation state machine.
//!
//! [`AnnotationSession`] owns both zones, the active-zone selection and
//! the transient stroke state. Pointer input is fed in through
//! [`AnnotationSession::handle`], which returns an [`Effect`] telling the
//! caller whether the surface must be redrawn. Rendering lives in
//! [`crate::render`]; nothing here touches pixels.

use crate::error::ValidationError;
use crate::geometry::Point;
use crate::zone::{Zone, ZoneId};

/// Pointer travel (display pixels) above which a press-and-release is a
/// drag rather than a click. Drags never commit a point.
pub const DRAG_THRESHOLD_PX: f64 = 4.0;

/// Pointer input on the annotation surface, already in display space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    Leave,
    Click(Point),
}

/// A live line from the last committed point to the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSegment {
    pub zone: ZoneId,
    pub from: Point,
    pub to: Point,
}

/// What the caller has to do after an input was applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Nothing changed.
    None,
    /// Zones or selection changed; clear and redraw the surface.
    Redraw,
    /// Redraw, then overlay the preview segment.
    Preview(PreviewSegment),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stroke {
    Idle,
    Drawing { origin: Point, travel: f64 },
}

/// Annotation state for one captured frame.
#[derive(Debug, Clone)]
pub struct AnnotationSession {
    active: Option<ZoneId>,
    entry: Zone,
    exit: Zone,
    stroke: Stroke,
    /// Travel of the stroke that just ended, consumed by the following click.
    released_travel: Option<f64>,
    preview: Option<PreviewSegment>,
    revision: u64,
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationSession {
    pub fn new() -> Self {
        Self {
            active: None,
            entry: Zone::new(ZoneId::Entry),
            exit: Zone::new(ZoneId::Exit),
            stroke: Stroke::Idle,
            released_travel: None,
            preview: None,
            revision: 0,
        }
    }

    pub fn active_zone(&self) -> Option<ZoneId> {
        self.active
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.stroke, Stroke::Drawing { .. })
    }

    pub fn zone(&self, id: ZoneId) -> &Zone {
        match id {
            ZoneId::Entry => &self.entry,
            ZoneId::Exit => &self.exit,
        }
    }

    pub fn entry(&self) -> &Zone {
        &self.entry
    }

    pub fn exit(&self) -> &Zone {
        &self.exit
    }

    pub fn preview(&self) -> Option<PreviewSegment> {
        self.preview
    }

    /// Bumped on every change that requires a redraw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Switch the zone that subsequent clicks append to.
    ///
    /// Cancels any stroke in progress. Points already committed to either
    /// zone are kept.
    pub fn set_active_zone(&mut self, zone: ZoneId) -> Effect {
        self.cancel_stroke();
        self.active = Some(zone);
        tracing::debug!(zone = %zone, "Active zone selected");
        self.redraw()
    }

    /// Clear both zones and deselect.
    pub fn reset_areas(&mut self) -> Effect {
        self.cancel_stroke();
        self.entry.clear();
        self.exit.clear();
        self.active = None;
        tracing::debug!("Annotation areas reset");
        self.redraw()
    }

    /// Apply one pointer event.
    pub fn handle(&mut self, event: PointerEvent) -> Effect {
        match event {
            PointerEvent::Down(at) => {
                if self.active.is_none() {
                    return Effect::None;
                }
                self.released_travel = None;
                self.stroke = Stroke::Drawing {
                    origin: at,
                    travel: 0.0,
                };
                Effect::None
            }
            PointerEvent::Move(at) => {
                let (Stroke::Drawing { origin, travel }, Some(zone)) = (self.stroke, self.active)
                else {
                    return Effect::None;
                };
                self.stroke = Stroke::Drawing {
                    origin,
                    travel: travel.max(origin.distance_to(&at)),
                };
                match self.zone(zone).last() {
                    Some(from) => {
                        let segment = PreviewSegment { zone, from, to: at };
                        self.preview = Some(segment);
                        Effect::Preview(segment)
                    }
                    None => Effect::None,
                }
            }
            PointerEvent::Up(at) => {
                if let Stroke::Drawing { origin, travel } = self.stroke {
                    self.released_travel = Some(travel.max(origin.distance_to(&at)));
                }
                self.end_stroke()
            }
            PointerEvent::Leave => {
                self.released_travel = None;
                self.end_stroke()
            }
            PointerEvent::Click(at) => self.commit_click(at),
        }
    }

    /// Both zones, provided each has at least three points.
    pub fn closed_zones(&self) -> Result<(&Zone, &Zone), ValidationError> {
        if self.entry.is_closeable() && self.exit.is_closeable() {
            Ok((&self.entry, &self.exit))
        } else {
            Err(ValidationError::IncompleteZones {
                entry: self.entry.len(),
                exit: self.exit.len(),
            })
        }
    }

    fn commit_click(&mut self, at: Point) -> Effect {
        let travel = self.released_travel.take();
        let Some(zone) = self.active else {
            return Effect::None;
        };
        if travel.is_some_and(|t| t > DRAG_THRESHOLD_PX) {
            tracing::trace!(zone = %zone, "Ignoring click at the end of a drag");
            return Effect::None;
        }
        match zone {
            ZoneId::Entry => self.entry.push(at),
            ZoneId::Exit => self.exit.push(at),
        }
        self.redraw()
    }

    fn end_stroke(&mut self) -> Effect {
        let was_drawing = self.is_drawing();
        self.stroke = Stroke::Idle;
        if self.preview.take().is_some() || was_drawing {
            self.redraw()
        } else {
            Effect::None
        }
    }

    fn cancel_stroke(&mut self) {
        self.stroke = Stroke::Idle;
        self.released_travel = None;
        self.preview = None;
    }

    fn redraw(&mut self) -> Effect {
        self.revision += 1;
        Effect::Redraw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(session: &mut AnnotationSession, x: f64, y: f64) -> Effect {
        let p = Point::new(x, y);
        session.handle(PointerEvent::Down(p));
        session.handle(PointerEvent::Up(p));
        session.handle(PointerEvent::Click(p))
    }

    #[test]
    fn clicks_without_active_zone_are_ignored() {
        let mut s = AnnotationSession::new();
        assert_eq!(click(&mut s, 10.0, 10.0), Effect::None);
        assert!(s.entry().is_empty());
        assert!(s.exit().is_empty());
    }

    #[test]
    fn click_appends_to_active_zone_in_order() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        assert_eq!(click(&mut s, 10.0, 10.0), Effect::Redraw);
        click(&mut s, 100.0, 10.0);
        click(&mut s, 100.0, 100.0);

        assert_eq!(
            s.entry().points(),
            &[
                Point::new(10.0, 10.0),
                Point::new(100.0, 10.0),
                Point::new(100.0, 100.0)
            ]
        );
        assert!(s.exit().is_empty());
    }

    #[test]
    fn switching_zone_keeps_both_zones_points() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        click(&mut s, 1.0, 1.0);
        click(&mut s, 2.0, 2.0);
        s.set_active_zone(ZoneId::Exit);
        click(&mut s, 3.0, 3.0);
        s.set_active_zone(ZoneId::Entry);
        s.set_active_zone(ZoneId::Exit);

        assert_eq!(s.entry().len(), 2);
        assert_eq!(s.exit().len(), 1);
        assert_eq!(s.active_zone(), Some(ZoneId::Exit));
    }

    #[test]
    fn selecting_zone_cancels_stroke() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        s.handle(PointerEvent::Down(Point::new(5.0, 5.0)));
        assert!(s.is_drawing());
        assert_eq!(s.set_active_zone(ZoneId::Exit), Effect::Redraw);
        assert!(!s.is_drawing());
    }

    #[test]
    fn pointer_down_without_zone_does_not_start_drawing() {
        let mut s = AnnotationSession::new();
        s.handle(PointerEvent::Down(Point::new(5.0, 5.0)));
        assert!(!s.is_drawing());
    }

    #[test]
    fn move_previews_without_mutating_zone() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Exit);
        click(&mut s, 10.0, 10.0);

        s.handle(PointerEvent::Down(Point::new(10.0, 10.0)));
        let effect = s.handle(PointerEvent::Move(Point::new(50.0, 60.0)));

        assert_eq!(
            effect,
            Effect::Preview(PreviewSegment {
                zone: ZoneId::Exit,
                from: Point::new(10.0, 10.0),
                to: Point::new(50.0, 60.0),
            })
        );
        assert_eq!(s.exit().len(), 1);
    }

    #[test]
    fn move_without_drawing_has_no_preview() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        click(&mut s, 10.0, 10.0);
        assert_eq!(s.handle(PointerEvent::Move(Point::new(20.0, 20.0))), Effect::None);
        assert!(s.preview().is_none());
    }

    #[test]
    fn drag_release_does_not_commit_point() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        s.handle(PointerEvent::Down(Point::new(10.0, 10.0)));
        s.handle(PointerEvent::Move(Point::new(40.0, 10.0)));
        s.handle(PointerEvent::Up(Point::new(40.0, 10.0)));
        assert_eq!(s.handle(PointerEvent::Click(Point::new(40.0, 10.0))), Effect::None);
        assert!(s.entry().is_empty());
    }

    #[test]
    fn small_jitter_still_counts_as_click() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        s.handle(PointerEvent::Down(Point::new(10.0, 10.0)));
        s.handle(PointerEvent::Move(Point::new(12.0, 11.0)));
        s.handle(PointerEvent::Up(Point::new(12.0, 11.0)));
        s.handle(PointerEvent::Click(Point::new(12.0, 11.0)));
        assert_eq!(s.entry().points(), &[Point::new(12.0, 11.0)]);
    }

    #[test]
    fn up_and_leave_end_stroke_but_keep_points() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        click(&mut s, 1.0, 1.0);
        s.handle(PointerEvent::Down(Point::new(1.0, 1.0)));
        s.handle(PointerEvent::Move(Point::new(30.0, 30.0)));
        assert!(s.preview().is_some());
        s.handle(PointerEvent::Leave);
        assert!(!s.is_drawing());
        assert!(s.preview().is_none());
        assert_eq!(s.entry().len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        click(&mut s, 1.0, 1.0);
        s.set_active_zone(ZoneId::Exit);
        click(&mut s, 2.0, 2.0);

        assert_eq!(s.reset_areas(), Effect::Redraw);
        assert!(s.entry().is_empty());
        assert!(s.exit().is_empty());
        assert_eq!(s.active_zone(), None);
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut s = AnnotationSession::new();
        let r0 = s.revision();
        s.set_active_zone(ZoneId::Entry);
        let r1 = s.revision();
        click(&mut s, 1.0, 1.0);
        let r2 = s.revision();
        s.reset_areas();
        let r3 = s.revision();
        assert!(r0 < r1 && r1 < r2 && r2 < r3);
    }

    #[test]
    fn closed_zones_requires_three_points_each() {
        let mut s = AnnotationSession::new();
        s.set_active_zone(ZoneId::Entry);
        for i in 0..3 {
            click(&mut s, f64::from(i) * 10.0, 0.0);
        }
        s.set_active_zone(ZoneId::Exit);
        click(&mut s, 1.0, 1.0);
        click(&mut s, 2.0, 1.0);

        assert_eq!(
            s.closed_zones().unwrap_err(),
            ValidationError::IncompleteZones { entry: 3, exit: 2 }
        );

        click(&mut s, 2.0, 2.0);
        assert!(s.closed_zones().is_ok());
    }
}
