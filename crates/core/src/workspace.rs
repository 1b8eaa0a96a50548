//! The operator's annotation workspace: the loaded video, the captured
//! still, the zones drawn over it and the detection settings.

use image::RgbaImage;

use crate::annotation::{AnnotationSession, Effect, PointerEvent};
use crate::error::{PipelineError, ValidationError};
use crate::frame::CapturedFrame;
use crate::render;
use crate::settings::DetectionConfig;
use crate::video::VideoFile;
use crate::zone::ZoneId;

/// Both zones in source-resolution pixels, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledZones {
    pub entry: Vec<[i64; 2]>,
    pub exit: Vec<[i64; 2]>,
}

#[derive(Debug, Default)]
pub struct AnnotationWorkspace {
    video: Option<VideoFile>,
    frame: Option<CapturedFrame>,
    session: AnnotationSession,
    pub settings: DetectionConfig,
}

impl AnnotationWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a new source video. Any still and zones from the previous
    /// video are dropped.
    pub fn load_video(&mut self, video: VideoFile) {
        tracing::info!(file = %video.file_name(), size = video.size(), "Video selected");
        self.video = Some(video);
        self.frame = None;
        self.session = AnnotationSession::new();
    }

    pub fn video(&self) -> Option<&VideoFile> {
        self.video.as_ref()
    }

    /// Replace the still. A new frame invalidates every zone drawn so far.
    pub fn install_frame(&mut self, frame: CapturedFrame) -> Effect {
        if self.frame.is_some() {
            tracing::debug!("Discarding previous frame and zones");
        }
        self.frame = Some(frame);
        self.session = AnnotationSession::new();
        Effect::Redraw
    }

    pub fn frame(&self) -> Option<&CapturedFrame> {
        self.frame.as_ref()
    }

    pub fn session(&self) -> &AnnotationSession {
        &self.session
    }

    /// Pointer input; ignored until a frame has been captured.
    pub fn handle(&mut self, event: PointerEvent) -> Effect {
        if self.frame.is_none() {
            return Effect::None;
        }
        self.session.handle(event)
    }

    pub fn set_active_zone(&mut self, zone: ZoneId) -> Effect {
        self.session.set_active_zone(zone)
    }

    pub fn reset_areas(&mut self) -> Effect {
        self.session.reset_areas()
    }

    /// The still at display size with the zone overlay on top.
    pub fn render(&self) -> Option<RgbaImage> {
        let frame = self.frame.as_ref()?;
        let (w, h) = frame.display_size();
        let overlay = render::render_overlay(&self.session, w, h);
        Some(render::compose(frame.image(), &overlay))
    }

    /// Check the workspace is ready to submit and scale both zones.
    ///
    /// Order of checks: video present, zones closed, settings in range.
    pub fn prepare(&self) -> Result<(&VideoFile, ScaledZones), PipelineError> {
        let video = self.video.as_ref().ok_or(ValidationError::NoVideoFile)?;
        let (entry, exit) = self.session.closed_zones()?;
        self.settings.check()?;
        let frame = self.frame.as_ref().ok_or_else(|| {
            PipelineError::MediaNotReady("no frame captured to annotate".to_string())
        })?;

        let scale = frame.scale();
        Ok((
            video,
            ScaledZones {
                entry: entry.to_source_space(scale),
                exit: exit.to_source_space(scale),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use std::path::Path;

    fn workspace_with_frame(native: (u32, u32)) -> AnnotationWorkspace {
        let mut ws = AnnotationWorkspace::new();
        ws.load_video(VideoFile::from_parts(Path::new("road.mp4"), 1024).unwrap());
        let frame = CapturedFrame::from_image(RgbaImage::new(native.0, native.1), 800, 450, 0.0)
            .unwrap();
        ws.install_frame(frame);
        ws
    }

    fn draw(ws: &mut AnnotationWorkspace, zone: ZoneId, pts: &[(f64, f64)]) {
        ws.set_active_zone(zone);
        for &(x, y) in pts {
            ws.handle(PointerEvent::Click(Point::new(x, y)));
        }
    }

    #[test]
    fn scales_zones_with_frame_factor() {
        let mut ws = workspace_with_frame((1280, 720));
        draw(&mut ws, ZoneId::Entry, &[(10.0, 10.0), (100.0, 10.0), (100.0, 100.0)]);
        draw(&mut ws, ZoneId::Exit, &[(200.0, 200.0), (300.0, 200.0), (300.0, 300.0)]);

        let (_, zones) = ws.prepare().unwrap();
        assert_eq!(zones.entry, vec![[16, 16], [160, 16], [160, 160]]);
        assert_eq!(zones.exit, vec![[320, 320], [480, 320], [480, 480]]);
    }

    #[test]
    fn missing_video_reported_before_zones() {
        let ws = AnnotationWorkspace::new();
        assert_eq!(
            ws.prepare().unwrap_err(),
            PipelineError::Validation(ValidationError::NoVideoFile)
        );
    }

    #[test]
    fn incomplete_zones_fail_validation() {
        let mut ws = workspace_with_frame((1280, 720));
        draw(&mut ws, ZoneId::Entry, &[(10.0, 10.0), (100.0, 10.0), (100.0, 100.0)]);
        draw(&mut ws, ZoneId::Exit, &[(1.0, 1.0)]);
        assert_eq!(
            ws.prepare().unwrap_err(),
            PipelineError::Validation(ValidationError::IncompleteZones { entry: 3, exit: 1 })
        );
    }

    #[test]
    fn recapture_resets_zones() {
        let mut ws = workspace_with_frame((1280, 720));
        draw(&mut ws, ZoneId::Entry, &[(10.0, 10.0), (20.0, 10.0)]);
        let frame = CapturedFrame::from_image(RgbaImage::new(1920, 1080), 800, 450, 2.0).unwrap();
        assert_eq!(ws.install_frame(frame), Effect::Redraw);
        assert!(ws.session().entry().is_empty());
        assert_eq!(ws.session().active_zone(), None);
        assert!((ws.frame().unwrap().scale().value() - 2.4).abs() < 1e-12);
    }

    #[test]
    fn pointer_input_ignored_without_frame() {
        let mut ws = AnnotationWorkspace::new();
        ws.set_active_zone(ZoneId::Entry);
        assert_eq!(ws.handle(PointerEvent::Click(Point::new(1.0, 1.0))), Effect::None);
        assert!(ws.session().entry().is_empty());
    }

    #[test]
    fn render_is_display_sized() {
        let ws = workspace_with_frame((1280, 720));
        assert_eq!(ws.render().unwrap().dimensions(), (800, 450));
        assert!(AnnotationWorkspace::new().render().is_none());
    }
}
