//! Frame capture unit.
//!
//! Pulls one still frame out of the source video at its native
//! resolution. The still becomes the backdrop the zones are drawn over,
//! and its native size fixes the scale factor used to send the zones.

use image::RgbaImage;

use crate::error::{PipelineError, ValidationError};
use crate::ffmpeg::{self, FfmpegError};
use crate::geometry::ScaleFactor;
use crate::video::VideoFile;

/// Default annotation-surface size.
pub const DEFAULT_DISPLAY_WIDTH: u32 = 800;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 450;

/// A still frame plus the geometry it was captured with.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    image: RgbaImage,
    display_width: u32,
    display_height: u32,
    scale: ScaleFactor,
    timestamp_secs: f64,
}

impl CapturedFrame {
    /// Wrap an already-decoded still shown on a `display_width` x
    /// `display_height` surface.
    pub fn from_image(
        image: RgbaImage,
        display_width: u32,
        display_height: u32,
        timestamp_secs: f64,
    ) -> Result<Self, PipelineError> {
        let (native_width, native_height) = image.dimensions();
        if native_height == 0 || display_height == 0 {
            return Err(PipelineError::MediaNotReady(format!(
                "frame is {native_width}x{native_height}"
            )));
        }
        let scale = ScaleFactor::between(native_width, display_width).ok_or_else(|| {
            PipelineError::MediaNotReady(format!(
                "frame is {native_width}x{native_height}, surface is {display_width}x{display_height}"
            ))
        })?;
        Ok(Self {
            image,
            display_width,
            display_height,
            scale,
            timestamp_secs,
        })
    }

    /// The still at native resolution.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    /// Display → source factor, fixed for the lifetime of this frame.
    pub fn scale(&self) -> ScaleFactor {
        self.scale
    }

    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_secs
    }
}

/// Captures stills for a fixed annotation-surface size.
#[derive(Debug, Clone, Copy)]
pub struct FrameCapture {
    display_width: u32,
    display_height: u32,
}

impl Default for FrameCapture {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_WIDTH, DEFAULT_DISPLAY_HEIGHT)
    }
}

impl FrameCapture {
    pub fn new(display_width: u32, display_height: u32) -> Self {
        Self {
            display_width,
            display_height,
        }
    }

    /// Capture the frame at `timestamp_secs`.
    ///
    /// Fails with [`PipelineError::MediaNotReady`] and captures nothing
    /// when the video does not (yet) report a native size.
    pub async fn capture(
        &self,
        video: &VideoFile,
        timestamp_secs: f64,
    ) -> Result<CapturedFrame, PipelineError> {
        let probe = ffmpeg::probe_video(video.path()).await.map_err(not_ready)?;
        let Some((width, height)) = probe.native_dimensions() else {
            return Err(PipelineError::MediaNotReady(format!(
                "{} reports no video dimensions",
                video.file_name()
            )));
        };

        let timestamp_secs = match probe.duration_secs() {
            Some(d) if d > 0.0 => timestamp_secs.clamp(0.0, d),
            _ => timestamp_secs.max(0.0),
        };

        // Scratch space, removed when `scratch` drops.
        let scratch = tempfile::tempdir().map_err(|e| PipelineError::Unknown(e.to_string()))?;
        let still_path = scratch.path().join("frame.png");
        ffmpeg::extract_frame_png(video.path(), &still_path, timestamp_secs)
            .await
            .map_err(not_ready)?;

        let bytes = tokio::fs::read(&still_path)
            .await
            .map_err(|e| not_ready(e.into()))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| not_ready(e.into()))?
            .to_rgba8();

        if image.dimensions() != (width, height) {
            tracing::warn!(
                probed = %format!("{width}x{height}"),
                decoded = %format!("{}x{}", image.width(), image.height()),
                "Extracted frame size differs from probed size",
            );
        }

        let frame = CapturedFrame::from_image(
            image,
            self.display_width,
            self.display_height,
            timestamp_secs,
        )?;

        tracing::info!(
            file = %video.file_name(),
            native_width = frame.native_size().0,
            native_height = frame.native_size().1,
            scale = frame.scale().value(),
            timestamp_secs,
            "Frame captured",
        );

        Ok(frame)
    }
}

fn not_ready(e: FfmpegError) -> PipelineError {
    match e {
        FfmpegError::VideoNotFound(_) => ValidationError::NoVideoFile.into(),
        other => PipelineError::MediaNotReady(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn scale_is_native_over_display_width() {
        let frame = CapturedFrame::from_image(RgbaImage::new(1280, 720), 800, 450, 0.0).unwrap();
        assert_eq!(frame.native_size(), (1280, 720));
        assert_eq!(frame.display_size(), (800, 450));
        assert!((frame.scale().value() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn empty_image_is_not_ready() {
        assert_matches!(
            CapturedFrame::from_image(RgbaImage::new(0, 0), 800, 450, 0.0),
            Err(PipelineError::MediaNotReady(_))
        );
    }

    #[tokio::test]
    async fn capture_of_missing_video_fails_validation() {
        let video = VideoFile::from_parts(std::path::Path::new("/no/such/clip.mp4"), 10).unwrap();
        let err = FrameCapture::default().capture(&video, 0.0).await.unwrap_err();
        assert_eq!(err, PipelineError::Validation(ValidationError::NoVideoFile));
    }
}
