//! Multipart payload of one video submission.

use reqwest::multipart::{Form, Part};

use speedtrap_core::error::PipelineError;
use speedtrap_core::settings::DetectionConfig;
use speedtrap_core::video::VideoFile;
use speedtrap_core::workspace::{AnnotationWorkspace, ScaledZones};
use speedtrap_core::zone::ZoneId;

/// A validated submission: the video plus every text field of the form.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    video: VideoFile,
    fields: Vec<(&'static str, String)>,
}

impl SubmissionRequest {
    /// Validate the workspace and assemble the request. Performs no I/O.
    pub fn from_workspace(workspace: &AnnotationWorkspace) -> Result<Self, PipelineError> {
        let (video, zones) = workspace.prepare()?;
        Self::new(video.clone(), &zones, &workspace.settings)
    }

    pub fn new(
        video: VideoFile,
        zones: &ScaledZones,
        settings: &DetectionConfig,
    ) -> Result<Self, PipelineError> {
        settings.check()?;

        let encode = |points: &Vec<[i64; 2]>| {
            serde_json::to_string(points).map_err(|e| PipelineError::Unknown(e.to_string()))
        };

        let mut fields = vec![
            (ZoneId::Entry.form_field(), encode(&zones.entry)?),
            (ZoneId::Exit.form_field(), encode(&zones.exit)?),
        ];
        fields.extend(settings.form_fields());

        Ok(Self { video, fields })
    }

    pub fn video(&self) -> &VideoFile {
        &self.video
    }

    /// Text fields in form order.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Read the video and build the multipart body.
    pub async fn into_form(self) -> Result<Form, PipelineError> {
        let bytes = tokio::fs::read(self.video.path())
            .await
            .map_err(|e| PipelineError::Transport(format!("failed to read video: {e}")))?;

        let part = Part::bytes(bytes)
            .file_name(self.video.file_name().to_string())
            .mime_str(self.video.mime_type())
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let mut form = Form::new().part("video", part);
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }
}
