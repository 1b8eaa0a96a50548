//! Source video file checks mirrored from the analysis service.

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, ValidationError};

/// Container formats the analysis service accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Upload ceiling enforced by the analysis service (200 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// A video file selected by the operator, checked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFile {
    path: PathBuf,
    file_name: String,
    extension: String,
    size: u64,
}

impl VideoFile {
    /// Stat `path` and check extension and size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| ValidationError::NoVideoFile)?;
        if !metadata.is_file() {
            return Err(ValidationError::NoVideoFile.into());
        }
        Ok(Self::from_parts(path, metadata.len())?)
    }

    /// Build from an already-known size (no filesystem access).
    pub fn from_parts(path: &Path, size: u64) -> Result<Self, ValidationError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::NoVideoFile)?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ValidationError::UnsupportedFormat(file_name));
        }

        if size > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge {
                size,
                max: MAX_UPLOAD_BYTES,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            extension,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// MIME type for the multipart `video` part.
    pub fn mime_type(&self) -> &'static str {
        match self.extension.as_str() {
            "mp4" => "video/mp4",
            "avi" => "video/x-msvideo",
            "mov" => "video/quicktime",
            "mkv" => "video/x-matroska",
            _ => "application/octet-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        let v = VideoFile::from_parts(Path::new("/tmp/Road.MP4"), 1024).unwrap();
        assert_eq!(v.file_name(), "Road.MP4");
        assert_eq!(v.mime_type(), "video/mp4");

        let v = VideoFile::from_parts(Path::new("clip.mkv"), 1).unwrap();
        assert_eq!(v.mime_type(), "video/x-matroska");
    }

    #[test]
    fn rejects_unknown_extension() {
        assert_matches!(
            VideoFile::from_parts(Path::new("clip.webm"), 1),
            Err(ValidationError::UnsupportedFormat(name)) if name == "clip.webm"
        );
        assert_matches!(
            VideoFile::from_parts(Path::new("noext"), 1),
            Err(ValidationError::UnsupportedFormat(_))
        );
    }

    #[test]
    fn rejects_oversized_upload() {
        assert_matches!(
            VideoFile::from_parts(Path::new("big.mp4"), MAX_UPLOAD_BYTES + 1),
            Err(ValidationError::FileTooLarge { .. })
        );
        assert!(VideoFile::from_parts(Path::new("edge.mp4"), MAX_UPLOAD_BYTES).is_ok());
    }

    #[tokio::test]
    async fn missing_file_is_no_video_file() {
        let err = VideoFile::open("/definitely/not/here.mp4").await.unwrap_err();
        assert_eq!(err, PipelineError::Validation(ValidationError::NoVideoFile));
    }

    #[tokio::test]
    async fn opens_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("road.mov");
        tokio::fs::write(&path, b"not really a movie").await.unwrap();
        let v = VideoFile::open(&path).await.unwrap();
        assert_eq!(v.size(), 18);
        assert_eq!(v.mime_type(), "video/quicktime");
    }
}
