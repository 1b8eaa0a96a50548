//! Media sources for live capture.
//!
//! A [`MediaSource`] hands out one [`MediaStream`] per recording. The
//! stream buffers encoded bytes as they arrive; the capture loop drains
//! the buffer once per chunk interval.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use speedtrap_core::error::PipelineError;

/// Read size for the encoder's stdout.
const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Result of draining a stream's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPoll {
    /// Bytes recorded since the previous poll.
    Data(Vec<u8>),
    /// Nothing new yet.
    Empty,
    /// The source finished; no more data will arrive.
    Ended,
}

/// Something that can be recorded from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquire the underlying device or feed.
    ///
    /// Fails with [`PipelineError::Connection`] when it cannot be opened.
    async fn acquire(&self) -> Result<Box<dyn MediaStream>, PipelineError>;
}

/// One acquired recording stream.
#[async_trait]
pub trait MediaStream: Send {
    /// Take everything buffered since the last call.
    async fn poll_chunk(&mut self) -> Result<ChunkPoll, PipelineError>;

    /// Release the device. Safe to call more than once.
    async fn release(&mut self);
}

/// Records any ffmpeg input (device, file or network feed) as WebM.
#[derive(Debug, Clone)]
pub struct FfmpegSource {
    input: String,
    format: Option<String>,
}

impl FfmpegSource {
    /// * `input` - ffmpeg `-i` argument, e.g. `/dev/video0` or an RTSP URL.
    /// * `format` - optional ffmpeg `-f` demuxer, e.g. `v4l2`.
    pub fn new(input: impl Into<String>, format: Option<String>) -> Self {
        Self {
            input: input.into(),
            format,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        if let Some(format) = &self.format {
            cmd.arg("-f").arg(format);
        }
        cmd.arg("-i")
            .arg(&self.input)
            .args(["-an", "-c:v", "libvpx", "-deadline", "realtime", "-b:v", "1M"])
            .args(["-f", "webm", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl MediaSource for FfmpegSource {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>, PipelineError> {
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| PipelineError::Connection(format!("failed to start ffmpeg: {e}")))?;

        // An input that cannot be opened makes ffmpeg exit right away.
        if let Ok(Some(status)) = child.try_wait() {
            return Err(PipelineError::Connection(format!(
                "ffmpeg exited immediately ({status}) for input '{}'",
                self.input
            )));
        }

        let stream = FfmpegStream::from_child(child)?;
        tracing::info!(input = %self.input, "Media stream acquired");
        Ok(Box::new(stream))
    }
}

struct FfmpegStream {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    rx: mpsc::UnboundedReceiver<Result<Vec<u8>, String>>,
}

impl FfmpegStream {
    /// Start draining the child's stdout into the chunk buffer.
    fn from_child(mut child: Child) -> Result<Self, PipelineError> {
        let mut stdout = child.stdout.take().ok_or_else(|| {
            PipelineError::Connection("ffmpeg stdout was not captured".to_string())
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUFFER_BYTES];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e.to_string()));
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child: Some(child),
            reader: Some(reader),
            rx,
        })
    }

    /// Classify a closed stdout by how ffmpeg exited. A failed exit means
    /// the input could not be opened or was lost.
    async fn exit_outcome(&mut self) -> Result<ChunkPoll, PipelineError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(ChunkPoll::Ended);
        };
        match child.wait().await {
            Ok(status) => stream_end(status.success(), &status.to_string()),
            Err(e) => Err(PipelineError::Connection(format!(
                "failed to read ffmpeg exit status: {e}"
            ))),
        }
    }
}

fn stream_end(success: bool, status: &str) -> Result<ChunkPoll, PipelineError> {
    if success {
        Ok(ChunkPoll::Ended)
    } else {
        Err(PipelineError::Connection(format!("ffmpeg exited with {status}")))
    }
}

#[async_trait]
impl MediaStream for FfmpegStream {
    async fn poll_chunk(&mut self) -> Result<ChunkPoll, PipelineError> {
        let mut data = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(Ok(bytes)) => data.extend_from_slice(&bytes),
                Ok(Err(e)) => {
                    return Err(PipelineError::Connection(format!("media stream failed: {e}")))
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if data.is_empty() {
                        return self.exit_outcome().await;
                    }
                    break;
                }
            }
        }
        Ok(if data.is_empty() {
            ChunkPoll::Empty
        } else {
            ChunkPoll::Data(data)
        })
    }

    async fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "ffmpeg already exited");
            }
            tracing::info!("Media stream released");
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
