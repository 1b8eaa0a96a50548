#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use speedtrap_client::backend::{LiveBackend, MediaChunk};
use speedtrap_client::source::{ChunkPoll, MediaSource, MediaStream};
use speedtrap_core::error::PipelineError;
use speedtrap_core::result::{LiveResult, Violation};
use speedtrap_core::settings::DetectionConfig;
use speedtrap_core::video::VideoFile;
use speedtrap_core::workspace::ScaledZones;

// ---------------------------------------------------------------------------
// HTTP fixtures
// ---------------------------------------------------------------------------

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A small `.mp4` on disk. Keep the returned dir alive for the test.
pub async fn sample_video() -> (tempfile::TempDir, VideoFile) {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("intersection.mp4");
    tokio::fs::write(&path, b"not really an mp4").await.unwrap();
    let video = VideoFile::open(&path).await.unwrap();
    (dir, video)
}

pub fn sample_zones() -> ScaledZones {
    ScaledZones {
        entry: vec![[16, 16], [160, 16], [160, 160]],
        exit: vec![[320, 320], [480, 320], [480, 480]],
    }
}

pub fn default_settings() -> DetectionConfig {
    DetectionConfig::default()
}

// ---------------------------------------------------------------------------
// Live-capture fakes
// ---------------------------------------------------------------------------

/// Media source that yields a fixed chunk on every poll.
#[derive(Default)]
pub struct ScriptedSource {
    pub refuse: bool,
    /// Fail the stream on this poll (0-based).
    pub fail_on_poll: Option<usize>,
    /// Report the feed as closed on this poll (0-based).
    pub end_on_poll: Option<usize>,
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

#[async_trait]
impl MediaSource for ScriptedSource {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>, PipelineError> {
        if self.refuse {
            return Err(PipelineError::Connection("permission denied".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            polls: 0,
            fail_on_poll: self.fail_on_poll,
            end_on_poll: self.end_on_poll,
            released: Arc::clone(&self.released),
            live: true,
        }))
    }
}

struct ScriptedStream {
    polls: usize,
    fail_on_poll: Option<usize>,
    end_on_poll: Option<usize>,
    released: Arc<AtomicUsize>,
    live: bool,
}

#[async_trait]
impl MediaStream for ScriptedStream {
    async fn poll_chunk(&mut self) -> Result<ChunkPoll, PipelineError> {
        let poll = self.polls;
        self.polls += 1;
        if Some(poll) == self.fail_on_poll {
            return Err(PipelineError::Connection("device unplugged".into()));
        }
        if self.end_on_poll.is_some_and(|end| poll >= end) {
            return Ok(ChunkPoll::Ended);
        }
        Ok(ChunkPoll::Data(vec![poll as u8; 32]))
    }

    async fn release(&mut self) {
        if self.live {
            self.live = false;
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Backend that records what it receives and returns a canned result.
pub struct RecordingBackend {
    pub ingested: Mutex<Vec<u64>>,
    pub fetches: AtomicUsize,
    pub reject_sequence: Option<u64>,
    pub fetch_delay: Duration,
    pub fetch_fails: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            ingested: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            reject_sequence: None,
            fetch_delay: Duration::from_millis(1500),
            fetch_fails: false,
        }
    }
}

impl RecordingBackend {
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn ingested(&self) -> Vec<u64> {
        self.ingested.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiveBackend for RecordingBackend {
    async fn ingest_chunk(&self, chunk: MediaChunk) -> Result<(), PipelineError> {
        if Some(chunk.sequence) == self.reject_sequence {
            return Err(PipelineError::Server {
                status: 503,
                message: "ingest queue full".into(),
            });
        }
        self.ingested.lock().unwrap().push(chunk.sequence);
        Ok(())
    }

    async fn fetch_result(&self) -> Result<LiveResult, PipelineError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.fetch_delay).await;
        if self.fetch_fails {
            return Err(PipelineError::Transport("connection reset".into()));
        }
        Ok(LiveResult {
            success: true,
            message: "Analysis complete. Speed violations detected.".into(),
            violations: Some(vec![Violation {
                plate: "XYZ-1234".into(),
                speed: 75.0,
                timestamp: "10:00:00".into(),
                location: "Main St & 5th Ave".into(),
            }]),
        })
    }
}
