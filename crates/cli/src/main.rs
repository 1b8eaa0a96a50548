//! `speedtrap` -- operator CLI for the speed-trap pipeline.
//!
//! Captures a still from a traffic video, draws the entry and exit
//! zones over it, submits the video for analysis, or records a live
//! feed and fetches the consolidated result.
//!
//! # Environment variables
//!
//! | Variable              | Default                 | Description                        |
//! |-----------------------|-------------------------|------------------------------------|
//! | `ANALYSIS_API_URL`    | `http://localhost:5000` | Video analysis service             |
//! | `SUBMIT_TIMEOUT_SECS` | `120`                   | Hard deadline for one submission   |
//! | `PROGRESS_TICK_MS`    | `500`                   | Simulated upload progress cadence  |
//! | `LIVE_API_URL`        | unset                   | Live backend; unset uses the mock  |
//! | `CHUNK_INTERVAL_MS`   | `1000`                  | Live chunk interval                |
//! | `RECORDING_MAX_SECS`  | `10`                    | Live recordings stop after this    |
//! | `DISPLAY_WIDTH`       | `800`                   | Annotation surface width           |
//! | `DISPLAY_HEIGHT`      | `450`                   | Annotation surface height          |

mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use speedtrap_client::backend::{HttpLiveBackend, LiveBackend, MockLiveBackend};
use speedtrap_client::source::FfmpegSource;
use speedtrap_client::{AnalysisApi, ClientConfig, LiveCapture, SubmissionOrchestrator};
use speedtrap_core::annotation::PointerEvent;
use speedtrap_core::error::PipelineError;
use speedtrap_core::frame::FrameCapture;
use speedtrap_core::recorder::RecorderState;
use speedtrap_core::report;
use speedtrap_core::video::VideoFile;
use speedtrap_core::workspace::AnnotationWorkspace;
use speedtrap_core::zone::ZoneId;

use args::{AnnotateArgs, CaptureArgs, Cli, Command, MonitorArgs, SubmitArgs, ZoneArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "speedtrap=info,speedtrap_client=info,speedtrap_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = cli.timeout {
        anyhow::ensure!(secs > 0, "--timeout must be at least 1 second");
        config.submit_timeout = Duration::from_secs(secs);
    }

    let outcome = match cli.command {
        Command::Capture(args) => capture(&config, args).await,
        Command::Annotate(args) => annotate(&config, args).await,
        Command::Submit(args) => submit(&config, args).await,
        Command::Monitor(args) => monitor(&config, args).await,
        Command::Status => status(&config).await,
    };

    // Pipeline failures carry their own operator-facing text.
    if let Err(e) = &outcome {
        if let Some(pipeline) = e.downcast_ref::<PipelineError>() {
            eprintln!("{}", pipeline.user_message());
            std::process::exit(1);
        }
    }
    outcome
}

async fn capture(config: &ClientConfig, args: CaptureArgs) -> anyhow::Result<()> {
    let video = VideoFile::open(&args.video).await?;
    let frame = FrameCapture::new(config.display_width, config.display_height)
        .capture(&video, args.at)
        .await?;

    frame
        .image()
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let (w, h) = frame.native_size();
    println!(
        "{}: {w}x{h} captured at {:.2}s, scale factor {:.4}",
        video.file_name(),
        frame.timestamp_secs(),
        frame.scale().value()
    );
    println!("Wrote {}", args.out.display());
    Ok(())
}

/// Load the video, capture a still and replay the zone points as clicks.
async fn annotated_workspace(
    config: &ClientConfig,
    video: &std::path::Path,
    at: f64,
    zones: &ZoneArgs,
) -> anyhow::Result<AnnotationWorkspace> {
    let mut workspace = AnnotationWorkspace::new();
    let video = VideoFile::open(video).await?;
    let frame = FrameCapture::new(config.display_width, config.display_height)
        .capture(&video, at)
        .await?;
    workspace.load_video(video);
    workspace.install_frame(frame);

    for (zone, points) in [(ZoneId::Entry, &zones.entry), (ZoneId::Exit, &zones.exit)] {
        workspace.set_active_zone(zone);
        for point in &points.0 {
            workspace.handle(PointerEvent::Click(*point));
        }
    }
    Ok(workspace)
}

async fn annotate(config: &ClientConfig, args: AnnotateArgs) -> anyhow::Result<()> {
    let workspace = annotated_workspace(config, &args.video, args.at, &args.zones).await?;
    let image = workspace.render().context("no frame captured to render")?;
    image
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let session = workspace.session();
    println!(
        "Entry zone: {} points, exit zone: {} points",
        session.entry().len(),
        session.exit().len()
    );
    println!("Wrote {}", args.out.display());
    Ok(())
}

async fn submit(config: &ClientConfig, args: SubmitArgs) -> anyhow::Result<()> {
    let mut workspace = annotated_workspace(config, &args.video, args.at, &args.zones).await?;
    workspace.settings = args.detection_config();

    let orchestrator = SubmissionOrchestrator::new(
        AnalysisApi::new(config.api_url.clone()),
        config.submission_settings(),
    );

    let mut status_rx = orchestrator.watch_status();
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let progress = status_rx.borrow_and_update().progress();
            eprint!("\rUploading {}", report::progress_bar(progress, 30));
        }
    });

    let outcome = orchestrator.submit_workspace(&workspace).await;
    printer.abort();
    eprintln!();

    let result = outcome?;
    print!("{}", report::render_processing_result(&result));
    Ok(())
}

async fn monitor(config: &ClientConfig, args: MonitorArgs) -> anyhow::Result<()> {
    let backend: Arc<dyn LiveBackend> = match &config.live_api_url {
        Some(url) => Arc::new(HttpLiveBackend::new(url.clone())),
        None => {
            tracing::warn!("LIVE_API_URL not set, using the mock live backend");
            Arc::new(MockLiveBackend::default())
        }
    };
    let source = Arc::new(FfmpegSource::new(args.input, args.format));
    let live = LiveCapture::new(source, backend, config.live_settings());

    let mut view_rx = live.watch_view();
    live.start().await?;
    println!("Monitoring started. Press Ctrl-C to stop recording.");

    let mut last_state = RecorderState::Recording;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if last_state == RecorderState::Recording => {
                live.stop().await;
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                match view.state {
                    RecorderState::Recording | RecorderState::Processing => {
                        eprint!("\r{}", report::render_recorder_view(&view).trim_end());
                    }
                    _ => {
                        eprintln!();
                        print!("{}", report::render_recorder_view(&view));
                    }
                }
                last_state = view.state;
                if view.state.is_terminal() {
                    break;
                }
            }
        }
    }

    live.shutdown().await;
    Ok(())
}

async fn status(config: &ClientConfig) -> anyhow::Result<()> {
    let api = AnalysisApi::new(config.api_url.clone());
    let status = api.status().await?;
    println!("Service:      {} ({})", status.status, api.api_url());
    println!("Device:       {}", status.device.as_deref().unwrap_or("unknown"));
    let gpu = if status.gpu_available {
        "available"
    } else {
        "not available"
    };
    println!("GPU:          {gpu}");
    println!("Model loaded: {}", status.model_loaded);
    Ok(())
}
