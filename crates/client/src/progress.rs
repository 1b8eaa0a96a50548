//! Background driver for a simulated progress value.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use speedtrap_core::progress::{ProgressModel, ProgressProfile};

/// Ticks a [`ProgressModel`] on its own task and publishes each new
/// value until stopped or saturated.
///
/// Dropping the ticker stops it.
pub struct ProgressTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn spawn<F>(profile: ProgressProfile, publish: F) -> Self
    where
        F: Fn(u8) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut model = ProgressModel::new(profile);
            let start = tokio::time::Instant::now() + profile.interval;
            let mut ticker = tokio::time::interval_at(start, profile.interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let more = model.tick();
                        publish(model.value());
                        if !more {
                            tracing::debug!(value = model.value(), "Progress simulation saturated");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop ticking and wait for the task to exit. No value is published
    /// after this returns.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
