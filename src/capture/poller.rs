//! Waits for a clipboard image whose fingerprint differs from a baseline.
//!
//! There is no usable change notification for clipboard images, so the
//! clipboard is sampled on a fixed interval until a new image shows up, the
//! deadline passes, a read fails, or the owner cancels.

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::capture::{
    cancel::{CancelToken, CancelTrigger, cancel_pair},
    probe::ClipboardImageProbe,
    types::{ClipboardImage, Fingerprint, PollError},
};

/// Shortest sampling interval; smaller values are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of a clipboard wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

/// True when `image` should be treated as a new capture.
///
/// Without a baseline any image counts.
pub fn is_new_image(image: &ClipboardImage, baseline: Option<&Fingerprint>) -> bool {
    baseline.is_none_or(|baseline| image.fingerprint != *baseline)
}

/// Sample the clipboard until a qualifying image appears.
///
/// The first sample is taken one `interval` after the call. Each tick reads
/// the clipboard first and only then checks the deadline, so an image that
/// lands right at the deadline is still picked up.
///
/// # Errors
/// - [`PollError::Timeout`] when the deadline passes without a new image
/// - [`PollError::Probe`] on the first failed clipboard read (no retry)
/// - [`PollError::Cancelled`] when `cancel` fires
pub async fn wait_for_change(
    probe: &ClipboardImageProbe,
    baseline: Option<Fingerprint>,
    options: PollOptions,
    mut cancel: CancelToken,
) -> Result<ClipboardImage, PollError> {
    let interval = options.interval.max(MIN_INTERVAL);
    let started = Instant::now();
    let mut ticker = time::interval_at(started + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Clipboard wait cancelled after {}ms", started.elapsed().as_millis());
                return Err(PollError::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        match probe.read_async().await.map_err(PollError::Probe)? {
            Some(image) if is_new_image(&image, baseline.as_ref()) => {
                log::debug!(
                    "New clipboard image after {}ms ({} bytes)",
                    started.elapsed().as_millis(),
                    image.bytes.len()
                );
                return Ok(image);
            }
            Some(_) => log::trace!("Clipboard image unchanged"),
            None => log::trace!("No image on clipboard yet"),
        }

        let waited = started.elapsed();
        if waited > options.timeout {
            log::debug!("Clipboard wait timed out after {}ms", waited.as_millis());
            return Err(PollError::Timeout { waited });
        }
    }
}

/// A clipboard wait running as its own task.
///
/// Resolves exactly once through [`join`](Self::join). Calling
/// [`cancel`](Self::cancel) or dropping the handle stops the timer.
pub struct PollHandle {
    trigger: CancelTrigger,
    task: JoinHandle<Result<ClipboardImage, PollError>>,
}

impl PollHandle {
    /// Spawn [`wait_for_change`] on the current runtime.
    pub fn spawn(
        probe: ClipboardImageProbe,
        baseline: Option<Fingerprint>,
        options: PollOptions,
    ) -> Self {
        let (trigger, token) = cancel_pair();
        let task =
            tokio::spawn(async move { wait_for_change(&probe, baseline, options, token).await });
        Self { trigger, task }
    }

    pub fn cancel(&self) {
        self.trigger.cancel();
    }

    /// Wait for the outcome.
    pub async fn join(self) -> Result<ClipboardImage, PollError> {
        let Self { trigger, task } = self;
        let outcome = task
            .await
            .map_err(|e| PollError::Probe(format!("Clipboard wait task failed: {}", e)))?;
        drop(trigger);
        outcome
    }
}
