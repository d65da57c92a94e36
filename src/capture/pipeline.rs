use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use tokio::{task, time};

use crate::capture::{
    cancel::CancelToken,
    dependencies::{CaptureDependencies, CaptureFileSaver},
    file::FileSaveConfig,
    launcher::{CaptureToolLauncher, LaunchStrategy, default_strategies},
    poller::{PollHandle, PollOptions},
    probe::ClipboardImageProbe,
    types::{CaptureError, CaptureStatus, PersistError},
};

/// Everything a single capture flow needs besides its dependencies.
#[derive(Clone)]
pub struct CaptureRequest {
    pub strategies: Vec<LaunchStrategy>,
    pub poll: PollOptions,
    /// Pause between launching the tool and the first clipboard sample.
    pub settle_delay: Duration,
    pub save_config: FileSaveConfig,
}

impl CaptureRequest {
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            poll: PollOptions::default(),
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
            save_config: FileSaveConfig::default(),
        }
    }
}

impl fmt::Debug for CaptureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureRequest")
            .field("strategies", &self.strategies.len())
            .field("poll", &self.poll)
            .field("settle_delay", &self.settle_delay)
            .field("save_directory", &self.save_config.save_directory)
            .finish()
    }
}

/// Run one capture: baseline, launch, settle, wait for a new image, save.
///
/// `on_status` observes the `Launching` and `WaitingForImage` transitions.
///
/// # Errors
/// - [`CaptureError::LaunchFailed`] before the clipboard is ever polled
/// - [`CaptureError::NoNewImage`] when the user produced no snip in time
/// - [`CaptureError::Probe`] when the clipboard cannot be read
/// - [`CaptureError::Persist`] when the image cannot be written
/// - [`CaptureError::Cancelled`] when `cancel` fires before the tool starts, during the
///   settle delay, or during the wait
pub async fn run_capture_flow(
    request: CaptureRequest,
    dependencies: Arc<CaptureDependencies>,
    mut cancel: CancelToken,
    on_status: impl Fn(CaptureStatus) + Send + Sync,
) -> Result<PathBuf, CaptureError> {
    log::info!("Starting capture flow: {:?}", request);

    let probe = ClipboardImageProbe::new(
        Arc::clone(&dependencies.clipboard),
        dependencies.fingerprint,
    );

    // The baseline must be read before the tool can write to the clipboard.
    on_status(CaptureStatus::Launching);
    let baseline = probe
        .read_async()
        .await
        .map_err(CaptureError::Probe)?
        .map(|image| image.fingerprint);
    match &baseline {
        Some(fingerprint) => log::debug!("Baseline clipboard image {:?}", fingerprint),
        None => log::debug!("Clipboard holds no image; any image will count as new"),
    }

    if cancel.is_cancelled() {
        log::info!("Capture cancelled before launch");
        return Err(CaptureError::Cancelled);
    }

    let launcher = CaptureToolLauncher::new(request.strategies, Arc::clone(&dependencies.runner));
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CaptureError::Cancelled),
        launched = launcher.launch() => launched?,
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CaptureError::Cancelled),
        _ = time::sleep(request.settle_delay) => {}
    }

    on_status(CaptureStatus::WaitingForImage);
    let poll = PollHandle::spawn(probe, baseline, request.poll);
    let image = tokio::select! {
        biased;
        // Dropping the pending join drops the handle, which stops the poll timer.
        _ = cancel.cancelled() => return Err(CaptureError::Cancelled),
        outcome = poll.join() => match outcome {
            Ok(image) => image,
            Err(err) => {
                let err = CaptureError::from(err);
                if err.is_soft() {
                    log::warn!("No new snip found: {}", err);
                }
                return Err(err);
            }
        },
    };

    log::info!("Obtained snip from clipboard ({} bytes)", image.bytes.len());
    let path = save_image(
        Arc::clone(&dependencies.saver),
        image.bytes,
        request.save_config,
    )
    .await?;
    log::info!("Snip saved: {}", path.display());
    Ok(path)
}

async fn save_image(
    saver: Arc<dyn CaptureFileSaver>,
    image_data: Vec<u8>,
    config: FileSaveConfig,
) -> Result<PathBuf, CaptureError> {
    task::spawn_blocking(move || saver.save(&image_data, &config))
        .await
        .map_err(|e| {
            CaptureError::Persist(PersistError::Write {
                path: PathBuf::new(),
                source: std::io::Error::other(format!("Save task failed: {}", e)),
            })
        })?
        .map_err(CaptureError::from)
}
