use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc;

use crate::capture::{
    cancel::{CancelToken, CancelTrigger, cancel_pair},
    dependencies::CaptureDependencies,
    pipeline::{CaptureRequest, run_capture_flow},
    types::{CaptureError, CaptureOutcome, CaptureStatus},
};

struct CaptureJob {
    request: CaptureRequest,
    cancel: CancelToken,
}

/// Shared state for managing async capture flows.
///
/// Bridges the synchronous hotkey/daemon loop with the async capture pipeline.
/// At most one capture runs at a time; a request made while another is in
/// flight is rejected with [`CaptureError::Busy`].
#[derive(Clone)]
pub struct CaptureManager {
    /// Channel for sending capture jobs.
    request_tx: mpsc::UnboundedSender<CaptureJob>,
    /// Template for every request.
    request: Arc<CaptureRequest>,
    /// Set from request acceptance until the flow has reported its outcome.
    busy: Arc<AtomicBool>,
    /// Cancels the in-flight flow, if any.
    active: Arc<Mutex<Option<CancelTrigger>>>,
    /// Shared status of the current capture operation.
    status: Arc<Mutex<CaptureStatus>>,
    /// Shared result of the last capture (if any).
    last_result: Arc<Mutex<Option<CaptureOutcome>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CaptureManager {
    /// Create a new capture manager using the real clipboard, processes and filesystem.
    ///
    /// This spawns a background task that runs capture flows.
    ///
    /// # Arguments
    /// * `runtime_handle` - Tokio runtime handle for spawning async tasks
    /// * `request` - Strategies, timings and output location used for every capture
    pub fn new(runtime_handle: &tokio::runtime::Handle, request: CaptureRequest) -> Self {
        Self::with_dependencies(runtime_handle, request, CaptureDependencies::default())
    }

    /// Create a capture manager with custom dependencies (useful for testing).
    pub fn with_dependencies(
        runtime_handle: &tokio::runtime::Handle,
        request: CaptureRequest,
        dependencies: CaptureDependencies,
    ) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<CaptureJob>();
        let busy = Arc::new(AtomicBool::new(false));
        let active = Arc::new(Mutex::new(None));
        let status = Arc::new(Mutex::new(CaptureStatus::Idle));
        let last_result = Arc::new(Mutex::new(None));
        let dependencies = Arc::new(dependencies);

        let busy_clone = busy.clone();
        let active_clone = active.clone();
        let status_clone = status.clone();
        let result_clone = last_result.clone();

        // Spawn background task to handle capture jobs
        runtime_handle.spawn(async move {
            while let Some(job) = request_rx.recv().await {
                log::debug!("Processing capture request");

                let status_updates = status_clone.clone();
                let flow = run_capture_flow(
                    job.request,
                    dependencies.clone(),
                    job.cancel,
                    move |status| *lock(&status_updates) = status,
                )
                .await;

                let (status, outcome) = match flow {
                    Ok(path) => {
                        log::info!("Capture successful: {}", path.display());
                        (
                            CaptureStatus::Saved(path.clone()),
                            CaptureOutcome::Saved(path),
                        )
                    }
                    Err(CaptureError::NoNewImage { waited }) => {
                        log::warn!("Nothing captured within {}ms", waited.as_millis());
                        (CaptureStatus::NothingCaptured, CaptureOutcome::NothingCaptured)
                    }
                    Err(CaptureError::Cancelled) => {
                        log::info!("Capture cancelled");
                        (CaptureStatus::Cancelled, CaptureOutcome::Cancelled)
                    }
                    Err(e) => {
                        let error_message = e.to_string();
                        log::error!("Capture failed: {}", error_message);
                        (
                            CaptureStatus::Failed(error_message.clone()),
                            CaptureOutcome::Failed(error_message),
                        )
                    }
                };

                *lock(&status_clone) = status;
                *lock(&result_clone) = Some(outcome);
                lock(&active_clone).take();
                busy_clone.store(false, Ordering::Release);
            }
        });

        Self {
            request_tx,
            request: Arc::new(request),
            busy,
            active,
            status,
            last_result,
        }
    }

    /// Request a capture.
    ///
    /// This is non-blocking and returns immediately. The capture happens
    /// asynchronously in the background.
    ///
    /// # Errors
    /// - [`CaptureError::Busy`] while another capture is in flight
    /// - [`CaptureError::ManagerStopped`] when the background task is gone
    pub fn request_capture(&self) -> Result<(), CaptureError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::Busy);
        }

        let (trigger, cancel) = cancel_pair();
        *lock(&self.active) = Some(trigger);
        *lock(&self.last_result) = None;
        *lock(&self.status) = CaptureStatus::Launching;

        let job = CaptureJob {
            request: (*self.request).clone(),
            cancel,
        };
        if self.request_tx.send(job).is_err() {
            lock(&self.active).take();
            *lock(&self.status) = CaptureStatus::Failed(CaptureError::ManagerStopped.to_string());
            self.busy.store(false, Ordering::Release);
            return Err(CaptureError::ManagerStopped);
        }

        Ok(())
    }

    /// Cancel the in-flight capture. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(trigger) => {
                log::info!("Cancelling in-flight capture");
                trigger.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Get the current capture status.
    pub fn get_status(&self) -> CaptureStatus {
        lock(&self.status).clone()
    }

    /// Get the result of the last capture and clear it.
    pub fn take_result(&self) -> Option<CaptureOutcome> {
        lock(&self.last_result).take()
    }

    /// Try to get the result without waiting on a contended lock.
    pub fn try_take_result(&self) -> Option<CaptureOutcome> {
        self.last_result.try_lock().ok().and_then(|mut r| r.take())
    }

    /// Reset status to idle unless a capture is running.
    pub fn reset(&self) {
        let mut status = lock(&self.status);
        if !status.is_in_flight() {
            *status = CaptureStatus::Idle;
        }
    }
}

#[cfg(test)]
impl CaptureManager {
    pub(crate) fn with_closed_channel_for_test() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<CaptureJob>();
        drop(rx);
        Self {
            request_tx: tx,
            request: Arc::new(CaptureRequest::default()),
            busy: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(None)),
            status: Arc::new(Mutex::new(CaptureStatus::Idle)),
            last_result: Arc::new(Mutex::new(None)),
        }
    }
}
