/// Daemon mode implementation: background service that captures on a hotkey trigger
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::{
    CaptureError, CaptureManager, CaptureOutcome, dependencies::CaptureDependencies,
    launcher::SystemCommandRunner,
};
use crate::config::Config;

const LOOP_TICK: Duration = Duration::from_millis(100);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Commands accepted on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonCommand {
    Capture,
    Cancel,
    Quit,
}

impl DaemonCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "capture" | "snip" | "c" => Some(Self::Capture),
            "cancel" | "x" => Some(Self::Cancel),
            "quit" | "exit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Flags set by trigger sources and consumed by the daemon loop.
#[derive(Clone, Default)]
struct Triggers {
    capture: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    quit: Arc<AtomicBool>,
}

impl Triggers {
    fn raise(&self, command: DaemonCommand) {
        let flag = match command {
            DaemonCommand::Capture => &self.capture,
            DaemonCommand::Cancel => &self.cancel,
            DaemonCommand::Quit => &self.quit,
        };
        // Release pairs with the Acquire swap in the daemon loop
        flag.store(true, Ordering::Release);
    }
}

pub struct Daemon {
    manager: CaptureManager,
    triggers: Triggers,
    /// Owns the workers the manager runs on; `None` when driven by an outside runtime.
    runtime: Option<tokio::runtime::Runtime>,
}

impl Daemon {
    pub fn new(config: &Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;

        let dependencies = CaptureDependencies {
            runner: Arc::new(SystemCommandRunner::new(config.launch_grace())),
            ..CaptureDependencies::default()
        };
        let manager = CaptureManager::with_dependencies(
            runtime.handle(),
            config.capture_request(),
            dependencies,
        );

        Ok(Self {
            manager,
            triggers: Triggers::default(),
            runtime: Some(runtime),
        })
    }

    /// Daemon driven by an existing manager (and its runtime).
    pub fn with_manager(manager: CaptureManager) -> Self {
        Self {
            manager,
            triggers: Triggers::default(),
            runtime: None,
        }
    }

    /// Hotkey entry point: start a capture unless one is already running.
    pub fn handle_hotkey(&self) -> Result<(), CaptureError> {
        info!("Hotkey triggered - opening snipping tool");
        match self.manager.request_capture() {
            Ok(()) => Ok(()),
            Err(CaptureError::Busy) => {
                warn!("Capture already in progress - ignoring hotkey");
                Err(CaptureError::Busy)
            }
            Err(e) => {
                error!("Could not start capture: {}", e);
                Err(e)
            }
        }
    }

    /// Run daemon with signal and stdin triggers until asked to quit.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting snipkeep daemon");
        #[cfg(unix)]
        {
            info!("Send SIGUSR1 to capture (e.g., pkill -SIGUSR1 snipkeep), SIGUSR2 to cancel");
            spawn_signal_listener(self.triggers.clone())?;
        }
        info!("Type 'capture', 'cancel' or 'quit' on stdin to control the daemon");
        spawn_stdin_listener(self.triggers.clone());

        info!("Daemon ready - waiting for hotkey");

        // Main daemon loop
        loop {
            if self.triggers.quit.load(Ordering::Acquire) {
                info!("Quit requested - exiting daemon");
                break;
            }
            self.tick();
            thread::sleep(LOOP_TICK);
        }

        self.shutdown();
        Ok(())
    }

    /// Handle pending triggers and report a finished capture, if any.
    fn tick(&self) {
        if self.triggers.capture.swap(false, Ordering::Acquire) {
            self.handle_hotkey().ok();
        }
        if self.triggers.cancel.swap(false, Ordering::Acquire) && !self.manager.cancel() {
            debug!("Cancel requested but no capture is running");
        }
        if let Some(outcome) = self.manager.try_take_result() {
            report_outcome(&outcome);
        }
    }

    fn shutdown(&mut self) {
        info!("Daemon shutting down");
        if self.manager.cancel() {
            let deadline = Instant::now() + SHUTDOWN_GRACE;
            while self.manager.is_busy() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(20));
            }
            if let Some(outcome) = self.manager.take_result() {
                report_outcome(&outcome);
            }
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
    }
}

fn report_outcome(outcome: &CaptureOutcome) {
    match outcome {
        CaptureOutcome::Saved(path) => info!("Screenshot saved: {}", path.display()),
        CaptureOutcome::NothingCaptured => warn!("No new snip found - nothing saved"),
        CaptureOutcome::Cancelled => info!("Capture cancelled"),
        CaptureOutcome::Failed(message) => error!("Capture failed: {}", message),
    }
}

#[cfg(unix)]
fn spawn_signal_listener(triggers: Triggers) -> Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGUSR1, SIGUSR2, SIGTERM, SIGINT])
        .context("Failed to register signal handler")?;

    // Runs until process exit; the iterator has no resources needing cleanup.
    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR1 => {
                    info!("Received SIGUSR1 - capture requested");
                    triggers.raise(DaemonCommand::Capture);
                }
                SIGUSR2 => {
                    info!("Received SIGUSR2 - cancel requested");
                    triggers.raise(DaemonCommand::Cancel);
                }
                SIGTERM | SIGINT => {
                    info!(
                        "Received {} - initiating graceful shutdown",
                        if sig == SIGTERM { "SIGTERM" } else { "SIGINT" }
                    );
                    triggers.raise(DaemonCommand::Quit);
                }
                _ => warn!("Received unexpected signal: {}", sig),
            }
        }
    });
    Ok(())
}

fn spawn_stdin_listener(triggers: Triggers) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    debug!("Stopped reading stdin: {}", e);
                    return;
                }
            };
            match DaemonCommand::parse(&line) {
                Some(command) => triggers.raise(command),
                None if line.trim().is_empty() => {}
                None => warn!("Unknown command '{}'", line.trim()),
            }
        }
        debug!("stdin closed - only signals can control the daemon now");
    });
}
