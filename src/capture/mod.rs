//! Snip acquisition for snipkeep.
//!
//! This module provides:
//! - Launching the native snipping tool through a fallback chain
//! - Detecting a new clipboard image by fingerprint comparison
//! - A cancellable, deadline-bounded clipboard wait
//! - Saving the captured image under a unique name

pub mod cancel;
pub mod clipboard;
pub mod dependencies;
pub mod file;
pub mod launcher;
pub mod poller;
pub mod probe;
pub mod types;

mod manager;
mod pipeline;

pub use manager::CaptureManager;
pub use pipeline::{CaptureRequest, run_capture_flow};
pub use types::{
    CaptureError, CaptureOutcome, CaptureStatus, ClipboardImage, ExecError, Fingerprint,
    LaunchError, PersistError, PollError, StrategyFailure,
};
