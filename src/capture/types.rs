//! Data types for the snip acquisition pipeline.

use std::{fmt, path::PathBuf, time::Duration};
use thiserror::Error;

/// Fixed-length content digest of encoded clipboard image bytes.
///
/// Only ever compared for equality; equal fingerprints mean the clipboard
/// content is considered unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_bytes(digest: [u8; 32]) -> Self {
        Self(digest)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to tell digests apart in logs.
        write!(f, "Fingerprint({})", &hex::encode(&self.0[..6]))
    }
}

/// Encoded (PNG) clipboard image together with its fingerprint.
///
/// Lives only for the duration of one read; it is persisted as bytes, never as a struct.
#[derive(Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub bytes: Vec<u8>,
    pub fingerprint: Fingerprint,
}

impl fmt::Debug for ClipboardImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardImage")
            .field("len", &self.bytes.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Failure of a single process invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("failed to spawn `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("`{program}` exited with {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: String,
        stderr: String,
    },

    #[error("failed waiting for `{program}`: {message}")]
    Wait { program: String, message: String },
}

/// Diagnostic for one launch strategy that did not start the capture tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub label: String,
    pub error: ExecError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.error)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchError {
    /// Every strategy failed; one entry per attempt, in declared order.
    #[error("could not open capture tool ({} strategies failed: {})", .failures.len(), join_failures(.failures))]
    AllStrategiesFailed { failures: Vec<StrategyFailure> },
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Terminal outcomes of a clipboard wait other than finding an image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("no new clipboard image within {}ms", .waited.as_millis())]
    Timeout { waited: Duration },

    #[error("clipboard read failed: {0}")]
    Probe(String),

    #[error("clipboard wait cancelled")]
    Cancelled,
}

/// Filesystem failures while storing a captured image.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by a capture flow.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    LaunchFailed(#[from] LaunchError),

    /// Soft failure: the user most likely closed the snip UI without selecting anything.
    #[error("no new screenshot on the clipboard after {}ms", .waited.as_millis())]
    NoNewImage { waited: Duration },

    #[error("clipboard read failed: {0}")]
    Probe(String),

    #[error("failed to save screenshot: {0}")]
    Persist(#[from] PersistError),

    #[error("capture cancelled")]
    Cancelled,

    #[error("a capture is already in progress")]
    Busy,

    #[error("capture manager not running")]
    ManagerStopped,
}

impl CaptureError {
    /// Expected outcomes that should not be presented as application errors.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NoNewImage { .. } | Self::Cancelled)
    }
}

impl From<PollError> for CaptureError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Timeout { waited } => Self::NoNewImage { waited },
            PollError::Probe(message) => Self::Probe(message),
            PollError::Cancelled => Self::Cancelled,
        }
    }
}

/// Outcome of a capture request handled by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved(PathBuf),
    NothingCaptured,
    Cancelled,
    Failed(String),
}

/// Status of the capture manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    /// Baseline taken, capture tool being started.
    Launching,
    /// Tool launched; polling the clipboard.
    WaitingForImage,
    Saved(PathBuf),
    NothingCaptured,
    Cancelled,
    Failed(String),
}

impl CaptureStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Launching | Self::WaitingForImage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(label: &str) -> StrategyFailure {
        StrategyFailure {
            label: label.to_string(),
            error: ExecError::Spawn {
                program: label.to_string(),
                message: "not found".to_string(),
            },
        }
    }

    #[test]
    fn launch_error_lists_every_strategy() {
        let err = LaunchError::AllStrategiesFailed {
            failures: vec![failure("uri"), failure("exe")],
        };
        let message = err.to_string();
        assert!(message.contains("2 strategies failed"));
        assert!(message.contains("uri: failed to spawn `uri`"));
        assert!(message.contains("exe: failed to spawn `exe`"));
    }

    #[test]
    fn poll_timeout_maps_to_soft_no_new_image() {
        let err = CaptureError::from(PollError::Timeout {
            waited: Duration::from_millis(30_000),
        });
        assert!(matches!(err, CaptureError::NoNewImage { .. }));
        assert!(err.is_soft());
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn probe_and_persist_errors_are_hard() {
        assert!(!CaptureError::from(PollError::Probe("boom".into())).is_soft());
        let persist = PersistError::Write {
            path: PathBuf::from("/tmp/x.png"),
            source: std::io::Error::other("disk full"),
        };
        assert!(!CaptureError::from(persist).is_soft());
        assert!(CaptureError::Cancelled.is_soft());
    }

    #[test]
    fn fingerprint_displays_as_hex() {
        let fp = Fingerprint::from_bytes([0xab; 32]);
        assert_eq!(fp.to_string(), "ab".repeat(32));
        assert_eq!(format!("{fp:?}"), "Fingerprint(abababababab)");
    }
}
