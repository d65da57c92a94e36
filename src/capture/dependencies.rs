use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;

use crate::capture::{
    clipboard,
    file::{self, FileSaveConfig},
    launcher::{self, LaunchStrategy},
    probe,
    types::{ExecError, Fingerprint, PersistError},
};

/// Abstraction over reading the clipboard image as encoded PNG bytes.
pub trait ClipboardReader: Send + Sync {
    fn read_image(&self) -> Result<Option<Vec<u8>>, String>;
}

/// Abstraction over running one launch strategy's command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, strategy: &LaunchStrategy) -> Result<(), ExecError>;
}

/// Abstraction over file saving for captured screenshots.
pub trait CaptureFileSaver: Send + Sync {
    fn save(&self, image_data: &[u8], config: &FileSaveConfig) -> Result<PathBuf, PersistError>;
}

/// Content hash used to compare clipboard images.
pub type Fingerprinter = fn(&[u8]) -> Fingerprint;

/// Bundle of dependencies used by the capture pipeline. Each component can be mocked in tests.
#[derive(Clone)]
pub struct CaptureDependencies {
    pub clipboard: Arc<dyn ClipboardReader>,
    pub runner: Arc<dyn CommandRunner>,
    pub saver: Arc<dyn CaptureFileSaver>,
    pub fingerprint: Fingerprinter,
}

impl Default for CaptureDependencies {
    fn default() -> Self {
        Self {
            clipboard: Arc::new(SystemClipboard),
            runner: Arc::new(launcher::SystemCommandRunner::default()),
            saver: Arc::new(DefaultFileSaver),
            fingerprint: probe::sha256_fingerprint,
        }
    }
}

struct SystemClipboard;
struct DefaultFileSaver;

impl ClipboardReader for SystemClipboard {
    fn read_image(&self) -> Result<Option<Vec<u8>>, String> {
        clipboard::read_image_png()
    }
}

impl CaptureFileSaver for DefaultFileSaver {
    fn save(&self, image_data: &[u8], config: &FileSaveConfig) -> Result<PathBuf, PersistError> {
        file::save_snip(image_data, config)
    }
}
