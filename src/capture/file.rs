//! File saving functionality for snips.

use super::types::PersistError;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Subfolder of the pictures directory that receives snips.
pub const DEFAULT_SUBFOLDER: &str = "openweb_images";

/// Configuration for file saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSaveConfig {
    /// Directory to save snips to.
    pub save_directory: PathBuf,
    /// Filename prefix; the millisecond timestamp is appended.
    pub filename_prefix: String,
}

impl Default for FileSaveConfig {
    fn default() -> Self {
        Self {
            save_directory: default_save_directory(),
            filename_prefix: "snip".to_string(),
        }
    }
}

/// `<pictures>/openweb_images`, falling back to the home directory when the
/// platform has no pictures folder.
pub fn default_save_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_SUBFOLDER)
}

/// `<prefix>_<unix ms>.png`, plus `-<n>` when `attempt > 0`.
pub fn generate_filename(prefix: &str, timestamp_millis: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}_{}.png", prefix, timestamp_millis)
    } else {
        format!("{}_{}-{}.png", prefix, timestamp_millis, attempt)
    }
}

/// Ensure the save directory exists, creating it (and parents) if necessary.
pub fn ensure_directory_exists(directory: &Path) -> Result<PathBuf, PersistError> {
    if !directory.exists() {
        log::info!("Creating snip directory: {}", directory.display());
        fs::create_dir_all(directory).map_err(|source| PersistError::CreateDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
    }

    Ok(directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf()))
}

/// Save image bytes to a new, uniquely named file.
///
/// Never overwrites: when the timestamped name is taken (two snips in the
/// same millisecond) a numeric suffix is appended.
///
/// # Returns
/// Path to the saved file
pub fn save_snip(image_data: &[u8], config: &FileSaveConfig) -> Result<PathBuf, PersistError> {
    const MAX_SUFFIX: u32 = 1000;

    let directory = ensure_directory_exists(&config.save_directory)?;
    let timestamp = Utc::now().timestamp_millis();

    for attempt in 0..MAX_SUFFIX {
        let file_path =
            directory.join(generate_filename(&config.filename_prefix, timestamp, attempt));

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("{} already exists, trying next suffix", file_path.display());
                continue;
            }
            Err(source) => {
                return Err(PersistError::Write {
                    path: file_path,
                    source,
                });
            }
        };

        log::info!(
            "Saving snip to: {} ({} bytes)",
            file_path.display(),
            image_data.len()
        );

        let write_err = |source| PersistError::Write {
            path: file_path.clone(),
            source,
        };
        file.write_all(image_data).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&file_path, Permissions::from_mode(0o600)).map_err(write_err)?;
        }

        return Ok(file_path);
    }

    Err(PersistError::Write {
        path: directory.join(generate_filename(&config.filename_prefix, timestamp, 0)),
        source: std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name after {} attempts", MAX_SUFFIX),
        ),
    })
}

/// Expand tilde (~) in path strings.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}
