//! Clipboard image probe: one read plus a content fingerprint.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::task;

use crate::capture::{
    dependencies::{ClipboardReader, Fingerprinter},
    types::{ClipboardImage, Fingerprint},
};

/// SHA-256 fingerprint of encoded image bytes.
pub fn sha256_fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint::from_bytes(Sha256::digest(bytes).into())
}

/// Reads the clipboard image (if any) and fingerprints it.
#[derive(Clone)]
pub struct ClipboardImageProbe {
    reader: Arc<dyn ClipboardReader>,
    fingerprint: Fingerprinter,
}

impl ClipboardImageProbe {
    pub fn new(reader: Arc<dyn ClipboardReader>, fingerprint: Fingerprinter) -> Self {
        Self {
            reader,
            fingerprint,
        }
    }

    pub fn fingerprint(&self, bytes: &[u8]) -> Fingerprint {
        (self.fingerprint)(bytes)
    }

    /// Blocking read; `Ok(None)` means no image on the clipboard.
    pub fn read(&self) -> Result<Option<ClipboardImage>, String> {
        Ok(self.reader.read_image()?.map(|bytes| ClipboardImage {
            fingerprint: self.fingerprint(&bytes),
            bytes,
        }))
    }

    /// [`read`](Self::read) on the blocking pool, keeping clipboard I/O off the async workers.
    pub async fn read_async(&self) -> Result<Option<ClipboardImage>, String> {
        let probe = self.clone();
        task::spawn_blocking(move || probe.read())
            .await
            .map_err(|e| format!("Clipboard read task failed: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedReader(Mutex<Option<Vec<u8>>>);

    impl ClipboardReader for FixedReader {
        fn read_image(&self) -> Result<Option<Vec<u8>>, String> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(sha256_fingerprint(b"image"), sha256_fingerprint(b"image"));
        assert_ne!(sha256_fingerprint(b"image-a"), sha256_fingerprint(b"image-b"));
        assert_ne!(sha256_fingerprint(b""), sha256_fingerprint(&[0]));
    }

    #[test]
    fn read_attaches_fingerprint_of_bytes() {
        let reader = Arc::new(FixedReader(Mutex::new(Some(b"png".to_vec()))));
        let probe = ClipboardImageProbe::new(reader, sha256_fingerprint);

        let image = probe.read().unwrap().expect("image present");
        assert_eq!(image.bytes, b"png");
        assert_eq!(image.fingerprint, sha256_fingerprint(b"png"));
    }

    #[tokio::test]
    async fn empty_clipboard_reads_as_none() {
        let reader = Arc::new(FixedReader(Mutex::new(None)));
        let probe = ClipboardImageProbe::new(reader, sha256_fingerprint);
        assert!(probe.read_async().await.unwrap().is_none());
    }

    #[test]
    fn injected_fingerprinter_is_used() {
        fn constant(_: &[u8]) -> Fingerprint {
            Fingerprint::from_bytes([7; 32])
        }
        let reader = Arc::new(FixedReader(Mutex::new(Some(b"anything".to_vec()))));
        let probe = ClipboardImageProbe::new(reader, constant);
        assert_eq!(
            probe.read().unwrap().unwrap().fingerprint,
            Fingerprint::from_bytes([7; 32])
        );
    }
}
