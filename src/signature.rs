//! Granule file signature schemes.
//!
//! The ingestion history compares an opaque content signature to decide
//! whether a granule changed since it was last ingested. The scheme is
//! injected so deployments can choose what "unchanged" means.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::PipelineError;

/// Computes an opaque content signature for a granule file.
pub trait SignatureScheme: Send + Sync {
    fn signature(&self, path: &Path) -> Result<String, PipelineError>;
}

/// Any `Fn(&Path) -> Result<String>` closure is a signature scheme.
impl<F> SignatureScheme for F
where
    F: Fn(&Path) -> Result<String, PipelineError> + Send + Sync,
{
    fn signature(&self, path: &Path) -> Result<String, PipelineError> {
        self(path)
    }
}

/// SHA-256 over the full file content, hex encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Signature;

impl SignatureScheme for Sha256Signature {
    fn signature(&self, path: &Path) -> Result<String, PipelineError> {
        let bytes = fs::read(path).map_err(|e| {
            PipelineError::PipelineRunning(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_same_content_same_signature() {
        let mut a = NamedTempFile::new().unwrap();
        let mut b = NamedTempFile::new().unwrap();
        a.write_all(b"granule bytes").unwrap();
        b.write_all(b"granule bytes").unwrap();

        let scheme = Sha256Signature;
        assert_eq!(
            scheme.signature(a.path()).unwrap(),
            scheme.signature(b.path()).unwrap()
        );
    }

    #[test]
    fn test_content_change_changes_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"version one").unwrap();
        let before = Sha256Signature.signature(file.path()).unwrap();

        file.write_all(b" and more").unwrap();
        let after = Sha256Signature.signature(file.path()).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Sha256Signature.signature(Path::new("/nonexistent/granule.nc"));
        assert!(matches!(result, Err(PipelineError::PipelineRunning(_))));
    }
}
