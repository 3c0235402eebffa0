//! Manifest extraction from mod archives.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

/// Archive entry holding the mod manifest.
pub const MANIFEST_ENTRY: &str = "fabric.mod.json";

/// Reads the embedded manifest document out of a mod package.
///
/// `Ok(None)` means the package carries no manifest, which is not an error.
pub trait ManifestSource {
    fn extract(&self, package: &Path) -> Result<Option<Vec<u8>>>;
}

/// Reads [`MANIFEST_ENTRY`] from a zip/jar archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct JarManifestSource;

impl ManifestSource for JarManifestSource {
    fn extract(&self, package: &Path) -> Result<Option<Vec<u8>>> {
        let file =
            File::open(package).with_context(|| format!("open archive {}", package.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("read archive {}", package.display()))?;
        let mut entry = match archive.by_name(MANIFEST_ENTRY) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                debug!(path = %package.display(), "archive has no manifest");
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("locate {} in {}", MANIFEST_ENTRY, package.display())
                });
            }
        };
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("inflate {} in {}", MANIFEST_ENTRY, package.display()))?;
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_jar;

    #[test]
    fn extracts_manifest_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sodium.jar");
        let manifest = br#"{"id":"sodium","version":"1.0"}"#;
        write_jar(&path, &[(MANIFEST_ENTRY, manifest.as_slice())]).expect("write jar");

        let bytes = JarManifestSource.extract(&path).expect("extract");
        assert_eq!(bytes.as_deref(), Some(manifest.as_slice()));
    }

    #[test]
    fn archive_without_manifest_yields_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("library.jar");
        write_jar(&path, &[("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".as_slice())])
            .expect("write jar");

        assert!(JarManifestSource.extract(&path).expect("extract").is_none());
    }

    #[test]
    fn non_archive_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.jar");
        std::fs::write(&path, b"not a zip").expect("write");

        assert!(JarManifestSource.extract(&path).is_err());
    }
}
