//! Test-only helpers for building scratch mods directories.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::io::jar::{JarManifestSource, MANIFEST_ENTRY};
use crate::registry::{ModRegistry, disabled_path};

/// Write a jar archive containing `entries` (name, contents).
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        writer
            .start_file(*name, options)
            .with_context(|| format!("start entry {name}"))?;
        writer
            .write_all(contents)
            .with_context(|| format!("write entry {name}"))?;
    }
    writer.finish().context("finish jar")?;
    Ok(())
}

/// Minimal manifest declaring `id` with hard dependencies on `depends`.
pub fn manifest_json(id: &str, depends: &[&str]) -> String {
    let depends: serde_json::Map<String, serde_json::Value> = depends
        .iter()
        .map(|dep| (dep.to_string(), serde_json::Value::from("*")))
        .collect();
    serde_json::json!({
        "id": id,
        "version": "1.0.0",
        "depends": depends,
    })
    .to_string()
}

/// A mods directory in a temp dir, populated with real jar archives.
///
/// Mods written with [`ModStoreFixture::with_mod`] live at `<id>.jar`.
pub struct ModStoreFixture {
    temp: TempDir,
}

impl ModStoreFixture {
    pub fn new() -> Self {
        Self {
            temp: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn jar_path(&self, id: &str) -> PathBuf {
        self.dir().join(format!("{id}.jar"))
    }

    pub fn disabled_path(&self, id: &str) -> PathBuf {
        disabled_path(&self.jar_path(id))
    }

    /// Enabled mod `<id>.jar` depending on `depends`.
    pub fn with_mod(self, id: &str, depends: &[&str]) -> Self {
        let manifest = manifest_json(id, depends);
        write_jar(&self.jar_path(id), &[(MANIFEST_ENTRY, manifest.as_bytes())])
            .expect("write mod jar");
        self
    }

    /// Disabled mod `<id>.jar.disabled` depending on `depends`.
    pub fn with_disabled_mod(self, id: &str, depends: &[&str]) -> Self {
        let manifest = manifest_json(id, depends);
        write_jar(
            &self.disabled_path(id),
            &[(MANIFEST_ENTRY, manifest.as_bytes())],
        )
        .expect("write disabled mod jar");
        self
    }

    /// Jar named `file_name` whose manifest entry holds `manifest` verbatim.
    pub fn with_raw_manifest(self, file_name: &str, manifest: &[u8]) -> Self {
        write_jar(&self.dir().join(file_name), &[(MANIFEST_ENTRY, manifest)])
            .expect("write raw manifest jar");
        self
    }

    /// Jar named `file_name` that carries no mod manifest.
    pub fn with_package_without_manifest(self, file_name: &str) -> Self {
        write_jar(
            &self.dir().join(file_name),
            &[("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".as_slice())],
        )
        .expect("write library jar");
        self
    }

    pub fn write_file(&self, file_name: &str, contents: &[u8]) {
        fs::write(self.dir().join(file_name), contents).expect("write file");
    }

    /// Registry over this directory (not yet scanned).
    pub fn registry(&self) -> ModRegistry<JarManifestSource> {
        ModRegistry::open(self.dir()).expect("open registry")
    }

    /// Registry over this directory, scanned.
    pub fn scanned_registry(&self) -> ModRegistry<JarManifestSource> {
        let mut registry = self.registry();
        assert!(registry.scan(), "fixture scan loaded no mods");
        registry
    }
}

impl Default for ModStoreFixture {
    fn default() -> Self {
        Self::new()
    }
}
