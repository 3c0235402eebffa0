//! Mod registry: discovery, on-disk enable/disable state and dependency closure.
//!
//! A mod is enabled when its package sits at `<name>.jar` and disabled when
//! the same file has been renamed to `<name>.jar.disabled`. The registry never
//! copies or deletes packages; every state change is a single rename.

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::core::closure::requirement_closure;
use crate::core::manifest::ModInfo;
use crate::core::types::ModState;
use crate::io::jar::{JarManifestSource, ManifestSource};

/// File extension of an enabled package.
pub const PACKAGE_EXTENSION: &str = ".jar";
/// Suffix appended to a package's file name to disable it.
pub const DISABLED_SUFFIX: &str = ".disabled";

/// A discovered mod: its manifest plus the canonical (enabled) package path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModEntry {
    pub info: ModInfo,
    pub jar_path: PathBuf,
}

impl ModEntry {
    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn disabled_path(&self) -> PathBuf {
        disabled_path(&self.jar_path)
    }

    /// Current on-disk state. Anything other than "only the disabled form
    /// exists" counts as enabled.
    pub fn state(&self) -> ModState {
        if is_disabled(&self.jar_path) {
            ModState::Disabled
        } else {
            ModState::Enabled
        }
    }
}

/// Counts from the most recent scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Candidate package files found (enabled or disabled).
    pub packages: usize,
    pub loaded: usize,
    /// Packages without a manifest.
    pub skipped: usize,
    /// Unreadable archives or malformed manifests.
    pub failed: usize,
}

/// Effector used by the search engine to realize each iteration.
pub trait ModToggler {
    /// Ids currently enabled on disk, in discovery order.
    fn enabled_ids(&self) -> Vec<String>;
    /// Disable everything outside `keep` and its requirement closure.
    fn disable_all_except(&self, keep: &[String]) -> bool;
    fn enable_all(&self) -> bool;
}

/// Source of truth for which mods exist and whether each is enabled.
#[derive(Debug)]
pub struct ModRegistry<S = JarManifestSource> {
    store_dir: PathBuf,
    source: S,
    mods: Vec<ModEntry>,
    index: HashMap<String, PathBuf>,
    last_scan: ScanSummary,
}

impl ModRegistry<JarManifestSource> {
    /// Registry over a mods directory, reading manifests from jar archives.
    pub fn open(store_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(store_dir, JarManifestSource)
    }
}

impl<S: ManifestSource> ModRegistry<S> {
    /// Create an empty registry. Fails if `store_dir` is not an existing directory.
    pub fn new(store_dir: impl Into<PathBuf>, source: S) -> Result<Self> {
        let store_dir = store_dir.into();
        ensure_directory(&store_dir)?;
        Ok(Self {
            store_dir,
            source,
            mods: Vec::new(),
            index: HashMap::new(),
            last_scan: ScanSummary::default(),
        })
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Point the registry at another directory. Known mods are dropped until
    /// the next scan.
    pub fn set_store_dir(&mut self, store_dir: impl Into<PathBuf>) -> Result<()> {
        let store_dir = store_dir.into();
        ensure_directory(&store_dir)?;
        info!(path = %store_dir.display(), "mods directory changed");
        self.store_dir = store_dir;
        self.mods.clear();
        self.index.clear();
        self.last_scan = ScanSummary::default();
        Ok(())
    }

    pub fn mods(&self) -> &[ModEntry] {
        &self.mods
    }

    pub fn last_scan(&self) -> ScanSummary {
        self.last_scan
    }

    /// Rescan the mods directory, replacing everything known so far.
    ///
    /// Returns true iff at least one mod was loaded. Previous contents are
    /// discarded even when the scan fails.
    pub fn scan(&mut self) -> bool {
        self.mods.clear();
        self.index.clear();
        self.last_scan = ScanSummary::default();

        info!(path = %self.store_dir.display(), "scanning mods");
        let packages = match list_packages(&self.store_dir) {
            Ok(packages) => packages,
            Err(err) => {
                let message = format!("{err:#}");
                error!(path = %self.store_dir.display(), error = %message, "scan failed");
                return false;
            }
        };

        let mut summary = ScanSummary {
            packages: packages.len(),
            ..ScanSummary::default()
        };
        for package in packages {
            match self.load_package(&package) {
                PackageLoad::Loaded(entry) => {
                    summary.loaded += 1;
                    self.insert(entry);
                }
                PackageLoad::NoManifest => summary.skipped += 1,
                PackageLoad::Failed => summary.failed += 1,
            }
        }

        info!(
            loaded = summary.loaded,
            packages = summary.packages,
            skipped = summary.skipped,
            failed = summary.failed,
            "scan finished"
        );
        self.last_scan = summary;
        summary.loaded > 0
    }

    fn load_package(&self, package: &Package) -> PackageLoad {
        let file_path = package.file_path();
        let bytes = match self.source.extract(&file_path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(package = %package.display_name(), "skip: no manifest found");
                return PackageLoad::NoManifest;
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(package = %package.display_name(), error = %message, "skip: unreadable package");
                return PackageLoad::Failed;
            }
        };
        let info = match ModInfo::parse(&bytes) {
            Ok(info) => info,
            Err(err) => {
                error!(package = %package.display_name(), error = %err, "skip: failed to parse manifest");
                return PackageLoad::Failed;
            }
        };
        let status = if package.disabled { "disabled" } else { "ok" };
        info!(
            id = %info.id,
            version = %info.version,
            package = %package.display_name(),
            status,
            "loaded mod"
        );
        PackageLoad::Loaded(ModEntry {
            info,
            jar_path: package.jar_path.clone(),
        })
    }

    /// Last write wins for duplicate ids; the earlier entry keeps its position.
    fn insert(&mut self, entry: ModEntry) {
        let id = entry.id().to_string();
        if let Some(previous) = self.index.get(&id) {
            if previous == &entry.jar_path {
                warn!(id = %id, path = %entry.jar_path.display(), "package present in both enabled and disabled form");
            } else {
                warn!(
                    id = %id,
                    previous = %previous.display(),
                    replacement = %entry.jar_path.display(),
                    "duplicate mod id; later package replaces earlier"
                );
            }
            if let Some(slot) = self.mods.iter_mut().find(|existing| existing.id() == id) {
                *slot = entry.clone();
            }
        } else {
            self.mods.push(entry.clone());
        }
        self.index.insert(id, entry.jar_path);
    }

    pub fn get_by_id(&self, id: &str) -> Option<&ModEntry> {
        self.mods.iter().find(|entry| entry.id() == id)
    }

    pub fn state_of(&self, id: &str) -> Option<ModState> {
        self.get_by_id(id).map(ModEntry::state)
    }

    /// Disable each id. Unknown ids and filesystem errors fail that id only;
    /// the result is true iff every id ended up disabled.
    pub fn disable<I, T>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        ids.into_iter().fold(true, |all_ok, id| {
            self.set_state(id.as_ref(), ModState::Disabled) && all_ok
        })
    }

    /// Enable each id; inverse of [`ModRegistry::disable`].
    pub fn enable<I, T>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        ids.into_iter().fold(true, |all_ok, id| {
            self.set_state(id.as_ref(), ModState::Enabled) && all_ok
        })
    }

    /// Make `keep` and its requirement closure the exact enabled set.
    ///
    /// Known mods in the closure are enabled (a no-op for those already
    /// enabled) before everything else is disabled, so a kept mod never ends
    /// up without a hard dependency.
    pub fn disable_all_except<I, T>(&self, keep: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let keep: Vec<T> = keep.into_iter().collect();
        let required = self.transitive_dependencies_of(keep.iter().map(|id| id.as_ref()));
        let (to_enable, to_disable): (Vec<&str>, Vec<&str>) = self
            .mods
            .iter()
            .map(ModEntry::id)
            .partition(|id| required.contains(*id));
        debug!(
            keep = keep.len(),
            required = required.len(),
            disabling = to_disable.len(),
            "disable all except"
        );
        let enabled = self.enable(to_enable);
        let disabled = self.disable(to_disable);
        enabled && disabled
    }

    pub fn enable_all(&self) -> bool {
        self.enable(self.mods.iter().map(ModEntry::id))
    }

    /// `ids` plus every mod reachable through declared `depends` entries.
    ///
    /// `suggests` entries are not followed. Ids outside the registry are
    /// carried through but never expanded.
    pub fn transitive_dependencies_of<'a, I>(&self, ids: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        requirement_closure(ids, |id| {
            self.get_by_id(id)
                .map(|entry| entry.info.dependency_ids().map(str::to_string).collect())
        })
    }

    pub fn enabled_ids(&self) -> Vec<String> {
        self.ids_in_state(ModState::Enabled)
    }

    pub fn disabled_ids(&self) -> Vec<String> {
        self.ids_in_state(ModState::Disabled)
    }

    /// Rows of `(id, [(dependency id, constraint)])` for mods that declare
    /// hard dependencies, in discovery order.
    pub fn dependency_graph(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.mods
            .iter()
            .filter(|entry| !entry.info.depends.is_empty())
            .map(|entry| {
                let deps = entry
                    .info
                    .depends
                    .iter()
                    .map(|(id, constraint)| (id.clone(), constraint.clone()))
                    .collect();
                (entry.id().to_string(), deps)
            })
            .collect()
    }

    fn ids_in_state(&self, state: ModState) -> Vec<String> {
        self.mods
            .iter()
            .filter(|entry| entry.state() == state)
            .map(|entry| entry.id().to_string())
            .collect()
    }

    fn set_state(&self, id: &str, target: ModState) -> bool {
        let Some(jar_path) = self.index.get(id) else {
            warn!(id = %id, "mod not found");
            return false;
        };
        let disabled = disabled_path(jar_path);
        let (from, to, verb) = match target {
            ModState::Disabled => (jar_path.as_path(), disabled.as_path(), "disabled"),
            ModState::Enabled => (disabled.as_path(), jar_path.as_path(), "enabled"),
        };

        match (from.exists(), to.exists()) {
            (true, true) => {
                error!(
                    id = %id,
                    path = %jar_path.display(),
                    "package exists in both enabled and disabled form"
                );
                false
            }
            (true, false) => match fs::rename(from, to) {
                Ok(()) => {
                    info!(id = %id, "{verb}");
                    true
                }
                Err(err) => {
                    error!(id = %id, from = %from.display(), to = %to.display(), error = %err, "rename failed");
                    false
                }
            },
            (false, true) => {
                debug!(id = %id, "already {verb}");
                true
            }
            (false, false) => {
                error!(id = %id, path = %from.display(), "file not found");
                false
            }
        }
    }
}

impl<S: ManifestSource> ModToggler for ModRegistry<S> {
    fn enabled_ids(&self) -> Vec<String> {
        ModRegistry::enabled_ids(self)
    }

    fn disable_all_except(&self, keep: &[String]) -> bool {
        ModRegistry::disable_all_except(self, keep)
    }

    fn enable_all(&self) -> bool {
        ModRegistry::enable_all(self)
    }
}

/// `<jar path>.disabled`.
pub fn disabled_path(jar_path: &Path) -> PathBuf {
    let mut name = OsString::from(jar_path.as_os_str());
    name.push(DISABLED_SUFFIX);
    PathBuf::from(name)
}

/// Canonical location absent and disabled location present.
pub fn is_disabled(jar_path: &Path) -> bool {
    !jar_path.exists() && disabled_path(jar_path).exists()
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        bail!("mods directory does not exist: {}", dir.display());
    }
    if !dir.is_dir() {
        bail!("path is not a directory: {}", dir.display());
    }
    Ok(())
}

enum PackageLoad {
    Loaded(ModEntry),
    NoManifest,
    Failed,
}

/// A candidate package file in the mods directory.
struct Package {
    /// Canonical enabled path (`.jar`).
    jar_path: PathBuf,
    /// True when found under its `.disabled` name.
    disabled: bool,
}

impl Package {
    fn file_path(&self) -> PathBuf {
        if self.disabled {
            disabled_path(&self.jar_path)
        } else {
            self.jar_path.clone()
        }
    }

    fn display_name(&self) -> String {
        self.jar_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Regular `*.jar` and `*.jar.disabled` files, sorted by file name.
fn list_packages(dir: &Path) -> Result<Vec<Package>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let is_file = entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?
            .is_file();
        if is_file {
            entries.push(entry.path());
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(entries
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            if let Some(stem) = name.strip_suffix(DISABLED_SUFFIX) {
                stem.ends_with(PACKAGE_EXTENSION).then(|| Package {
                    jar_path: path.with_file_name(stem),
                    disabled: true,
                })
            } else {
                name.ends_with(PACKAGE_EXTENSION).then_some(Package {
                    jar_path: path,
                    disabled: false,
                })
            }
        })
        .collect())
}
