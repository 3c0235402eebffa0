//! CLI command implementations.
//!
//! Every command is a single pass: the search state lives in the progress
//! snapshot between invocations, and the mods directory is rescanned each
//! time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::core::types::{ModState, SearchState, Verdict};
use crate::engine::SearchEngine;
use crate::exit_codes;
use crate::io::config::{AppConfig, write_config};
use crate::io::paths::{AppPaths, MODS_DIR_NAME, detect_mods_dir, expand_home};
use crate::io::progress::{
    SearchProgress, clear_progress, load_progress, write_progress,
};
use crate::registry::{ModEntry, ModRegistry};

/// Resolved settings shared by all commands.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: AppConfig,
    pub progress_path: PathBuf,
    /// `--mods-dir` from the command line.
    pub mods_dir_override: Option<PathBuf>,
}

impl CliContext {
    pub fn new(
        paths: &AppPaths,
        config_path: PathBuf,
        config: AppConfig,
        mods_dir_override: Option<PathBuf>,
    ) -> Self {
        let progress_path = config
            .progress_path
            .clone()
            .unwrap_or_else(|| paths.progress_path.clone());
        Self {
            config_path,
            config,
            progress_path,
            mods_dir_override,
        }
    }

    /// `--mods-dir`, then the configured directory, then auto-detection.
    pub fn resolve_mods_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self
            .mods_dir_override
            .clone()
            .or_else(|| self.config.mods_dir.clone())
        {
            return Ok(dir);
        }
        detect_mods_dir().context(
            "could not detect a mods directory; pass --mods-dir or run `modbisect set-path <dir>`",
        )
    }
}

/// Open and scan a registry, failing when nothing could be loaded.
fn scanned_registry(dir: &Path) -> Result<ModRegistry> {
    let mut registry = ModRegistry::open(dir)?;
    if !registry.scan() {
        bail!("no mods loaded from {}", dir.display());
    }
    Ok(registry)
}

/// Scan and print every loaded mod.
pub fn scan(ctx: &CliContext) -> Result<i32> {
    let dir = ctx.resolve_mods_dir()?;
    println!("Scanning mods in: {}", dir.display());
    let registry = scanned_registry(&dir)?;
    for entry in registry.mods() {
        let status = match entry.state() {
            ModState::Enabled => "[OK]      ",
            ModState::Disabled => "[DISABLED]",
        };
        println!(
            "  {} {} v{} ({})",
            status,
            entry.id(),
            entry.info.version,
            file_name(&entry.jar_path)
        );
    }
    let summary = registry.last_scan();
    println!(
        "\nLoaded {} mods from {} packages ({} without manifest, {} failed)",
        summary.loaded, summary.packages, summary.skipped, summary.failed
    );
    Ok(exit_codes::OK)
}

/// List mods with their state and hard dependencies.
pub fn list(ctx: &CliContext) -> Result<i32> {
    let registry = scanned_registry(&ctx.resolve_mods_dir()?)?;
    println!("=== Loaded Mods ===");
    for entry in registry.mods() {
        let mut line = format!(
            "{} {} v{}",
            entry.state().label(),
            entry.id(),
            entry.info.version
        );
        if !entry.info.depends.is_empty() {
            let deps: Vec<&str> = entry.info.dependency_ids().collect();
            line.push_str(&format!(" (depends on: {})", deps.join(", ")));
        }
        println!("{line}");
    }
    Ok(exit_codes::OK)
}

/// Print the hard dependency graph.
pub fn deps(ctx: &CliContext) -> Result<i32> {
    let registry = scanned_registry(&ctx.resolve_mods_dir()?)?;
    println!("=== Dependency Graph ===");
    for (id, deps) in registry.dependency_graph() {
        println!("{id} depends on:");
        for (dep, constraint) in deps {
            println!("  -> {dep} ({constraint})");
        }
    }
    Ok(exit_codes::OK)
}

/// Print the full metadata of one mod.
///
/// With `raw`, prints the manifest document as pretty JSON instead.
pub fn info(ctx: &CliContext, id: &str, raw: bool) -> Result<i32> {
    let registry = scanned_registry(&ctx.resolve_mods_dir()?)?;
    let entry = registry
        .get_by_id(id)
        .with_context(|| format!("mod not found: {id}"))?;
    if raw {
        println!("{}", entry.info.raw_json);
    } else {
        print_mod_info(entry);
    }
    Ok(exit_codes::OK)
}

fn print_mod_info(entry: &ModEntry) {
    let info = &entry.info;
    println!("=== Mod Info ===");
    println!("ID: {}", info.id);
    println!("Name: {}", info.name);
    println!("Version: {}", info.version);
    println!("State: {}", entry.state().label().trim());
    println!("Path: {}", entry.jar_path.display());
    println!("Environment: {}", info.environment);
    if !info.description.is_empty() {
        println!("Description: {}", info.description);
    }
    if !info.authors.is_empty() {
        println!("Authors: {}", info.authors.join(", "));
    }
    for (label, value) in [
        ("Homepage", info.homepage()),
        ("Sources", info.sources()),
        ("Issues", info.issues()),
    ] {
        if let Some(value) = value {
            println!("{label}: {value}");
        }
    }
    if !info.depends.is_empty() {
        println!("Dependencies:");
        for (dep, constraint) in &info.depends {
            println!("  - {dep} ({constraint})");
        }
    }
    if !info.suggests.is_empty() {
        println!("Suggests:");
        for (dep, constraint) in &info.suggests {
            println!("  - {dep} ({constraint})");
        }
    }
}

/// Start a new search and apply the first split.
pub fn start(ctx: &CliContext) -> Result<i32> {
    // A finished search still leaves its last split on disk until `stop`.
    match load_progress(&ctx.progress_path)? {
        Some(progress) if progress.is_active => bail!(
            "a search is already in progress ({}); run `modbisect stop` or `modbisect reset` first",
            ctx.progress_path.display()
        ),
        Some(_) => bail!(
            "the previous search has finished but mods are still disabled; run `modbisect stop` first"
        ),
        None => {}
    }
    let dir = ctx.resolve_mods_dir()?;
    let registry = scanned_registry(&dir)?;
    let mut engine = SearchEngine::new(&registry);
    engine.start_search();
    info!(state = %engine.state(), "search start requested");

    // Too few mods: nothing was toggled, so there is nothing to resume.
    if engine.state() == SearchState::InProgress {
        save(ctx, &engine.snapshot(&dir))?;
    }
    Ok(print_outcome(&engine, &registry))
}

/// Fold a verdict into the saved search.
pub fn report(ctx: &CliContext, verdict: Verdict) -> Result<i32> {
    let progress = load_active_progress(&ctx.progress_path)?;
    let dir = PathBuf::from(&progress.store_location);
    let registry = scanned_registry(&dir)?;
    let mut engine = SearchEngine::new(&registry);
    engine.restore(&progress);

    if !engine.report_result(verdict) {
        bail!("verdict rejected: search is {}", engine.state());
    }
    save(ctx, &engine.snapshot(&dir))?;
    Ok(print_outcome(&engine, &registry))
}

/// Print the saved search's progress.
pub fn status(ctx: &CliContext) -> Result<i32> {
    let Some(progress) = load_progress(&ctx.progress_path)? else {
        println!("No search in progress.");
        return Ok(exit_codes::OK);
    };
    let registry = ModRegistry::open(&progress.store_location)?;
    let mut engine = SearchEngine::new(&registry);
    engine.restore(&progress);

    print!("{}", engine.progress_report());
    println!("Mods directory: {}", progress.store_location);
    println!("Saved at: {}", progress.timestamp);
    if engine.state() == SearchState::InProgress {
        print_id_list("Suspects", engine.suspects());
        print_id_list("Currently disabled", engine.currently_disabled());
    }
    Ok(terminal_exit_code(engine.state()))
}

/// Show the result of the saved search, then re-enable everything.
pub fn stop(ctx: &CliContext) -> Result<i32> {
    let Some(progress) = load_progress(&ctx.progress_path)? else {
        println!("No search in progress.");
        return Ok(exit_codes::OK);
    };
    let dir = PathBuf::from(&progress.store_location);
    let registry = scanned_registry(&dir)?;
    let mut engine = SearchEngine::new(&registry);
    engine.restore(&progress);

    let code = match engine.state() {
        SearchState::Completed => {
            println!("Problematic mod: {}", engine.culprits().join(", "));
            exit_codes::FOUND
        }
        SearchState::Failed => {
            println!("Search ended without a single culprit.");
            exit_codes::INCONCLUSIVE
        }
        _ => {
            println!(
                "Search stopped after {} iteration(s) with {} suspect(s) left:",
                engine.iteration(),
                engine.suspects().len()
            );
            for id in engine.suspects() {
                println!("  - {id}");
            }
            exit_codes::OK
        }
    };

    let restored = engine.reset();
    clear_progress(&ctx.progress_path)?;
    println!("All mods re-enabled.");
    if !restored {
        bail!("some mods could not be re-enabled; see log output");
    }
    Ok(code)
}

/// Re-enable every mod and forget any saved search.
pub fn reset(ctx: &CliContext) -> Result<i32> {
    let dir = match load_progress(&ctx.progress_path)? {
        Some(progress) if !progress.store_location.is_empty() => {
            PathBuf::from(progress.store_location)
        }
        _ => ctx.resolve_mods_dir()?,
    };
    let registry = scanned_registry(&dir)?;
    let mut engine = SearchEngine::new(&registry);
    let restored = engine.reset();
    clear_progress(&ctx.progress_path)?;
    if !restored {
        bail!("some mods could not be re-enabled; see log output");
    }
    println!("All mods re-enabled in {}", dir.display());
    Ok(exit_codes::OK)
}

/// Remember a mods directory, given either a game instance root (containing
/// `mods/`) or the `mods` directory itself. A leading `~` is expanded.
pub fn set_path(ctx: &CliContext, dir: &Path) -> Result<i32> {
    let dir = resolve_instance_mods_dir(&expand_home(dir))?;
    // Validates the directory the same way the registry does.
    ModRegistry::open(&dir)?;
    let mut config = ctx.config.clone();
    config.mods_dir = Some(dir.clone());
    write_config(&ctx.config_path, &config)?;
    println!("Mods directory set to: {}", dir.display());
    println!("Run `modbisect scan` to load mods from the new directory.");
    Ok(exit_codes::OK)
}

fn resolve_instance_mods_dir(dir: &Path) -> Result<PathBuf> {
    let nested = dir.join(MODS_DIR_NAME);
    if nested.is_dir() {
        return Ok(nested);
    }
    if dir.is_dir() && dir.file_name().is_some_and(|name| name == MODS_DIR_NAME) {
        return Ok(dir.to_path_buf());
    }
    bail!(
        "could not find a '{MODS_DIR_NAME}' directory in {}; pass a game instance (containing '{MODS_DIR_NAME}') or the '{MODS_DIR_NAME}' directory itself",
        dir.display()
    )
}

fn load_active_progress(path: &Path) -> Result<SearchProgress> {
    match load_progress(path)? {
        Some(progress) if progress.is_active => Ok(progress),
        Some(_) => bail!("the saved search has already finished; run `modbisect stop` to see the result"),
        None => bail!("no search in progress; run `modbisect start` first"),
    }
}

fn save(ctx: &CliContext, progress: &SearchProgress) -> Result<()> {
    debug!(path = %ctx.progress_path.display(), "saving progress");
    write_progress(&ctx.progress_path, progress)
}

/// Print what the user should do next and map the state to an exit code.
fn print_outcome(engine: &SearchEngine<'_, ModRegistry>, registry: &ModRegistry) -> i32 {
    match engine.state() {
        SearchState::InProgress => {
            println!("=== Iteration {} ===", engine.iteration());
            println!("Suspects remaining: {}", engine.suspects().len());
            println!(
                "Disabled {} mod(s) (keeping {} enabled):",
                engine.currently_disabled().len(),
                registry.enabled_ids().len()
            );
            for id in engine.currently_disabled() {
                println!("  - {id}");
            }
            println!();
            println!("Please test the game now, then report the result:");
            println!("  - problem GONE     -> modbisect success");
            println!("  - problem PERSISTS -> modbisect failure");
        }
        SearchState::Completed => {
            println!("=== Search Complete ===");
            println!("Problematic mod identified: {}", engine.culprits().join(", "));
            println!("Run `modbisect stop` to re-enable all mods.");
        }
        SearchState::Failed => {
            println!("=== Search Failed ===");
            if engine.iteration() == 0 {
                println!("Not enough enabled mods to bisect (need at least 2).");
            } else {
                println!("Could not identify a single problematic mod.");
                println!("Possible reasons:");
                println!("  - Multiple mods causing the issue together");
                println!("  - Problem is not mod-related");
            }
            println!("Run `modbisect stop` to re-enable all mods.");
        }
        SearchState::NotStarted => {
            println!("No search in progress.");
        }
    }
    terminal_exit_code(engine.state())
}

fn terminal_exit_code(state: SearchState) -> i32 {
    match state {
        SearchState::Completed => exit_codes::FOUND,
        SearchState::Failed => exit_codes::INCONCLUSIVE,
        SearchState::NotStarted | SearchState::InProgress => exit_codes::OK,
    }
}

fn print_id_list(label: &str, ids: &[String]) {
    println!("{label}:");
    for id in ids {
        println!("  - {id}");
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ModStoreFixture;

    fn context(store: &ModStoreFixture, state_dir: &Path) -> CliContext {
        let paths = AppPaths::new(state_dir);
        CliContext::new(
            &paths,
            paths.config_path.clone(),
            AppConfig::default(),
            Some(store.dir().to_path_buf()),
        )
    }

    fn active_progress(ctx: &CliContext) -> bool {
        load_progress(&ctx.progress_path)
            .expect("load")
            .is_some_and(|progress| progress.is_active)
    }

    #[test]
    fn override_beats_config_mods_dir() {
        let store = ModStoreFixture::new();
        let state = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(&store, state.path());
        ctx.config.mods_dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(ctx.resolve_mods_dir().expect("resolve"), store.dir());

        ctx.mods_dir_override = None;
        assert_eq!(
            ctx.resolve_mods_dir().expect("resolve"),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn progress_path_honors_config_override() {
        let state = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(state.path());
        let config = AppConfig {
            progress_path: Some(state.path().join("custom.json")),
            ..AppConfig::default()
        };
        let ctx = CliContext::new(&paths, paths.config_path.clone(), config, None);
        assert_eq!(ctx.progress_path, state.path().join("custom.json"));
    }

    #[test]
    fn start_then_verdicts_find_culprit_and_persist_progress() {
        let store = ModStoreFixture::new()
            .with_mod("a", &[])
            .with_mod("b", &[])
            .with_mod("c", &[])
            .with_mod("d", &[]);
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());

        assert_eq!(start(&ctx).expect("start"), exit_codes::OK);
        assert!(active_progress(&ctx));
        assert!(start(&ctx).is_err(), "second start must be rejected");

        assert_eq!(report(&ctx, Verdict::Success).expect("success"), exit_codes::OK);
        assert_eq!(
            report(&ctx, Verdict::Failure).expect("failure"),
            exit_codes::FOUND
        );
        let saved = load_progress(&ctx.progress_path)
            .expect("load")
            .expect("present");
        assert!(!saved.is_active);
        assert_eq!(saved.suspects, vec!["b".to_string()]);
        assert!(report(&ctx, Verdict::Success).is_err());

        assert_eq!(stop(&ctx).expect("stop"), exit_codes::FOUND);
        assert!(!ctx.progress_path.exists());
        assert!(store.jar_path("a").exists());
    }

    #[test]
    fn report_without_search_is_rejected() {
        let store = ModStoreFixture::new().with_mod("a", &[]);
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());
        assert!(report(&ctx, Verdict::Failure).is_err());
    }

    #[test]
    fn start_with_one_mod_is_inconclusive() {
        let store = ModStoreFixture::new().with_mod("solo", &[]);
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());
        assert_eq!(start(&ctx).expect("start"), exit_codes::INCONCLUSIVE);
        assert!(!active_progress(&ctx));
    }

    #[test]
    fn reset_reenables_and_clears_progress() {
        let store = ModStoreFixture::new()
            .with_mod("a", &[])
            .with_mod("b", &[])
            .with_mod("c", &[]);
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());

        start(&ctx).expect("start");
        assert!(store.disabled_path("a").exists());
        assert_eq!(reset(&ctx).expect("reset"), exit_codes::OK);
        assert!(store.jar_path("a").exists());
        assert!(!ctx.progress_path.exists());
    }

    #[test]
    fn start_after_finished_search_is_rejected_until_stop() {
        let store = ModStoreFixture::new()
            .with_mod("a", &[])
            .with_mod("b", &[])
            .with_mod("c", &[])
            .with_mod("d", &[]);
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());

        start(&ctx).expect("start");
        report(&ctx, Verdict::Success).expect("success");
        assert_eq!(
            report(&ctx, Verdict::Failure).expect("failure"),
            exit_codes::FOUND
        );
        assert!(store.disabled_path("a").exists());

        assert!(start(&ctx).is_err());
        let saved = load_progress(&ctx.progress_path)
            .expect("load")
            .expect("present");
        assert_eq!(saved.suspects, vec!["b".to_string()]);
        assert!(store.disabled_path("a").exists());

        stop(&ctx).expect("stop");
        assert_eq!(start(&ctx).expect("restart"), exit_codes::OK);
        let restarted = load_progress(&ctx.progress_path)
            .expect("load")
            .expect("present");
        assert_eq!(restarted.all_ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn info_prints_known_mod_in_both_forms() {
        let store = ModStoreFixture::new().with_mod("a", &["b"]).with_mod("b", &[]);
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());

        assert_eq!(info(&ctx, "a", false).expect("info"), exit_codes::OK);
        assert_eq!(info(&ctx, "a", true).expect("raw info"), exit_codes::OK);
        assert!(info(&ctx, "missing", true).is_err());
    }

    #[test]
    fn set_path_resolves_instance_root_to_mods_dir() {
        let store = ModStoreFixture::new();
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());
        let instance = tempfile::tempdir().expect("tempdir");
        let mods = instance.path().join("mods");
        std::fs::create_dir(&mods).expect("mkdir mods");

        set_path(&ctx, instance.path()).expect("set instance root");
        let saved = crate::io::config::load_config(&ctx.config_path).expect("load");
        assert_eq!(saved.mods_dir, Some(mods.clone()));

        set_path(&ctx, &mods).expect("set mods dir");
        let saved = crate::io::config::load_config(&ctx.config_path).expect("load");
        assert_eq!(saved.mods_dir, Some(mods));
    }

    #[test]
    fn set_path_rejects_directory_without_mods() {
        let store = ModStoreFixture::new();
        let state = tempfile::tempdir().expect("tempdir");
        let ctx = context(&store, state.path());

        assert!(set_path(&ctx, store.dir()).is_err());
        assert!(set_path(&ctx, &store.dir().join("mods")).is_err());
        assert!(!ctx.config_path.exists());
    }
}
