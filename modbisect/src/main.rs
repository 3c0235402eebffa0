//! Find the one mod that breaks a modded game install.
//!
//! Each `start`/`success`/`failure` invocation renames half of the remaining
//! suspects to `*.jar.disabled`, and the user tests the game in between.
//! Search progress is saved to `progress.json`, so the search survives
//! restarts of both this tool and the game.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use modbisect::cli::{self, CliContext};
use modbisect::core::types::Verdict;
use modbisect::exit_codes;
use modbisect::io::config::load_config;
use modbisect::io::paths::AppPaths;
use modbisect::logging;

#[derive(Parser)]
#[command(
    name = "modbisect",
    version,
    about = "Bisection search for the mod that breaks your game"
)]
struct Cli {
    /// Config file (default: `<config dir>/modbisect/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mods directory, overriding the configured or detected one.
    #[arg(long, global = true)]
    mods_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the mods directory and print every mod found.
    Scan,
    /// List mods with their enabled state and dependencies.
    List,
    /// Print the hard dependency graph.
    Deps,
    /// Show the full metadata of one mod.
    Info {
        /// Mod id.
        id: String,
        /// Print the manifest document as JSON.
        #[arg(long)]
        raw: bool,
    },
    /// Start a search: disable the first half of the enabled mods.
    Start,
    /// Report that the problem is gone with the current set.
    Success,
    /// Report that the problem persists with the current set.
    Failure,
    /// Show the saved search's progress.
    Status,
    /// Show the search result and re-enable all mods.
    Stop,
    /// Re-enable all mods and forget the saved search.
    Reset,
    /// Remember a mods directory in the config file.
    SetPath {
        /// Directory containing the mod jars.
        dir: PathBuf,
    },
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let paths = AppPaths::platform_default();
    let config_path = cli.config.unwrap_or_else(|| paths.config_path.clone());
    let config = load_config(&config_path)?;
    logging::init(&config.log_level);
    debug!(config = %config_path.display(), "config loaded");

    let ctx = CliContext::new(&paths, config_path, config, cli.mods_dir);
    match cli.command {
        Command::Scan => cli::scan(&ctx),
        Command::List => cli::list(&ctx),
        Command::Deps => cli::deps(&ctx),
        Command::Info { id, raw } => cli::info(&ctx, &id, raw),
        Command::Start => cli::start(&ctx),
        Command::Success => cli::report(&ctx, Verdict::Success),
        Command::Failure => cli::report(&ctx, Verdict::Failure),
        Command::Status => cli::status(&ctx),
        Command::Stop => cli::stop(&ctx),
        Command::Reset => cli::reset(&ctx),
        Command::SetPath { dir } => cli::set_path(&ctx, &dir),
    }
}
