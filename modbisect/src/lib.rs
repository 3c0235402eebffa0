//! Bisection search for the one mod that breaks a modded game install.
//!
//! The user repeatedly tests the game with half of the remaining suspects
//! disabled and reports whether the problem persists. The architecture keeps
//! a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (manifest parsing, requirement
//!   closure, midpoint split, verdict folding). No I/O.
//! - **[`io`]**: Side-effecting helpers (config, progress snapshot, archive
//!   reading, default paths).
//!
//! [`registry`] owns the mods directory and performs the actual enable/disable
//! renames; [`engine`] drives the search through the [`registry::ModToggler`]
//! seam; [`cli`] implements the commands.

pub mod cli;
pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod registry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
