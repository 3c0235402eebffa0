//! Stable exit codes for modbisect CLI commands.

/// Command succeeded; a search may be awaiting the next verdict.
pub const OK: i32 = 0;
/// Command failed: bad arguments, missing directory, no search in progress, or other errors.
pub const INVALID: i32 = 1;
/// The search finished with exactly one culprit.
pub const FOUND: i32 = 2;
/// The search finished without a single culprit (or had too few mods).
pub const INCONCLUSIVE: i32 = 3;
