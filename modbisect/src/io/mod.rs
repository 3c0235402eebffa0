//! I/O helpers for modbisect commands.

pub mod config;
pub mod jar;
pub mod paths;
pub mod progress;
