//! Deterministic, pure logic shared by the registry and the search engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod bisect;
pub mod closure;
pub mod manifest;
pub mod types;
