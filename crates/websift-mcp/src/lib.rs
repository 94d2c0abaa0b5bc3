//! `websift` crate (library surface).
//!
//! The primary entrypoint for end users is the `websift` binary (MCP stdio / HTTP).
//! This library module exists to support embedding: the pipeline and its backend
//! clients can be wired without depending on internal crate layout.

pub use websift_core as core;
pub use websift_local as local;
