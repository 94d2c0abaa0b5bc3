//! Public facade crate for `websift`.
//!
//! This crate contains no IO or backend-specific logic.
//! It re-exports the backend-agnostic types, traits and pipeline from `websift-core`.

pub use websift_core::*;
