//! docdex-engine
//!
//! Tantivy-backed implementation of the `SearchEngine` collaborator trait:
//! one concrete index per directory, a JSON alias store with atomic swap,
//! boosted multi-field search with degrade-safe highlighting, and
//! term-dictionary tag aggregation.

pub mod alias;
pub mod engine;
pub mod mapping;

pub use engine::TantivyEngine;
