//! promptgrade-core — Core evaluation engine for LLM-backed functions.
//!
//! This crate defines the fundamental data model (functions, version trees,
//! test sets, evaluation records), the schema transforms that turn an
//! annotated output schema into a strict grading schema, and the grading
//! engine and orchestrator that the rest of the promptgrade system builds on.

pub mod error;
pub mod grading;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod testset;
pub mod traits;
pub mod tree;
