//! Execution engine for vulnlab
//!
//! The engine orchestrates:
//! 1. Diffing - Compute current vs desired state per stage
//! 2. Executing - Apply stages strictly in order, halting on first failure

pub mod executor;

pub use executor::{ExecuteOptions, ExecuteSummary, execute};
