//! Expert role definitions and task routing.
//!
//! This module provides the immutable role catalog consulted by the
//! orchestrator.

pub mod catalog;

pub use catalog::{fold_key, Role, RoleCatalog, RoleSummary, TaskType};
