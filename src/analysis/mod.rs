//! Answer analysis: structured extraction and consolidation.

pub mod consolidator;
pub mod extract;
pub mod task_fields;

pub use consolidator::{dedup_findings, ConsolidationLimits, Consolidator};
pub use extract::{extract_structured, Extracted};
