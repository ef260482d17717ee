//! Log parsing and report generation for Gantry CI.
//!
//! The report builder makes a single pass over one work item's ledger,
//! classifying each line into a tagged event and feeding a small state
//! machine that tracks open upgrade phases and migrations. The output is a
//! structured [`gantry_core::report::Report`] plus an annotated HTML log
//! document, persisted per work item by the artifact store.

pub mod artifacts;
pub mod builder;
pub mod classify;
pub mod publisher;
pub mod render;

pub use artifacts::ArtifactStore;
pub use builder::ReportBuilder;
pub use classify::{clean, CleanEvent, RawEvent};
pub use publisher::Publisher;
