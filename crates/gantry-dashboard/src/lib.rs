//! Status dashboard for the work queue.
//!
//! The dashboard is a static HTML page regenerated on demand from the queue
//! and the published artifacts. One row per recent patchset, one column per
//! known job; a cell links to the latest attempt's rendered log and to any
//! earlier attempts.

pub mod builder;
pub mod render;

pub use builder::{Cell, CellStatus, Dashboard, DashboardBuilder, Row};
pub use render::render;
