//! Gantry CI Core
//!
//! Core domain types, traits, and error handling for Gantry CI.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates.

pub mod error;
pub mod keys;
pub mod ports;
pub mod report;
pub mod work;

pub use error::{Error, Result};
pub use keys::*;
