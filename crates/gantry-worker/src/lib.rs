//! The worker half of the system: claims queued items, runs the checkout
//! tooling, and streams its output into the shared ledger.

pub mod checkout;
pub mod config;
pub mod worker;
pub mod writer;

pub use checkout::GitCheckout;
pub use config::WorkerConfig;
pub use worker::Worker;
pub use writer::LedgerWriter;
