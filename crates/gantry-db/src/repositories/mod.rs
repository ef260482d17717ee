//! PostgreSQL implementations of the core port traits.

mod catalog;
mod ledger;
mod work_queue;

pub use catalog::PgMigrationCatalog;
pub use ledger::PgLogLedger;
pub use work_queue::PgWorkQueue;
