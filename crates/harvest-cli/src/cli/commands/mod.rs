//! CLI command handlers, one per file.

mod collect;
mod drain;
mod due;
mod run;
mod status;

pub use collect::run_collect;
pub use drain::run_drain;
pub use due::run_due;
pub use run::run_cycle;
pub use status::run_status;
