pub mod config;
pub mod error;
pub mod logging;

pub mod checksum;
pub mod collector;
pub mod fetch_head;
pub mod gate;
pub mod ledger;
pub mod object_store;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod task_queue;
pub mod transfer;
pub mod trigger;
pub mod url_model;
