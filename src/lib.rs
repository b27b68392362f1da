// Crate root library declaration and module exports.
pub mod apply;
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod dates;
pub mod error;
pub mod job;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod reconcile;
pub mod summary;
