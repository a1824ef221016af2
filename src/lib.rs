//! varquery - a multi-backend variant query execution engine
//!
//! Turns declarative variant filters into backend SQL, runs one query
//! per partition on a bounded worker pool and merges the rows into one
//! cancellable, backpressured stream of variant records.

pub mod backend;
pub mod cli;
pub mod config;
pub mod executor;
pub mod observability;
pub mod planner;
pub mod variant;
