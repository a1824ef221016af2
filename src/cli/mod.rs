//! Command-line interface
//!
//! - explain: print the per-partition queries of a request
//! - check-config: validate an engine config file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, explain, plan, run, run_command, QueryRequest};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json, write_error, write_response};
