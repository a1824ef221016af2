//! JSON I/O handling for the CLI
//!
//! - Input: one JSON document from a file, or stdin for `-`
//! - Output: one JSON envelope on stdout

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{CliError, CliResult};

/// Read and deserialize a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().lock().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(path)
            .map_err(|e| CliError::io_error(format!("{}: {}", path.display(), e)))?
    };

    if text.trim().is_empty() {
        return Err(CliError::input_invalid(format!("{} is empty", path.display())));
    }
    serde_json::from_str(&text)
        .map_err(|e| CliError::input_invalid(format!("{}: {}", path.display(), e)))
}

/// Write a success envelope to stdout
pub fn write_response<T: Serialize>(data: &T) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&serde_json::to_string(&response)?)
}

/// Write an error envelope to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&serde_json::to_string(&response)?)
}

pub fn write_line(line: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;
    Ok(())
}
