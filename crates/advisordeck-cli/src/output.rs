use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    data: &'a Value,
    /// "live" when the backend answered, "fallback" otherwise.
    origin: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: &'a Vec<String>,
}

pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    let envelope = Envelope {
        data: &result.data,
        origin: result.origin,
        warnings: &result.warnings,
    };
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut handle, &envelope)?;
    } else {
        serde_json::to_writer(&mut handle, &envelope)?;
    }
    writeln!(handle)?;
    Ok(())
}
