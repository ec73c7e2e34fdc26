//! Rendering of command results.

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Print `value` as JSON, or as `key: value` lines from `rows`.
pub fn render<T: Serialize>(
    format: OutputFormat,
    value: &T,
    rows: &[(&str, String)],
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Plain => {
            let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, val) in rows {
                println!("{key:<width$}  {val}");
            }
        }
    }
    Ok(())
}

/// Render an epoch-milliseconds timestamp, `-` when unset.
pub fn millis(ts: i64) -> String {
    if ts <= 0 { "-".into() } else { ts.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_timestamp_is_dash() {
        assert_eq!(millis(0), "-");
        assert_eq!(millis(1_700_000_000_000), "1700000000000");
    }
}
