//! CLI command implementations.
//!
//! Every command writes machine-readable JSON to stdout; logs and progress go
//! to stderr through `tracing`.

pub mod cancel;
pub mod control;
pub mod oneshot;
pub mod search;
pub mod status;

use std::io::Write;

use anyhow::{Context, Result};
use splunk_jobs::{CreateJobOptions, ResultsReader};
use tokio::io::AsyncBufRead;

/// Write every remaining record of `reader` as one JSON object per line.
///
/// Each line is `{"type": ..., "data": ...}`; row fields sit under `data`.
///
/// Stops after `limit` result rows when `limit > 0`. Returns the number of rows written.
pub async fn write_records<R, W>(reader: &mut ResultsReader<R>, out: &mut W, limit: u64) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut rows = 0u64;
    while let Some(record) = reader.next_record().await? {
        let is_row = record.as_result().is_some();
        serde_json::to_writer(&mut *out, &record).context("failed to encode record")?;
        out.write_all(b"\n").context("failed to write output")?;
        if is_row {
            rows += 1;
            if limit > 0 && rows >= limit {
                break;
            }
        }
    }
    out.flush().context("failed to flush output")?;
    Ok(rows)
}

/// Creation options from the shared time-bound flags.
pub fn time_bounds(earliest: Option<String>, latest: Option<String>) -> CreateJobOptions {
    let mut options = CreateJobOptions::new();
    if let Some(earliest) = earliest {
        options = options.earliest_time(earliest);
    }
    if let Some(latest) = latest {
        options = options.latest_time(latest);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use splunk_jobs::testing::generators::ResultsXmlGenerator;

    #[tokio::test]
    async fn test_write_records_as_json_lines() {
        let xml = ResultsXmlGenerator::new()
            .with_fields(["host"])
            .with_row_count(3)
            .with_message("INFO", "done")
            .generate();
        let mut reader = ResultsReader::open(xml.as_bytes()).await.unwrap();
        let mut out = Vec::new();

        let rows = write_records(&mut reader, &mut out, 2).await.unwrap();
        assert_eq!(rows, 2);

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "message");
        assert_eq!(lines[0]["data"]["text"], "done");
        assert_eq!(lines[1]["type"], "result");
        assert_eq!(lines[1]["data"]["host"], "host-0");
    }

    #[test]
    fn test_time_bounds() {
        let options = time_bounds(Some("-1h".to_string()), None);
        assert_eq!(options.earliest_time.as_deref(), Some("-1h"));
        assert_eq!(options.latest_time, None);
    }
}
