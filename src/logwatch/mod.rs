//! Append-only NDJSON session log consumption.
//!
//! The log file is an external contract: one JSON object per line,
//! minimally `timestamp`, `instance`, `event`, appended in
//! chronological order by the agent orchestration process. This module
//! only consumes it, never produces it. Malformed lines (partial
//! writes) are skipped, never fatal.

pub mod cost;

use std::io::SeekFrom;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::event::LogEvent;
use crate::Result;

/// Read the whole log once, returning every event that parses, in
/// file order. A missing file yields an empty list.
///
/// # Errors
///
/// Returns `AppError::Io` when the file exists but cannot be read.
pub async fn read_existing_logs(path: &Path) -> Result<Vec<LogEvent>> {
    if tokio::fs::metadata(path).await.is_err() {
        return Ok(Vec::new());
    }
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(raw.lines().filter_map(|line| parse_line(path, line)).collect())
}

/// Follow the log from the start, delivering each parsed event in file
/// order without re-delivering lines already seen.
///
/// Existing content is replayed before new appends; callers wanting
/// only new events must skip already-read lines themselves. At end of
/// file the loop sleeps `poll_interval` and re-checks for appended
/// bytes: a polling tail, not an OS-level change notification.
///
/// Terminates cleanly when the callback returns `ControlFlow::Break`,
/// the cancellation token fires, the file disappears mid-tail, or a
/// truncation/read error is detected. A file missing at call time
/// returns immediately without yielding anything.
///
/// # Errors
///
/// Returns `AppError::Io` only for seek failures on a freshly opened
/// file; all steady-state read problems stop the tail cleanly instead.
pub async fn tail<F>(
    path: &Path,
    poll_interval: Duration,
    cancel: &CancellationToken,
    mut on_event: F,
) -> Result<()>
where
    F: FnMut(LogEvent) -> ControlFlow<()>,
{
    if tokio::fs::metadata(path).await.is_err() {
        return Ok(());
    }

    let mut offset: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let Ok(meta) = tokio::fs::metadata(path).await else {
            // File disappeared out from under us; clean stop.
            debug!(path = %path.display(), "log file removed, stopping tail");
            return Ok(());
        };
        if meta.len() < offset {
            debug!(path = %path.display(), "log file truncated, stopping tail");
            return Ok(());
        }

        if meta.len() > offset {
            let Ok(mut file) = File::open(path).await else {
                return Ok(());
            };
            file.seek(SeekFrom::Start(offset)).await?;
            let mut reader = BufReader::new(file);
            let mut line = String::new();
            loop {
                line.clear();
                let read = match reader.read_line(&mut line).await {
                    Ok(read) => read,
                    Err(err) => {
                        debug!(path = %path.display(), %err, "log read error, stopping tail");
                        return Ok(());
                    }
                };
                if read == 0 {
                    break;
                }
                if !line.ends_with('\n') {
                    // Partial append; re-read once the writer finishes it.
                    break;
                }
                offset += u64::try_from(read).unwrap_or(u64::MAX);
                if let Some(event) = parse_line(path, &line) {
                    if let ControlFlow::Break(()) = on_event(event) {
                        return Ok(());
                    }
                }
            }
        }

        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            () = tokio::time::sleep(poll_interval) => {}
        }
    }
}

fn parse_line(path: &Path, line: &str) -> Option<LogEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<LogEvent>(trimmed) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(path = %path.display(), %err, "skipping malformed log line");
            None
        }
    }
}
