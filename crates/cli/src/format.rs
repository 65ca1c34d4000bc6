//! Output formatting for command results.

use perfgate_core::SendingMode;
use perfgate_delivery::{ChunkSummary, DrainReport};
use serde_json::json;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Progress line for one synced chunk.
pub fn format_chunk(chunk: &ChunkSummary) -> String {
    format!(
        "Synced {} traces, from trace {} to {}",
        chunk.count, chunk.first_id, chunk.last_id
    )
}

/// Summary printed after a drain pass.
///
/// In human mode chunk lines were already printed as progress.
pub fn format_report(report: &DrainReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => {
            if report.found == 0 {
                return "No unsent traces found, nothing to sync!".to_string();
            }
            match &report.failure {
                None => "Sync complete".to_string(),
                Some(f) => {
                    let mut lines = vec![format!(
                        "(error) Submitting trace {} failed: {}",
                        f.failed_id, f.error
                    )];
                    if let Some((first, last)) = &f.salvaged_range {
                        lines.push(format!(
                            "(warn) An error occurred mid-sync, deleted the {} traces that were synced, from trace {} to {}",
                            f.salvaged, first, last
                        ));
                    }
                    lines.push("(error) Error occurred during sync, halting.".to_string());
                    lines.join("\n")
                }
            }
        }
        OutputMode::Json => {
            let chunks: Vec<_> = report
                .chunks
                .iter()
                .map(|c| {
                    json!({
                        "count": c.count,
                        "first_id": c.first_id.to_string(),
                        "last_id": c.last_id.to_string(),
                    })
                })
                .collect();
            let failure = report.failure.as_ref().map(|f| {
                json!({
                    "failed_id": f.failed_id.to_string(),
                    "salvaged": f.salvaged,
                    "salvaged_first_id": f.salvaged_range.as_ref().map(|(first, _)| first.to_string()),
                    "salvaged_last_id": f.salvaged_range.as_ref().map(|(_, last)| last.to_string()),
                    "error": f.error.to_string(),
                })
            });
            json!({
                "found": report.found,
                "synced": report.synced(),
                "complete": report.is_complete(),
                "chunks": chunks,
                "failure": failure,
            })
            .to_string()
        }
    }
}

/// Status line(s). `unsent` is `None` when nothing is buffered.
pub fn format_status(mode: SendingMode, unsent: Option<usize>, output: OutputMode) -> String {
    match output {
        OutputMode::Human => match unsent {
            Some(n) => format!("sending mode: {}\nunsent traces: {}", mode, n),
            None => format!("sending mode: {}\nunsent traces: - (not buffered)", mode),
        },
        OutputMode::Json => json!({ "mode": mode.as_str(), "unsent": unsent }).to_string(),
    }
}

/// Confirmation after `clear`.
pub fn format_cleared(output: OutputMode) -> String {
    match output {
        OutputMode::Human => "All buffered traces have been cleared.".to_string(),
        OutputMode::Json => json!({ "cleared": true }).to_string(),
    }
}

/// Error line.
pub fn format_error(message: &str, output: OutputMode) -> String {
    match output {
        OutputMode::Human => format!("(error) {}", message),
        OutputMode::Json => json!({ "error": message }).to_string(),
    }
}
