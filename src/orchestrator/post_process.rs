//! Post-send processing: aggregation and the exports requested on the command line.

use crate::cli::Cli;
use crate::metrics::ResultsMetrics;
use crate::model::SendResult;
use crate::storage;

/// Result of post-send processing, ready for presentation layers.
pub(crate) struct ProcessedSend {
    pub metrics: ResultsMetrics,
    pub export_messages: Vec<String>,
}

/// Aggregate a completed batch and write any `--export-*` files.
pub(crate) fn process_send_completion(args: &Cli, results: &[SendResult]) -> ProcessedSend {
    let metrics = ResultsMetrics::from_results(results);

    let mut export_messages = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match storage::export_json(export_path, results) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }
    if let Some(export_path) = args.export_csv.as_deref() {
        match storage::export_csv(export_path, results) {
            Ok(_) => export_messages.push(format!("Exported CSV: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export CSV failed: {e:#}")),
        }
    }

    ProcessedSend {
        metrics,
        export_messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContactRecord;
    use clap::Parser;
    use std::ffi::OsString;

    #[test]
    fn writes_requested_exports() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("r.json");
        let csv = dir.path().join("r.csv");
        let args = Cli::parse_from([
            OsString::from("bulk-mail-cli"),
            "--export-json".into(),
            json.clone().into_os_string(),
            "--export-csv".into(),
            csv.clone().into_os_string(),
        ]);
        let rec = ContactRecord::with_email("a@b.com");
        let processed =
            process_send_completion(&args, &[SendResult::success(&rec), SendResult::failed(&rec, "x")]);
        assert_eq!(processed.metrics.total, 2);
        assert_eq!(processed.export_messages.len(), 2);
        assert!(json.exists() && csv.exists());
    }

    #[test]
    fn no_flags_no_exports() {
        let args = Cli::parse_from(["bulk-mail-cli"]);
        let processed = process_send_completion(&args, &[]);
        assert!(processed.export_messages.is_empty());
    }
}
