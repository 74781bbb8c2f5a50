use crate::model::SendResult;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    fn ext(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Export results into the current directory under a timestamped name.
/// Returns the absolute path of the exported file.
pub fn export_results(results: &[SendResult], format: ExportFormat) -> Result<PathBuf> {
    if results.is_empty() {
        return Err(anyhow::anyhow!("no results to export yet"));
    }
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format export timestamp")?;
    let name = crate::storage::export_file_name(&timestamp, format.ext());

    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(name);
    match format {
        ExportFormat::Json => crate::storage::export_json(&path, results)?,
        ExportFormat::Csv => crate::storage::export_csv(&path, results)?,
    }
    tracing::info!(path = %path.display(), "results exported");
    Ok(path)
}

/// Initialize the clipboard manager thread if not already initialized.
/// Each clipboard instance is kept alive for a while so clipboard managers
/// on Linux have time to read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
