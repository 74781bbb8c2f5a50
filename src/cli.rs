use crate::engine::{MailEngine, SelectedFile};
use crate::model::{ClientConfig, SendMode, UploadOutcome, DEFAULT_BASE_URL, MAX_UPLOAD_BYTES};
use crate::session::{Effect, Session, SessionEvent};
use crate::table::TableView;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "bulk-mail-cli",
    version,
    about = "Upload a contact spreadsheet and send bulk email, with optional TUI"
)]
pub struct Cli {
    /// Spreadsheet (.xlsx, max 5MB) to upload; in the TUI it is uploaded on launch
    pub file: Option<PathBuf>,

    /// Base URL of the upload/send service
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Print JSON (records, or results with --send) and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text preview (or results summary with --send) and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// In --json/--text mode, send emails to every parsed record after upload
    #[arg(long)]
    pub send: bool,

    /// Use the simulated send backend instead of the send endpoint
    #[arg(long)]
    pub simulate_send: bool,

    /// Delay before the simulated backend reports results
    #[arg(long, default_value = "2s")]
    pub simulated_delay: humantime::Duration,

    /// Preview search term (text/JSON modes)
    #[arg(long, default_value = "")]
    pub search: String,

    /// Preview page, 1-based (text mode)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Export send results as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export send results as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Log file (defaults to the user data directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, false).await;
        }
    }

    let json = args.json;
    run_headless(args, json).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("bulk-mail-cli/{}", env!("CARGO_PKG_VERSION")),
        send_mode: if args.simulate_send {
            SendMode::Simulated
        } else {
            SendMode::Http
        },
        simulated_delay: Duration::from(args.simulated_delay),
        max_upload_bytes: MAX_UPLOAD_BYTES,
    }
}

/// Upload, preview and optionally send without a TUI.
async fn run_headless(args: Cli, json: bool) -> Result<()> {
    let path = args
        .file
        .clone()
        .context("a FILE is required with --json or --text")?;
    let engine = MailEngine::new(&build_config(&args))?;
    let (out_tx, out_handle) = spawn_output_writer();
    let mut session = Session::default();

    let file = SelectedFile::open(&path)
        .await
        .map_err(|e| anyhow::anyhow!(e.upload_notice(&path.display().to_string()).to_message()))?;

    let (progress_tx, mut progress_rx) = watch::channel(0u8);
    let progress_out = out_tx.clone();
    let name = format!("{} ({:.2} KB)", file.name, file.size_kb());
    let progress_task = tokio::spawn(async move {
        let mut last = 0u8;
        while progress_rx.changed().await.is_ok() {
            let p = *progress_rx.borrow_and_update();
            // Print in 25% steps to keep stderr readable.
            if p == 100 || p / 25 > last / 25 {
                let _ = progress_out.send(OutputLine::Stderr(format!(
                    "Processing {name}... {p}%"
                )));
            }
            last = p;
        }
    });
    let outcome = engine.upload(&file, &progress_tx).await;
    drop(progress_tx);
    let _ = progress_task.await;

    let upload_failed = outcome.is_err();
    let no_result = matches!(outcome, Ok(UploadOutcome::NoResult));
    let transition = session.apply(SessionEvent::UploadFinished {
        file_name: file.name.clone(),
        outcome,
    });
    if let Some(notice) = transition.notice.as_ref() {
        if upload_failed {
            finish_output(out_tx, out_handle).await;
            return Err(anyhow::anyhow!(notice.to_message()));
        }
        let _ = out_tx.send(OutputLine::Stderr(notice.to_message()));
    }
    if no_result {
        tracing::warn!("upload produced no records");
    }

    if !args.send {
        let mut view = TableView::default();
        view.set_search_term(args.search.clone());
        if json {
            let filtered: Vec<_> = view.filter(&session.current_records);
            let out = serde_json::to_string_pretty(&filtered)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        } else {
            let total = view.total_pages(&session.current_records);
            view.go_to(args.page, total);
            let summary =
                crate::text_summary::build_preview_summary(&session.current_records, &view);
            for line in summary.lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
        finish_output(out_tx, out_handle).await;
        return Ok(());
    }

    let transition = session.apply(SessionEvent::SendRequested);
    let Some(Effect::StartSend(records)) = transition.effect else {
        finish_output(out_tx, out_handle).await;
        let message = transition
            .notice
            .map(|n| n.to_message())
            .unwrap_or_else(|| "nothing to send".into());
        return Err(anyhow::anyhow!(message));
    };
    if engine.send_mode() == SendMode::Simulated {
        let _ = out_tx.send(OutputLine::Stderr(
            crate::model::InfoEvent::UsingSimulatedSend.to_message(),
        ));
    }
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Sending {} emails...",
        records.len()
    )));

    let outcome = engine.send_all(&records).await;
    let send_error = outcome.as_ref().err().cloned();
    let transition = session.apply(SessionEvent::SendFinished(outcome));
    if let Some(e) = send_error {
        finish_output(out_tx, out_handle).await;
        return Err(anyhow::anyhow!(e.notice().to_message()));
    }
    if let Some(notice) = transition.notice {
        let _ = out_tx.send(OutputLine::Stderr(notice.to_message()));
    }

    let processed = crate::orchestrator::process_send_completion(&args, &session.current_results);
    for msg in processed.export_messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }

    if json {
        let out = serde_json::to_string_pretty(&serde_json::json!({
            "summary": processed.metrics,
            "results": session.current_results,
        }))?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_results_summary(&session.current_results);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    finish_output(out_tx, out_handle).await;
    Ok(())
}

async fn finish_output(
    out_tx: mpsc::UnboundedSender<OutputLine>,
    out_handle: tokio::task::JoinHandle<()>,
) {
    drop(out_tx);
    let _ = out_handle.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service() {
        let args = Cli::parse_from(["bulk-mail-cli"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://localhost:5000");
        assert_eq!(cfg.send_mode, SendMode::Http);
        assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.simulated_delay, Duration::from_secs(2));
    }

    #[test]
    fn simulate_flag_switches_backend() {
        let args = Cli::parse_from([
            "bulk-mail-cli",
            "--simulate-send",
            "--base-url",
            "http://mail.internal:8080",
            "contacts.xlsx",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.send_mode, SendMode::Simulated);
        assert_eq!(cfg.base_url, "http://mail.internal:8080");
        assert_eq!(args.file, Some(PathBuf::from("contacts.xlsx")));
    }

    #[tokio::test]
    async fn json_and_text_are_exclusive() {
        let args = Cli::parse_from(["bulk-mail-cli", "--json", "--text", "a.xlsx"]);
        assert!(run(args).await.is_err());
    }
}
