//! Workflow controller task.
//!
//! Executes uploads and sends requested by the UI and emits their progress and
//! completion as events. Every request runs as its own task: nothing is
//! cancelled, so overlapping completions are applied in arrival order.

use crate::cli::Cli;
use crate::engine::{validate_file, MailEngine, SelectedFile};
use crate::model::{AppEvent, ContactRecord, InfoEvent, SendMode};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UiCommand {
    Upload(PathBuf),
    Send(Vec<ContactRecord>),
    Quit,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

async fn run_upload(
    engine: Arc<MailEngine>,
    path: PathBuf,
    max_upload_bytes: u64,
    event_tx: UnboundedSender<AppEvent>,
) {
    let file = match SelectedFile::open(&path).await {
        Ok(f) => f,
        Err(e) => {
            let _ = event_tx.send(AppEvent::UploadFinished {
                file_name: display_name(&path),
                outcome: Err(e),
            });
            return;
        }
    };
    // Rejected files never reach the progress panel.
    if let Err(e) = validate_file(&file, max_upload_bytes) {
        let _ = event_tx.send(AppEvent::UploadFinished {
            file_name: file.name,
            outcome: Err(e),
        });
        return;
    }

    let _ = event_tx.send(AppEvent::UploadStarted {
        file_name: file.name.clone(),
        size_bytes: file.size,
    });

    let (progress_tx, mut progress_rx) = watch::channel(0u8);
    let forward_tx = event_tx.clone();
    let forward = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let percent = *progress_rx.borrow_and_update();
            let _ = forward_tx.send(AppEvent::UploadProgress { percent });
        }
    });

    let outcome = engine.upload(&file, &progress_tx).await;
    drop(progress_tx);
    let _ = forward.await;

    let _ = event_tx.send(AppEvent::UploadFinished {
        file_name: file.name,
        outcome,
    });
}

async fn run_send(
    engine: Arc<MailEngine>,
    records: Vec<ContactRecord>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let _ = event_tx.send(AppEvent::SendStarted {
        count: records.len(),
    });
    let outcome = engine.send_all(&records).await;
    let _ = event_tx.send(AppEvent::SendFinished { outcome });
}

/// Run commands from the UI until it quits or hangs up.
pub(crate) async fn run_controller(
    args: &Cli,
    engine: Arc<MailEngine>,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let max_upload_bytes = crate::cli::build_config(args).max_upload_bytes;
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut last_upload: Option<(String, JoinHandle<()>)> = None;

    if engine.send_mode() == SendMode::Simulated {
        let _ = event_tx.send(AppEvent::Info(InfoEvent::UsingSimulatedSend));
    }

    let mut pending: Vec<UiCommand> = args.file.iter().cloned().map(UiCommand::Upload).collect();

    loop {
        let cmd = match pending.pop() {
            Some(cmd) => Some(cmd),
            None => cmd_rx.recv().await,
        };
        tasks.retain(|h| !h.is_finished());

        match cmd {
            Some(UiCommand::Upload(path)) => {
                if let Some((previous, handle)) = last_upload.take() {
                    if !handle.is_finished() {
                        let _ = event_tx.send(AppEvent::Info(InfoEvent::UploadSuperseded {
                            file_name: previous,
                        }));
                    }
                    tasks.push(handle);
                }
                tracing::info!(path = %path.display(), "upload requested");
                let name = display_name(&path);
                let handle = tokio::spawn(run_upload(
                    engine.clone(),
                    path,
                    max_upload_bytes,
                    event_tx.clone(),
                ));
                last_upload = Some((name, handle));
            }
            Some(UiCommand::Send(records)) => {
                tracing::info!(count = records.len(), "send requested");
                tasks.push(tokio::spawn(run_send(
                    engine.clone(),
                    records,
                    event_tx.clone(),
                )));
            }
            Some(UiCommand::Quit) | None => {
                for h in tasks.iter().chain(last_upload.as_ref().map(|(_, h)| h)) {
                    h.abort();
                }
                break Ok(());
            }
        }
    }
}
