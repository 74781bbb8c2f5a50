//! Session state and the pure transitions that drive the upload → send → results flow.
//!
//! `Session::apply` never performs I/O. Work that has to happen outside (a send)
//! is returned as an [`Effect`] for the controller to execute, and anything the
//! user should see comes back as a [`Notice`].

use crate::error::MailerError;
use crate::metrics::ResultsMetrics;
use crate::model::{ContactRecord, Notice, SendResult, UploadOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Upload,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub active_view: View,
    pub current_records: Vec<ContactRecord>,
    pub is_sending: bool,
    pub current_results: Vec<SendResult>,
    pub is_dark_mode: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            active_view: View::Upload,
            current_records: Vec::new(),
            is_sending: false,
            current_results: Vec::new(),
            is_dark_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    UploadFinished {
        file_name: String,
        outcome: Result<UploadOutcome, MailerError>,
    },
    SendRequested,
    SendFinished(Result<Vec<SendResult>, MailerError>),
    Navigate(View),
    UploadNewFile,
    ToggleDarkMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartSend(Vec<ContactRecord>),
}

#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub effect: Option<Effect>,
    pub notice: Option<Notice>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn notice(notice: Notice) -> Self {
        Self {
            effect: None,
            notice: Some(notice),
        }
    }
}

impl Session {
    pub fn apply(&mut self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::UploadFinished { file_name, outcome } => match outcome {
                Ok(UploadOutcome::Parsed(records)) => {
                    let count = records.len();
                    self.current_records = records;
                    tracing::debug!(file = %file_name, count, "records replaced");
                    Transition::notice(Notice::info(
                        "File uploaded successfully",
                        format!("{count} records found in the Excel file."),
                    ))
                }
                // Kept as a silent no-op; a body without `result` leaves the session untouched.
                Ok(UploadOutcome::NoResult) => Transition::none(),
                Err(e) => Transition::notice(e.upload_notice(&file_name)),
            },
            SessionEvent::SendRequested => {
                if self.is_sending {
                    return Transition::none();
                }
                if self.current_records.is_empty() {
                    return Transition::notice(MailerError::NoDataError.notice());
                }
                self.is_sending = true;
                Transition {
                    effect: Some(Effect::StartSend(self.current_records.clone())),
                    notice: None,
                }
            }
            SessionEvent::SendFinished(Ok(results)) => {
                self.is_sending = false;
                let metrics = ResultsMetrics::from_results(&results);
                self.current_results = results;
                self.active_view = View::Results;
                Transition::notice(Notice::info(
                    "Email processing complete",
                    format!(
                        "{} of {} emails sent successfully.",
                        metrics.success, metrics.total
                    ),
                ))
            }
            SessionEvent::SendFinished(Err(e)) => {
                self.is_sending = false;
                Transition::notice(e.notice())
            }
            SessionEvent::Navigate(view) => {
                self.active_view = view;
                Transition::none()
            }
            // Records and results survive; only a fresh parse replaces them.
            SessionEvent::UploadNewFile => {
                self.active_view = View::Upload;
                Transition::none()
            }
            SessionEvent::ToggleDarkMode => {
                self.is_dark_mode = !self.is_dark_mode;
                Transition::none()
            }
        }
    }
}
