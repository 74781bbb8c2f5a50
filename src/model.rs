use crate::error::MailerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Content type accepted by the upload endpoint (.xlsx).
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// Upload size limit: 5 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
/// Placeholder shown for text fields the spreadsheet left empty.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the parse/send service (`uploadEndpointBaseUrl`).
    pub base_url: String,
    pub user_agent: String,
    pub send_mode: SendMode,
    #[serde(with = "humantime_serde")]
    pub simulated_delay: Duration,
    pub max_upload_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            user_agent: format!("bulk-mail-cli/{}", env!("CARGO_PKG_VERSION")),
            send_mode: SendMode::Http,
            simulated_delay: Duration::from_secs(2),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    Http,
    Simulated,
}

/// One parsed spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// May be empty when the sheet had no email column for the row.
    pub email: String,
    pub name: String,
    pub company: String,
    pub product: String,
    pub quantity: u64,
    pub port: String,
    pub address: String,
}

impl ContactRecord {
    /// Record with only an email set and every other field defaulted.
    #[cfg(test)]
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: UNKNOWN.into(),
            company: UNKNOWN.into(),
            product: UNKNOWN.into(),
            quantity: 0,
            port: UNKNOWN.into(),
            address: UNKNOWN.into(),
        }
    }

    pub fn display_email(&self) -> &str {
        if self.email.trim().is_empty() {
            "-"
        } else {
            &self.email
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Failed,
}

impl SendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SendStatus::Success => "success",
            SendStatus::Failed => "failed",
        }
    }
}

/// Outcome of one attempted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    pub status: SendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl SendResult {
    pub fn success(record: &ContactRecord) -> Self {
        Self {
            email: record.email.clone(),
            name: record.name.clone(),
            company: record.company.clone(),
            status: SendStatus::Success,
            error_reason: None,
        }
    }

    pub fn failed(record: &ContactRecord, reason: impl Into<String>) -> Self {
        Self {
            email: record.email.clone(),
            name: record.name.clone(),
            company: record.company.clone(),
            status: SendStatus::Failed,
            error_reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }
}

/// What a 2xx upload response produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Parsed(Vec<ContactRecord>),
    /// The body had no `result` field; nothing to hand upward.
    NoResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn to_message(&self) -> String {
        format!("{}: {}", self.title, self.description)
    }
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    UploadStarted {
        file_name: String,
        size_bytes: u64,
    },
    /// Cosmetic progress proxy, 0..=100.
    UploadProgress {
        percent: u8,
    },
    UploadFinished {
        file_name: String,
        outcome: Result<UploadOutcome, MailerError>,
    },
    SendStarted {
        count: usize,
    },
    SendFinished {
        outcome: Result<Vec<SendResult>, MailerError>,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    UsingSimulatedSend,
    UploadSuperseded { file_name: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::UsingSimulatedSend => {
                "Using simulated send backend (no email is delivered)".to_string()
            }
            InfoEvent::UploadSuperseded { file_name } => {
                format!("Started a new upload while {file_name} is still in flight")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dump_uses_humantime_delay() {
        let cfg = ClientConfig {
            send_mode: SendMode::Simulated,
            simulated_delay: Duration::from_millis(1500),
            ..Default::default()
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["simulated_delay"], "1s 500ms");
        assert_eq!(v["send_mode"], "simulated");
        let back: ClientConfig = serde_json::from_value(v).unwrap();
        assert_eq!(back.simulated_delay, Duration::from_millis(1500));
    }

    #[test]
    fn send_result_uses_camel_case_and_omits_missing_reason() {
        let record = ContactRecord::with_email("a@b.com");
        let ok = serde_json::to_value(SendResult::success(&record)).unwrap();
        assert_eq!(ok["status"], "success");
        assert!(ok.get("errorReason").is_none());

        let failed = serde_json::to_value(SendResult::failed(&record, "bounced")).unwrap();
        assert_eq!(failed["errorReason"], "bounced");
    }

    #[test]
    fn empty_email_displays_as_dash() {
        let record = ContactRecord::with_email("");
        assert_eq!(record.display_email(), "-");
    }
}
