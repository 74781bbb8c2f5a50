//! Error taxonomy for the upload and send workflow.
//!
//! Every variant is recoverable: the orchestrators return it, and the
//! presentation layers turn it into a transient notice via [`MailerError::notice`].

use thiserror::Error;

use crate::model::{Notice, NoticeKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailerError {
    #[error("Please upload a valid Excel (.xlsx) file")]
    InvalidFormat,
    #[error("File size exceeds 5MB limit")]
    FileTooLarge,
    #[error("{message}")]
    TransportError { message: String },
    #[error("HTTP error! Status: {status_code}")]
    UploadHttpError { status_code: u16 },
    #[error("send endpoint returned HTTP {status_code}")]
    SendHttpError { status_code: u16 },
    #[error("no records to send")]
    NoDataError,
    #[error("unexpected response: {message}")]
    InvalidResponse { message: String },
    #[error("cannot read file: {message}")]
    FileRead { message: String },
}

impl MailerError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        MailerError::TransportError {
            message: err.to_string(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        MailerError::InvalidResponse {
            message: message.into(),
        }
    }

    /// Notice shown when an upload of `file_name` fails with this error.
    pub fn upload_notice(&self, file_name: &str) -> Notice {
        match self {
            MailerError::InvalidFormat => Notice::error(
                "Invalid file format",
                "Only Excel (.xlsx) files are supported.",
            ),
            MailerError::FileTooLarge => {
                Notice::error("File too large", "Maximum file size is 5MB.")
            }
            other => Notice::error(
                "Error processing file",
                format!("Failed to process {file_name}: {other}"),
            ),
        }
    }

    /// Notice shown when a send operation fails with this error.
    pub fn notice(&self) -> Notice {
        match self {
            MailerError::NoDataError => Notice::error(
                "No data to process",
                "Please upload an Excel file first.",
            ),
            MailerError::InvalidFormat | MailerError::FileTooLarge => self.upload_notice("file"),
            other => Notice {
                kind: NoticeKind::Error,
                title: "Error processing emails".into(),
                description: format!("{other}. Please try again."),
            },
        }
    }
}
