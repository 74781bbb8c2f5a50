mod records;
mod send;
mod upload;

pub use send::SendBackend;
pub use upload::{validate_file, SelectedFile};

use crate::error::MailerError;
use crate::model::{ClientConfig, ContactRecord, SendMode, SendResult, UploadOutcome};
use anyhow::{Context, Result};
use reqwest::Url;
use tokio::sync::watch;

/// HTTP client bound to the parse/send service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let base_url = cfg.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).with_context(|| format!("invalid base URL: {}", cfg.base_url))?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn upload_url(&self) -> String {
        format!("{}/email-send/upload", self.base_url)
    }

    pub fn send_url(&self) -> String {
        format!("{}/email-send/send", self.base_url)
    }
}

/// Owns the service client and the send backend; shared by controller tasks.
pub struct MailEngine {
    client: ApiClient,
    backend: SendBackend,
    max_upload_bytes: u64,
}

impl MailEngine {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let client = ApiClient::new(cfg)?;
        let backend = SendBackend::from_config(cfg, &client);
        match serde_json::to_string(cfg) {
            Ok(dump) => tracing::info!(config = %dump, "engine configured"),
            Err(e) => tracing::warn!("config not serializable: {e}"),
        }
        Ok(Self {
            client,
            backend,
            max_upload_bytes: cfg.max_upload_bytes,
        })
    }

    pub fn send_mode(&self) -> SendMode {
        self.backend.mode()
    }

    /// Validate and submit `file`, publishing the cosmetic progress on `progress`.
    pub async fn upload(
        &self,
        file: &SelectedFile,
        progress: &watch::Sender<u8>,
    ) -> Result<UploadOutcome, MailerError> {
        upload::submit_file(&self.client, file, self.max_upload_bytes, progress).await
    }

    pub async fn send_all(&self, records: &[ContactRecord]) -> Result<Vec<SendResult>, MailerError> {
        self.backend.send_all(records).await
    }
}
