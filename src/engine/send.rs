use crate::engine::ApiClient;
use crate::error::MailerError;
use crate::model::{ClientConfig, ContactRecord, SendMode, SendResult, SendStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SIMULATED_SUCCESS_RATE: f64 = 0.8;
pub const SIMULATED_FAILURE_REASON: &str = "Failed to deliver: mailbox full";

/// Where a batch send goes.
#[derive(Debug, Clone)]
pub enum SendBackend {
    Http(ApiClient),
    /// Demo stand-in: waits, then fails roughly one in five recipients.
    Simulated { delay: Duration },
}

#[derive(Serialize)]
struct SendRequest<'a> {
    records: &'a [ContactRecord],
}

#[derive(Deserialize)]
struct SendResponse {
    result: Vec<RemoteStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteStatus {
    status: SendStatus,
    #[serde(default)]
    error_reason: Option<String>,
}

impl SendBackend {
    pub fn from_config(cfg: &ClientConfig, client: &ApiClient) -> Self {
        match cfg.send_mode {
            SendMode::Http => SendBackend::Http(client.clone()),
            SendMode::Simulated => SendBackend::Simulated {
                delay: cfg.simulated_delay,
            },
        }
    }

    pub fn mode(&self) -> SendMode {
        match self {
            SendBackend::Http(_) => SendMode::Http,
            SendBackend::Simulated { .. } => SendMode::Simulated,
        }
    }

    /// Send one batch. Either every record gets a result, in input order, or
    /// the whole call fails.
    pub async fn send_all(&self, records: &[ContactRecord]) -> Result<Vec<SendResult>, MailerError> {
        if records.is_empty() {
            return Err(MailerError::NoDataError);
        }
        tracing::info!(count = records.len(), mode = ?self.mode(), "sending batch");
        let results = match self {
            SendBackend::Http(client) => send_http(client, records).await,
            SendBackend::Simulated { delay } => {
                tokio::time::sleep(*delay).await;
                let mut rng = rand::thread_rng();
                Ok(simulate_outcomes(records, &mut rng))
            }
        };
        match &results {
            Ok(r) => tracing::info!(
                sent = r.iter().filter(|x| x.is_success()).count(),
                total = r.len(),
                "batch complete"
            ),
            Err(e) => tracing::error!("batch failed: {e}"),
        }
        results
    }
}

/// Draw one outcome per record.
pub fn simulate_outcomes<R: Rng + ?Sized>(records: &[ContactRecord], rng: &mut R) -> Vec<SendResult> {
    records
        .iter()
        .map(|r| {
            if rng.gen_bool(SIMULATED_SUCCESS_RATE) {
                SendResult::success(r)
            } else {
                SendResult::failed(r, SIMULATED_FAILURE_REASON)
            }
        })
        .collect()
}

async fn send_http(
    client: &ApiClient,
    records: &[ContactRecord],
) -> Result<Vec<SendResult>, MailerError> {
    let resp = client
        .http
        .post(client.send_url())
        .json(&SendRequest { records })
        .send()
        .await
        .map_err(MailerError::transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(MailerError::SendHttpError {
            status_code: status.as_u16(),
        });
    }

    let body: SendResponse = resp
        .json()
        .await
        .map_err(|e| MailerError::invalid_response(format!("send response: {e}")))?;

    if body.result.len() != records.len() {
        return Err(MailerError::invalid_response(format!(
            "expected {} statuses, got {}",
            records.len(),
            body.result.len()
        )));
    }

    Ok(records
        .iter()
        .zip(body.result)
        .map(|(record, remote)| match remote.status {
            SendStatus::Success => SendResult::success(record),
            SendStatus::Failed => SendResult {
                error_reason: remote.error_reason,
                ..SendResult::failed(record, "")
            },
        })
        .collect())
}
