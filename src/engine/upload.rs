use crate::engine::records::records_from_raw;
use crate::engine::ApiClient;
use crate::error::MailerError;
use crate::model::{UploadOutcome, XLSX_MIME};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

/// The progress shown during an upload is a timer, not a byte count: it climbs
/// by `PROGRESS_STEP` every `PROGRESS_TICK` and parks at `PROGRESS_CAP` until
/// the server answers.
const PROGRESS_STEP: u8 = 5;
const PROGRESS_CAP: u8 = 95;
const PROGRESS_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
enum FileBody {
    Path(PathBuf),
    #[cfg(test)]
    Bytes(Bytes),
}

/// A file chosen by the user, with its declared content type.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub size: u64,
    body: FileBody,
}

impl SelectedFile {
    /// Stat `path` and guess its content type from the extension. The body is
    /// only read after validation passes.
    pub async fn open(path: &Path) -> Result<Self, MailerError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| MailerError::FileRead {
                message: format!("{}: {e}", path.display()),
            })?;
        if !meta.is_file() {
            return Err(MailerError::FileRead {
                message: format!("{} is not a regular file", path.display()),
            });
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.xlsx")
            .to_string();
        let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        Ok(Self {
            name,
            content_type,
            size: meta.len(),
            body: FileBody::Path(path.to_path_buf()),
        })
    }

    #[cfg(test)]
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: Option<&str>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            content_type: content_type.map(str::to_string),
            size: bytes.len() as u64,
            body: FileBody::Bytes(bytes),
        }
    }

    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }

    async fn read_body(&self) -> Result<Bytes, MailerError> {
        match &self.body {
            #[cfg(test)]
            FileBody::Bytes(b) => Ok(b.clone()),
            FileBody::Path(p) => tokio::fs::read(p)
                .await
                .map(Bytes::from)
                .map_err(|e| MailerError::FileRead {
                    message: format!("{}: {e}", p.display()),
                }),
        }
    }
}

/// Client-side checks that must pass before any request is issued.
pub fn validate_file(file: &SelectedFile, max_bytes: u64) -> Result<(), MailerError> {
    if file.content_type.as_deref() != Some(XLSX_MIME) {
        return Err(MailerError::InvalidFormat);
    }
    if file.size > max_bytes {
        return Err(MailerError::FileTooLarge);
    }
    Ok(())
}

/// Next value of the cosmetic progress indicator.
pub fn next_progress(prev: u8) -> u8 {
    prev.saturating_add(PROGRESS_STEP).min(PROGRESS_CAP)
}

fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Interpret a 2xx upload body. A missing or falsy `result` is not an error.
pub fn parse_upload_body(body: &Value) -> Result<UploadOutcome, MailerError> {
    match body.get("result") {
        None => Ok(UploadOutcome::NoResult),
        Some(v) if is_falsy(v) => Ok(UploadOutcome::NoResult),
        Some(Value::Array(rows)) => Ok(UploadOutcome::Parsed(records_from_raw(rows))),
        Some(other) => Err(MailerError::invalid_response(format!(
            "`result` is not a list: {other}"
        ))),
    }
}

pub(crate) async fn submit_file(
    client: &ApiClient,
    file: &SelectedFile,
    max_bytes: u64,
    progress: &watch::Sender<u8>,
) -> Result<UploadOutcome, MailerError> {
    if let Err(e) = validate_file(file, max_bytes) {
        tracing::warn!(file = %file.name, content_type = ?file.content_type, size = file.size, "upload rejected: {e}");
        return Err(e);
    }

    progress.send_replace(0);
    let request = async {
        let body = file.read_body().await?;
        post_upload(client, file, body).await
    };
    tokio::pin!(request);

    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    ticker.tick().await;
    let result = loop {
        tokio::select! {
            res = &mut request => break res,
            _ = ticker.tick() => {
                progress.send_modify(|p| *p = next_progress(*p));
            }
        }
    };

    match &result {
        Ok(outcome) => {
            progress.send_replace(100);
            match outcome {
                UploadOutcome::Parsed(records) => {
                    tracing::info!(file = %file.name, records = records.len(), "upload parsed")
                }
                UploadOutcome::NoResult => {
                    tracing::warn!(file = %file.name, "upload response had no result field")
                }
            }
        }
        Err(e) => {
            progress.send_replace(0);
            tracing::error!(file = %file.name, "upload failed: {e}");
        }
    }
    result
}

async fn post_upload(
    client: &ApiClient,
    file: &SelectedFile,
    body: Bytes,
) -> Result<UploadOutcome, MailerError> {
    let mut part = Part::bytes(body.to_vec()).file_name(file.name.clone());
    if let Some(ct) = file.content_type.as_deref() {
        part = part.mime_str(ct).map_err(MailerError::transport)?;
    }
    let form = Form::new().part("file", part);

    let resp = client
        .http
        .post(client.upload_url())
        .multipart(form)
        .send()
        .await
        .map_err(MailerError::transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(MailerError::UploadHttpError {
            status_code: status.as_u16(),
        });
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| MailerError::invalid_response(format!("body is not JSON: {e}")))?;
    parse_upload_body(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClientConfig, MAX_UPLOAD_BYTES};
    use axum::{
        extract::{Multipart, State},
        http::StatusCode,
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio::net::TcpListener;

    #[derive(Clone)]
    struct ServerState {
        hits: Arc<AtomicUsize>,
        status: StatusCode,
        reply: Value,
        received: Arc<tokio::sync::Mutex<Vec<(String, Option<String>, usize)>>>,
    }

    async fn handle_upload(
        State(state): State<ServerState>,
        mut multipart: Multipart,
    ) -> (StatusCode, Json<Value>) {
        state.hits.fetch_add(1, Ordering::SeqCst);
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            state.received.lock().await.push((name, file_name, len));
        }
        (state.status, Json(state.reply.clone()))
    }

    async fn spawn_upload_server(status: StatusCode, reply: Value) -> (ApiClient, ServerState) {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state = ServerState {
            hits: Arc::new(AtomicUsize::new(0)),
            status,
            reply,
            received: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/email-send/upload", post(handle_upload))
            .layer(axum::extract::DefaultBodyLimit::disable())
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let cfg = ClientConfig {
            base_url: format!("http://{addr}"),
            ..Default::default()
        };
        (ApiClient::new(&cfg).expect("client"), state)
    }

    fn xlsx(name: &str, len: usize) -> SelectedFile {
        SelectedFile::from_bytes(name, Some(XLSX_MIME), vec![0u8; len])
    }

    #[tokio::test]
    async fn wrong_type_is_rejected_without_request() {
        let (client, server) = spawn_upload_server(StatusCode::OK, json!({})).await;
        let (tx, _rx) = watch::channel(0u8);
        for ct in [Some("text/csv"), Some("application/vnd.ms-excel"), None] {
            let file = SelectedFile::from_bytes("contacts", ct, vec![1, 2, 3]);
            let err = submit_file(&client, &file, MAX_UPLOAD_BYTES, &tx).await.unwrap_err();
            assert_eq!(err, MailerError::InvalidFormat);
        }
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_without_request() {
        let (client, server) = spawn_upload_server(StatusCode::OK, json!({})).await;
        let (tx, _rx) = watch::channel(0u8);
        let file = xlsx("big.xlsx", MAX_UPLOAD_BYTES as usize + 1);
        let err = submit_file(&client, &file, MAX_UPLOAD_BYTES, &tx).await.unwrap_err();
        assert_eq!(err, MailerError::FileTooLarge);
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exactly_five_mib_is_accepted() {
        let file = xlsx("edge.xlsx", MAX_UPLOAD_BYTES as usize);
        assert!(validate_file(&file, MAX_UPLOAD_BYTES).is_ok());
    }

    #[tokio::test]
    async fn two_mib_upload_yields_defaulted_record() {
        let (client, server) = spawn_upload_server(
            StatusCode::OK,
            json!({"result": [{"email": "a@b.com"}]}),
        )
        .await;
        let (tx, rx) = watch::channel(0u8);
        let file = xlsx("contacts.xlsx", 2 * 1024 * 1024);

        let outcome = submit_file(&client, &file, MAX_UPLOAD_BYTES, &tx).await.unwrap();
        let UploadOutcome::Parsed(records) = outcome else {
            panic!("expected parsed records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "a@b.com");
        assert_eq!(records[0].name, "Unknown");
        assert_eq!(records[0].quantity, 0);
        assert_eq!(*rx.borrow(), 100);

        let received = server.received.lock().await;
        assert_eq!(server.hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            received.as_slice(),
            &[("file".to_string(), Some("contacts.xlsx".to_string()), 2 * 1024 * 1024)]
        );
    }

    #[tokio::test]
    async fn missing_result_field_is_a_silent_no_op() {
        let (client, _server) = spawn_upload_server(StatusCode::OK, json!({"message": "ok"})).await;
        let (tx, _rx) = watch::channel(0u8);
        let outcome = submit_file(&client, &xlsx("a.xlsx", 10), MAX_UPLOAD_BYTES, &tx)
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::NoResult);
    }

    #[tokio::test]
    async fn non_2xx_status_fails_and_resets_progress() {
        let (client, _server) =
            spawn_upload_server(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
        let (tx, rx) = watch::channel(40u8);
        let err = submit_file(&client, &xlsx("a.xlsx", 10), MAX_UPLOAD_BYTES, &tx)
            .await
            .unwrap_err();
        assert_eq!(err, MailerError::UploadHttpError { status_code: 500 });
        assert_eq!(*rx.borrow(), 0);
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let client = ApiClient::new(&ClientConfig {
            base_url: format!("http://{addr}"),
            ..Default::default()
        })
        .unwrap();
        let (tx, rx) = watch::channel(0u8);
        let err = submit_file(&client, &xlsx("a.xlsx", 10), MAX_UPLOAD_BYTES, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, MailerError::TransportError { .. }), "{err:?}");
        assert_eq!(*rx.borrow(), 0);
    }

    #[test]
    fn progress_climbs_and_parks_below_completion() {
        let mut p = 0;
        let mut seen = vec![p];
        for _ in 0..40 {
            p = next_progress(p);
            seen.push(p);
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 95);
        assert_eq!(seen[1], 5);
    }

    #[test]
    fn result_that_is_not_a_list_is_rejected() {
        let err = parse_upload_body(&json!({"result": "oops"})).unwrap_err();
        assert!(matches!(err, MailerError::InvalidResponse { .. }));
        assert_eq!(
            parse_upload_body(&json!({"result": []})).unwrap(),
            UploadOutcome::Parsed(Vec::new())
        );
    }

    #[test]
    fn falsy_result_is_a_silent_no_op() {
        for body in [
            json!({}),
            json!({"result": null}),
            json!({"result": false}),
            json!({"result": 0}),
            json!({"result": 0.0}),
            json!({"result": ""}),
        ] {
            assert_eq!(parse_upload_body(&body).unwrap(), UploadOutcome::NoResult, "{body}");
        }
        assert!(parse_upload_body(&json!({"result": 1})).is_err());
    }

    #[tokio::test]
    async fn open_guesses_xlsx_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.xlsx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        let file = SelectedFile::open(&path).await.unwrap();
        assert_eq!(file.name, "contacts.xlsx");
        assert_eq!(file.content_type.as_deref(), Some(XLSX_MIME));
        assert_eq!(file.size, 4);

        let missing = SelectedFile::open(&dir.path().join("nope.xlsx")).await;
        assert!(matches!(missing, Err(MailerError::FileRead { .. })));
    }
}
