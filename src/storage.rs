//! On-disk output: result exports and the log file location.

use crate::model::SendResult;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "bulk-mail-cli";

/// Directory for application data (log file). Falls back to the working directory.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_log_path() -> PathBuf {
    data_dir().join(format!("{APP_DIR}.log"))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(())
}

pub fn export_json(path: &Path, results: &[SendResult]) -> Result<()> {
    ensure_parent(path)?;
    let data = serde_json::to_vec_pretty(results).context("serialize results")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = results.len(), "exported JSON");
    Ok(())
}

pub fn export_csv(path: &Path, results: &[SendResult]) -> Result<()> {
    ensure_parent(path)?;
    let mut f = std::io::BufWriter::new(
        std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?,
    );
    writeln!(f, "email,name,company,status,error_reason")?;
    for r in results {
        writeln!(
            f,
            "{},{},{},{},{}",
            csv_field(&r.email),
            csv_field(&r.name),
            csv_field(&r.company),
            r.status.as_str(),
            csv_field(r.error_reason.as_deref().unwrap_or(""))
        )?;
    }
    f.flush().with_context(|| format!("flush {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = results.len(), "exported CSV");
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// File name for an export taken at `timestamp` (RFC3339).
pub fn export_file_name(timestamp: &str, ext: &str) -> String {
    format!(
        "email-results-{}.{ext}",
        timestamp.replace(':', "-").replace('T', "_")
    )
}
