//! Merge service HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Three endpoints:
//! `POST /upload/onesite/`, `POST /upload/apricot/` and `POST /merge/`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use rostermerge_recon::editor::valid_pairs;
use rostermerge_recon::{MergePair, PartitionedResult, Row, UploadedDataset};

/// OneSite exports are legacy Excel workbooks.
pub const ONESITE_EXTENSION: &str = "xls";
pub const APRICOT_EXTENSION: &str = "xlsx";

/// Merge service client (blocking).
#[derive(Clone)]
pub struct MergeClient {
    http: reqwest::blocking::Client,
    api_base: String,
}

/// Error type for service exchanges.
#[derive(Debug)]
pub enum ClientError {
    /// Connection failed, reset or timed out
    Network(String),
    /// Non-success status, with the service's `detail` when it sent one
    Http(u16, String),
    /// Response body did not decode
    Parse(String),
    /// Local file could not be read
    Io(String),
    /// Rejected input: 400/422 from the service, or caught before sending
    Validation(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ClientError::Io(msg) => write!(f, "I/O error: {}", msg),
            ClientError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// Body of `POST /merge/`.
#[derive(Debug, Clone, Serialize)]
pub struct MergeRequest<'a> {
    pub apricot_data: &'a [Row],
    pub onesite_data: &'a [Row],
    pub merge_columns: Vec<MergePair>,
}

impl<'a> MergeRequest<'a> {
    /// Build a request carrying only the complete pairs of `pairs`, in order.
    pub fn new(onesite_data: &'a [Row], apricot_data: &'a [Row], pairs: &[MergePair]) -> Self {
        Self {
            apricot_data,
            onesite_data,
            merge_columns: valid_pairs(pairs),
        }
    }
}

impl MergeClient {
    /// Create a client for `api_base`. `None` leaves requests unbounded.
    pub fn new(api_base: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("rmerge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Run the reconciliation: one POST, no retry.
    pub fn fetch_reconciliation(
        &self,
        onesite_rows: &[Row],
        apricot_rows: &[Row],
        pairs: &[MergePair],
    ) -> Result<PartitionedResult, ClientError> {
        let request = MergeRequest::new(onesite_rows, apricot_rows, pairs);
        if request.merge_columns.is_empty() {
            return Err(ClientError::Validation(
                "At least one complete merge pair is required".into(),
            ));
        }

        let url = format!("{}/merge/", self.api_base);
        log::debug!(
            "POST {} ({} onesite rows, {} apricot rows, {} pair(s))",
            url,
            onesite_rows.len(),
            apricot_rows.len(),
            request.merge_columns.len(),
        );

        let response = self.http.post(&url)
            .json(&request)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let response = check(response)?;

        let result: PartitionedResult = response.json()
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        log::info!("merge: received {} row(s) across 4 categories", result.total_rows());
        Ok(result)
    }

    /// Upload one or more OneSite `.xls` exports as multipart field `files`.
    pub fn upload_onesite(&self, paths: &[PathBuf]) -> Result<UploadedDataset, ClientError> {
        if paths.is_empty() {
            return Err(ClientError::Validation("No OneSite files given".into()));
        }

        let mut form = reqwest::blocking::multipart::Form::new();
        for path in paths {
            require_extension(path, ONESITE_EXTENSION, "OneSite")?;
            form = form.file("files", path)
                .map_err(|e| ClientError::Io(format!("{}: {}", path.display(), e)))?;
        }

        let url = format!("{}/upload/onesite/", self.api_base);
        self.post_form(&url, form)
    }

    /// Upload a single Apricot `.xlsx` export as multipart field `file`.
    pub fn upload_apricot(&self, path: &Path) -> Result<UploadedDataset, ClientError> {
        require_extension(path, APRICOT_EXTENSION, "Apricot")?;
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)
            .map_err(|e| ClientError::Io(format!("{}: {}", path.display(), e)))?;

        let url = format!("{}/upload/apricot/", self.api_base);
        self.post_form(&url, form)
    }

    fn post_form(
        &self,
        url: &str,
        form: reqwest::blocking::multipart::Form,
    ) -> Result<UploadedDataset, ClientError> {
        log::debug!("POST {} (multipart)", url);
        let response = self.http.post(url)
            .multipart(form)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let response = check(response)?;

        let dataset: UploadedDataset = response.json()
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        log::info!(
            "upload: {} column(s), {} row(s) from {}",
            dataset.columns.len(),
            dataset.data.len(),
            url,
        );
        Ok(dataset)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ClientError> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = error_detail(&body);
    if status == 422 || status == 400 {
        return Err(ClientError::Validation(message));
    }
    Err(ClientError::Http(status, message))
}

/// FastAPI error bodies are `{"detail": "..."}`, or a list of
/// `{"msg": ...}` objects for request validation failures.
fn error_detail(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    match &json["detail"] {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i["msg"].as_str()).collect();
            if msgs.is_empty() {
                body.to_string()
            } else {
                msgs.join("; ")
            }
        }
        _ => body.to_string(),
    }
}

fn require_extension(path: &Path, extension: &str, dataset: &str) -> Result<(), ClientError> {
    let ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "Only .{} files are supported for {} ({})",
            extension,
            dataset,
            path.display()
        )))
    }
}
