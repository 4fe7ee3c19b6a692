//! Shared HTTP client wrapper
//!
//! Thin wrapper around `reqwest::blocking::Client` that centralizes
//! USER_AGENT and timeout configuration.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::config::network::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::config::upload::{UPLOAD_FIELD, UPLOAD_PATH};
use crate::error::{AppError, Result};

/// Shared HTTP client with standard configuration
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    /// Create a new client with default audiotap settings
    pub fn new() -> Result<Self> {
        let inner = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { inner })
    }

    /// POST `bytes` as a multipart `file` field to `{base_url}/upload`.
    ///
    /// Any 2xx response is success and its JSON body is returned. Any other
    /// status is a generic upload failure. No retry.
    pub fn upload(
        &self,
        base_url: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<serde_json::Value> {
        let url = upload_url(base_url);
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(url = %url, file = file_name, size, "uploading");
        let resp = self.inner.post(&url).multipart(form).send()?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "upload rejected by server");
            return Err(AppError::Upload("Upload failed".to_string()));
        }
        let body = resp.json::<serde_json::Value>()?;
        Ok(body)
    }
}

fn upload_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), UPLOAD_PATH)
}
