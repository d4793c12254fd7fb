//! HTTP remote log.
//!
//! POSTs each [`RemoteLogEntry`] as JSON to a spreadsheet-style append
//! endpoint (for example a Google Apps Script web app). Only an HTTP 200 reply
//! counts as confirmation.

use std::time::Duration;

use crate::error::SinkError;

use super::traits::{RemoteLog, RemoteLogEntry};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote log backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpRemoteLog {
    client: reqwest::blocking::Client,
    url: reqwest::Url,
}

impl HttpRemoteLog {
    /// Creates a remote log posting to `url` with [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Remote` for an unparseable URL or client setup failure.
    pub fn new(url: &str) -> Result<Self, SinkError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Creates a remote log with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Remote` for an unparseable URL or client setup failure.
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let url = reqwest::Url::parse(url).map_err(|e| SinkError::Remote {
            message: format!("invalid remote log URL {url:?}: {e}"),
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Remote {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client, url })
    }

    /// Endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

impl RemoteLog for HttpRemoteLog {
    fn append_remote(&self, entry: &RemoteLogEntry) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(entry)
            .send()
            .map_err(|e| SinkError::Remote {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(SinkError::RemoteStatus {
                status: status.as_u16(),
            })
        }
    }
}
