//! Masking gateway: remote detection service first, local redaction on any failure.
//!
//! Contract: `POST {service_url}/mask` with `{"text": raw}` and expect
//! `{"maskedText": "..."}`. One bounded attempt, no retries. Any transport
//! error, timeout, non-2xx status, undecodable body, or absent/blank
//! `maskedText` degrades to [`local::redact`]. Degradation is never surfaced.

pub mod local;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MaskingConfig;

pub use local::MASK_PLACEHOLDER;

/// Why the remote masking attempt was not used.
#[derive(Debug)]
enum RemoteMiss {
    Disabled,
    Transport(reqwest::Error),
    Status(reqwest::StatusCode),
    MissingField,
}

#[derive(Serialize)]
struct MaskRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct MaskResponse {
    #[serde(rename = "maskedText", default)]
    masked_text: Option<String>,
}

/// Produces sanitized log text. Total: never returns an error.
#[derive(Debug, Clone)]
pub struct MaskingGateway {
    client: reqwest::Client,
    url_mask: Option<String>,
    timeout: Duration,
}

impl MaskingGateway {
    /// Builds the gateway. With `service_url = None` only local redaction is used.
    ///
    /// # Errors
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(cfg: &MaskingConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        let url_mask = cfg
            .service_url
            .as_deref()
            .map(|base| format!("{}/mask", base.trim_end_matches('/')));

        Ok(Self {
            client,
            url_mask,
            timeout: cfg.timeout,
        })
    }

    /// Gateway that never calls out; used when no detection service is configured.
    pub fn local_only() -> Self {
        Self {
            client: reqwest::Client::new(),
            url_mask: None,
            timeout: Duration::ZERO,
        }
    }

    /// Returns the masked form of `raw`.
    ///
    /// Blank input is returned as-is without a network call.
    pub async fn mask(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return raw.to_string();
        }

        let started = Instant::now();
        match self.try_remote(raw).await {
            Ok(masked) => {
                debug!(
                    latency_ms = started.elapsed().as_millis(),
                    input_len = raw.len(),
                    output_len = masked.len(),
                    "masked via detection service"
                );
                masked
            }
            Err(RemoteMiss::Disabled) => local::redact(raw),
            Err(miss) => {
                warn!(
                    reason = ?miss,
                    latency_ms = started.elapsed().as_millis(),
                    "detection service unusable; applying local redaction"
                );
                local::redact(raw)
            }
        }
    }

    async fn try_remote(&self, raw: &str) -> Result<String, RemoteMiss> {
        let url = self.url_mask.as_deref().ok_or(RemoteMiss::Disabled)?;

        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&MaskRequest { text: raw })
            .send()
            .await
            .map_err(RemoteMiss::Transport)?;

        if !resp.status().is_success() {
            return Err(RemoteMiss::Status(resp.status()));
        }

        let body: MaskResponse = resp.json().await.map_err(RemoteMiss::Transport)?;
        body.masked_text
            .filter(|m| !m.is_empty())
            .ok_or(RemoteMiss::MissingField)
    }
}
