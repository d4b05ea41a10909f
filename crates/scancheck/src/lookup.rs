//! LookupClient: the two registry calls.
//!
//! Stage 1 resolves a barcode to a registry key (and batch), stage 2 asks the
//! verification endpoint who the key belongs to. Every failure is converted to a
//! [LookupError] tagged with its [Stage]; nothing is retried here.

use crate::barcode::BarcodeValue;
use crate::config::{LookupConfig, PrimaryEndpoint, SecondaryBody};
use crate::payload::{
    decode_batch_records, decode_key_response, decode_search_response, KeyRequest, SearchRequest,
};
use crate::verdict::{
    classify_secondary, match_primary, primary_from_key, PrimaryLookupResult,
    SecondaryVerificationResult,
};
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which of the two registry calls an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Primary,
    Secondary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Primary => f.write_str("primary"),
            Stage::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to connect to server ({stage} lookup): {source}")]
    Network {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned status {code} ({stage} lookup)")]
    Server { stage: Stage, code: u16 },
    #[error("malformed response ({stage} lookup): {source}")]
    Parse {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
    #[error("empty {stage} lookup input")]
    EmptyInput { stage: Stage },
}

impl LookupError {
    pub fn stage(&self) -> Stage {
        match self {
            LookupError::Network { stage, .. }
            | LookupError::Server { stage, .. }
            | LookupError::Parse { stage, .. }
            | LookupError::EmptyInput { stage } => *stage,
        }
    }

    /// HTTP status for server-side failures. Parse failures count as server-side but carry none.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LookupError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid registry url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Registry seam between the scan pipeline and the network.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn lookup_primary(
        &self,
        barcode: &BarcodeValue,
    ) -> Result<PrimaryLookupResult, LookupError>;

    async fn lookup_secondary(&self, key: &str)
        -> Result<SecondaryVerificationResult, LookupError>;
}

/// Builder for [LookupClient]. Starts from [LookupConfig::default].
#[derive(Debug, Clone, Default)]
pub struct LookupClientBuilder {
    config: LookupConfig,
}

impl LookupClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LookupConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn primary(mut self, endpoint: PrimaryEndpoint) -> Self {
        self.config.primary = endpoint;
        self
    }

    pub fn secondary_path(mut self, path: impl Into<String>) -> Self {
        self.config.secondary_path = path.into();
        self
    }

    pub fn secondary_body(mut self, body: SecondaryBody) -> Self {
        self.config.secondary_body = body;
        self
    }

    /// `None` disables the transport timeout (unbounded wait).
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<LookupClient, ConfigError> {
        let config = self.config;
        let mut base = parse_url(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: config.base_url,
                reason: "not a base url".into(),
            });
        }
        // Url::join drops the last segment unless the base path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let primary_url = join_url(&base, config.primary.path())?;
        let secondary_url = join_url(&base, &config.secondary_path)?;

        let mut http = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = config.request_timeout {
            http = http.timeout(timeout);
        }
        Ok(LookupClient {
            http_client: http.build()?,
            primary_url,
            by_barcode: matches!(config.primary, PrimaryEndpoint::ByBarcode { .. }),
            secondary_url,
            secondary_body: config.secondary_body,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path).map_err(|e| ConfigError::InvalidUrl {
        url: format!("{}{}", base, path),
        reason: e.to_string(),
    })
}

/// reqwest-backed [Registry].
#[derive(Debug, Clone)]
pub struct LookupClient {
    http_client: reqwest::Client,
    primary_url: Url,
    by_barcode: bool,
    secondary_url: Url,
    secondary_body: SecondaryBody,
}

impl LookupClient {
    pub fn builder() -> LookupClientBuilder {
        LookupClientBuilder::new()
    }

    fn primary_request_url(&self, barcode: &BarcodeValue) -> Url {
        let mut url = self.primary_url.clone();
        if self.by_barcode {
            // Base was validated in build(), so segments are always available.
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(barcode.as_str());
            }
        }
        url
    }

    async fn fetch(
        &self,
        stage: Stage,
        request: reqwest::RequestBuilder,
    ) -> Result<String, LookupError> {
        let resp = request
            .send()
            .await
            .map_err(|source| LookupError::Network { stage, source })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Server {
                stage,
                code: status.as_u16(),
            });
        }
        resp.text()
            .await
            .map_err(|source| LookupError::Network { stage, source })
    }
}

#[async_trait]
impl Registry for LookupClient {
    async fn lookup_primary(
        &self,
        barcode: &BarcodeValue,
    ) -> Result<PrimaryLookupResult, LookupError> {
        let stage = Stage::Primary;
        let url = self.primary_request_url(barcode);
        tracing::debug!(%url, %barcode, "primary lookup");
        let body = self.fetch(stage, self.http_client.get(url)).await?;
        let result = if self.by_barcode {
            let resp = decode_key_response(&body)
                .map_err(|source| LookupError::Parse { stage, source })?;
            primary_from_key(resp.key)
        } else {
            let records =
                decode_batch_records(&body).map_err(|source| LookupError::Parse { stage, source })?;
            tracing::debug!(records = records.len(), "primary registry collection received");
            match_primary(&records, barcode.as_str())
        };
        Ok(result)
    }

    async fn lookup_secondary(
        &self,
        key: &str,
    ) -> Result<SecondaryVerificationResult, LookupError> {
        let stage = Stage::Secondary;
        if key.is_empty() {
            return Err(LookupError::EmptyInput { stage });
        }
        tracing::debug!(url = %self.secondary_url, key, "secondary lookup");
        let request = self.http_client.post(self.secondary_url.clone());
        let request = match self.secondary_body {
            SecondaryBody::SearchValue => request.json(&SearchRequest { search_value: key }),
            SecondaryBody::Key => request.json(&KeyRequest { key }),
        };
        let body = self.fetch(stage, request).await?;
        let resp = decode_search_response(&body)
            .map_err(|source| LookupError::Parse { stage, source })?;
        Ok(classify_secondary(resp.result))
    }
}
