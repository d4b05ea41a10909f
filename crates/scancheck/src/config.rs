//! Lookup configuration.

use std::time::Duration;

/// Registry host used by the production scanner.
pub const DEFAULT_BASE_URL: &str = "https://nodei.ssccglpinnacle.com/";

/// Lookup configuration.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Base URL both registry endpoints are resolved against (trailing slash expected).
    pub base_url: String,
    /// Stage-1 contract.
    pub primary: PrimaryEndpoint,
    /// Stage-2 verification path, relative to `base_url`.
    pub secondary_path: String,
    /// Stage-2 request body shape.
    pub secondary_body: SecondaryBody,
    /// Per-request transport timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            primary: PrimaryEndpoint::default(),
            secondary_path: "searchBarr1".to_string(),
            secondary_body: SecondaryBody::SearchValue,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Stage-1 request shape. Exactly one is active per client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryEndpoint {
    /// Parameterless GET returning every batch record; matched client-side.
    Collection { path: String },
    /// `GET {path}/{barcode}` returning a single pre-resolved `{ "key": .. }`.
    ByBarcode { path: String },
}

impl Default for PrimaryEndpoint {
    fn default() -> Self {
        PrimaryEndpoint::Collection {
            path: "getKey".to_string(),
        }
    }
}

impl PrimaryEndpoint {
    pub fn path(&self) -> &str {
        match self {
            PrimaryEndpoint::Collection { path } | PrimaryEndpoint::ByBarcode { path } => path,
        }
    }
}

/// Stage-2 JSON body field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondaryBody {
    /// `{ "searchValue": key }`
    #[default]
    SearchValue,
    /// `{ "key": key }`
    Key,
}
