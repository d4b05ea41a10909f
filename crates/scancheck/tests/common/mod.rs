//! Common helpers for integration tests.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid
//! per-binary warnings.
#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use scancheck::{
    BarcodeValue, LookupError, Notice, PrimaryLookupResult, Registry, ScanController,
    SecondaryVerificationResult, SessionState, Stage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, timeout};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("scancheck=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

pub fn barcode(s: &str) -> BarcodeValue {
    BarcodeValue::new(s).expect("non-empty barcode")
}

/// Base URL of a local port with nothing listening on it.
pub fn closed_port_url() -> Result<String> {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").context("bind for port")?;
        listener.local_addr()?.port()
    };
    Ok(format!("http://127.0.0.1:{}/", port))
}

/// Poll the controller until it reaches `state` (5s budget).
pub async fn wait_for_state(controller: &ScanController, state: SessionState) -> Result<()> {
    timeout(Duration::from_secs(5), async {
        while controller.state().await != state {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("controller never reached {:?}", state))
}

/// Drain everything currently queued on a notice channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn verdicts(notices: &[Notice]) -> Vec<String> {
    notices
        .iter()
        .filter_map(|n| match n {
            Notice::Verdict(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// In-memory registry with scripted answers and optional holds on either stage.
#[derive(Default)]
pub struct ScriptedRegistry {
    primary: Mutex<HashMap<String, PrimaryLookupResult>>,
    owners: Mutex<HashMap<String, String>>,
    primary_holds: Mutex<HashMap<String, Arc<Notify>>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    pub primary_calls: AtomicUsize,
    pub secondary_calls: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `barcode -> key` in batch `batch_id`, owned by `owner`.
    pub fn register(&self, barcode: &str, key: &str, batch_id: &str, owner: &str) {
        self.register_unowned(barcode, key, batch_id);
        self.owners
            .lock()
            .unwrap()
            .insert(key.to_string(), owner.to_string());
    }

    /// Register `barcode -> key` with no owner: stage 2 for `key` answers 404.
    pub fn register_unowned(&self, barcode: &str, key: &str, batch_id: &str) {
        self.primary.lock().unwrap().insert(
            barcode.to_string(),
            PrimaryLookupResult::Found {
                key: key.to_string(),
                batch_id: Some(batch_id.to_string()),
            },
        );
    }

    /// Stage 1 for `barcode` blocks until the returned handle is notified.
    pub fn hold_primary(&self, barcode: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.primary_holds
            .lock()
            .unwrap()
            .insert(barcode.to_string(), Arc::clone(&notify));
        notify
    }

    /// Stage 2 for `key` blocks until the returned handle is notified.
    pub fn hold_secondary(&self, key: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::clone(&notify));
        notify
    }
}

#[async_trait]
impl Registry for ScriptedRegistry {
    async fn lookup_primary(
        &self,
        barcode: &BarcodeValue,
    ) -> Result<PrimaryLookupResult, LookupError> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.primary_holds.lock().unwrap().get(barcode.as_str()).cloned();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        Ok(self
            .primary
            .lock()
            .unwrap()
            .get(barcode.as_str())
            .cloned()
            .unwrap_or(PrimaryLookupResult::NotFound))
    }

    async fn lookup_secondary(
        &self,
        key: &str,
    ) -> Result<SecondaryVerificationResult, LookupError> {
        self.secondary_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.holds.lock().unwrap().get(key).cloned();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        let owner = self.owners.lock().unwrap().get(key).cloned();
        match owner {
            Some(owner) => Ok(scancheck::verdict::classify_secondary(owner)),
            None => Err(LookupError::Server {
                stage: Stage::Secondary,
                code: 404,
            }),
        }
    }
}
