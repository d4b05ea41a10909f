//! ScanController: drives detections through the session gate and the two-stage lookup,
//! and reports every outcome to the [PresentationSink].
//!
//! Gate checks and state transitions happen under the session mutex, so two
//! near-simultaneous detections can never both pass the gate. Each admitted barcode
//! runs in its own spawned task: stage 1, then stage 2 if a key was found. Reset does
//! not cancel that task; its late results are refused by the session (stale ticket)
//! and never reach the sink.

use crate::barcode::BarcodeValue;
use crate::lookup::{LookupError, Registry};
use crate::session::{ScanSession, SessionError, SessionState, Ticket};
use crate::sink::{FailureStage, PresentationSink};
use crate::source::{DetectionSource, Detections, ScanError};
use crate::verdict::Verdict;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Transient notice sent when a running scanner is stopped.
pub const SCANNER_STOPPED_NOTICE: &str = "barcode scanner has been stopped";

/// One scan screen: owns its session, shares the registry and sink.
#[derive(Clone)]
pub struct ScanController {
    session: Arc<Mutex<ScanSession>>,
    registry: Arc<dyn Registry>,
    sink: Arc<dyn PresentationSink>,
}

impl ScanController {
    /// The session is injected so its lifetime is the caller's, not the scanner's.
    pub fn new(
        session: ScanSession,
        registry: Arc<dyn Registry>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            registry,
            sink,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    pub async fn last_verdict(&self) -> Option<Verdict> {
        self.session.lock().await.last_verdict().cloned()
    }

    /// Start the detector. Initialization failure is reported to the sink once.
    pub fn start_scanning(&self, source: &DetectionSource) -> Result<Detections, ScanError> {
        source.start().map_err(|e| {
            self.sink
                .on_error(FailureStage::Initialization, &e.to_string());
            e
        })
    }

    /// Stop the detector; notifies the sink only if it was running.
    pub fn stop_scanning(&self, source: &DetectionSource) {
        if source.stop() {
            self.sink.on_transient_notice(SCANNER_STOPPED_NOTICE);
        }
    }

    /// Feed every detection of `detections` through the gate until the run ends.
    pub async fn run(&self, mut detections: Detections) {
        while let Some(barcode) = detections.next().await {
            self.on_detected(barcode).await;
        }
        tracing::debug!("detection run ended");
    }

    /// Handle one detection. Returns the pipeline task if the gate admitted it.
    pub async fn on_detected(&self, barcode: BarcodeValue) -> Option<JoinHandle<()>> {
        let ticket = self.session.lock().await.try_dispatch(&barcode);
        let Some(ticket) = ticket else {
            tracing::debug!(%barcode, "lookup already dispatched, detection dropped");
            return None;
        };
        tracing::info!(%barcode, generation = ticket.generation(), "barcode accepted, verifying");
        self.sink
            .on_transient_notice(&format!("searching: {}", barcode));
        let this = self.clone();
        Some(tokio::spawn(async move {
            this.verify(ticket, barcode).await;
        }))
    }

    /// Operator "scan again": reopen the gate. In-flight lookups are left to finish and
    /// are discarded when they report back.
    pub async fn scan_again(&self) {
        let mut session = self.session.lock().await;
        session.reset();
        tracing::info!(generation = session.generation(), "scan session reset");
    }

    async fn verify(&self, ticket: Ticket, barcode: BarcodeValue) {
        if let Err(e) = self.session.lock().await.primary_issued(ticket) {
            discard(&e);
            return;
        }
        let primary = match self.registry.lookup_primary(&barcode).await {
            Ok(primary) => primary,
            Err(e) => return self.fail(ticket, e).await,
        };
        let key = match primary.key() {
            Some(key) => key.to_string(),
            None => return self.settle(ticket, Verdict::compose(&primary, None)).await,
        };
        if let Err(e) = self.session.lock().await.primary_found(ticket) {
            discard(&e);
            return;
        }
        match self.registry.lookup_secondary(&key).await {
            Ok(secondary) => {
                self.settle(ticket, Verdict::compose(&primary, Some(&secondary)))
                    .await
            }
            Err(e) => self.fail(ticket, e).await,
        }
    }

    async fn settle(&self, ticket: Ticket, verdict: Verdict) {
        let mut session = self.session.lock().await;
        match session.settle(ticket, verdict.clone()) {
            Ok(()) => {
                tracing::info!(%verdict, "scan settled");
                self.sink.on_verdict(&verdict.to_string());
            }
            Err(e) => discard(&e),
        }
    }

    /// One error notice plus the failure verdict, unless the lookup was abandoned.
    async fn fail(&self, ticket: Ticket, err: LookupError) {
        let stage = err.stage();
        let verdict = Verdict::could_not_verify(stage);
        let mut session = self.session.lock().await;
        match session.settle(ticket, verdict.clone()) {
            Ok(()) => {
                tracing::warn!(%stage, reason = %err, "lookup failed");
                self.sink
                    .on_error(FailureStage::Lookup(stage), &err.to_string());
                self.sink.on_verdict(&verdict.to_string());
            }
            Err(e) => {
                tracing::debug!(reason = %err, "abandoned lookup failed");
                discard(&e);
            }
        }
    }
}

fn discard(err: &SessionError) {
    tracing::debug!(reason = %err, "late lookup result discarded");
}
