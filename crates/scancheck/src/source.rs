//! DetectionSource: restartable stream of decoded barcodes from an opaque detector.
//!
//! The detector pushes every decode through a [DetectionFeed]; nothing is batched or
//! correlated across frames, so a barcode held in view arrives many times. Each
//! `start()` opens a new run. Feeds and streams from an earlier run go quiet once a
//! newer run begins or the source is stopped.

use crate::barcode::BarcodeValue;
use futures_util::Stream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("error initializing barcode scanner: {0}")]
    Initialization(String),
}

/// Opaque barcode detector (camera + symbol decoder).
pub trait Detector: Send + Sync {
    /// Bring the detector up. Every decoded symbol must be passed to `feed` until
    /// [Detector::release] is called.
    fn initialize(&self, feed: DetectionFeed) -> Result<(), String>;

    fn release(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Stopped,
    Running(u64),
    /// Last initialization failed; stays quiet until the next explicit start.
    Inert,
}

struct Shared {
    phase: watch::Sender<Phase>,
    events: broadcast::Sender<(u64, BarcodeValue)>,
}

/// Handle a detector uses to report decodes (the `onDetected` callback).
/// Cheap to clone; safe to call from any thread.
#[derive(Clone)]
pub struct DetectionFeed {
    shared: Arc<Shared>,
    run: u64,
}

impl DetectionFeed {
    /// Report one decoded string. Returns false if it was dropped (empty, or this
    /// feed's run is no longer active).
    pub fn detected(&self, raw: impl Into<String>) -> bool {
        if *self.shared.phase.borrow() != Phase::Running(self.run) {
            tracing::debug!(run = self.run, "detection after stop dropped");
            return false;
        }
        let Some(barcode) = BarcodeValue::new(raw) else {
            tracing::debug!("empty decode dropped");
            return false;
        };
        // Err only means no stream is subscribed right now.
        let _ = self.shared.events.send((self.run, barcode));
        true
    }
}

/// Wraps a [Detector] and exposes its decodes as a restartable [Detections] stream.
pub struct DetectionSource {
    detector: Arc<dyn Detector>,
    shared: Arc<Shared>,
    runs: AtomicU64,
}

impl DetectionSource {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        let (phase, _) = watch::channel(Phase::Stopped);
        let (events, _) = broadcast::channel(256);
        Self {
            detector,
            shared: Arc::new(Shared { phase, events }),
            runs: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.shared.phase.borrow(), Phase::Running(_))
    }

    pub fn is_inert(&self) -> bool {
        *self.shared.phase.borrow() == Phase::Inert
    }

    /// Start (or restart) detection. A running source is stopped first, so the
    /// returned stream always belongs to a fresh run.
    ///
    /// On initialization failure the source is left inert and nothing is retried.
    pub fn start(&self) -> Result<Detections, ScanError> {
        self.stop();
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let events = self.shared.events.subscribe();
        let phase = self.shared.phase.subscribe();
        self.shared.phase.send_replace(Phase::Running(run));
        let feed = DetectionFeed {
            shared: Arc::clone(&self.shared),
            run,
        };
        if let Err(reason) = self.detector.initialize(feed) {
            self.shared.phase.send_replace(Phase::Inert);
            tracing::warn!(%reason, "barcode detector failed to initialize");
            return Err(ScanError::Initialization(reason));
        }
        tracing::info!(run, "barcode detector started");
        Ok(Detections { events, phase, run })
    }

    /// Stop detection. Idempotent; returns true only if a run was actually stopped.
    pub fn stop(&self) -> bool {
        let stopped = self.shared.phase.send_if_modified(|phase| {
            if matches!(phase, Phase::Running(_)) {
                *phase = Phase::Stopped;
                true
            } else {
                false
            }
        });
        if stopped {
            self.detector.release();
            tracing::info!("barcode detector stopped");
        }
        stopped
    }
}

impl Drop for DetectionSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decodes of one run, in arrival order. Ends once that run is stopped or replaced.
pub struct Detections {
    events: broadcast::Receiver<(u64, BarcodeValue)>,
    phase: watch::Receiver<Phase>,
    run: u64,
}

impl Detections {
    fn is_current(&mut self) -> bool {
        *self.phase.borrow_and_update() == Phase::Running(self.run)
    }

    /// Next decode, or `None` once the run is over.
    pub async fn next(&mut self) -> Option<BarcodeValue> {
        loop {
            if !self.is_current() {
                return None;
            }
            tokio::select! {
                biased;
                changed = self.phase.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                received = self.events.recv() => match received {
                    Ok((run, barcode)) if run == self.run => return Some(barcode),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "detections lagged, oldest dropped");
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = BarcodeValue> {
        futures_util::stream::unfold(self, |mut detections| async move {
            detections.next().await.map(|barcode| (barcode, detections))
        })
    }
}

/// Detector for hardware that hands over already-decoded strings (keyboard-wedge
/// scanners, manual entry). Decodes are pushed with [ManualDetector::push].
#[derive(Default)]
pub struct ManualDetector {
    feed: Mutex<Option<DetectionFeed>>,
}

impl ManualDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one decode into the current run. False if dropped or not started.
    pub fn push(&self, raw: impl Into<String>) -> bool {
        let feed = match self.feed.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        feed.map(|feed| feed.detected(raw)).unwrap_or(false)
    }

    fn set_feed(&self, feed: Option<DetectionFeed>) {
        match self.feed.lock() {
            Ok(mut guard) => *guard = feed,
            Err(poisoned) => *poisoned.into_inner() = feed,
        }
    }
}

impl Detector for ManualDetector {
    fn initialize(&self, feed: DetectionFeed) -> Result<(), String> {
        self.set_feed(Some(feed));
        Ok(())
    }

    fn release(&self) {
        self.set_feed(None);
    }
}
