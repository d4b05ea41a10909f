//! PresentationSink: where the pipeline reports what the operator should see.

use crate::lookup::Stage;
use std::fmt;
use tokio::sync::mpsc;

/// Where a reported failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Scanner/camera bring-up.
    Initialization,
    Lookup(Stage),
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Initialization => f.write_str("initialization"),
            FailureStage::Lookup(stage) => write!(f, "{} lookup", stage),
        }
    }
}

/// Consumer of pipeline notifications (UI layer). Callbacks must not block.
pub trait PresentationSink: Send + Sync {
    fn on_verdict(&self, text: &str);
    fn on_transient_notice(&self, text: &str);
    fn on_error(&self, stage: FailureStage, detail: &str);
}

/// Renders notifications as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn on_verdict(&self, text: &str) {
        tracing::info!(verdict = text, "verdict");
    }

    fn on_transient_notice(&self, text: &str) {
        tracing::info!(notice = text, "notice");
    }

    fn on_error(&self, stage: FailureStage, detail: &str) {
        tracing::error!(%stage, detail, "scan failed");
    }
}

/// One notification, as delivered by [ChannelSink].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Verdict(String),
    Transient(String),
    Error { stage: FailureStage, detail: String },
}

/// Forwards notifications over an unbounded channel, for a UI loop (or a test) to drain.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            tracing::debug!("presentation channel closed, notice dropped");
        }
    }
}

impl PresentationSink for ChannelSink {
    fn on_verdict(&self, text: &str) {
        self.send(Notice::Verdict(text.to_string()));
    }

    fn on_transient_notice(&self, text: &str) {
        self.send(Notice::Transient(text.to_string()));
    }

    fn on_error(&self, stage: FailureStage, detail: &str) {
        self.send(Notice::Error {
            stage,
            detail: detail.to_string(),
        });
    }
}
