//! Barcode authenticity pipeline: from a continuous barcode detector to an operator verdict.
//!
//! - **DetectionSource**: restartable stream of decoded barcodes from an opaque [Detector].
//! - **ScanSession**: dedup gate and linear state machine; one in-flight lookup per session,
//!   late results from a reset session are refused.
//! - **LookupClient**: the two registry calls (barcode -> key/batch, key -> owner) behind the
//!   [Registry] seam, with a staged [LookupError] taxonomy.
//! - **Verdict**: pure composition of both lookup results into the text the operator sees.
//! - **ScanController**: wires the above together and reports to a [PresentationSink].

pub mod barcode;
pub mod config;
pub mod controller;
pub mod lookup;
pub mod payload;
pub mod session;
pub mod sink;
pub mod source;
pub mod verdict;

pub use barcode::BarcodeValue;
pub use config::{LookupConfig, PrimaryEndpoint, SecondaryBody};
pub use controller::{ScanController, SCANNER_STOPPED_NOTICE};
pub use lookup::{ConfigError, LookupClient, LookupClientBuilder, LookupError, Registry, Stage};
pub use session::{ScanSession, SessionError, SessionState, Ticket};
pub use sink::{ChannelSink, FailureStage, Notice, PresentationSink, TracingSink};
pub use source::{DetectionFeed, DetectionSource, Detections, Detector, ManualDetector, ScanError};
pub use verdict::{PrimaryLookupResult, SecondaryVerificationResult, Verdict};
