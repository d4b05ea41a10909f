//! Response interpretation: raw registry payloads to lookup results, and lookup results
//! to the operator-facing [Verdict]. Everything here is pure.

use crate::lookup::Stage;
use crate::payload::BatchRecord;
use serde::Serialize;
use std::fmt;

/// Stage-2 result string that marks a key as not verified (exact, case-sensitive).
pub const NOT_VERIFIED_SENTINEL: &str = "Not Verified";

/// Outcome of the primary registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryLookupResult {
    NotFound,
    /// `batch_id` is absent for the path-parameterized endpoint.
    Found {
        key: String,
        batch_id: Option<String>,
    },
}

impl PrimaryLookupResult {
    pub fn key(&self) -> Option<&str> {
        match self {
            PrimaryLookupResult::Found { key, .. } => Some(key),
            PrimaryLookupResult::NotFound => None,
        }
    }
}

/// Outcome of the secondary registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryVerificationResult {
    Verified { owner: String },
    NotVerified,
}

/// Scan the primary collection for the first pair whose value equals `barcode`.
/// Records and pairs are visited in payload order; first match wins.
pub fn match_primary(records: &[BatchRecord], barcode: &str) -> PrimaryLookupResult {
    records
        .iter()
        .find_map(|record| {
            record
                .key_value_pairs
                .iter()
                .find(|pair| pair.value == barcode)
                .map(|pair| PrimaryLookupResult::Found {
                    key: pair.key.clone(),
                    batch_id: Some(record.batch_id.clone()),
                })
        })
        .unwrap_or(PrimaryLookupResult::NotFound)
}

/// Map the path-variant `{ key }` response; a missing or empty key is `NotFound`.
pub fn primary_from_key(key: Option<String>) -> PrimaryLookupResult {
    match key {
        Some(key) if !key.is_empty() => PrimaryLookupResult::Found {
            key,
            batch_id: None,
        },
        _ => PrimaryLookupResult::NotFound,
    }
}

/// Map the stage-2 result string.
pub fn classify_secondary(result: String) -> SecondaryVerificationResult {
    if result == NOT_VERIFIED_SENTINEL {
        SecondaryVerificationResult::NotVerified
    } else {
        SecondaryVerificationResult::Verified { owner: result }
    }
}

/// Terminal outcome of one scan. Rendered with `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    NotInRegistry,
    Original {
        batch_id: Option<String>,
        key: String,
        owner: String,
    },
    NotVerified {
        batch_id: Option<String>,
        key: String,
    },
    CouldNotVerify {
        stage: Stage,
    },
}

impl Verdict {
    /// Compose from stage 1 and, if it was reached, stage 2.
    ///
    /// `Found` without a stage-2 result means stage 2 never completed and yields
    /// [Verdict::CouldNotVerify] for the secondary stage.
    pub fn compose(
        primary: &PrimaryLookupResult,
        secondary: Option<&SecondaryVerificationResult>,
    ) -> Verdict {
        match (primary, secondary) {
            (PrimaryLookupResult::NotFound, _) => Verdict::NotInRegistry,
            (PrimaryLookupResult::Found { .. }, None) => {
                Verdict::could_not_verify(Stage::Secondary)
            }
            (
                PrimaryLookupResult::Found { key, batch_id },
                Some(SecondaryVerificationResult::Verified { owner }),
            ) => Verdict::Original {
                batch_id: batch_id.clone(),
                key: key.clone(),
                owner: owner.clone(),
            },
            (
                PrimaryLookupResult::Found { key, batch_id },
                Some(SecondaryVerificationResult::NotVerified),
            ) => Verdict::NotVerified {
                batch_id: batch_id.clone(),
                key: key.clone(),
            },
        }
    }

    pub fn could_not_verify(stage: Stage) -> Verdict {
        Verdict::CouldNotVerify { stage }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::CouldNotVerify { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::NotInRegistry => f.write_str("not in registry"),
            Verdict::Original {
                batch_id,
                key,
                owner,
            } => {
                f.write_str("original item; ")?;
                if let Some(batch_id) = batch_id {
                    write!(f, "batch={}; ", batch_id)?;
                }
                write!(f, "key={}; owner={}; verified", key, owner)
            }
            Verdict::NotVerified { .. } => {
                f.write_str("matched primary registry but not verified downstream")
            }
            Verdict::CouldNotVerify { stage } => {
                write!(f, "could not verify: {} lookup failed", stage)
            }
        }
    }
}
