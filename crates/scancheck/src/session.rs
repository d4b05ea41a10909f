//! ScanSession: dedup gate and linear state machine for one scan screen.
//!
//! `Idle -> Dispatching -> AwaitingPrimary -> AwaitingSecondary -> Settled`, with
//! `Settled` terminal until [ScanSession::reset]. Every dispatch hands out a [Ticket]
//! bound to the session generation; reset bumps the generation so results from an
//! abandoned lookup are refused instead of applied.

use crate::barcode::BarcodeValue;
use crate::verdict::Verdict;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Dispatching,
    AwaitingPrimary,
    AwaitingSecondary,
    Settled,
}

/// Proof of dispatch. Transitions must present the ticket of the lookup they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("stale ticket: issued in generation {issued}, session is at {current}")]
    Stale { issued: u64, current: u64 },
    #[error("cannot {action} while {state:?}")]
    OutOfOrder {
        state: SessionState,
        action: &'static str,
    },
}

/// Per-screen scan state. Not shared across sessions.
#[derive(Debug, Clone)]
pub struct ScanSession {
    state: SessionState,
    dispatched: bool,
    generation: u64,
    barcode: Option<BarcodeValue>,
    last_verdict: Option<Verdict>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            dispatched: false,
            generation: 0,
            barcode: None,
            last_verdict: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Barcode of the lookup currently owning the gate.
    pub fn barcode(&self) -> Option<&BarcodeValue> {
        self.barcode.as_ref()
    }

    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last_verdict.as_ref()
    }

    /// Gate check and set in one step: `Idle -> Dispatching` if nothing is dispatched.
    /// Returns `None` when the detection must be dropped.
    pub fn try_dispatch(&mut self, barcode: &BarcodeValue) -> Option<Ticket> {
        if self.dispatched || self.state != SessionState::Idle {
            return None;
        }
        self.dispatched = true;
        self.state = SessionState::Dispatching;
        self.barcode = Some(barcode.clone());
        Some(Ticket {
            generation: self.generation,
        })
    }

    /// `Dispatching -> AwaitingPrimary` once the stage-1 call is on its way.
    pub fn primary_issued(&mut self, ticket: Ticket) -> Result<(), SessionError> {
        self.advance(
            ticket,
            "issue primary lookup",
            &[SessionState::Dispatching],
            SessionState::AwaitingPrimary,
        )
    }

    /// `AwaitingPrimary -> AwaitingSecondary` after stage 1 found a key.
    pub fn primary_found(&mut self, ticket: Ticket) -> Result<(), SessionError> {
        self.advance(
            ticket,
            "start secondary lookup",
            &[SessionState::AwaitingPrimary],
            SessionState::AwaitingSecondary,
        )
    }

    /// Record the terminal verdict. `dispatched` stays set until [ScanSession::reset].
    pub fn settle(&mut self, ticket: Ticket, verdict: Verdict) -> Result<(), SessionError> {
        self.advance(
            ticket,
            "settle",
            &[SessionState::AwaitingPrimary, SessionState::AwaitingSecondary],
            SessionState::Settled,
        )?;
        self.last_verdict = Some(verdict);
        Ok(())
    }

    /// Operator reset ("scan again"): reopen the gate and invalidate outstanding tickets.
    /// The last verdict is kept until a newer one replaces it.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.dispatched = false;
        self.state = SessionState::Idle;
        self.barcode = None;
    }

    fn check(&self, ticket: Ticket) -> Result<(), SessionError> {
        if ticket.generation != self.generation {
            return Err(SessionError::Stale {
                issued: ticket.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn advance(
        &mut self,
        ticket: Ticket,
        action: &'static str,
        from: &[SessionState],
        to: SessionState,
    ) -> Result<(), SessionError> {
        self.check(ticket)?;
        if !from.contains(&self.state) {
            return Err(SessionError::OutOfOrder {
                state: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::Stage;

    fn barcode(s: &str) -> BarcodeValue {
        BarcodeValue::new(s).unwrap()
    }

    #[test]
    fn session_new() {
        let s = ScanSession::new();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.is_dispatched());
        assert!(s.last_verdict().is_none());
    }

    #[test]
    fn gate_admits_one_dispatch() {
        let mut s = ScanSession::new();
        let b = barcode("ABC123");
        assert!(s.try_dispatch(&b).is_some());
        assert!(s.try_dispatch(&b).is_none());
        assert!(s.try_dispatch(&barcode("OTHER")).is_none());
        assert_eq!(s.barcode(), Some(&b));
        assert_eq!(s.state(), SessionState::Dispatching);
    }

    #[test]
    fn full_path_to_settled() {
        let mut s = ScanSession::new();
        let t = s.try_dispatch(&barcode("ABC123")).unwrap();
        s.primary_issued(t).unwrap();
        assert_eq!(s.state(), SessionState::AwaitingPrimary);
        s.primary_found(t).unwrap();
        assert_eq!(s.state(), SessionState::AwaitingSecondary);
        s.settle(t, Verdict::NotInRegistry).unwrap();
        assert_eq!(s.state(), SessionState::Settled);
        assert_eq!(s.last_verdict(), Some(&Verdict::NotInRegistry));
        assert!(s.is_dispatched());
        assert!(s.try_dispatch(&barcode("ABC123")).is_none());
    }

    #[test]
    fn primary_failure_settles_and_keeps_gate_closed() {
        let mut s = ScanSession::new();
        let t = s.try_dispatch(&barcode("ABC123")).unwrap();
        s.primary_issued(t).unwrap();
        s.settle(t, Verdict::could_not_verify(Stage::Primary)).unwrap();
        assert!(s.try_dispatch(&barcode("ABC123")).is_none());
        s.reset();
        assert!(s.try_dispatch(&barcode("ABC123")).is_some());
    }

    #[test]
    fn out_of_order_transition_is_refused() {
        let mut s = ScanSession::new();
        let t = s.try_dispatch(&barcode("ABC123")).unwrap();
        let err = s.primary_found(t).unwrap_err();
        assert_eq!(
            err,
            SessionError::OutOfOrder {
                state: SessionState::Dispatching,
                action: "start secondary lookup"
            }
        );
        assert!(s.settle(t, Verdict::NotInRegistry).is_err());
        assert_eq!(s.state(), SessionState::Dispatching);
    }

    #[test]
    fn reset_invalidates_ticket() {
        let mut s = ScanSession::new();
        let old = s.try_dispatch(&barcode("ABC123")).unwrap();
        s.primary_issued(old).unwrap();
        s.reset();
        assert_eq!(s.generation(), 1);
        let new = s.try_dispatch(&barcode("XYZ")).unwrap();
        s.primary_issued(new).unwrap();
        let err = s.settle(old, Verdict::NotInRegistry).unwrap_err();
        assert!(err.to_string().contains("stale ticket"));
        assert_eq!(s.state(), SessionState::AwaitingPrimary);
        assert!(s.last_verdict().is_none());
    }

    #[test]
    fn reset_keeps_last_verdict() {
        let mut s = ScanSession::new();
        let t = s.try_dispatch(&barcode("ABC123")).unwrap();
        s.primary_issued(t).unwrap();
        s.settle(t, Verdict::NotInRegistry).unwrap();
        s.reset();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.barcode().is_none());
        assert_eq!(s.last_verdict(), Some(&Verdict::NotInRegistry));
    }
}
