// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-owner usage ledger

use serde::{Deserialize, Serialize};

use crate::{Result, TaxisError};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub used_bytes: u64,
    pub limit_bytes: u64,
}

/// Incrementally maintained byte count for one owner.
///
/// Invariant: `used_bytes <= limit_bytes` after every accepted `commit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaLedger {
    used_bytes: u64,
    limit_bytes: u64,
}

impl QuotaLedger {
    pub fn new(used_bytes: u64, limit_bytes: u64) -> Self {
        Self { used_bytes, limit_bytes }
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.limit_bytes.saturating_sub(self.used_bytes)
    }

    /// Would `incoming` more bytes still fit
    pub fn admits(&self, incoming: u64) -> bool {
        self.used_bytes
            .checked_add(incoming)
            .is_some_and(|after| after <= self.limit_bytes)
    }

    pub fn decision(&self, incoming: u64) -> AdmissionDecision {
        AdmissionDecision {
            allowed: self.admits(incoming),
            used_bytes: self.used_bytes,
            limit_bytes: self.limit_bytes,
        }
    }

    /// Err with `CapacityExceeded` unless `incoming` fits. Never mutates.
    pub fn check(&self, owner: &str, incoming: u64) -> Result<()> {
        if self.admits(incoming) {
            Ok(())
        } else {
            Err(TaxisError::CapacityExceeded {
                owner: owner.to_string(),
                used_bytes: self.used_bytes,
                requested_bytes: incoming,
                limit_bytes: self.limit_bytes,
            })
        }
    }

    /// Record bytes that were admitted and written
    pub fn commit(&mut self, bytes: u64) {
        self.used_bytes = self.used_bytes.saturating_add(bytes);
    }

    /// Record bytes that were deleted
    pub fn release(&mut self, bytes: u64) {
        self.used_bytes = self.used_bytes.saturating_sub(bytes);
    }

    /// Replace the recorded usage with a measured value
    pub fn reset(&mut self, actual_bytes: u64) {
        self.used_bytes = actual_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GIB;

    #[test]
    fn test_second_upload_rejected_without_state_change() {
        let mut ledger = QuotaLedger::new(0, 100 * GIB);

        ledger.check("alice", 60 * GIB).unwrap();
        ledger.commit(60 * GIB);

        let err = ledger.check("alice", 50 * GIB).unwrap_err();
        assert!(err.is_capacity_exceeded());
        match err {
            TaxisError::CapacityExceeded { used_bytes, requested_bytes, limit_bytes, .. } => {
                assert_eq!(used_bytes, 60 * GIB);
                assert_eq!(requested_bytes, 50 * GIB);
                assert_eq!(limit_bytes, 100 * GIB);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.used_bytes(), 60 * GIB);
    }

    #[test]
    fn test_exact_fit_is_admitted() {
        let ledger = QuotaLedger::new(40, 100);
        assert!(ledger.admits(60));
        assert!(!ledger.admits(61));
        assert_eq!(ledger.remaining_bytes(), 60);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let ledger = QuotaLedger::new(10, u64::MAX);
        assert!(!ledger.admits(u64::MAX));
    }

    #[test]
    fn test_release_saturates() {
        let mut ledger = QuotaLedger::new(10, 100);
        ledger.release(50);
        assert_eq!(ledger.used_bytes(), 0);
    }

    #[test]
    fn test_invariant_over_operation_sequence() {
        let mut ledger = QuotaLedger::new(0, 1000);
        let ops: [(bool, u64); 8] = [
            (true, 400), (true, 500), (true, 200), (false, 400),
            (true, 450), (true, 100), (false, 900), (true, 1000),
        ];
        for (is_admit, bytes) in ops {
            if is_admit {
                if ledger.check("bob", bytes).is_ok() {
                    ledger.commit(bytes);
                }
            } else {
                ledger.release(bytes);
            }
            assert!(ledger.used_bytes() <= ledger.limit_bytes());
        }
    }

    #[test]
    fn test_decision_reports_usage() {
        let ledger = QuotaLedger::new(70, 100);
        let decision = ledger.decision(40);
        assert!(!decision.allowed);
        assert_eq!(decision.used_bytes, 70);
        assert_eq!(decision.limit_bytes, 100);
    }
}
