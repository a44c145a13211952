//! Lending policy knobs.

use serde::{Deserialize, Serialize};

/// Default cap on simultaneously active loans per member.
pub const DEFAULT_MAX_ACTIVE_BORROWS: u32 = 5;

/// Default loan length in days.
pub const DEFAULT_LOAN_DAYS: u32 = 14;

/// Default number of renewals allowed per loan.
pub const DEFAULT_MAX_RENEWALS: u32 = 2;

/// Longest loan period accepted from configuration (ten years).
pub const MAX_LOAN_DAYS: u32 = 3650;

/// Limits applied by the lending rules.
///
/// Built once at start-up and passed to whoever evaluates the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingPolicy {
    /// Maximum active loans a member may hold.
    pub max_active_borrows: u32,
    /// Days until a new loan is due; also the extension granted per renewal.
    pub loan_days: u32,
    /// Maximum renewals per loan.
    pub max_renewals: u32,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            max_active_borrows: DEFAULT_MAX_ACTIVE_BORROWS,
            loan_days: DEFAULT_LOAN_DAYS,
            max_renewals: DEFAULT_MAX_RENEWALS,
        }
    }
}

impl LendingPolicy {
    /// Loan length as a chrono duration, capped at [`MAX_LOAN_DAYS`].
    #[must_use]
    pub fn loan_duration(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.loan_days.min(MAX_LOAN_DAYS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = LendingPolicy::default();
        assert_eq!(policy.max_active_borrows, 5);
        assert_eq!(policy.loan_days, 14);
        assert_eq!(policy.max_renewals, 2);
        assert_eq!(policy.loan_duration(), chrono::Duration::days(14));
    }

    #[test]
    fn oversized_loan_days_are_capped() {
        let policy = LendingPolicy {
            loan_days: u32::MAX,
            ..Default::default()
        };
        assert_eq!(
            policy.loan_duration(),
            chrono::Duration::days(i64::from(MAX_LOAN_DAYS))
        );
    }
}
