//! Loan date rules
//!
//! Pure functions over dates and statuses. Nothing in here touches the store;
//! [`LoansService`](super::loans::LoansService) applies these rules before it
//! writes.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

use crate::models::book_instance::{BookInstance, LoanStatus};

/// Days added to today to propose a renewal date (3 weeks)
pub const DEFAULT_RENEWAL_DAYS: i64 = 21;
/// Furthest a renewal may push the due date (4 weeks)
pub const MAX_RENEWAL_DAYS: i64 = 28;
/// Widest renewal window accepted from configuration
pub const RENEWAL_DAYS_LIMIT: i64 = 365;

/// Why a renewal date was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewalError {
    #[error("Invalid date - renewal in past")]
    PastDate { candidate: NaiveDate, today: NaiveDate },

    #[error("Invalid date - renewal more than {max_days} days ahead")]
    TooFarInFuture {
        candidate: NaiveDate,
        latest: NaiveDate,
        max_days: i64,
    },
}

/// True iff the copy is on loan and its due date has passed
pub fn is_overdue(status: LoanStatus, due_back: Option<NaiveDate>, as_of: NaiveDate) -> bool {
    status == LoanStatus::OnLoan && due_back.map_or(false, |due| due < as_of)
}

impl BookInstance {
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        is_overdue(self.status, self.due_back, as_of)
    }
}

/// Renewal window, in days from the current date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LoanPolicy {
    #[serde(default = "default_renewal_days")]
    pub default_renewal_days: i64,
    #[serde(default = "max_renewal_days")]
    pub max_renewal_days: i64,
}

fn default_renewal_days() -> i64 {
    DEFAULT_RENEWAL_DAYS
}

fn max_renewal_days() -> i64 {
    MAX_RENEWAL_DAYS
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            default_renewal_days: DEFAULT_RENEWAL_DAYS,
            max_renewal_days: MAX_RENEWAL_DAYS,
        }
    }
}

impl LoanPolicy {
    /// Requires `0 <= default_renewal_days <= max_renewal_days <= RENEWAL_DAYS_LIMIT`
    pub fn check(&self) -> Result<(), String> {
        if self.default_renewal_days < 0 {
            return Err(format!(
                "loans.default_renewal_days must not be negative (got {})",
                self.default_renewal_days
            ));
        }
        if self.default_renewal_days > self.max_renewal_days {
            return Err(format!(
                "loans.default_renewal_days ({}) exceeds loans.max_renewal_days ({})",
                self.default_renewal_days, self.max_renewal_days
            ));
        }
        if self.max_renewal_days > RENEWAL_DAYS_LIMIT {
            return Err(format!(
                "loans.max_renewal_days ({}) exceeds {} days",
                self.max_renewal_days, RENEWAL_DAYS_LIMIT
            ));
        }
        Ok(())
    }

    /// Date the renewal form is pre-filled with
    pub fn default_renewal_date(&self, as_of: NaiveDate) -> NaiveDate {
        as_of + Duration::days(self.default_renewal_days)
    }

    /// Last date a renewal may set
    pub fn latest_renewal_date(&self, as_of: NaiveDate) -> NaiveDate {
        as_of + Duration::days(self.max_renewal_days)
    }

    /// Accepts any date in `[as_of, as_of + max_renewal_days]`
    pub fn validate_renewal_date(&self, candidate: NaiveDate, as_of: NaiveDate) -> Result<(), RenewalError> {
        if candidate < as_of {
            return Err(RenewalError::PastDate {
                candidate,
                today: as_of,
            });
        }

        let latest = self.latest_renewal_date(as_of);
        if candidate > latest {
            return Err(RenewalError::TooFarInFuture {
                candidate,
                latest,
                max_days: self.max_renewal_days,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn on_loan_past_due_is_overdue() {
        let today = date(2024, 1, 10);
        assert!(is_overdue(LoanStatus::OnLoan, Some(date(2024, 1, 1)), today));
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = date(2024, 1, 10);
        assert!(!is_overdue(LoanStatus::OnLoan, Some(today), today));
        assert!(!is_overdue(LoanStatus::OnLoan, None, today));
    }

    #[test]
    fn other_statuses_are_never_overdue() {
        let today = date(2024, 1, 10);
        let long_ago = Some(date(2000, 1, 1));
        for status in [LoanStatus::Maintenance, LoanStatus::Available, LoanStatus::Reserved] {
            assert!(!is_overdue(status, long_ago, today), "{status} should not be overdue");
        }
    }

    #[test]
    fn default_renewal_is_three_weeks_out() {
        let policy = LoanPolicy::default();
        assert_eq!(policy.default_renewal_date(date(2024, 1, 10)), date(2024, 1, 31));
        assert_eq!(policy.default_renewal_date(date(2024, 2, 20)), date(2024, 3, 12));
        assert_eq!(policy.default_renewal_date(date(2023, 12, 25)), date(2024, 1, 15));
    }

    #[test]
    fn renewal_window_is_today_through_four_weeks() {
        let policy = LoanPolicy::default();
        let today = date(2024, 1, 10);

        assert!(policy.validate_renewal_date(today, today).is_ok());
        assert!(policy.validate_renewal_date(date(2024, 1, 20), today).is_ok());
        assert!(policy.validate_renewal_date(date(2024, 2, 7), today).is_ok());

        assert_eq!(
            policy.validate_renewal_date(date(2024, 1, 9), today),
            Err(RenewalError::PastDate {
                candidate: date(2024, 1, 9),
                today,
            })
        );
        assert_eq!(
            policy.validate_renewal_date(date(2024, 2, 8), today),
            Err(RenewalError::TooFarInFuture {
                candidate: date(2024, 2, 8),
                latest: date(2024, 2, 7),
                max_days: 28,
            })
        );
    }

    #[test]
    fn every_day_is_classified() {
        let policy = LoanPolicy::default();
        let today = date(2024, 6, 1);
        for offset in -40..=40 {
            let candidate = today + Duration::days(offset);
            let result = policy.validate_renewal_date(candidate, today);
            match offset {
                o if o < 0 => assert!(matches!(result, Err(RenewalError::PastDate { .. }))),
                o if o > MAX_RENEWAL_DAYS => {
                    assert!(matches!(result, Err(RenewalError::TooFarInFuture { .. })))
                }
                _ => assert!(result.is_ok()),
            }
        }
    }

    #[test]
    fn configured_window_is_respected() {
        let policy = LoanPolicy {
            default_renewal_days: 7,
            max_renewal_days: 14,
        };
        let today = date(2024, 1, 1);
        assert_eq!(policy.default_renewal_date(today), date(2024, 1, 8));
        assert!(policy.validate_renewal_date(date(2024, 1, 15), today).is_ok());
        assert!(policy.validate_renewal_date(date(2024, 1, 16), today).is_err());
    }

    #[test]
    fn windows_must_be_ordered_and_bounded() {
        assert!(LoanPolicy::default().check().is_ok());

        let window = |default_renewal_days, max_renewal_days| LoanPolicy {
            default_renewal_days,
            max_renewal_days,
        };
        assert!(window(0, 0).check().is_ok());
        assert!(window(30, RENEWAL_DAYS_LIMIT).check().is_ok());

        assert!(window(-1, 28).check().unwrap_err().contains("negative"));
        assert!(window(30, 28).check().unwrap_err().contains("exceeds loans.max_renewal_days"));
        assert!(window(21, i64::MAX).check().is_err());
        assert!(window(21, -5).check().is_err());
    }

    #[test]
    fn error_messages_name_the_problem() {
        let today = date(2024, 1, 10);
        let past = LoanPolicy::default()
            .validate_renewal_date(date(2024, 1, 1), today)
            .unwrap_err();
        assert_eq!(past.to_string(), "Invalid date - renewal in past");
    }
}
