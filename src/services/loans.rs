//! Loan management service

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::{
    access::{require, AccessGate},
    loan_policy::LoanPolicy,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{BookInstanceDetails, InstanceFilter, InstanceOrder, LoanScope, LoanStatus, RenewalForm},
        pagination::Pagination,
        user::{Capability, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: LoanPolicy,
    gate: Arc<dyn AccessGate>,
}

fn with_overdue(mut details: BookInstanceDetails, today: NaiveDate) -> BookInstanceDetails {
    details.is_overdue = super::loan_policy::is_overdue(details.status, details.due_back, today);
    details
}

impl LoansService {
    pub fn new(repository: Repository, policy: LoanPolicy, gate: Arc<dyn AccessGate>) -> Self {
        Self {
            repository,
            policy,
            gate,
        }
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// Copies on loan, either the principal's own or everybody's
    pub async fn list_loans_for(
        &self,
        principal: &UserClaims,
        scope: LoanScope,
        page: Pagination,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let (filter, order) = match scope {
            LoanScope::Mine => (
                InstanceFilter {
                    borrower_id: Some(principal.user_id),
                    ..InstanceFilter::on_loan()
                },
                InstanceOrder::DueBack,
            ),
            LoanScope::All => {
                require(self.gate.as_ref(), principal, Capability::MarkReturned)?;
                (InstanceFilter::on_loan(), InstanceOrder::DueBackThenBorrower)
            }
        };

        let (loans, total) = self.repository.instances.list(&filter, order, page).await?;
        let loans = loans.into_iter().map(|l| with_overdue(l, today)).collect();
        Ok((loans, total))
    }

    /// Copies on loan whose due date has passed
    pub async fn list_overdue(
        &self,
        principal: &UserClaims,
        page: Pagination,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        require(self.gate.as_ref(), principal, Capability::ViewAllLoans)?;

        let filter = InstanceFilter {
            due_before: Some(today),
            ..InstanceFilter::on_loan()
        };
        let (loans, total) = self
            .repository
            .instances
            .list(&filter, InstanceOrder::DueBackThenBorrower, page)
            .await?;
        let loans = loans.into_iter().map(|l| with_overdue(l, today)).collect();
        Ok((loans, total))
    }

    /// Renewal form pre-filled with the default date
    pub async fn renewal_form(&self, principal: &UserClaims, id: Uuid, today: NaiveDate) -> AppResult<RenewalForm> {
        require(self.gate.as_ref(), principal, Capability::MarkReturned)?;

        let instance = self.repository.instances.get_details(id).await?;
        Ok(RenewalForm {
            instance: with_overdue(instance, today),
            proposed_renewal_date: self.policy.default_renewal_date(today),
            latest_renewal_date: self.policy.latest_renewal_date(today),
        })
    }

    /// Move the due date of a copy; nothing is written unless every check passes
    pub async fn renew(
        &self,
        principal: &UserClaims,
        id: Uuid,
        renewal_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<BookInstanceDetails> {
        require(self.gate.as_ref(), principal, Capability::MarkReturned)?;

        let instance = self.repository.instances.get(id).await?;
        self.policy.validate_renewal_date(renewal_date, today)?;

        self.repository.instances.set_due_back(id, renewal_date).await?;

        tracing::info!(
            "User {} renewed book instance {}: due back {:?} -> {}",
            principal.user_id,
            id,
            instance.due_back,
            renewal_date
        );

        let details = self.repository.instances.get_details(id).await?;
        Ok(with_overdue(details, today))
    }

    /// Lend an available copy to a borrower
    pub async fn lend(
        &self,
        principal: &UserClaims,
        id: Uuid,
        borrower_id: i32,
        due_back: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<BookInstanceDetails> {
        require(self.gate.as_ref(), principal, Capability::MarkReturned)?;

        let instance = self.repository.instances.get(id).await?;
        if instance.status != LoanStatus::Available {
            return Err(AppError::BusinessRule(format!(
                "Book instance {} is {}, not available",
                id, instance.status
            )));
        }

        self.repository.borrowers.get(borrower_id).await?;

        let due_back = match due_back {
            Some(date) => {
                self.policy.validate_renewal_date(date, today)?;
                date
            }
            None => self.policy.default_renewal_date(today),
        };

        // Someone else may have lent it since the read above
        self.repository
            .instances
            .check_out(id, borrower_id, due_back)
            .await?
            .ok_or_else(|| AppError::BusinessRule(format!("Book instance {} is no longer available", id)))?;

        tracing::info!(
            "User {} lent book instance {} to borrower {} until {}",
            principal.user_id,
            id,
            borrower_id,
            due_back
        );

        let details = self.repository.instances.get_details(id).await?;
        Ok(with_overdue(details, today))
    }

    /// Take a copy back and make it available again
    pub async fn mark_returned(&self, principal: &UserClaims, id: Uuid, today: NaiveDate) -> AppResult<BookInstanceDetails> {
        require(self.gate.as_ref(), principal, Capability::MarkReturned)?;

        let instance = self.repository.instances.get(id).await?;
        if instance.status != LoanStatus::OnLoan {
            return Err(AppError::BusinessRule(format!(
                "Book instance {} is {}, not on loan",
                id, instance.status
            )));
        }

        self.repository
            .instances
            .check_in(id)
            .await?
            .ok_or_else(|| AppError::BusinessRule(format!("Book instance {} is no longer on loan", id)))?;

        if instance.is_overdue(today) {
            tracing::info!(
                "Book instance {} returned late (was due {:?})",
                id,
                instance.due_back
            );
        }
        tracing::info!("User {} marked book instance {} returned", principal.user_id, id);

        let details = self.repository.instances.get_details(id).await?;
        Ok(with_overdue(details, today))
    }
}
