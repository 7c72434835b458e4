//! Business logic services

pub mod access;
pub mod catalog;
pub mod loan_policy;
pub mod loans;

use std::sync::Arc;

use crate::repository::Repository;

use self::{access::AccessGate, loan_policy::LoanPolicy};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, policy: LoanPolicy, gate: Arc<dyn AccessGate>) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), gate.clone()),
            loans: loans::LoansService::new(repository, policy, gate),
        }
    }
}
