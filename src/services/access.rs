//! Capability checks

use crate::{
    error::{AppError, AppResult},
    models::user::{Capability, UserClaims},
};

/// Answers "does this principal hold that capability?"
#[cfg_attr(test, mockall::automock)]
pub trait AccessGate: Send + Sync {
    fn has_capability(&self, principal: &UserClaims, capability: Capability) -> bool;
}

/// Trusts the capabilities signed into the principal's token
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsGate;

impl AccessGate for ClaimsGate {
    fn has_capability(&self, principal: &UserClaims, capability: Capability) -> bool {
        principal.holds(capability)
    }
}

/// Guard run before an operation that needs `capability`
pub fn require(gate: &dyn AccessGate, principal: &UserClaims, capability: Capability) -> AppResult<()> {
    if gate.has_capability(principal, capability) {
        Ok(())
    } else {
        tracing::debug!(
            "Denied {} to user {} ({})",
            capability,
            principal.user_id,
            principal.sub
        );
        Err(AppError::Authorization(format!(
            "The {} capability is required",
            capability
        )))
    }
}
