//! Borrower model, capabilities and token claims

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A patron copies can be lent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrower {
    pub id: i32,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
}

/// Named permission a principal may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// See every patron's loans and borrower details
    ViewAllLoans,
    /// Lend, return and renew copies (librarian)
    MarkReturned,
    /// Create, edit and delete catalog records
    EditCatalog,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewAllLoans => "view-all-loans",
            Capability::MarkReturned => "mark-returned",
            Capability::EditCatalog => "edit-catalog",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims of the authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// Login
    pub sub: String,
    /// Borrower id of the principal
    pub user_id: i32,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Claims valid for `ttl_hours` from now
    pub fn new(
        user_id: i32,
        login: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
        ttl_hours: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: login.into(),
            user_id,
            capabilities: capabilities.into_iter().collect(),
            exp: (now + Duration::hours(ttl_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn holds(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_capabilities() {
        let claims = UserClaims::new(4, "librarian", [Capability::MarkReturned], 1);
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();

        assert_eq!(parsed, claims);
        assert!(parsed.holds(Capability::MarkReturned));
        assert!(!parsed.holds(Capability::ViewAllLoans));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = UserClaims::new(1, "patron", [], 1).create_token("one").unwrap();
        assert!(UserClaims::from_token(&token, "two").is_err());
    }

    #[test]
    fn capabilities_use_kebab_case_names() {
        assert_eq!(
            serde_json::to_string(&Capability::ViewAllLoans).unwrap(),
            "\"view-all-loans\""
        );
        assert_eq!(Capability::MarkReturned.to_string(), "mark-returned");
    }
}
