//! Book instance (loanable copy) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::user::Borrower;

/// Lending status of a copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    /// Single-letter code stored in the database
    pub fn as_code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(LoanStatus::Maintenance),
            "o" => Some(LoanStatus::OnLoan),
            "a" => Some(LoanStatus::Available),
            "r" => Some(LoanStatus::Reserved),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        };
        f.write_str(label)
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code: &str = Decode::<Postgres>::decode(value)?;
        LoanStatus::from_code(code.trim())
            .ok_or_else(|| format!("Invalid loan status code: {}", code).into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_code(), buf)
    }
}

/// Book instance record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    /// Edition / printing text
    pub imprint: String,
    /// `None` when the copy is not on loan
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
    pub language_id: Option<i32>,
}

/// Book instance joined with its book title, borrower and language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookInstanceDetails {
    pub id: Uuid,
    pub book_id: i32,
    pub book_title: String,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub language: Option<String>,
    pub borrower: Option<Borrower>,
    pub is_overdue: bool,
}

impl BookInstanceDetails {
    /// Hide who holds the copy
    pub fn redact_borrower(mut self) -> Self {
        self.borrower = None;
        self
    }
}

/// Create / replace book instance request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_loan_fields"))]
pub struct BookInstanceInput {
    pub book_id: i32,
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1-200 characters"))]
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    #[serde(default)]
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
    pub language_id: Option<i32>,
}

/// An on-loan copy needs a borrower and a due date
fn validate_loan_fields(input: &BookInstanceInput) -> Result<(), ValidationError> {
    if input.status == LoanStatus::OnLoan && (input.borrower_id.is_none() || input.due_back.is_none()) {
        let mut err = ValidationError::new("on_loan_fields");
        err.message = Some("A copy on loan needs a borrower and a due date".into());
        return Err(err);
    }
    Ok(())
}

/// Store-level filter over book instances
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    pub status: Option<LoanStatus>,
    pub borrower_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Strictly earlier due dates only
    pub due_before: Option<NaiveDate>,
}

impl InstanceFilter {
    pub fn on_loan() -> Self {
        Self {
            status: Some(LoanStatus::OnLoan),
            ..Self::default()
        }
    }

    pub fn matches(&self, instance: &BookInstance) -> bool {
        self.status.map_or(true, |s| instance.status == s)
            && self.borrower_id.map_or(true, |b| instance.borrower_id == Some(b))
            && self.book_id.map_or(true, |b| instance.book_id == b)
            && self
                .due_before
                .map_or(true, |d| instance.due_back.map_or(false, |due| due < d))
    }
}

/// Ordering of instance listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstanceOrder {
    /// due_back ascending, undated copies last
    #[default]
    DueBack,
    /// due_back ascending, then borrower last name ascending
    DueBackThenBorrower,
}

/// Whose loans a listing covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanScope {
    /// Copies the principal has borrowed
    #[default]
    Mine,
    /// Every copy on loan; librarians only
    All,
}

/// Renewal form as first displayed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenewalForm {
    pub instance: BookInstanceDetails,
    /// Pre-filled value of the date field
    pub proposed_renewal_date: NaiveDate,
    /// Latest date the form accepts
    pub latest_renewal_date: NaiveDate,
}

/// Book instance query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookInstanceQuery {
    pub status: Option<LoanStatus>,
    pub book_id: Option<i32>,
    /// Requires the view-all-loans capability
    pub borrower_id: Option<i32>,
    pub due_before: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookInstanceQuery {
    pub fn filter(&self) -> InstanceFilter {
        InstanceFilter {
            status: self.status,
            borrower_id: self.borrower_id,
            book_id: self.book_id,
            due_before: self.due_before,
        }
    }
}
