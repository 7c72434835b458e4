//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::book::BookSummary;

/// Author record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// "Last, First" as shown in listings
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Author with the books that reference it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<BookSummary>,
}

/// Create / replace author request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_lifespan"))]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

fn validate_lifespan(input: &AuthorInput) -> Result<(), ValidationError> {
    match (input.date_of_birth, input.date_of_death) {
        (Some(born), Some(died)) if died < born => {
            let mut err = ValidationError::new("lifespan");
            err.message = Some("Date of death is before date of birth".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Author query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AuthorQuery {
    /// Matches first or last name, case-insensitive
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(born: Option<NaiveDate>, died: Option<NaiveDate>) -> AuthorInput {
        AuthorInput {
            first_name: "Ursula".into(),
            last_name: "Le Guin".into(),
            date_of_birth: born,
            date_of_death: died,
        }
    }

    #[test]
    fn death_before_birth_is_rejected() {
        let born = NaiveDate::from_ymd_opt(1929, 10, 21);
        let died = NaiveDate::from_ymd_opt(1900, 1, 1);
        assert!(input(born, died).validate().is_err());
        assert!(input(born, NaiveDate::from_ymd_opt(2018, 1, 22)).validate().is_ok());
        assert!(input(None, died).validate().is_ok());
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut author = input(None, None);
        author.last_name.clear();
        assert!(author.validate().is_err());
    }
}
