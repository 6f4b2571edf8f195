//! Calendar dates exchanged with the cancellation operation.

use chrono::{NaiveDate, Utc};

use crate::error::ValidationError;

/// Textual format of order dates: `DD/MM/YYYY`.
pub const ORDER_DATE_FORMAT: &str = "%d/%m/%Y";

/// A UTC calendar day identifying when orders were placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderDate(NaiveDate);

impl OrderDate {
    /// Parses a `DD/MM/YYYY` date.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        NaiveDate::parse_from_str(input.trim(), ORDER_DATE_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                input: input.to_string(),
            })
    }

    /// Today's date in UTC.
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for OrderDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl std::fmt::Display for OrderDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(ORDER_DATE_FORMAT))
    }
}

impl std::str::FromStr for OrderDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
