//! Stable identifiers used throughout the domain model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::SentinelError;

/// International Securities Identification Number: 2-letter country prefix,
/// 9 alphanumeric characters, 1 check digit. We validate shape, not the
/// check digit algorithm (out of scope for this service).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isin(String);

impl Isin {
    pub fn parse(raw: &str) -> Result<Self, SentinelError> {
        let raw = raw.trim().to_uppercase();
        if raw.len() != 12 {
            return Err(SentinelError::validation(format!(
                "ISIN must be 12 characters, got {} ({raw})",
                raw.len()
            )));
        }
        let mut chars = raw.chars();
        let country: String = chars.by_ref().take(2).collect();
        if !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SentinelError::validation(format!(
                "ISIN {raw} must start with a 2-letter country code"
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SentinelError::validation(format!(
                "ISIN {raw} must be alphanumeric"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Isin {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isin {
    type Error = SentinelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isin> for String {
    fn from(value: Isin) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_isin() {
        assert!(Isin::parse("US0378331005").is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Isin::parse("US037833100").is_err());
    }

    #[test]
    fn rejects_non_alpha_country_prefix() {
        assert!(Isin::parse("100378331005").is_err());
    }

    #[test]
    fn normalizes_case() {
        assert_eq!(Isin::parse("us0378331005").unwrap().as_str(), "US0378331005");
    }
}
