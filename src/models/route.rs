use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// Country code plus the first two postal digits, e.g. `PL50`
///
/// Every lookup into the coordinate table goes through this key, so distinct
/// postal codes sharing their first two digits collapse onto one location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalKey(String);

impl PostalKey {
    pub fn new(country: &str, digits: &str) -> Result<Self> {
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ProcessingError::InvalidPostalCode(format!(
                "invalid country code '{}'",
                country
            )));
        }

        if digits.len() < 2 || !digits.chars().take(2).all(|c| c.is_ascii_digit()) {
            return Err(ProcessingError::InvalidPostalCode(format!(
                "postal code '{}' must start with two digits",
                digits
            )));
        }

        Ok(Self(format!("{}{}", country.to_ascii_uppercase(), &digits[..2])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country(&self) -> &str {
        &self.0[..2]
    }

    pub fn digits(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for PostalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostalKey {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() < 4 || !s.is_char_boundary(2) {
            return Err(ProcessingError::InvalidPostalCode(format!(
                "'{}' is not a postal key",
                s
            )));
        }
        let (country, digits) = s.split_at(2);
        Self::new(country, digits)
    }
}

impl TryFrom<String> for PostalKey {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PostalKey> for String {
    fn from(key: PostalKey) -> Self {
        key.0
    }
}

/// One side of a route: country code and the postal digits as written in the route code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteEndpoint {
    pub country: String,
    pub postal: String,
}

impl RouteEndpoint {
    fn parse_segment(code: &str, segment: &str) -> Result<Self> {
        let invalid = |reason: String| ProcessingError::InvalidRouteCode {
            code: code.to_string(),
            reason,
        };

        let segment = segment.trim();
        if segment.len() < 4 || !segment.is_char_boundary(2) {
            return Err(invalid(format!(
                "segment '{}' must be a country code followed by at least two digits",
                segment
            )));
        }

        let (country, postal) = segment.split_at(2);
        if !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid(format!("'{}' is not a country code", country)));
        }
        if !postal.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(format!("'{}' is not a numeric postal code", postal)));
        }

        Ok(Self {
            country: country.to_ascii_uppercase(),
            postal: postal.to_string(),
        })
    }

    pub fn from_postal_key(key: &PostalKey) -> Self {
        Self {
            country: key.country().to_string(),
            postal: key.digits().to_string(),
        }
    }

    pub fn postal_key(&self) -> PostalKey {
        // Parsing guarantees two letters and at least two digits
        PostalKey(format!("{}{}", self.country, &self.postal[..2]))
    }

    /// Table keys from the full postal code down to the two-digit prefix
    pub fn lookup_keys(&self) -> Vec<String> {
        (2..=self.postal.len())
            .rev()
            .map(|len| format!("{}{}", self.country, &self.postal[..len]))
            .collect()
    }

    pub fn code(&self) -> String {
        format!("{}{}", self.country, self.postal)
    }
}

/// A parsed `<CountryA><DigitsA>-<CountryB><DigitsB>` route code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteCode {
    origin: RouteEndpoint,
    destination: RouteEndpoint,
}

impl RouteCode {
    pub fn parse(code: &str) -> Result<Self> {
        let parts: Vec<&str> = code.trim().split('-').collect();

        if parts.len() != 2 {
            return Err(ProcessingError::InvalidRouteCode {
                code: code.to_string(),
                reason: format!(
                    "expected exactly two hyphen-separated segments, found {}",
                    parts.len()
                ),
            });
        }

        Ok(Self {
            origin: RouteEndpoint::parse_segment(code, parts[0])?,
            destination: RouteEndpoint::parse_segment(code, parts[1])?,
        })
    }

    pub fn from_postal_keys(origin: &PostalKey, destination: &PostalKey) -> Self {
        Self {
            origin: RouteEndpoint::from_postal_key(origin),
            destination: RouteEndpoint::from_postal_key(destination),
        }
    }

    pub fn origin(&self) -> &RouteEndpoint {
        &self.origin
    }

    pub fn destination(&self) -> &RouteEndpoint {
        &self.destination
    }

    /// `(origin country, origin postal, destination country, destination postal)`
    pub fn components(&self) -> (&str, &str, &str, &str) {
        (
            &self.origin.country,
            &self.origin.postal,
            &self.destination.country,
            &self.destination.postal,
        )
    }
}

impl fmt::Display for RouteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin.code(), self.destination.code())
    }
}

impl FromStr for RouteCode {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split a route code into `(countryA, postalA, countryB, postalB)`
pub fn parse_route_code(code: &str) -> Result<(String, String, String, String)> {
    let route = RouteCode::parse(code)?;
    let (a, pa, b, pb) = route.components();
    Ok((a.to_string(), pa.to_string(), b.to_string(), pb.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_code() {
        let parsed = parse_route_code("NL89-CZ50").unwrap();
        assert_eq!(
            parsed,
            (
                "NL".to_string(),
                "89".to_string(),
                "CZ".to_string(),
                "50".to_string()
            )
        );
    }

    #[test]
    fn test_parse_is_inverse_of_display() {
        for code in ["NL89-CZ50", "PL50-DE10", "FR75001-ES08", "IT20-PL00"] {
            let route = RouteCode::parse(code).unwrap();
            assert_eq!(route.to_string(), code);
        }
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let route = RouteCode::parse(" nl89-cz50 ").unwrap();
        assert_eq!(route.to_string(), "NL89-CZ50");
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        for code in ["NL89", "NL89-CZ50-DE10", "", "NL89CZ50"] {
            let err = RouteCode::parse(code).unwrap_err();
            assert!(matches!(err, ProcessingError::InvalidRouteCode { .. }), "{}", code);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_segments() {
        assert!(RouteCode::parse("N189-CZ50").is_err());
        assert!(RouteCode::parse("NL8-CZ50").is_err());
        assert!(RouteCode::parse("NL89-CZ5A").is_err());
        assert!(RouteCode::parse("NL89-").is_err());
    }

    #[test]
    fn test_lookup_keys_most_specific_first() {
        let route = RouteCode::parse("PT8500-ES08").unwrap();
        assert_eq!(
            route.origin().lookup_keys(),
            vec!["PT8500", "PT850", "PT85"]
        );
        assert_eq!(route.destination().lookup_keys(), vec!["ES08"]);
    }

    #[test]
    fn test_postal_key_coarsening() {
        let a = RouteCode::parse("PL50123-DE10").unwrap();
        let b = RouteCode::parse("PL50999-DE10").unwrap();
        assert_eq!(a.origin().postal_key(), b.origin().postal_key());
        assert_eq!(a.origin().postal_key().as_str(), "PL50");
    }

    #[test]
    fn test_postal_key_serde() {
        let key: PostalKey = serde_json::from_str("\"PL50\"").unwrap();
        assert_eq!(key.country(), "PL");
        assert_eq!(key.digits(), "50");
        assert!(serde_json::from_str::<PostalKey>("\"P50\"").is_err());
    }
}
