use crate::error::{ProcessingError, Result};
use crate::models::PostalKey;

/// Normalize free-form postal input ("pl 20-123", "DE 49876") to a [`PostalKey`]
///
/// Spaces and hyphens are dropped, letters are uppercased and everything past
/// the first two digits is discarded.
pub fn normalize_postal_code(raw: &str) -> Result<PostalKey> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if cleaned.is_empty() {
        return Err(ProcessingError::InvalidPostalCode(
            "empty postal code".to_string(),
        ));
    }

    let country: String = cleaned.chars().take(2).collect();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ProcessingError::InvalidPostalCode(format!(
            "'{}' must start with a two-letter country code",
            raw
        )));
    }

    let digits: String = cleaned[country.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(2)
        .collect();
    if digits.len() < 2 {
        return Err(ProcessingError::InvalidPostalCode(format!(
            "'{}' needs at least two digits after the country code",
            raw
        )));
    }

    PostalKey::new(&country, &digits)
}
