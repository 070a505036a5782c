use std::collections::HashSet;
use std::fs;
use std::path::Path;

use encoding_rs::WINDOWS_1250;
use tracing::{info, warn};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::ROUTE_CSV_COLUMN;

/// Reads route code lists
///
/// Two layouts are accepted: a JSON array of strings, or a CSV export with a
/// `Lane Name` column. Order is preserved exactly, since checkpoints are
/// matched positionally against it.
pub struct RouteReader {
    column: String,
}

impl RouteReader {
    pub fn new() -> Self {
        Self {
            column: ROUTE_CSV_COLUMN.to_string(),
        }
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    pub fn read_routes(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes);

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
            || text.trim_start().starts_with('[');

        let routes = if is_json {
            serde_json::from_str::<Vec<String>>(&text).map_err(|e| {
                ProcessingError::InvalidFormat(format!(
                    "{} is not a JSON array of route codes: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            self.parse_csv(&text)?
        };

        info!("Read {} routes from {}", routes.len(), path.display());
        Ok(routes)
    }

    /// Route codes from the configured column, deduplicated in first-seen order
    pub fn parse_csv(&self, text: &str) -> Result<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(detect_delimiter(text))
            .flexible(true)
            .from_reader(text.as_bytes());

        let column = reader
            .headers()?
            .iter()
            .position(|h| h.trim() == self.column)
            .ok_or_else(|| {
                ProcessingError::MissingData(format!("CSV has no '{}' column", self.column))
            })?;

        let mut seen = HashSet::new();
        let mut routes = Vec::new();
        let mut duplicates = 0usize;

        for record in reader.records() {
            let record = record?;
            let code = match record.get(column).map(str::trim) {
                Some(code) if !code.is_empty() => code,
                _ => continue,
            };
            if seen.insert(code.to_string()) {
                routes.push(code.to_string());
            } else {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            warn!("Dropped {} duplicate route codes", duplicates);
        }

        Ok(routes)
    }
}

impl Default for RouteReader {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8 when valid, otherwise Windows-1250 (Central European spreadsheet exports)
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = WINDOWS_1250.decode(bytes);
            if had_errors {
                warn!("Input is neither UTF-8 nor clean Windows-1250; some characters were replaced");
            }
            text.into_owned()
        }
    }
}

/// Semicolon when the header line uses it, comma otherwise
pub fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_read_json_list_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("routes.json");
        fs::write(&path, r#"["PL50-DE10", "NL89-CZ50", "PL50-DE10"]"#).unwrap();

        let routes = RouteReader::new().read_routes(&path).unwrap();
        // JSON lists are taken verbatim, duplicates included
        assert_eq!(routes, vec!["PL50-DE10", "NL89-CZ50", "PL50-DE10"]);
    }

    #[test]
    fn test_read_csv_dedupes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lanes.csv");
        fs::write(
            &path,
            "Customer;Lane Name;Volume\nAcme;PL50-DE10;3\nAcme;NL89-CZ50;1\nBeta; PL50-DE10 ;2\nGamma;;4\n",
        )
        .unwrap();

        let routes = RouteReader::new().read_routes(&path).unwrap();
        assert_eq!(routes, vec!["PL50-DE10", "NL89-CZ50"]);
    }

    #[test]
    fn test_windows_1250_fallback() {
        // "Łódź" encoded as Windows-1250
        let mut bytes = b"Lane Name,City\nPL90-DE10,".to_vec();
        bytes.extend_from_slice(&[0xA3, 0xF3, 0x64, 0x9F]);
        bytes.push(b'\n');

        let text = decode_text(&bytes);
        assert!(text.contains("Łódź"));

        let routes = RouteReader::new().parse_csv(&text).unwrap();
        assert_eq!(routes, vec!["PL90-DE10"]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = decode_text(b"\xEF\xBB\xBFLane Name\nPL50-DE10\n");
        assert_eq!(RouteReader::new().parse_csv(&text).unwrap(), vec!["PL50-DE10"]);
    }

    #[test]
    fn test_missing_column() {
        let err = RouteReader::new().parse_csv("Route,Volume\nPL50-DE10,1\n").unwrap_err();
        assert!(matches!(err, ProcessingError::MissingData(_)));

        let routes = RouteReader::new()
            .with_column("Route")
            .parse_csv("Route,Volume\nPL50-DE10,1\n")
            .unwrap();
        assert_eq!(routes, vec!["PL50-DE10"]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b\n1,2"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }
}
