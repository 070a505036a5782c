use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::PartitionCenter;
use crate::readers::route_reader::{decode_text, detect_delimiter};
use crate::utils::coordinates::parse_coordinate;

/// Row layout of the provider centroid exports
#[derive(Debug, Deserialize)]
struct CenterRecord {
    id: i64,
    latitude: String,
    longitude: String,
    country: String,
    #[serde(default)]
    postal_code: String,
    #[serde(default, alias = "city")]
    city_name: String,
}

/// Reads partition centroid CSV files for index and postal table builds
pub struct PartitionReader {
    strict: bool,
}

impl PartitionReader {
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Fail on the first invalid row instead of skipping it
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn read_centers(&self, path: &Path) -> Result<Vec<PartitionCenter>> {
        let text = decode_text(&fs::read(path)?);
        let centers = self.parse_centers(&text)?;
        info!("Read {} partition centers from {}", centers.len(), path.display());
        Ok(centers)
    }

    pub fn parse_centers(&self, text: &str) -> Result<Vec<PartitionCenter>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(detect_delimiter(text))
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut centers = Vec::new();
        let mut skipped = 0usize;

        for (line, record) in reader.deserialize::<CenterRecord>().enumerate() {
            match record.map_err(ProcessingError::from).and_then(Self::to_center) {
                Ok(center) => centers.push(center),
                Err(e) if !self.strict => {
                    warn!("Skipping partition center at row {}: {}", line + 2, e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if skipped > 0 {
            warn!("Skipped {} invalid partition centers", skipped);
        }

        Ok(centers)
    }

    fn to_center(record: CenterRecord) -> Result<PartitionCenter> {
        let center = PartitionCenter {
            id: record.id,
            latitude: parse_coordinate(&record.latitude)?,
            longitude: parse_coordinate(&record.longitude)?,
            country: record.country.to_ascii_uppercase(),
            postal_code: record.postal_code,
            city_name: record.city_name,
        };
        center.validate()?;
        Ok(center)
    }
}

impl Default for PartitionReader {
    fn default() -> Self {
        Self::new()
    }
}
