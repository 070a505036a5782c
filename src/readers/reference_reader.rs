use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::ReferencePaths;
use crate::error::{ProcessingError, Result};
use crate::models::{Coordinate, CrossSchemeIndex, PostalKey, PostalPartitionTable, ReferenceData};
use crate::utils::coordinates::validate_coordinates;
use crate::utils::postal::normalize_postal_code;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: PostalProperties,
    #[serde(default)]
    geometry: Option<PointGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct PostalProperties {
    country_code: Option<String>,
    postal_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    /// GeoJSON order: [longitude, latitude]
    #[serde(default)]
    coordinates: Vec<f64>,
}

impl Feature {
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.properties.latitude, self.properties.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => {
                let coords = &self.geometry.as_ref()?.coordinates;
                match coords.as_slice() {
                    [lon, lat, ..] => Some(Coordinate::new(*lat, *lon)),
                    _ => None,
                }
            }
        }
    }
}

/// Loads the static lookup files the mapper and runner depend on
pub struct ReferenceReader;

impl ReferenceReader {
    /// Postal coordinates from a GeoJSON feature collection
    ///
    /// Features without a usable postal key or coordinate are skipped.
    pub fn read_postal_coordinates(path: &Path) -> Result<HashMap<PostalKey, Coordinate>> {
        let collection: FeatureCollection = read_json_file(path)?;
        let mut coordinates = HashMap::with_capacity(collection.features.len());
        let mut skipped = 0usize;

        for feature in &collection.features {
            let key = match (&feature.properties.country_code, &feature.properties.postal_code) {
                (Some(country), Some(postal)) => {
                    normalize_postal_code(&format!("{}{}", country, postal)).ok()
                }
                _ => None,
            };
            let coordinate = feature
                .coordinate()
                .filter(|c| validate_coordinates(c.latitude, c.longitude).is_ok());

            match (key, coordinate) {
                (Some(key), Some(coordinate)) => {
                    coordinates.insert(key, coordinate);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} postal features without a key or valid coordinate in {}",
                skipped,
                path.display()
            );
        }

        Ok(coordinates)
    }

    pub fn read_postal_table(path: &Path) -> Result<PostalPartitionTable> {
        read_json_file(path)
    }

    pub fn read_cross_scheme_index(path: &Path) -> Result<CrossSchemeIndex> {
        read_json_file(path)
    }

    /// Load every reference file; any missing or malformed file is fatal
    pub fn load(paths: &ReferencePaths) -> Result<ReferenceData> {
        let reference = ReferenceData::new(
            Self::read_postal_coordinates(&paths.postal_coordinates)?,
            Self::read_postal_table(&paths.scheme_a_postal)?,
            Self::read_postal_table(&paths.scheme_b_postal)?,
            Self::read_cross_scheme_index(&paths.cross_scheme_index)?,
        );

        info!("Reference data loaded: {}", reference.summary());
        Ok(reference)
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        ProcessingError::MissingData(format!("cannot open {}: {}", path.display(), e))
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        ProcessingError::InvalidFormat(format!("{}: {}", path.display(), e))
    })
}
