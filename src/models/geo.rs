use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::coordinates::great_circle_distance;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinate {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        great_circle_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Centroid of one provider partition, as exported by the provider
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PartitionCenter {
    pub id: i64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(length(equal = 2))]
    pub country: String,

    #[serde(default)]
    pub postal_code: String,

    #[serde(default, alias = "city")]
    pub city_name: String,
}

impl PartitionCenter {
    pub fn new(id: i64, latitude: f64, longitude: f64, country: &str, postal_code: &str) -> Self {
        Self {
            id,
            latitude,
            longitude,
            country: country.to_string(),
            postal_code: postal_code.to_string(),
            city_name: String::new(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn is_same_country(&self, other: &PartitionCenter) -> bool {
        self.country.eq_ignore_ascii_case(&other.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(52.2297, 21.0122).validate().is_ok());
        assert!(Coordinate::new(91.0, 21.0122).validate().is_err());
        assert!(Coordinate::new(52.0, 181.0).validate().is_err());
    }

    #[test]
    fn test_partition_center_validation() {
        let center = PartitionCenter::new(1, 52.23, 21.01, "PL", "00-001");
        assert!(center.validate().is_ok());

        let bad_country = PartitionCenter::new(1, 52.23, 21.01, "POL", "00-001");
        assert!(bad_country.validate().is_err());
    }

    #[test]
    fn test_same_country_is_case_insensitive() {
        let a = PartitionCenter::new(1, 52.23, 21.01, "PL", "00");
        let b = PartitionCenter::new(2, 50.06, 19.94, "pl", "30");
        assert!(a.is_same_country(&b));
    }
}
