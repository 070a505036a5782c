use crate::error::{ProcessingError, Result};
use crate::utils::constants::EARTH_RADIUS_KM;

/// Great-circle distance in kilometres between two points using the Haversine formula
///
/// # Examples
/// ```
/// use freight_rate_checker::utils::great_circle_distance;
///
/// // Warsaw to Kraków
/// let distance = great_circle_distance(52.2297, 21.0122, 50.0647, 19.9450);
/// assert!((distance - 252.0).abs() < 5.0);
/// ```
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points
    let c = 2.0 * a.min(1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Validate that a latitude/longitude pair lies in the WGS84 ranges
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Latitude {} is outside [-90, 90]",
            latitude
        )));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Longitude {} is outside [-180, 180]",
            longitude
        )));
    }

    Ok(())
}

/// Parse a decimal-degree coordinate string
pub fn parse_coordinate(coord_str: &str) -> Result<f64> {
    let trimmed = coord_str.trim().replace(',', ".");

    trimmed.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid coordinate value: '{}'", coord_str))
    })
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
