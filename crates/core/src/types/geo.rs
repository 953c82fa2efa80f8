//! Geographic point type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`GeoPoint`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// A coordinate was NaN or infinite.
    #[error("{axis} must be a finite number")]
    NotFinite {
        /// Which coordinate was rejected.
        axis: &'static str,
    },
    /// Longitude outside -180..=180.
    #[error("longitude {0} is outside -180..180")]
    LongitudeOutOfRange(f64),
    /// Latitude outside -90..=90.
    #[error("latitude {0} is outside -90..90")]
    LatitudeOutOfRange(f64),
    /// A coordinate could not be parsed from form input.
    #[error("{axis} is not a number: {value:?}")]
    Unparseable {
        /// Which coordinate was rejected.
        axis: &'static str,
        /// The raw input.
        value: String,
    },
}

/// A WGS84 point.
///
/// Stored and serialized longitude-first (`[longitude, latitude]`), the
/// GeoJSON convention. Construction validates both ranges, so every
/// `GeoPoint` in the system is a real location.
///
/// ```
/// use geoart_core::GeoPoint;
///
/// let madrid = GeoPoint::new(-3.0, 40.0).unwrap();
/// assert_eq!(madrid.coordinates(), [-3.0, 40.0]);
///
/// assert!(GeoPoint::new(181.0, 0.0).is_err());
/// assert!(GeoPoint::new(0.0, -90.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    /// Build a point from longitude and latitude, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if either value is not finite or out of range.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, GeoError> {
        if !longitude.is_finite() {
            return Err(GeoError::NotFinite { axis: "longitude" });
        }
        if !latitude.is_finite() {
            return Err(GeoError::NotFinite { axis: "latitude" });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Parse a point from the raw `latitude` / `longitude` form fields.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Unparseable`] for non-numeric input and the
    /// range errors of [`GeoPoint::new`] otherwise.
    pub fn parse_form(latitude: &str, longitude: &str) -> Result<Self, GeoError> {
        let lat = parse_axis("latitude", latitude)?;
        let lon = parse_axis("longitude", longitude)?;
        Self::new(lon, lat)
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Coordinates as stored: `[longitude, latitude]`.
    #[must_use]
    pub const fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

fn parse_axis(axis: &'static str, raw: &str) -> Result<f64, GeoError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GeoError::Unparseable {
            axis,
            value: raw.to_owned(),
        })
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = GeoError;

    fn try_from([longitude, latitude]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(longitude, latitude)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        point.coordinates()
    }
}

impl fmt::Display for GeoPoint {
    /// Formats as `latitude,longitude`, the order map links expect.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_orders_longitude_first() {
        let point = GeoPoint::parse_form("40.0", "-3.0").unwrap();
        assert_eq!(point.coordinates(), [-3.0, 40.0]);
        assert!((point.latitude() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(GeoPoint::new(180.0, 90.0).is_ok());
        assert!(GeoPoint::new(-180.0, -90.0).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            GeoPoint::new(-180.5, 0.0),
            Err(GeoError::LongitudeOutOfRange(-180.5))
        );
        assert_eq!(
            GeoPoint::parse_form("91", "0"),
            Err(GeoError::LatitudeOutOfRange(91.0))
        );
    }

    #[test]
    fn test_rejects_garbage_and_nan() {
        assert!(matches!(
            GeoPoint::parse_form("north", "0"),
            Err(GeoError::Unparseable { axis: "latitude", .. })
        ));
        assert_eq!(
            GeoPoint::new(f64::NAN, 0.0),
            Err(GeoError::NotFinite { axis: "longitude" })
        );
    }

    #[test]
    fn test_serializes_as_coordinate_pair() {
        let point = GeoPoint::new(2.35, 48.85).unwrap();
        assert_eq!(serde_json::to_string(&point).unwrap(), "[2.35,48.85]");

        let bad: Result<GeoPoint, _> = serde_json::from_str("[200.0,0.0]");
        assert!(bad.is_err());
    }

    #[test]
    fn test_display_is_lat_lon() {
        let point = GeoPoint::new(-3.5, 40.25).unwrap();
        assert_eq!(point.to_string(), "40.25,-3.5");
    }
}
