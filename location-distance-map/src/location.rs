use serde::{Deserialize, Serialize};

pub type LocationId = i64;

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// A named point stored by the registry.
///
/// Records are immutable once the registry has assigned their `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true when both components are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.lat) && (MIN_LNG..=MAX_LNG).contains(&self.lng)
    }
}

/// Request body for adding a location. The registry picks the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl NewLocation {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }

    /// Checks the record invariants and returns the location with its name trimmed.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() || !Coordinate::new(self.lat, self.lng).is_valid() {
            return Err(ValidationError);
        }
        Ok(Self {
            name: name.to_string(),
            ..self
        })
    }
}

/// Rejection of an add request. Carries no field detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid location: name must be non-empty, lat within [-90, 90] and lng within [-180, 180]")]
pub struct ValidationError;
