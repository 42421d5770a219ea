use serde::{Deserialize, Serialize};
use skycast_core::NetworkError;
use std::collections::HashMap;

/// A geocoded city: a search candidate or a saved favorite.
///
/// Two cities are the same city when their coordinates match, whatever their
/// names say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub display_name: String,
    pub region: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn new(display_name: impl Into<String>, country: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            display_name: display_name.into(),
            region: None,
            country: country.into(),
            latitude,
            longitude,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Coordinate identity check
    pub fn same_place(&self, other: &City) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }

    /// Row title, e.g. "Париж, Иль-де-Франс"
    pub fn title(&self) -> String {
        match self.region.as_deref().filter(|r| !r.is_empty()) {
            Some(region) => format!("{}, {}", self.display_name, region),
            None => self.display_name.clone(),
        }
    }

    /// History label, e.g. "Париж, Иль-де-Франс, FR"
    pub fn label(&self) -> String {
        format!("{}, {}", self.title(), self.country)
    }
}

impl PartialEq for City {
    fn eq(&self, other: &Self) -> bool {
        self.same_place(other)
    }
}

/// Raw candidate as returned by the direct geocoding endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GeoCandidate {
    pub name: String,
    #[serde(default)]
    pub local_names: Option<HashMap<String, String>>,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl GeoCandidate {
    fn local_name(&self, locale: &str) -> Option<&str> {
        self.local_names
            .as_ref()
            .and_then(|names| names.get(locale))
            .map(String::as_str)
            .filter(|n| !n.trim().is_empty())
    }
}

/// Map a raw candidate to a displayable city.
///
/// With `require_localized` set, candidates without a name in `locale` are
/// dropped; otherwise they fall back to their canonical name.
pub fn to_city(raw: GeoCandidate, locale: &str, require_localized: bool) -> Option<City> {
    let display_name = match raw.local_name(locale) {
        Some(name) => name.to_string(),
        None if require_localized => return None,
        None => raw.name.clone(),
    };

    Some(City {
        display_name,
        region: raw.state.filter(|s| !s.is_empty()),
        country: raw.country,
        latitude: raw.lat,
        longitude: raw.lon,
    })
}

/// Geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl GeocodeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GeocodeError::Network(NetworkError::Timeout))
    }
}
