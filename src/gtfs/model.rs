//! Records read from the static GTFS tables.
//!
//! Column names follow the GTFS reference. Columns the tool does not use are
//! ignored; empty optional fields deserialize to `None`.

use serde::Deserialize;

use crate::geo::Coordinates;

/// A row of `stops.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_code: Option<String>,
    pub stop_name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stop_lon: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub location_type: Option<u8>,
    #[serde(default)]
    pub parent_station: Option<String>,
}

impl Stop {
    /// The stop's position, if both coordinates are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.stop_lat?, self.stop_lon?))
    }

    /// Key used for name lookups: trimmed and lowercased.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.stop_name)
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    #[serde(default)]
    pub trip_headsign: Option<String>,
}

/// A row of `routes.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Route {
    pub route_id: String,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
}

impl Route {
    /// Short name, else long name, else the route identifier.
    pub fn display_name(&self) -> &str {
        [&self.route_short_name, &self.route_long_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|name| !name.is_empty())
            .unwrap_or(self.route_id.as_str())
    }
}
