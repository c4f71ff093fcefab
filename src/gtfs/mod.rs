//! Static reference data: stops, trips and routes indexed for lookup.
//!
//! The index is built once and never mutated afterwards. Stops are kept in
//! load order; the id, code and name maps point into that list.

pub mod model;
pub mod source;

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::Result;
pub use model::{Route, Stop, Trip};
use model::normalize_name;
pub use source::GtfsSource;

pub const STOPS_FILE: &str = "stops.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const ROUTES_FILE: &str = "routes.txt";

#[derive(Debug, Default)]
pub struct ReferenceIndex {
    stops: Vec<Stop>,
    stops_by_id: HashMap<String, usize>,
    stops_by_code: HashMap<String, usize>,
    stops_by_name: HashMap<String, Vec<usize>>,
    trips_by_id: HashMap<String, Trip>,
    routes_by_id: HashMap<String, Route>,
}

impl ReferenceIndex {
    /// Loads the three tables from a directory or zip archive.
    ///
    /// # Errors
    ///
    /// Returns a data-access error if the source or one of the tables cannot
    /// be read, and a format error if a row lacks a required column.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = GtfsSource::from_path(path.as_ref());

        let stops = source.read_table(STOPS_FILE)?;
        let trips = source.read_table(TRIPS_FILE)?;
        let routes = source.read_table(ROUTES_FILE)?;

        let index = Self::from_records(stops, trips, routes);
        info!(
            stops = index.stops.len(),
            trips = index.trips_by_id.len(),
            routes = index.routes_by_id.len(),
            "Static GTFS loaded"
        );
        Ok(index)
    }

    /// Builds the lookup maps from already-parsed rows.
    ///
    /// Later duplicates of an id or stop code overwrite earlier ones; stops
    /// sharing a name are all kept, in load order.
    pub fn from_records(stops: Vec<Stop>, trips: Vec<Trip>, routes: Vec<Route>) -> Self {
        let mut stops_by_id = HashMap::with_capacity(stops.len());
        let mut stops_by_code = HashMap::new();
        let mut stops_by_name: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, stop) in stops.iter().enumerate() {
            stops_by_id.insert(stop.stop_id.clone(), i);
            if let Some(code) = stop.stop_code.as_ref().filter(|c| !c.is_empty()) {
                stops_by_code.insert(code.clone(), i);
            }
            stops_by_name.entry(stop.normalized_name()).or_default().push(i);
        }

        Self {
            stops,
            stops_by_id,
            stops_by_code,
            stops_by_name,
            trips_by_id: trips.into_iter().map(|t| (t.trip_id.clone(), t)).collect(),
            routes_by_id: routes.into_iter().map(|r| (r.route_id.clone(), r)).collect(),
        }
    }

    /// All stops, in load order.
    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops_by_id.get(stop_id).map(|&i| &self.stops[i])
    }

    pub fn stop_by_code(&self, code: &str) -> Option<&Stop> {
        self.stops_by_code.get(code).map(|&i| &self.stops[i])
    }

    /// Stops whose trimmed, lowercased name equals `name` after the same
    /// normalization. Empty when none match.
    pub fn stops_named(&self, name: &str) -> Vec<&Stop> {
        self.stops_by_name
            .get(&normalize_name(name))
            .map(|ids| ids.iter().map(|&i| &self.stops[i]).collect())
            .unwrap_or_default()
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips_by_id.get(trip_id)
    }

    pub fn route(&self, route_id: &str) -> Option<&Route> {
        self.routes_by_id.get(route_id)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }
}
