//! Joins the realtime snapshots with the static index to list upcoming
//! arrivals at one stop.
//!
//! Each trip contributes at most one arrival: its first prediction for the
//! stop in feed order. Predictions more than the configured grace period in
//! the past are dropped. All ETAs are relative to a single `now` sampled
//! once per pass, so rows are comparable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RankConfig;
use crate::geo::Coordinates;
use crate::gtfs::{ReferenceIndex, Stop};
use crate::realtime::{LiveFeeds, Snapshot, TripUpdate, VehicleSnapshot, occupancy_label};

/// One upcoming arrival at the queried stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    /// Seconds from `now` until arrival; may be negative when slightly overdue.
    pub eta_seconds: i64,
    pub arrival_epoch_utc: i64,
    pub trip_id: String,
    pub route: String,
    pub headsign: String,
    pub vehicle: Option<VehicleInfo>,
}

/// Live position of the vehicle serving an arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub lat: f32,
    pub lon: f32,
    pub bearing: Option<f32>,
    pub distance_m_to_stop: Option<u64>,
    pub occupancy_status: Option<i32>,
    pub id: Option<String>,
}

pub struct Ranker<'a> {
    index: &'a ReferenceIndex,
    config: RankConfig,
}

impl<'a> Ranker<'a> {
    pub fn new(index: &'a ReferenceIndex, config: RankConfig) -> Self {
        Self { index, config }
    }

    /// Ranks arrivals at `stop` against the current wall clock.
    pub fn rank(&self, stop: &Stop, feeds: &LiveFeeds) -> Vec<Arrival> {
        self.rank_at(stop, feeds, Utc::now())
    }

    /// Ranks arrivals at `stop`, soonest first, at most `limit` of them.
    pub fn rank_at(&self, stop: &Stop, feeds: &LiveFeeds, now: DateTime<Utc>) -> Vec<Arrival> {
        let vehicles = vehicles_by_trip(&feeds.vehicle_positions);
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        let cutoff = now_secs - self.config.stale_grace.as_secs_f64();
        let stop_position = stop.coordinates();

        let mut arrivals: Vec<Arrival> = feeds
            .trip_updates
            .trip_updates()
            .filter_map(|tu| {
                let trip_id = tu.trip_id.as_deref()?;
                let when = first_prediction_for(tu, &stop.stop_id)?;
                if (when as f64) < cutoff {
                    return None;
                }

                let (route, headsign) = self.describe_trip(trip_id, tu.route_id.as_deref());
                let vehicle = vehicles
                    .get(trip_id)
                    .and_then(|v| vehicle_info(v, stop_position));

                Some(Arrival {
                    eta_seconds: (when as f64 - now_secs).round() as i64,
                    arrival_epoch_utc: when,
                    trip_id: trip_id.to_string(),
                    route,
                    headsign,
                    vehicle,
                })
            })
            .collect();

        let matched = arrivals.len();
        arrivals.sort_by_key(|a| a.eta_seconds);
        arrivals.truncate(self.config.limit);

        for a in &arrivals {
            let occupancy = a
                .vehicle
                .as_ref()
                .and_then(|v| v.occupancy_status)
                .and_then(occupancy_label)
                .unwrap_or("UNKNOWN");
            debug!(
                trip_id = %a.trip_id,
                eta_seconds = a.eta_seconds,
                has_vehicle = a.vehicle.is_some(),
                occupancy,
                "Arrival"
            );
        }

        debug!(
            stop_id = %stop.stop_id,
            matched,
            returned = arrivals.len(),
            "Arrivals ranked"
        );
        arrivals
    }

    /// Route display name and headsign for a trip.
    ///
    /// Falls back to the feed's route id when the trip is unknown, and to
    /// the bare route id when the route is unknown.
    fn describe_trip(&self, trip_id: &str, feed_route_id: Option<&str>) -> (String, String) {
        let trip = self.index.trip(trip_id);
        let route_id = trip.map(|t| t.route_id.as_str()).or(feed_route_id);

        let route = match route_id {
            Some(id) => self
                .index
                .route(id)
                .map_or(id, |r| r.display_name())
                .to_string(),
            None => String::new(),
        };
        let headsign = trip
            .and_then(|t| t.trip_headsign.clone())
            .unwrap_or_default();

        (route, headsign)
    }
}

/// Predicted time of the trip's first stop-time update at `stop_id`.
///
/// Later visits to the same stop are ignored, even when the first one has
/// no usable time.
fn first_prediction_for(tu: &TripUpdate, stop_id: &str) -> Option<i64> {
    tu.stop_time_updates
        .iter()
        .find(|stu| stu.stop_id.as_deref() == Some(stop_id))?
        .predicted_time()
}

/// Indexes vehicles by trip id; later entities overwrite earlier ones.
fn vehicles_by_trip(snapshot: &Snapshot) -> HashMap<&str, &VehicleSnapshot> {
    snapshot
        .vehicles()
        .filter_map(|v| Some((v.trip_id.as_deref()?, v)))
        .collect()
}

fn vehicle_info(vehicle: &VehicleSnapshot, stop: Option<Coordinates>) -> Option<VehicleInfo> {
    let position = vehicle.position?;
    let here = Coordinates::new(position.latitude.into(), position.longitude.into());

    Some(VehicleInfo {
        lat: position.latitude,
        lon: position.longitude,
        bearing: position.bearing,
        distance_m_to_stop: stop.and_then(|s| here.rounded_distance_to(&s)),
        occupancy_status: vehicle.occupancy_status,
        id: vehicle.vehicle_id.clone(),
    })
}
