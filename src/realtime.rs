//! Domain view of a decoded GTFS-RT feed.
//!
//! The generated protobuf types mirror the wire schema, where every field is
//! optional and an entity may carry any combination of payloads. Ranking only
//! needs two shapes, so each [`gtfs_rt::FeedEntity`] is flattened into zero or
//! more [`Entity`] values and everything else is dropped.

use crate::gtfs_rt;
use crate::gtfs_rt::vehicle_position::OccupancyStatus;

/// A point-in-time feed message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Header timestamp, POSIX seconds.
    pub timestamp: Option<u64>,
    pub entities: Vec<Entity>,
}

/// Both realtime snapshots for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveFeeds {
    pub trip_updates: Snapshot,
    pub vehicle_positions: Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    TripUpdate(TripUpdate),
    Vehicle(VehicleSnapshot),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripUpdate {
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    /// Per-stop predictions in feed order.
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopTimeUpdate {
    pub stop_id: Option<String>,
    pub arrival_time: Option<i64>,
    pub departure_time: Option<i64>,
}

impl StopTimeUpdate {
    /// Arrival time if set, else departure time.
    pub fn predicted_time(&self) -> Option<i64> {
        self.arrival_time.or(self.departure_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSnapshot {
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub position: Option<Position>,
    /// Raw `OccupancyStatus` value, passed through unmodified.
    pub occupancy_status: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f32,
    pub longitude: f32,
    pub bearing: Option<f32>,
}

impl Snapshot {
    pub fn trip_updates(&self) -> impl Iterator<Item = &TripUpdate> {
        self.entities.iter().filter_map(|e| match e {
            Entity::TripUpdate(tu) => Some(tu),
            Entity::Vehicle(_) => None,
        })
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleSnapshot> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Vehicle(v) => Some(v),
            Entity::TripUpdate(_) => None,
        })
    }
}

impl From<gtfs_rt::FeedMessage> for Snapshot {
    fn from(msg: gtfs_rt::FeedMessage) -> Self {
        let entities = msg
            .entity
            .into_iter()
            .flat_map(|e| {
                let trip_update = e.trip_update.map(|tu| Entity::TripUpdate(tu.into()));
                let vehicle = e.vehicle.map(|v| Entity::Vehicle(v.into()));
                trip_update.into_iter().chain(vehicle)
            })
            .collect();

        Snapshot {
            timestamp: msg.header.timestamp,
            entities,
        }
    }
}

impl From<gtfs_rt::TripUpdate> for TripUpdate {
    fn from(tu: gtfs_rt::TripUpdate) -> Self {
        TripUpdate {
            trip_id: tu.trip.trip_id,
            route_id: tu.trip.route_id,
            stop_time_updates: tu
                .stop_time_update
                .into_iter()
                .map(|stu| StopTimeUpdate {
                    stop_id: stu.stop_id,
                    arrival_time: stu.arrival.and_then(|ev| ev.time),
                    departure_time: stu.departure.and_then(|ev| ev.time),
                })
                .collect(),
        }
    }
}

impl From<gtfs_rt::VehiclePosition> for VehicleSnapshot {
    fn from(v: gtfs_rt::VehiclePosition) -> Self {
        VehicleSnapshot {
            trip_id: v.trip.and_then(|t| t.trip_id),
            vehicle_id: v.vehicle.and_then(|d| d.id),
            position: v.position.map(|p| Position {
                latitude: p.latitude,
                longitude: p.longitude,
                bearing: p.bearing,
            }),
            occupancy_status: v.occupancy_status,
        }
    }
}

/// Schema name of a raw occupancy value, e.g. `MANY_SEATS_AVAILABLE`.
pub fn occupancy_label(value: i32) -> Option<&'static str> {
    OccupancyStatus::try_from(value)
        .ok()
        .map(|status| status.as_str_name())
}
