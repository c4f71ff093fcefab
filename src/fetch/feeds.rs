use tracing::info;

use super::auth::ApiKey;
use super::{BasicClient, HttpClient, fetch_feed};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::realtime::{LiveFeeds, Snapshot};

/// Fetches the trip-update and vehicle-position feeds from one endpoint.
pub struct FeedClient<C> {
    http: C,
    trip_updates_url: String,
    vehicle_positions_url: String,
}

impl FeedClient<ApiKey<BasicClient>> {
    /// Builds a client that sends the configured credential header on every
    /// request and gives up after the configured timeout.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let basic = BasicClient::new(config.timeout)?;
        let http = ApiKey::new(basic, &config.api_key_header, &config.api_key)?;
        Ok(Self::new(http, config))
    }
}

impl<C: HttpClient> FeedClient<C> {
    pub fn new(http: C, config: &FeedConfig) -> Self {
        Self {
            http,
            trip_updates_url: config.trip_updates_url(),
            vehicle_positions_url: config.vehicle_positions_url(),
        }
    }

    pub async fn trip_updates(&self) -> Result<Snapshot> {
        let feed = fetch_feed(&self.http, &self.trip_updates_url).await?;
        Ok(feed.into())
    }

    pub async fn vehicle_positions(&self) -> Result<Snapshot> {
        let feed = fetch_feed(&self.http, &self.vehicle_positions_url).await?;
        Ok(feed.into())
    }

    /// Fetches both feeds concurrently. Fails as soon as either fails.
    pub async fn fetch_all(&self) -> Result<LiveFeeds> {
        let (trip_updates, vehicle_positions) =
            tokio::try_join!(self.trip_updates(), self.vehicle_positions())?;

        info!(
            trip_updates = trip_updates.entities.len(),
            vehicle_positions = vehicle_positions.entities.len(),
            trip_updates_timestamp = ?trip_updates.timestamp,
            vehicle_positions_timestamp = ?vehicle_positions.timestamp,
            "Realtime feeds fetched"
        );
        Ok(LiveFeeds {
            trip_updates,
            vehicle_positions,
        })
    }
}
