//! HTTP retrieval of GTFS-RT feeds.

mod basic;
mod client;
mod feeds;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use feeds::FeedClient;

use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

const PROTOBUF_MIME: &str = "application/x-protobuf";

/// GETs `url` and decodes the body as a GTFS-RT [`FeedMessage`].
///
/// # Errors
///
/// - [`Error::Transport`] with the status and body text on a non-success
///   response
/// - [`Error::Http`] on connection failure or timeout
/// - [`Error::Decode`] if the body is not a valid feed message
#[tracing::instrument(skip(client))]
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<FeedMessage> {
    let parsed = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut req = reqwest::Request::new(reqwest::Method::GET, parsed);
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static(PROTOBUF_MIME));

    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Realtime feed returned an error status");
        return Err(Error::Transport {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp.bytes().await?;
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");
    let feed = parse_feed(&bytes)?;
    debug!(entity_count = feed.entity.len(), "Feed parsed successfully");
    Ok(feed)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use prost::Message;
    use reqwest::header::HeaderMap;

    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader};

    /// Answers every request with a canned status and body, recording what
    /// was sent.
    pub(crate) struct MockClient {
        status: u16,
        body: Vec<u8>,
        pub(crate) requests: Mutex<Vec<(String, HeaderMap)>>,
    }

    impl MockClient {
        pub(crate) fn new(status: u16, body: Vec<u8>) -> Self {
            Self {
                status,
                body,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.requests
                .lock()
                .unwrap()
                .push((req.url().to_string(), req.headers().clone()));
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body.clone())
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    pub(crate) fn encoded_feed(entity_ids: &[&str]) -> Vec<u8> {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".into(),
                ..Default::default()
            },
            entity: entity_ids
                .iter()
                .map(|id| FeedEntity {
                    id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
        .encode_to_vec()
    }

    #[tokio::test]
    async fn test_fetch_feed_decodes_body_and_asks_for_protobuf() {
        let client = MockClient::new(200, encoded_feed(&["a", "b"]));

        let feed = fetch_feed(&client, "http://feeds.test/tripUpdates")
            .await
            .unwrap();
        assert_eq!(feed.entity.len(), 2);

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].0, "http://feeds.test/tripUpdates");
        assert_eq!(requests[0].1[ACCEPT], PROTOBUF_MIME);
    }

    #[tokio::test]
    async fn test_error_status_carries_status_and_body() {
        let client = MockClient::new(403, b"Invalid API key".to_vec());

        let err = fetch_feed(&client, "http://feeds.test/tripUpdates")
            .await
            .unwrap_err();
        match err {
            Error::Transport { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "Invalid API key");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let client = MockClient::new(200, vec![0xFF, 0xFE, 0x00, 0x01]);
        let err = fetch_feed(&client, "http://feeds.test/x").await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_sending() {
        let client = MockClient::new(200, Vec::new());
        let err = fetch_feed(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
        assert!(client.requests.lock().unwrap().is_empty());
    }
}
