//! Stats collector client
//!
//! Records page hits and fetches per-event view counts from the external
//! hit-statistics collector. Both directions are deliberately lossy: a
//! hit that cannot be delivered is logged and dropped, and a view query
//! that fails yields no counts, so the primary read path keeps working
//! while the collector is down or slow.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::StatsConfig;
use crate::utils::errors::Result;

/// Request context handed in by the boundary layer for hit recording
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip: String,
    pub uri: String,
}

/// Payload of a recorded page view
#[derive(Debug, Clone, Serialize)]
struct Hit<'a> {
    id: i32,
    app: &'a str,
    uri: &'a str,
    ip: &'a str,
    timestamp: String,
}

/// Per-URI hit count as reported by the collector
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewStats {
    pub uri: String,
    pub app: String,
    pub hits: i64,
}

/// Client for the hit-statistics collector
#[derive(Debug, Clone)]
pub struct StatsClient {
    client: Client,
    base_url: String,
    app_name: String,
}

impl StatsClient {
    pub fn new(config: &StatsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_name: config.app_name.clone(),
        })
    }

    /// Record a page view. Fire-and-forget: any failure is logged and
    /// swallowed so a flaky collector never fails the caller's read.
    pub async fn record_hit(&self, ctx: &ClientContext) {
        let hit = Hit {
            id: 0,
            app: &self.app_name,
            uri: &ctx.uri,
            ip: &ctx.ip,
            timestamp: hit_timestamp(),
        };

        let sent = self
            .client
            .post(format!("{}/hit", self.base_url))
            .json(&hit)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match sent {
            Ok(_) => debug!(uri = %ctx.uri, ip = %ctx.ip, "Sent hit to stats collector"),
            Err(e) => warn!(error = %e, uri = %ctx.uri, "Failed to send hit to stats collector"),
        }
    }

    /// View counts for a batch of events, fetched in one call. Events
    /// without recorded hits are simply absent from the map; a failed
    /// query degrades to an empty map.
    pub async fn views_for(&self, event_ids: &[i32]) -> HashMap<i32, i64> {
        if event_ids.is_empty() {
            return HashMap::new();
        }

        match self.fetch_views(event_ids).await {
            Ok(stats) => views_by_event(&stats),
            Err(e) => {
                warn!(error = %e, "Failed to query stats collector, defaulting views to 0");
                HashMap::new()
            }
        }
    }

    async fn fetch_views(&self, event_ids: &[i32]) -> Result<Vec<ViewStats>> {
        let uris = event_ids
            .iter()
            .map(|id| event_uri(*id))
            .collect::<Vec<_>>()
            .join(",");

        debug!(count = event_ids.len(), "Querying stats collector");
        let stats = self
            .client
            .get(format!("{}/stats/util", self.base_url))
            .query(&[("uris", uris.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ViewStats>>()
            .await?;

        Ok(stats)
    }
}

fn hit_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn event_uri(id: i32) -> String {
    format!("/events/{id}")
}

fn event_id_from_uri(uri: &str) -> Option<i32> {
    uri.split('/').nth(2)?.parse().ok()
}

fn views_by_event(stats: &[ViewStats]) -> HashMap<i32, i64> {
    let mut views = HashMap::new();
    for entry in stats {
        match event_id_from_uri(&entry.uri) {
            Some(id) => {
                views.insert(id, entry.hits);
            }
            None => warn!(uri = %entry.uri, "Stats entry with unparseable event URI"),
        }
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: String) -> StatsClient {
        StatsClient::new(&StatsConfig {
            base_url,
            app_name: "afisha".to_string(),
            timeout_seconds: 1,
        })
        .unwrap()
    }

    #[test]
    fn event_uri_round_trips() {
        assert_eq!(event_uri(42), "/events/42");
        assert_eq!(event_id_from_uri("/events/42"), Some(42));
        assert_eq!(event_id_from_uri("/events"), None);
        assert_eq!(event_id_from_uri("/events/abc"), None);
    }

    #[test]
    fn hit_timestamp_has_expected_shape() {
        let ts = hit_timestamp();
        // e.g. 2024-03-01 18:30:00
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }

    #[test]
    fn malformed_uris_are_skipped() {
        let stats = vec![
            ViewStats {
                uri: "/events/3".to_string(),
                app: "afisha".to_string(),
                hits: 12,
            },
            ViewStats {
                uri: "/something/else/entirely".to_string(),
                app: "afisha".to_string(),
                hits: 99,
            },
        ];

        let views = views_by_event(&stats);
        assert_eq!(views.get(&3), Some(&12));
        assert_eq!(views.len(), 1);
    }

    #[tokio::test]
    async fn views_for_queries_one_batched_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/util"))
            .and(query_param("uris", "/events/1,/events/2,/events/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "uri": "/events/1", "app": "afisha", "hits": 5 },
                { "uri": "/events/3", "app": "afisha", "hits": 2 },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        let views = client.views_for(&[1, 2, 3]).await;

        assert_eq!(views.get(&1), Some(&5));
        assert_eq!(views.get(&2), None);
        assert_eq!(views.get(&3), Some(&2));
    }

    #[tokio::test]
    async fn views_for_skips_the_call_for_no_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/util"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        assert!(client.views_for(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn views_for_degrades_when_collector_is_unreachable() {
        // Nothing listens on this port
        let client = client_for("http://127.0.0.1:9".to_string());
        let views = client.views_for(&[1, 2]).await;
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn views_for_degrades_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/util"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        assert!(client.views_for(&[1]).await.is_empty());
    }

    #[tokio::test]
    async fn record_hit_posts_app_uri_and_ip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hit"))
            .and(body_partial_json(json!({
                "app": "afisha",
                "uri": "/events/7",
                "ip": "192.0.2.10",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(server.uri());
        client
            .record_hit(&ClientContext {
                ip: "192.0.2.10".to_string(),
                uri: "/events/7".to_string(),
            })
            .await;
    }

    #[tokio::test]
    async fn record_hit_swallows_delivery_failures() {
        let client = client_for("http://127.0.0.1:9".to_string());
        // Must not panic or propagate anything
        client
            .record_hit(&ClientContext {
                ip: "192.0.2.10".to_string(),
                uri: "/events/7".to_string(),
            })
            .await;
    }
}
