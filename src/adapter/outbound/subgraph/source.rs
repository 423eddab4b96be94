//! Polling source backed by a position subgraph.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::dto::{GraphQlResponse, PositionsData};
use super::query::positions_query;
use crate::domain::event::sort_events;
use crate::domain::RawEvent;
use crate::error::{Error, Result, SourceError};
use crate::port::outbound::source::{PollRequest, PollingSource, SourceBatch};

/// How the source reacts to HTTP 429.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Retries inside one cycle before giving up.
    pub max_retries: u32,
    /// Wait used when the response has no usable `Retry-After`.
    pub default_wait: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_wait: Duration::from_secs(5),
        }
    }
}

/// Queries increase, decrease and liquidation entities in one request.
pub struct SubgraphSource {
    client: reqwest::Client,
    url: String,
    rate_limit: RateLimitPolicy,
}

impl SubgraphSource {
    /// Create a source with request and connect timeouts.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration, rate_limit: RateLimitPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            rate_limit,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, request: PollRequest) -> Result<PositionsData> {
        let response = self
            .client
            .post(&self.url)
            .json(&positions_query(request.since.last_ts, request.limit))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(self.rate_limit.default_wait);
            return Err(SourceError::RateLimited {
                retry_after_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            }
            .into());
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Origin(format!("HTTP {status}: {}", truncate(&body))).into());
        }
        parse_response(&body)
    }
}

#[async_trait]
impl PollingSource for SubgraphSource {
    async fn poll(&self, request: PollRequest) -> Result<SourceBatch> {
        let mut retries = 0;
        loop {
            match self.fetch(request).await {
                Ok(data) => return Ok(merge_pages(data, request.limit)),
                Err(Error::Source(SourceError::RateLimited { retry_after_ms }))
                    if retries < self.rate_limit.max_retries =>
                {
                    retries += 1;
                    warn!(
                        retry_after_ms,
                        attempt = retries,
                        max = self.rate_limit.max_retries,
                        "Subgraph rate limited, waiting"
                    );
                    tokio::time::sleep(Duration::from_millis(retry_after_ms)).await;
                }
                Err(Error::Source(SourceError::Malformed(reason) | SourceError::Origin(reason))) => {
                    warn!(reason = %reason, since = %request.since, "Garbled subgraph response, treating as empty");
                    return Ok(SourceBatch::empty());
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "subgraph"
    }
}

/// Parse a response body, rejecting GraphQL errors and missing data.
///
/// # Errors
/// Returns [`SourceError::Malformed`] for invalid JSON or a missing `data`
/// object and [`SourceError::Origin`] when the body carries `errors`.
pub fn parse_response(body: &str) -> Result<PositionsData> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
        return Err(SourceError::Origin(messages.join("; ")).into());
    }
    response
        .data
        .ok_or_else(|| SourceError::Malformed("response without data".into()).into())
}

/// Merge the three per-kind pages into one ordered batch.
///
/// A page holding `limit` entities may have more events at its last
/// timestamp. When any page is full, events past the smallest such last
/// timestamp are dropped so they are fetched again next cycle instead of
/// being skipped over, and the batch is marked truncated.
#[must_use]
pub fn merge_pages(data: PositionsData, limit: usize) -> SourceBatch {
    let pages: [Vec<RawEvent>; 3] = [
        data.increases.into_iter().map(|e| e.into_increase()).collect(),
        data.decreases.into_iter().map(|e| e.into_decrease()).collect(),
        data.liquidations.into_iter().map(RawEvent::from).collect(),
    ];

    let cutoff = pages
        .iter()
        .filter(|page| limit > 0 && page.len() >= limit)
        .filter_map(|page| page.iter().map(|e| e.timestamp).max())
        .min();

    let mut events: Vec<RawEvent> = pages.into_iter().flatten().collect();
    if let Some(cutoff) = cutoff {
        let before = events.len();
        events.retain(|e| e.timestamp <= cutoff);
        debug!(cutoff, dropped = before - events.len(), "Subgraph page full, trimming batch");
    }
    sort_events(&mut events);

    SourceBatch {
        events,
        truncated: cutoff.is_some(),
    }
}

/// `Retry-After` as delay-seconds. HTTP-date values are not supported.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(id: &str, ts: u64) -> serde_json::Value {
        json!({
            "id": id,
            "account": "0x00000000000000000000000000000000000000aa",
            "collateralToken": "0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d",
            "indexToken": "0x7130d2a12b9bcbfae4f2634d864a1ee1ce3ead9c",
            "collateralDelta": "1",
            "sizeDelta": "2",
            "isLong": true,
            "price": "3",
            "timestamp": ts,
        })
    }

    fn liquidation(id: &str, ts: u64) -> serde_json::Value {
        json!({
            "id": id,
            "account": "0x00000000000000000000000000000000000000aa",
            "collateralToken": "0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d",
            "indexToken": "0x7130d2a12b9bcbfae4f2634d864a1ee1ce3ead9c",
            "isLong": false,
            "size": "10",
            "collateral": "1",
            "markPrice": "5",
            "realisedPnl": "-1",
            "timestamp": ts,
        })
    }

    fn body(
        increases: Vec<serde_json::Value>,
        decreases: Vec<serde_json::Value>,
        liquidations: Vec<serde_json::Value>,
    ) -> String {
        json!({ "data": {
            "increases": increases,
            "decreases": decreases,
            "liquidations": liquidations,
        }})
        .to_string()
    }

    fn ids(batch: &SourceBatch) -> Vec<&str> {
        batch.events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn merges_and_sorts_across_kinds() {
        let data = parse_response(&body(
            vec![change("i2", 20), change("i1", 10)],
            vec![change("d1", 15)],
            vec![liquidation("l1", 10)],
        ))
        .unwrap();
        let batch = merge_pages(data, 100);

        assert!(!batch.truncated);
        assert_eq!(ids(&batch), vec!["i1", "l1", "d1", "i2"]);
    }

    #[test]
    fn full_page_trims_past_its_last_timestamp() {
        let data = parse_response(&body(
            vec![change("i1", 10), change("i2", 12)],
            vec![change("d1", 12), change("d2", 30)],
            vec![liquidation("l1", 11)],
        ))
        .unwrap();
        let batch = merge_pages(data, 2);

        assert!(batch.truncated);
        // Both increases and decreases are full; the smaller last timestamp wins.
        assert_eq!(ids(&batch), vec!["i1", "l1", "d1", "i2"]);
    }

    #[test]
    fn graphql_errors_are_rejected() {
        let err = parse_response(r#"{"errors":[{"message":"indexing error"}]}"#).unwrap_err();
        assert!(err.to_string().contains("indexing error"));
    }

    #[test]
    fn missing_data_is_malformed() {
        assert!(matches!(
            parse_response(r#"{"data":null}"#),
            Err(Error::Source(SourceError::Malformed(_)))
        ));
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(Error::Source(SourceError::Malformed(_)))
        ));
    }

    #[test]
    fn partial_entity_is_malformed() {
        let raw = json!({ "data": {
            "increases": [{ "id": "i1", "timestamp": 1 }],
            "decreases": [],
            "liquidations": [],
        }})
        .to_string();
        assert!(parse_response(&raw).is_err());
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(150);
        assert!(truncate(&body).len() <= 200);
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn unreachable_origin_is_a_transport_error() {
        let source = SubgraphSource::new(
            "http://127.0.0.1:9/subgraph",
            Duration::from_millis(200),
            RateLimitPolicy::default(),
        )
        .unwrap();
        let result = source
            .poll(PollRequest::new(crate::domain::Cursor::zero(), 10))
            .await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
