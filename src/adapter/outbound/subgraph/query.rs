//! GraphQL request body for one polling page.

use serde_json::{json, Value};

const POSITIONS_QUERY: &str = r"query positions($since: Int!, $first: Int!) {
  increases: increasePositions(first: $first, orderBy: timestamp, orderDirection: asc, where: { timestamp_gte: $since }) {
    id account collateralToken indexToken collateralDelta sizeDelta isLong price timestamp
  }
  decreases: decreasePositions(first: $first, orderBy: timestamp, orderDirection: asc, where: { timestamp_gte: $since }) {
    id account collateralToken indexToken collateralDelta sizeDelta isLong price timestamp
  }
  liquidations: liquidatedPositions(first: $first, orderBy: timestamp, orderDirection: asc, where: { timestamp_gte: $since }) {
    id account collateralToken indexToken isLong size collateral markPrice realisedPnl timestamp
  }
}";

/// Build the request body fetching up to `first` events of each kind with
/// `timestamp >= since`.
#[must_use]
pub fn positions_query(since: u64, first: usize) -> Value {
    json!({
        "query": POSITIONS_QUERY,
        "variables": { "since": since, "first": first },
    })
}
