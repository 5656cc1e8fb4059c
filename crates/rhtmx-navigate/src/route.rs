// File: src/route.rs
// Purpose: The resolved navigation target and its equality rules

use crate::direction::Direction;
use crate::director::Controller;
use crate::navigate::Location;
use crate::query::{dump_query, Query};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::cell::Cell;
use std::collections::HashMap;

thread_local! {
    static LAST_TIMESTAMP: Cell<i64> = const { Cell::new(0) };
}

/// Per-entry history state blob
///
/// Serialized flat: `{"timestamp": 1700000000000, ...extra}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistoryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl HistoryState {
    /// Mints a fresh state with a strictly increasing millisecond timestamp
    pub fn next() -> Self {
        let now = Utc::now().timestamp_millis();
        let timestamp = LAST_TIMESTAMP.with(|last| {
            let value = now.max(last.get() + 1);
            last.set(value);
            value
        });

        Self::at(timestamp)
    }

    /// State with an explicit timestamp
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
            extra: Map::new(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    pub fn from_json(value: JsonValue) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

/// Result of matching a director against the pathname
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Params {
    /// No director pattern has matched yet
    #[default]
    Unmatched,
    /// Named captures from a string pattern (may be empty for static patterns)
    Named(HashMap<String, String>),
    /// Regex captures in order, index 0 being the whole match
    Captures(Vec<Option<String>>),
}

impl Params {
    pub fn is_matched(&self) -> bool {
        !matches!(self, Params::Unmatched)
    }

    /// Looks up a named capture
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Params::Named(map) => map.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Looks up a positional capture
    pub fn at(&self, idx: usize) -> Option<&str> {
        match self {
            Params::Captures(groups) => groups.get(idx)?.as_deref(),
            _ => None,
        }
    }
}

/// The logical route for one navigation event
///
/// Created fresh for every event and never reused.
#[derive(Debug, Clone)]
pub struct Route {
    /// Full navigable address at the time the route was built
    pub href: String,
    pub pathname: String,
    pub query: Query,
    pub params: Params,
    pub state: HistoryState,
    pub direction: Option<Direction>,
    /// Last result produced by a director during dispatch
    pub controller: Option<Controller>,
}

impl Route {
    pub fn new(location: Location, state: HistoryState) -> Self {
        Self {
            href: location.href,
            pathname: location.pathname,
            query: location.query,
            params: Params::Unmatched,
            state,
            direction: None,
            controller: None,
        }
    }

    /// Attaches the values computed once the route is accepted
    pub fn assign(&mut self, direction: Direction, state: HistoryState, href: String) {
        self.direction = Some(direction);
        self.state = state;
        self.href = href;
    }
}

/// Whether two routes are semantically the same navigation target
///
/// False when there is no previous route. Otherwise compares pathnames
/// exactly and queries by their canonical form, so reordering query keys
/// or array elements does not count as a change.
pub fn is_same_route(previous: Option<&Route>, next: &Route) -> bool {
    let Some(previous) = previous else {
        return false;
    };

    previous.pathname == next.pathname && dump_query(&previous.query) == dump_query(&next.query)
}
