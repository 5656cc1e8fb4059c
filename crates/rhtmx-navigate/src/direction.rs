//! Navigation direction classifier
//!
//! **Pure function**: depends only on the two history states and pathnames.

use crate::route::HistoryState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a navigation relates to the previous route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Replace,
}

impl Direction {
    /// Classifies a navigation
    ///
    /// - Same pathname as an existing previous route: `Replace`
    /// - Both states carry timestamps and the new one is older: `Backward`
    /// - Anything else: `Forward`
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigate::{Direction, HistoryState};
    ///
    /// let previous = HistoryState::at(100);
    /// let older = HistoryState::at(50);
    ///
    /// assert_eq!(
    ///     Direction::classify(&older, Some(&previous), "/a", Some("/b")),
    ///     Direction::Backward,
    /// );
    /// assert_eq!(
    ///     Direction::classify(&older, Some(&previous), "/a", Some("/a")),
    ///     Direction::Replace,
    /// );
    /// ```
    pub fn classify(
        state: &HistoryState,
        previous_state: Option<&HistoryState>,
        pathname: &str,
        previous_pathname: Option<&str>,
    ) -> Self {
        if previous_pathname == Some(pathname) {
            return Direction::Replace;
        }

        let stamps = state
            .timestamp
            .zip(previous_state.and_then(|previous| previous.timestamp));

        match stamps {
            Some((current, previous)) if current < previous => Direction::Backward,
            _ => Direction::Forward,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Replace => "replace",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
