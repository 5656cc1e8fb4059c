//! Path pattern parsing and matching
//!
//! Patterns use the familiar segment syntax:
//! - Static segments: `/about`
//! - Required parameters: `/users/:id`
//! - Optional parameters: `/posts/:id?`
//! - Catch-all (final segment only): `/docs/*slug`

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors reported while compiling a pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty parameter name in pattern `{0}`")]
    EmptyParamName(String),

    #[error("catch-all `*{name}` must be the last segment of `{pattern}`")]
    CatchAllNotLast { pattern: String, name: String },

    #[error("parameter `{name}` appears more than once in `{pattern}`")]
    DuplicateParam { pattern: String, name: String },
}

/// One compiled pattern segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Required(String),
    Optional(String),
    CatchAll(String),
}

/// Options that affect matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub strict: bool,
    pub ignore_case: bool,
}

/// A compiled path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl PathPattern {
    /// Compiles a pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigate::pattern::{MatchOptions, PathPattern};
    ///
    /// let pattern = PathPattern::parse("/users/:id").unwrap();
    /// let params = pattern.matches("/users/42", MatchOptions::default()).unwrap();
    /// assert_eq!(params.get("id"), Some(&"42".to_string()));
    ///
    /// assert!(PathPattern::parse("/files/*rest/edit").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let raw: Vec<&str> = source.split('/').filter(|s| !s.is_empty()).collect();
        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(raw.len());

        for (idx, seg) in raw.iter().enumerate() {
            let segment = classify(seg);

            let name = match &segment {
                Segment::Static(_) => None,
                Segment::Required(name) | Segment::Optional(name) | Segment::CatchAll(name) => {
                    Some(name)
                }
            };

            if let Some(name) = name {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName(source.to_string()));
                }
                if !seen.insert(name.clone()) {
                    return Err(PatternError::DuplicateParam {
                        pattern: source.to_string(),
                        name: name.clone(),
                    });
                }
            }

            if let Segment::CatchAll(name) = &segment {
                if idx + 1 != raw.len() {
                    return Err(PatternError::CatchAllNotLast {
                        pattern: source.to_string(),
                        name: name.clone(),
                    });
                }
            }

            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            trailing_slash: source.len() > 1 && source.ends_with('/'),
            segments,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compiled segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Matches a pathname, returning captured parameters on success
    ///
    /// A static-only pattern that matches yields an empty map.
    pub fn matches(&self, pathname: &str, options: MatchOptions) -> Option<HashMap<String, String>> {
        if options.strict && pathname != "/" {
            let path_trailing = pathname.ends_with('/');
            if path_trailing != self.trailing_slash {
                return None;
            }
        }

        let path_segments: Vec<&str> = pathname.split('/').filter(|s| !s.is_empty()).collect();

        match_segments(
            &self.segments,
            &path_segments,
            HashMap::new(),
            options.ignore_case,
        )
    }
}

fn classify(segment: &str) -> Segment {
    if let Some(name) = segment.strip_prefix('*') {
        return Segment::CatchAll(name.to_string());
    }

    match segment.strip_prefix(':') {
        Some(name) => match name.strip_suffix('?') {
            Some(optional) => Segment::Optional(optional.to_string()),
            None => Segment::Required(name.to_string()),
        },
        None => Segment::Static(segment.to_string()),
    }
}

fn eq_segment(pattern: &str, path: &str, ignore_case: bool) -> bool {
    if ignore_case {
        pattern.eq_ignore_ascii_case(path)
    } else {
        pattern == path
    }
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

// Walks pattern and path segments together, tail-recursively.
fn match_segments(
    pattern: &[Segment],
    path: &[&str],
    mut params: HashMap<String, String>,
    ignore_case: bool,
) -> Option<HashMap<String, String>> {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty().then_some(params);
    };

    match head {
        Segment::CatchAll(name) => {
            if path.is_empty() {
                return None;
            }
            let joined = path.iter().map(|s| decode(s)).collect::<Vec<_>>().join("/");
            params.insert(name.clone(), joined);
            Some(params)
        }
        Segment::Optional(name) => {
            // Consume the segment unless the next static segment claims it.
            let should_consume = match (path.first(), rest.first()) {
                (None, _) => false,
                (Some(current), Some(Segment::Static(next))) => {
                    !eq_segment(next, current, ignore_case)
                }
                (Some(_), _) => true,
            };

            if should_consume {
                let mut consumed = params.clone();
                consumed.insert(name.clone(), decode(path[0]));
                if let Some(found) = match_segments(rest, &path[1..], consumed, ignore_case) {
                    return Some(found);
                }
            }

            match_segments(rest, path, params, ignore_case)
        }
        Segment::Required(name) => {
            let (current, remaining) = path.split_first()?;
            params.insert(name.clone(), decode(current));
            match_segments(rest, remaining, params, ignore_case)
        }
        Segment::Static(expected) => {
            let (current, remaining) = path.split_first()?;
            if !eq_segment(expected, current, ignore_case) {
                return None;
            }
            match_segments(rest, remaining, params, ignore_case)
        }
    }
}
