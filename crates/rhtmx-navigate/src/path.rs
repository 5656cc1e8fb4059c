//! Path utilities for resolving navigation targets
//!
//! All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

/// Normalize a logical path to canonical form
///
/// Returns `Cow::Borrowed` when the input is already canonical.
///
/// - Double slashes: `/a//b` → `/a/b`
/// - Backslashes: `\a\b` → `/a/b`
/// - Missing leading slash: `a/b` → `/a/b`
/// - A trailing slash is **kept**, since strict matching depends on it
///
/// # Examples
///
/// ```
/// use rhtmx_navigate::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/users/1"), Cow::Borrowed("/users/1")));
/// assert_eq!(normalize_path("users//1/"), "/users/1/");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') && !path.contains("//") && !path.contains('\\') {
        return Cow::Borrowed(path);
    }

    let replaced = path.replace('\\', "/");
    let trailing = replaced.ends_with('/');
    let joined = replaced
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    match (joined.is_empty(), trailing) {
        (true, _) => Cow::Borrowed("/"),
        (false, true) => Cow::Owned(format!("/{}/", joined)),
        (false, false) => Cow::Owned(format!("/{}", joined)),
    }
}

/// Resolves `to` against the current pathname
///
/// Absolute targets are only normalized. Relative targets are joined onto
/// the directory of `base` (everything up to its last `/`), and `.` / `..`
/// segments are collapsed. `..` never climbs above the root.
///
/// # Examples
///
/// ```
/// use rhtmx_navigate::path::resolve_path;
///
/// assert_eq!(resolve_path("/users/1", "2"), "/users/2");
/// assert_eq!(resolve_path("/users/1", "../posts"), "/posts");
/// assert_eq!(resolve_path("/users/", "./new"), "/users/new");
/// assert_eq!(resolve_path("/a/b", "/c"), "/c");
/// ```
pub fn resolve_path(base: &str, to: &str) -> String {
    let joined = if to.starts_with('/') {
        to.to_string()
    } else {
        let directory = base.rfind('/').map(|idx| &base[..=idx]).unwrap_or("/");
        format!("{}{}", directory, to)
    };

    let trailing = joined.ends_with('/') || joined.ends_with("/.") || joined.ends_with("/..");
    let segments = joined
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(Vec::new(), |mut stack: Vec<&str>, segment| {
            match segment {
                "." => {}
                ".." => {
                    stack.pop();
                }
                other => stack.push(other),
            }
            stack
        });

    match (segments.is_empty(), trailing) {
        (true, _) => "/".to_string(),
        (false, true) => format!("/{}/", segments.join("/")),
        (false, false) => format!("/{}", segments.join("/")),
    }
}
