//! Navigation substrate
//!
//! The router never touches a concrete history implementation. It talks to
//! a [`Navigator`], which owns the current address, the per-entry state blob
//! and the pop-notification channel. [`MemoryHistory`] is the in-process
//! implementation used by tests and non-browser hosts.

use crate::config::{Mode, RouterOptions};
use crate::path::{normalize_path, resolve_path};
use crate::query::{parse_query, stringify_query, Query, QueryValue};
use crate::route::HistoryState;
use std::fmt;
use std::rc::Rc;

pub mod memory;
pub use memory::MemoryHistory;

/// Parsed form of a navigable address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    pub pathname: String,
    pub query: Query,
}

impl Location {
    pub fn new(href: impl Into<String>, pathname: impl Into<String>, query: Query) -> Self {
        Self {
            href: href.into(),
            pathname: pathname.into(),
            query,
        }
    }
}

/// Builds and parses addresses for one substrate strategy
///
/// # Examples
///
/// ```
/// use rhtmx_navigate::navigate::AddressMode;
/// use rhtmx_navigate::Mode;
///
/// let hashbang = AddressMode::new(Mode::Hash, "!");
/// assert_eq!(hashbang.build("/users/1", "tab=posts"), "#!/users/1?tab=posts");
///
/// let location = hashbang.parse("#!/users/1?tab=posts");
/// assert_eq!(location.pathname, "/users/1");
///
/// let plain = AddressMode::new(Mode::Path, "");
/// assert_eq!(plain.build("/users/1", ""), "/users/1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMode {
    mode: Mode,
    split: String,
}

impl AddressMode {
    pub fn new(mode: Mode, split: impl Into<String>) -> Self {
        Self {
            mode,
            split: split.into(),
        }
    }

    pub fn from_options(options: &RouterOptions) -> Self {
        Self::new(options.mode, options.split.clone())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Renders a pathname and raw query string as an address
    pub fn build(&self, pathname: &str, query: &str) -> String {
        let pathname = normalize_path(pathname);
        let tail = if query.is_empty() {
            pathname.into_owned()
        } else {
            format!("{}?{}", pathname, query)
        };

        match self.mode {
            Mode::Hash => format!("#{}{}", self.split, tail),
            Mode::Path => tail,
        }
    }

    /// Extracts pathname and query from an address
    pub fn parse(&self, href: &str) -> Location {
        let logical = match self.mode {
            Mode::Hash => {
                let fragment = href.split_once('#').map(|(_, hash)| hash).unwrap_or("");
                fragment.strip_prefix(self.split.as_str()).unwrap_or(fragment)
            }
            Mode::Path => {
                let without_origin = match href.split_once("://") {
                    Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or("/"),
                    None => href,
                };
                without_origin
                    .split_once('#')
                    .map(|(path, _)| path)
                    .unwrap_or(without_origin)
            }
        };

        let (path, query) = logical.split_once('?').unwrap_or((logical, ""));

        Location {
            href: href.to_string(),
            pathname: normalize_path(path).into_owned(),
            query: parse_query(query),
        }
    }
}

/// Teardown handle for a substrate subscription
///
/// The listener is removed when the handle is cancelled or dropped.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn cancel(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// The host's navigation substrate
///
/// Implementations keep interior state: every method takes `&self` because
/// the router and the embedder share one substrate.
pub trait Navigator {
    fn address_mode(&self) -> &AddressMode;

    /// Current full navigable address
    fn href(&self) -> String;

    /// Per-entry state blob of the current entry, if one was stored
    fn state(&self) -> Option<HistoryState>;

    /// Overwrites the current entry's state without navigating
    fn replace_state(&self, state: &HistoryState);

    /// Steps one entry backward; the resulting pop is notified like any other
    fn back(&self);

    /// Adds a new entry for `href`
    fn push_href(&self, href: &str);

    /// Replaces the current entry's address without adding an entry
    fn replace_href(&self, href: &str);

    /// Registers a listener for pop-style navigations
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;

    fn location(&self) -> Location {
        self.address_mode().parse(&self.href())
    }

    /// Absolute address for `to`, resolved against the current pathname
    ///
    /// A target that starts with `?` keeps the current pathname.
    fn resolve(&self, to: &str) -> String {
        let current = self.location();
        let (path, query) = to.split_once('?').unwrap_or((to, ""));
        let pathname = if path.is_empty() {
            current.pathname
        } else {
            resolve_path(&current.pathname, path)
        };

        self.address_mode().build(&pathname, query)
    }

    /// Navigates to `to`, adding a history entry
    fn redirect(&self, to: &str) -> String {
        let href = self.resolve(to);
        self.push_href(&href);
        href
    }

    /// Navigates to `to` in place, without adding a history entry
    fn rewrite(&self, to: &str) -> String {
        let href = self.resolve(to);
        self.replace_href(&href);
        href
    }

    /// Sets one query key on the current address and navigates there
    ///
    /// `None` stores an empty value.
    fn set_query(&self, key: &str, value: Option<&str>) -> String {
        let mut location = self.location();
        location
            .query
            .insert(key.to_string(), QueryValue::from(value.unwrap_or("")));
        let href = self
            .address_mode()
            .build(&location.pathname, &stringify_query(&location.query));
        self.push_href(&href);
        href
    }

    /// Removes one query key from the current address and navigates there
    fn remove_query(&self, key: &str) -> String {
        let mut location = self.location();
        location.query.remove(key);
        let href = self
            .address_mode()
            .build(&location.pathname, &stringify_query(&location.query));
        self.push_href(&href);
        href
    }
}
