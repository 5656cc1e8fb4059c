//! # RHTMX Navigate
//!
//! Client-side route resolution for single-page RHTMX applications: a
//! navigation state machine that turns address changes into resolved
//! [`Route`]s, plus an ordered pipeline of *directors* that inspect each
//! route and decide what to show.
//!
//! ## Features
//!
//! - **Single-flight navigation** - one resolution at a time, overlapping events are stepped back
//! - **Repeat suppression** - reordering query keys does not count as a navigation
//! - **Direction detection** - forward, backward or replace, from per-entry timestamps
//! - **Ordered directors** - `/users/:id` patterns, regular expressions and middleware
//! - **Sync and async handlers** - async handlers resolve through a [`Resolve`] handle
//! - **Redirects** - a redirect result rewrites the address in place and stops the pipeline
//! - **Pluggable history** - anything implementing [`Navigator`], with [`MemoryHistory`] built in
//!
//! ## Quick Start
//!
//! ```rust
//! use rhtmx_navigate::navigate::{MemoryHistory, Navigator};
//! use rhtmx_navigate::{Controller, DirectorPath, Handler, RouteEvent, Router, RouterOptions};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let options = RouterOptions::default();
//! let history = MemoryHistory::new(&options, "/admin");
//! let router = Router::new(Rc::new(history.clone()), options);
//!
//! router
//!     .match_route(
//!         Some(DirectorPath::pattern("/admin").unwrap()),
//!         Handler::sync(|| Some(Controller::redirect("/login"))),
//!     )
//!     .match_route(
//!         Some(DirectorPath::pattern("/login").unwrap()),
//!         Handler::sync(|| Some(Controller::view("login form"))),
//!     );
//!
//! let visited = Rc::new(RefCell::new(Vec::new()));
//! let sink = visited.clone();
//! router.on(RouteEvent::AfterChange, move |route| {
//!     sink.borrow_mut().push(route.pathname.clone());
//! });
//!
//! router.start();
//!
//! assert_eq!(*visited.borrow(), vec!["/admin", "/login"]);
//! assert_eq!(history.href(), "#/login");
//! ```
//!
//! ## Director Patterns
//!
//! | Pattern | Matches | Params |
//! |---------|---------|--------|
//! | `/about` | `/about` | none |
//! | `/users/:id` | `/users/42` | `id = "42"` |
//! | `/posts/:id?` | `/posts`, `/posts/7` | `id` when present |
//! | `/docs/*path` | `/docs/a/b` | `path = "a/b"` |
//!
//! Regular expressions match anywhere in the pathname unless anchored and
//! expose their capture groups by position.
//!
//! ## Configuration
//!
//! [`RouterOptions`] can be built in code or read from TOML:
//!
//! ```rust
//! use rhtmx_navigate::{Mode, RouterOptions};
//!
//! let options = RouterOptions::from_toml_str("mode = \"path\"\nstrict = true").unwrap();
//! assert_eq!(options.mode, Mode::Path);
//! assert!(options.strict);
//! ```

pub mod config;
pub mod direction;
pub mod director;
pub mod navigate;
pub mod path;
pub mod pattern;
mod pipeline;
pub mod query;
pub mod route;
pub mod router;
pub mod signal;

pub use config::{Mode, RouterOptions};
pub use direction::Direction;
pub use director::{Controller, Director, DirectorPath, Handler, Resolve};
pub use navigate::{AddressMode, Location, MemoryHistory, Navigator, Subscription};
pub use pattern::{MatchOptions, PathPattern, PatternError};
pub use query::{dump_query, parse_query, stringify_query, Query, QueryValue};
pub use route::{is_same_route, HistoryState, Params, Route};
pub use router::{NavigationKind, Router};
pub use signal::{ListenerId, RouteEvent};
