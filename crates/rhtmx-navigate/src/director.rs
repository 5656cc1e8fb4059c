// File: src/director.rs
// Purpose: Registered path matchers paired with their handlers

use crate::pattern::{MatchOptions, PathPattern, PatternError};
use crate::route::Params;
use regex::Regex;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// What a director's handler resolved with
#[derive(Clone)]
pub enum Controller {
    /// Rewrite the current address to this target and stop the pipeline
    Redirect(String),
    /// Anything the embedder wants to render, inspected after `afterChange`
    View(Rc<dyn Any>),
}

impl Controller {
    pub fn redirect(to: impl Into<String>) -> Self {
        Controller::Redirect(to.into())
    }

    pub fn view<T: Any>(value: T) -> Self {
        Controller::View(Rc::new(value))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Controller::Redirect(_))
    }

    pub fn as_redirect(&self) -> Option<&str> {
        match self {
            Controller::Redirect(to) => Some(to),
            Controller::View(_) => None,
        }
    }

    /// Borrows the view payload as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Controller::View(value) => value.downcast_ref::<T>(),
            Controller::Redirect(_) => None,
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Controller::Redirect(to) => f.debug_tuple("Redirect").field(to).finish(),
            Controller::View(_) => f.write_str("View(..)"),
        }
    }
}

/// Completion handle passed to asynchronous handlers
///
/// Consumed on use, so a handler resolves at most once. Dropping it
/// without resolving leaves the pipeline waiting.
pub struct Resolve {
    callback: Box<dyn FnOnce(Option<Controller>)>,
}

impl Resolve {
    pub(crate) fn new(callback: impl FnOnce(Option<Controller>) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Resolves with an optional result
    pub fn resolve(self, result: Option<Controller>) {
        (self.callback)(result)
    }

    /// Resolves without a result: let the next director run
    pub fn pass(self) {
        self.resolve(None)
    }

    /// Resolves with a redirect to `to`
    pub fn redirect(self, to: impl Into<String>) {
        self.resolve(Some(Controller::redirect(to)))
    }

    /// Resolves with a view payload
    pub fn view<T: Any>(self, value: T) {
        self.resolve(Some(Controller::view(value)))
    }
}

impl fmt::Debug for Resolve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolve").finish_non_exhaustive()
    }
}

/// A route handler, tagged at registration time
pub enum Handler {
    /// Returns its result immediately
    Sync(Box<dyn FnMut() -> Option<Controller>>),
    /// Must call [`Resolve`] to let the pipeline proceed
    Async(Box<dyn FnMut(Resolve)>),
}

impl Handler {
    pub fn sync<F>(handler: F) -> Self
    where
        F: FnMut() -> Option<Controller> + 'static,
    {
        Handler::Sync(Box::new(handler))
    }

    pub fn with_resolve<F>(handler: F) -> Self
    where
        F: FnMut(Resolve) + 'static,
    {
        Handler::Async(Box::new(handler))
    }

    /// A synchronous handler that does nothing
    pub fn noop() -> Self {
        Handler::sync(|| None)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// What a director matches against
#[derive(Debug, Clone)]
pub enum DirectorPath {
    /// `/users/:id` style pattern
    Pattern(PathPattern),
    /// Regular expression tested against the pathname
    Regex(Regex),
    /// Runs for every navigation without counting as a match
    Any,
}

impl DirectorPath {
    pub fn pattern(source: &str) -> Result<Self, PatternError> {
        PathPattern::parse(source).map(DirectorPath::Pattern)
    }

    pub fn regex(regex: Regex) -> Self {
        DirectorPath::Regex(regex)
    }
}

impl From<Regex> for DirectorPath {
    fn from(regex: Regex) -> Self {
        DirectorPath::Regex(regex)
    }
}

impl From<PathPattern> for DirectorPath {
    fn from(pattern: PathPattern) -> Self {
        DirectorPath::Pattern(pattern)
    }
}

impl TryFrom<&str> for DirectorPath {
    type Error = PatternError;

    fn try_from(source: &str) -> Result<Self, Self::Error> {
        DirectorPath::pattern(source)
    }
}

/// Outcome of testing one director against a pathname
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Evaluation {
    /// Not tested here (anonymous) or a regex that did not match
    Skip,
    /// A string pattern that did not match; its empty result replaces the params
    Miss,
    Matched(Params),
    Middleware,
}

type Loader = Box<dyn FnMut(Resolve)>;

/// A registered path + handler pair, the unit of dispatch
pub struct Director {
    id: usize,
    path: Option<DirectorPath>,
    loader: RefCell<Loader>,
    is_async: bool,
    controller: RefCell<Option<Controller>>,
}

impl Director {
    /// Wraps a handler; synchronous handlers resolve with their return value
    pub(crate) fn new(id: usize, path: Option<DirectorPath>, handler: Handler) -> Self {
        let (loader, is_async): (Loader, bool) = match handler {
            Handler::Async(loader) => (loader, true),
            Handler::Sync(mut handler) => (Box::new(move |resolve: Resolve| resolve.resolve(handler())), false),
        };

        Self {
            id,
            path,
            loader: RefCell::new(loader),
            is_async,
            controller: RefCell::new(None),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> Option<&DirectorPath> {
        self.path.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.path.is_none()
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Memoized result of an earlier run
    pub fn controller(&self) -> Option<Controller> {
        self.controller.borrow().clone()
    }

    pub(crate) fn memoize(&self, controller: Controller) {
        *self.controller.borrow_mut() = Some(controller);
    }

    pub(crate) fn evaluate(&self, pathname: &str, options: MatchOptions) -> Evaluation {
        match &self.path {
            Some(DirectorPath::Pattern(pattern)) => pattern
                .matches(pathname, options)
                .map(|params| Evaluation::Matched(Params::Named(params)))
                .unwrap_or(Evaluation::Miss),
            Some(DirectorPath::Regex(regex)) => regex
                .captures(pathname)
                .map(|captures| {
                    let groups = captures
                        .iter()
                        .map(|group| group.map(|m| m.as_str().to_string()))
                        .collect();
                    Evaluation::Matched(Params::Captures(groups))
                })
                .unwrap_or(Evaluation::Skip),
            Some(DirectorPath::Any) => Evaluation::Middleware,
            None => Evaluation::Skip,
        }
    }

    /// Invokes the loader
    ///
    /// Loaders never nest for one director; if one is already running the
    /// call resolves without a result.
    pub(crate) fn load(&self, resolve: Resolve) {
        match self.loader.try_borrow_mut() {
            Ok(mut loader) => loader(resolve),
            Err(_) => {
                tracing::warn!(director = self.id, "loader re-entered while running");
                resolve.pass();
            }
        }
    }
}

impl fmt::Debug for Director {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Director")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("is_async", &self.is_async)
            .field("controller", &self.controller.borrow())
            .finish()
    }
}
