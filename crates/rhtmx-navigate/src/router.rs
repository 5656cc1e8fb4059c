// File: src/router.rs
// Purpose: Navigation state machine: one resolution in flight at a time

use crate::config::RouterOptions;
use crate::direction::Direction;
use crate::director::{Director, DirectorPath, Handler};
use crate::navigate::{Navigator, Subscription};
use crate::pattern::MatchOptions;
use crate::pipeline::{dispatch, Completion};
use crate::route::{is_same_route, HistoryState, Route};
use crate::signal::{ListenerId, RouteEvent, Signals};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// What caused a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Programmatic navigation that added an entry (and the initial resolution)
    Push,
    /// Programmatic navigation in place
    Replace,
    /// Back/forward reported by the substrate
    Pop,
}

struct RouterInner {
    options: RouterOptions,
    navigator: Rc<dyn Navigator>,
    directors: RefCell<Vec<Rc<Director>>>,
    anonymous: RefCell<Option<Rc<Director>>>,
    previous: RefCell<Option<Rc<RefCell<Route>>>>,
    next_director_id: Cell<usize>,
    /// Single-flight lock
    resolving: Cell<bool>,
    /// Swallow the event caused by our own corrective step back
    drop_next: Cell<bool>,
    /// Redirect hops behind the resolution in flight
    hops: Cell<usize>,
    started: Cell<bool>,
    alive: Rc<Cell<bool>>,
    signals: Signals,
    subscription: RefCell<Option<Subscription>>,
}

/// Client-side router
///
/// Cloning yields another handle to the same router.
///
/// A navigation that arrives while another is resolving is undone with one
/// [`Navigator::back`], and the next navigation event is swallowed as the
/// echo of that step. When the substrate cannot step back (the first history
/// entry) no echo arrives, so the next real navigation is the one swallowed.
///
/// # Examples
///
/// ```
/// use rhtmx_navigate::navigate::MemoryHistory;
/// use rhtmx_navigate::{Controller, DirectorPath, Handler, RouteEvent, Router, RouterOptions};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let options = RouterOptions::default();
/// let history = MemoryHistory::new(&options, "/users/7");
/// let router = Router::new(Rc::new(history.clone()), options);
///
/// router.match_route(
///     Some(DirectorPath::pattern("/users/:id").unwrap()),
///     Handler::sync(|| Some(Controller::view("user page"))),
/// );
///
/// let seen = Rc::new(RefCell::new(None));
/// let sink = seen.clone();
/// router.on(RouteEvent::AfterChange, move |route| {
///     *sink.borrow_mut() = route.params.get("id").map(str::to_string);
/// });
///
/// router.start();
/// assert_eq!(seen.borrow().as_deref(), Some("7"));
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    pub fn new(navigator: Rc<dyn Navigator>, options: RouterOptions) -> Self {
        Self {
            inner: Rc::new(RouterInner {
                options,
                navigator,
                directors: RefCell::new(Vec::new()),
                anonymous: RefCell::new(None),
                previous: RefCell::new(None),
                next_director_id: Cell::new(0),
                resolving: Cell::new(false),
                drop_next: Cell::new(false),
                hops: Cell::new(0),
                started: Cell::new(false),
                alive: Rc::new(Cell::new(true)),
                signals: Signals::new(),
                subscription: RefCell::new(None),
            }),
        }
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    pub fn navigator(&self) -> Rc<dyn Navigator> {
        self.inner.navigator.clone()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a director
    ///
    /// Without a path the handler becomes the anonymous default, which runs
    /// only when no named director matched. Registration order is dispatch
    /// order.
    pub fn match_route(&self, path: Option<DirectorPath>, handler: Handler) -> &Self {
        match path {
            Some(path) => self.push_director(path, handler),
            None => self.install_anonymous(handler),
        }
        self
    }

    /// Same as [`Router::match_route`], kept for call-site symmetry
    pub fn get(&self, path: Option<DirectorPath>, handler: Handler) -> &Self {
        self.match_route(path, handler)
    }

    /// Installs the anonymous default; the last one installed wins
    pub fn otherwise(&self, handler: Handler) -> &Self {
        self.install_anonymous(handler);
        self
    }

    /// Registers a director that runs on every navigation, in order, without
    /// counting as a match
    pub fn middleware(&self, handler: Handler) -> &Self {
        self.push_director(DirectorPath::Any, handler);
        self
    }

    fn next_id(&self) -> usize {
        let id = self.inner.next_director_id.get();
        self.inner.next_director_id.set(id + 1);
        id
    }

    fn push_director(&self, path: DirectorPath, handler: Handler) {
        let director = Rc::new(Director::new(self.next_id(), Some(path), handler));
        self.inner.directors.borrow_mut().push(director);
    }

    fn install_anonymous(&self, handler: Handler) {
        let director = Rc::new(Director::new(self.next_id(), None, handler));
        *self.inner.anonymous.borrow_mut() = Some(director);
    }

    /// Registered named directors, in dispatch order
    pub fn directors(&self) -> Vec<Rc<Director>> {
        self.inner.directors.borrow().clone()
    }

    // ========================================================================
    // Signals
    // ========================================================================

    pub fn on<F>(&self, event: RouteEvent, listener: F) -> ListenerId
    where
        F: Fn(&Route) + 'static,
    {
        self.inner.signals.on(event, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.signals.off(id)
    }

    // ========================================================================
    // Substrate passthrough
    // ========================================================================

    /// Absolute address for `to`, without navigating
    pub fn resolve(&self, to: &str) -> String {
        self.inner.navigator.resolve(to)
    }

    /// Navigates to `to` with a new history entry
    pub fn redirect(&self, to: &str) -> String {
        let href = self.inner.navigator.redirect(to);
        self.navigate(NavigationKind::Push);
        href
    }

    /// Navigates to `to` in place
    pub fn rewrite(&self, to: &str) -> String {
        let href = self.inner.navigator.rewrite(to);
        self.navigate(NavigationKind::Replace);
        href
    }

    pub fn set_query(&self, key: &str, value: Option<&str>) -> String {
        let href = self.inner.navigator.set_query(key, value);
        self.navigate(NavigationKind::Push);
        href
    }

    pub fn remove_query(&self, key: &str) -> String {
        let href = self.inner.navigator.remove_query(key);
        self.navigate(NavigationKind::Push);
        href
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Activates the router and resolves the current address
    pub fn start(&self) -> &Self {
        let inner = &self.inner;
        if !inner.alive.get() || inner.started.replace(true) {
            return self;
        }

        if inner.anonymous.borrow().is_none() {
            self.install_anonymous(Handler::noop());
        }

        let weak: Weak<RouterInner> = Rc::downgrade(&self.inner);
        let subscription = inner.navigator.subscribe(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Router { inner }.navigate(NavigationKind::Pop);
            }
        }));
        *inner.subscription.borrow_mut() = Some(subscription);

        self.navigate(NavigationKind::Push);
        self
    }

    /// Tears the router down; an in-flight resolution completes silently
    pub fn destroy(&self) {
        let inner = &self.inner;
        if !inner.alive.replace(false) {
            return;
        }

        drop(inner.subscription.borrow_mut().take());
        inner.previous.borrow_mut().take();
        inner.directors.borrow_mut().clear();
        inner.anonymous.borrow_mut().take();
        inner.signals.clear();
        inner.resolving.set(false);
        debug!("router destroyed");
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    pub fn is_destroyed(&self) -> bool {
        !self.inner.alive.get()
    }

    /// Whether a resolution is in flight
    pub fn is_resolving(&self) -> bool {
        self.inner.resolving.get()
    }

    /// Snapshot of the current route
    pub fn current(&self) -> Option<Route> {
        self.inner
            .previous
            .borrow()
            .as_ref()
            .map(|route| route.borrow().clone())
    }

    // ========================================================================
    // State machine
    // ========================================================================

    fn navigate(&self, kind: NavigationKind) {
        self.resolve_current(kind, 0);
    }

    fn resolve_current(&self, kind: NavigationKind, hops: usize) {
        let inner = &self.inner;
        if !inner.alive.get() || !inner.started.get() {
            return;
        }

        if inner.drop_next.replace(false) {
            debug!(?kind, "swallowed navigation caused by corrective step back");
            return;
        }

        if inner.resolving.get() {
            warn!(?kind, href = %inner.navigator.href(), "navigation while resolving, stepping back");
            inner.drop_next.set(true);
            inner.navigator.back();
            return;
        }

        inner.resolving.set(true);

        let state = inner.navigator.state().unwrap_or_else(HistoryState::next);
        let mut route = Route::new(inner.navigator.location(), state.clone());
        let previous = inner.previous.borrow().clone();

        let repeated = {
            let previous = previous.as_ref().map(|route| route.borrow());
            is_same_route(previous.as_deref(), &route)
        };

        if repeated {
            inner.resolving.set(false);
            debug!(?kind, pathname = %route.pathname, "repeat navigation ignored");
            if let Some(previous) = previous {
                inner.signals.emit(RouteEvent::Repeat, &previous.borrow());
            }
            return;
        }

        inner.signals.emit(RouteEvent::BeforeChange, &route);
        if !inner.alive.get() {
            return;
        }

        let direction = {
            let previous = previous.as_ref().map(|route| route.borrow());
            Direction::classify(
                &state,
                previous.as_ref().map(|route| &route.state),
                &route.pathname,
                previous.as_ref().map(|route| route.pathname.as_str()),
            )
        };

        route.assign(direction, state.clone(), inner.navigator.href());
        inner.navigator.replace_state(&state);
        debug!(?kind, pathname = %route.pathname, %direction, "navigating");

        let route = Rc::new(RefCell::new(route));
        drop(previous);
        *inner.previous.borrow_mut() = Some(route.clone());
        inner.hops.set(hops);

        let fallback = match inner.anonymous.borrow().clone() {
            Some(director) => director,
            None => Rc::new(Director::new(self.next_id(), None, Handler::noop())),
        };
        let directors = inner.directors.borrow().clone();
        let options = MatchOptions {
            strict: inner.options.strict,
            ignore_case: inner.options.ignore_case,
        };

        let weak = Rc::downgrade(&self.inner);
        let finished = route.clone();
        dispatch(
            route,
            directors,
            fallback,
            options,
            inner.navigator.clone(),
            inner.alive.clone(),
            move |completion| {
                if let Some(inner) = weak.upgrade() {
                    Router { inner }.complete(&finished, completion);
                }
            },
        );
    }

    fn complete(&self, route: &Rc<RefCell<Route>>, completion: Completion) {
        let inner = &self.inner;
        if !inner.alive.get() {
            return;
        }

        inner.resolving.set(false);
        let hops = inner.hops.get();
        {
            let route = route.borrow();
            debug!(
                pathname = %route.pathname,
                matched = completion.matched,
                redirect = ?completion.redirect,
                "navigation resolved"
            );
            inner.signals.emit(RouteEvent::AfterChange, &route);
        }

        if let Some(href) = completion.redirect {
            self.follow_redirect(route, &href, hops + 1);
        }
    }

    /// Resolves the address a redirect-class result rewrote to
    ///
    /// Skipped when an `afterChange` listener already navigated elsewhere:
    /// the redirected route must still be current and the address unchanged.
    fn follow_redirect(&self, route: &Rc<RefCell<Route>>, href: &str, hops: usize) {
        let inner = &self.inner;
        if !inner.alive.get() || inner.resolving.get() {
            return;
        }

        let still_current = inner
            .previous
            .borrow()
            .as_ref()
            .is_some_and(|previous| Rc::ptr_eq(previous, route));
        if !still_current || inner.navigator.href() != href {
            debug!(%href, "redirect superseded by a later navigation");
            return;
        }

        if hops > inner.options.max_redirects {
            warn!(hops, %href, "redirect limit reached, not following");
            return;
        }

        self.resolve_current(NavigationKind::Replace, hops);
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("options", &self.inner.options)
            .field("directors", &self.inner.directors.borrow().len())
            .field("resolving", &self.inner.resolving.get())
            .field("started", &self.inner.started.get())
            .field("destroyed", &!self.inner.alive.get())
            .finish()
    }
}
