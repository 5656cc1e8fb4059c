// File: src/signal.rs
// Purpose: Lifecycle signals emitted by the router

use crate::route::Route;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Named lifecycle signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteEvent {
    /// A new route was accepted; carries the new route before dispatch
    BeforeChange,
    /// Dispatch finished; carries the final route
    AfterChange,
    /// The navigation resolved to the current route; carries the current route
    Repeat,
}

impl RouteEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteEvent::BeforeChange => "beforeChange",
            RouteEvent::AfterChange => "afterChange",
            RouteEvent::Repeat => "repeat",
        }
    }
}

impl fmt::Display for RouteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`Signals::on`], used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Rc<dyn Fn(&Route)>;

/// Listener registry
///
/// Listeners may register or remove listeners while being notified; such
/// changes take effect from the next emission. Emission is re-entrant: a
/// listener that navigates is notified again for the nested route before
/// its own call returns, so listener state belongs in `Cell`/`RefCell`.
#[derive(Default)]
pub struct Signals {
    next_id: Cell<usize>,
    listeners: RefCell<Vec<(ListenerId, RouteEvent, Listener)>>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: RouteEvent, listener: F) -> ListenerId
    where
        F: Fn(&Route) + 'static,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let listener: Listener = Rc::new(listener);
        self.listeners.borrow_mut().push((id, event, listener));
        id
    }

    /// Removes a listener; returns whether it was registered
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub fn emit(&self, event: RouteEvent, route: &Route) {
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, registered, _)| *registered == event)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in targets {
            listener(route);
        }
    }

    pub fn listener_count(&self, event: RouteEvent) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, registered, _)| *registered == event)
            .count()
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
