//! In-memory history substrate
//!
//! Behaves like a browser history stack: `push` truncates forward entries,
//! `back`/`forward`/`go` move the cursor and queue a pop notification, and
//! queued notifications are delivered by [`MemoryHistory::flush`], the way a
//! browser delivers `popstate` on a later task.

use crate::config::RouterOptions;
use crate::navigate::{AddressMode, Navigator, Subscription};
use crate::route::HistoryState;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone)]
struct Entry {
    href: String,
    state: Option<HistoryState>,
}

type PopListener = Rc<dyn Fn()>;

struct HistoryInner {
    mode: AddressMode,
    entries: RefCell<Vec<Entry>>,
    index: Cell<usize>,
    pending_pops: Cell<usize>,
    listeners: RefCell<Vec<(usize, PopListener)>>,
    next_listener: Cell<usize>,
    back_calls: Cell<usize>,
}

/// Shared handle to an in-memory history stack
#[derive(Clone)]
pub struct MemoryHistory {
    inner: Rc<HistoryInner>,
}

impl MemoryHistory {
    /// Creates a history whose single entry is `initial` (a logical path)
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_navigate::navigate::{MemoryHistory, Navigator};
    /// use rhtmx_navigate::RouterOptions;
    ///
    /// let history = MemoryHistory::new(&RouterOptions::default(), "/a");
    /// assert_eq!(history.href(), "#/a");
    ///
    /// history.push("/b?x=1");
    /// history.back();
    /// assert_eq!(history.href(), "#/a");
    /// assert_eq!(history.pending(), 1);
    /// ```
    pub fn new(options: &RouterOptions, initial: &str) -> Self {
        Self::with_mode(AddressMode::from_options(options), initial)
    }

    pub fn with_mode(mode: AddressMode, initial: &str) -> Self {
        let (path, query) = initial.split_once('?').unwrap_or((initial, ""));
        let href = mode.build(path, query);

        Self {
            inner: Rc::new(HistoryInner {
                mode,
                entries: RefCell::new(vec![Entry { href, state: None }]),
                index: Cell::new(0),
                pending_pops: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
                back_calls: Cell::new(0),
            }),
        }
    }

    /// Adds an entry for `to`, discarding forward entries; no notification
    pub fn push(&self, to: &str) -> String {
        let href = self.resolve(to);
        self.push_href(&href);
        href
    }

    /// Replaces the current entry's address; no notification
    pub fn replace(&self, to: &str) -> String {
        let href = self.resolve(to);
        self.replace_href(&href);
        href
    }

    pub fn forward(&self) {
        self.go(1);
    }

    /// Moves the cursor by `delta`; out-of-range moves are ignored
    pub fn go(&self, delta: isize) {
        let len = self.inner.entries.borrow().len();
        let target = self.inner.index.get() as isize + delta;

        if delta == 0 || target < 0 || target >= len as isize {
            return;
        }

        self.inner.index.set(target as usize);
        self.inner.pending_pops.set(self.inner.pending_pops.get() + 1);
    }

    /// Delivers queued pop notifications until none remain
    ///
    /// Notifications queued by listeners during delivery are delivered too.
    /// Returns how many notifications were delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;

        while self.inner.pending_pops.get() > 0 {
            self.inner.pending_pops.set(self.inner.pending_pops.get() - 1);

            let listeners: Vec<PopListener> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect();

            for listener in listeners {
                listener();
            }
            delivered += 1;
        }

        delivered
    }

    /// Queued, undelivered pop notifications
    pub fn pending(&self) -> usize {
        self.inner.pending_pops.get()
    }

    /// How many times `back` was called, including no-op calls at the start
    pub fn back_calls(&self) -> usize {
        self.inner.back_calls.get()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self) -> usize {
        self.inner.index.get()
    }

    /// Addresses of all entries, oldest first
    pub fn hrefs(&self) -> Vec<String> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|entry| entry.href.clone())
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl Navigator for MemoryHistory {
    fn address_mode(&self) -> &AddressMode {
        &self.inner.mode
    }

    fn href(&self) -> String {
        let entries = self.inner.entries.borrow();
        entries[self.inner.index.get()].href.clone()
    }

    fn state(&self) -> Option<HistoryState> {
        let entries = self.inner.entries.borrow();
        entries[self.inner.index.get()].state.clone()
    }

    fn replace_state(&self, state: &HistoryState) {
        let mut entries = self.inner.entries.borrow_mut();
        entries[self.inner.index.get()].state = Some(state.clone());
    }

    fn back(&self) {
        self.inner.back_calls.set(self.inner.back_calls.get() + 1);
        self.go(-1);
    }

    fn push_href(&self, href: &str) {
        let mut entries = self.inner.entries.borrow_mut();
        let next = self.inner.index.get() + 1;
        entries.truncate(next);
        entries.push(Entry {
            href: href.to_string(),
            state: None,
        });
        self.inner.index.set(next);
    }

    fn replace_href(&self, href: &str) {
        let mut entries = self.inner.entries.borrow_mut();
        entries[self.inner.index.get()].href = href.to_string();
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, listener));

        let weak: Weak<HistoryInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("mode", &self.inner.mode)
            .field("index", &self.inner.index.get())
            .field("entries", &self.inner.entries.borrow())
            .field("pending_pops", &self.inner.pending_pops.get())
            .finish()
    }
}
