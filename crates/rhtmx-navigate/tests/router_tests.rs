/// Integration tests for the navigation state machine
///
/// Every test drives a real `Router` over a `MemoryHistory`. Pop
/// notifications are only delivered on `flush()`, so tests control exactly
/// when a back/forward reaches the router.

use pretty_assertions::assert_eq;
use regex::Regex;
use rhtmx_navigate::{
    Controller, Direction, DirectorPath, Handler, MemoryHistory, Navigator, Resolve, Route,
    RouteEvent, Router, RouterOptions,
};
use rstest::rstest;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn setup(initial: &str) -> (Router, MemoryHistory) {
    setup_with(RouterOptions::default(), initial)
}

fn setup_with(options: RouterOptions, initial: &str) -> (Router, MemoryHistory) {
    init_tracing();
    let history = MemoryHistory::new(&options, initial);
    let router = Router::new(Rc::new(history.clone()), options);
    (router, history)
}

fn pattern(source: &str) -> Option<DirectorPath> {
    Some(DirectorPath::pattern(source).unwrap())
}

/// Records every signal as `(event, route)`
#[derive(Clone, Default)]
struct Recorder {
    events: Rc<RefCell<Vec<(RouteEvent, Route)>>>,
}

impl Recorder {
    fn attach(router: &Router) -> Self {
        let recorder = Self::default();
        for event in [RouteEvent::BeforeChange, RouteEvent::AfterChange, RouteEvent::Repeat] {
            let sink = recorder.events.clone();
            router.on(event, move |route| sink.borrow_mut().push((event, route.clone())));
        }
        recorder
    }

    fn count(&self, event: RouteEvent) -> usize {
        self.events.borrow().iter().filter(|(seen, _)| *seen == event).count()
    }

    fn trail(&self) -> Vec<(RouteEvent, String)> {
        self.events
            .borrow()
            .iter()
            .map(|(event, route)| (*event, route.pathname.clone()))
            .collect()
    }

    fn last(&self, event: RouteEvent) -> Option<Route> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find(|(seen, _)| *seen == event)
            .map(|(_, route)| route.clone())
    }
}

/// Handler that logs its name and returns nothing
fn logging(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Handler {
    let log = log.clone();
    Handler::sync(move || {
        log.borrow_mut().push(name);
        None
    })
}

/// Async handler that parks its resolve handle for the test to complete
fn parking(parked: &Rc<RefCell<Option<Resolve>>>, calls: &Rc<Cell<usize>>) -> Handler {
    let parked = parked.clone();
    let calls = calls.clone();
    Handler::with_resolve(move |resolve| {
        calls.set(calls.get() + 1);
        *parked.borrow_mut() = Some(resolve);
    })
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_start_resolves_initial_address() {
    let (router, _history) = setup("/a");
    let parked = Rc::new(RefCell::new(None));
    let async_calls = Rc::new(Cell::new(0));
    let sync_calls = Rc::new(Cell::new(0));

    let counter = sync_calls.clone();
    router
        .match_route(
            pattern("/a"),
            Handler::sync(move || {
                counter.set(counter.get() + 1);
                None
            }),
        )
        .match_route(pattern("/b"), parking(&parked, &async_calls));

    let recorder = Recorder::attach(&router);
    router.start();

    assert_eq!(
        recorder.trail(),
        vec![
            (RouteEvent::BeforeChange, "/a".to_string()),
            (RouteEvent::AfterChange, "/a".to_string()),
        ]
    );
    assert_eq!(sync_calls.get(), 1);
    assert_eq!(async_calls.get(), 0);
    assert!(!router.is_resolving());
}

#[test]
fn test_async_director_completes_navigation() {
    let (router, history) = setup("/a");
    let parked = Rc::new(RefCell::new(None));
    let async_calls = Rc::new(Cell::new(0));

    router
        .match_route(pattern("/a"), Handler::noop())
        .match_route(pattern("/b"), parking(&parked, &async_calls));

    let recorder = Recorder::attach(&router);
    router.start();
    router.redirect("/b?x=2&x=1");

    assert_eq!(async_calls.get(), 1);
    assert!(router.is_resolving());
    assert_eq!(recorder.count(RouteEvent::AfterChange), 1);

    parked.borrow_mut().take().unwrap().pass();

    assert!(!router.is_resolving());
    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.pathname, "/b");
    assert!(route.params.is_matched());

    let mut values = route.query["x"].values();
    values.sort();
    assert_eq!(values, vec!["1", "2"]);
    assert_eq!(history.len(), 2);
}

// ============================================================================
// Repeat suppression
// ============================================================================

#[test]
fn test_same_route_emits_repeat_only() {
    let (router, _history) = setup("/list?b=2&a=1");
    let log = Rc::new(RefCell::new(Vec::new()));
    router.match_route(pattern("/list"), logging(&log, "list"));

    let recorder = Recorder::attach(&router);
    router.start();
    router.redirect("/list?a=1&b=2");

    assert_eq!(*log.borrow(), vec!["list"]);
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 1);
    assert_eq!(recorder.count(RouteEvent::Repeat), 1);
    assert_eq!(recorder.last(RouteEvent::Repeat).unwrap().pathname, "/list");
    assert!(!router.is_resolving());
}

#[test]
fn test_array_order_does_not_count_as_change() {
    let (router, _history) = setup("/search?tag=b&tag=a");
    let recorder = Recorder::attach(&router);
    router.start();

    router.rewrite("/search?tag=a&tag=b");
    assert_eq!(recorder.count(RouteEvent::Repeat), 1);

    router.rewrite("/search?tag=a");
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 2);
}

// ============================================================================
// Direction
// ============================================================================

#[test]
fn test_direction_follows_history_timestamps() {
    let (router, history) = setup("/a");
    let recorder = Recorder::attach(&router);
    router.start();

    router.redirect("/b");
    assert_eq!(recorder.last(RouteEvent::AfterChange).unwrap().direction, Some(Direction::Forward));

    history.back();
    history.flush();
    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.pathname, "/a");
    assert_eq!(route.direction, Some(Direction::Backward));

    history.forward();
    history.flush();
    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.pathname, "/b");
    assert_eq!(route.direction, Some(Direction::Forward));

    router.rewrite("/b?tab=1");
    assert_eq!(recorder.last(RouteEvent::AfterChange).unwrap().direction, Some(Direction::Replace));
}

#[test]
fn test_state_is_written_in_place() {
    let (router, history) = setup("/a");
    router.start();
    router.redirect("/b");

    assert_eq!(history.len(), 2);
    assert_eq!(history.state(), router.current().map(|route| route.state));
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_dispatch_runs_matching_directors_in_order() {
    let (router, _history) = setup("/users/1");
    let log = Rc::new(RefCell::new(Vec::new()));

    router
        .match_route(pattern("/users/:id"), logging(&log, "a"))
        .match_route(pattern("/posts/:id"), logging(&log, "b"))
        .match_route(Some(Regex::new("^/users/").unwrap().into()), logging(&log, "c"));

    router.start();
    assert_eq!(*log.borrow(), vec!["a", "c"]);
}

#[test]
fn test_redirect_short_circuits_pipeline() {
    let (router, history) = setup("/dash");
    let log = Rc::new(RefCell::new(Vec::new()));

    let redirect_log = log.clone();
    router
        .match_route(pattern("/dash"), logging(&log, "a"))
        .match_route(
            pattern("/dash"),
            Handler::sync(move || {
                redirect_log.borrow_mut().push("b");
                Some(Controller::redirect("/login"))
            }),
        )
        .match_route(pattern("/dash"), logging(&log, "c"));

    let recorder = Recorder::attach(&router);
    router.start();

    assert_eq!(*log.borrow(), vec!["a", "b"]);
    assert_eq!(history.href(), "#/login");
    assert_eq!(history.len(), 1);

    let redirected = recorder.events.borrow()[1].1.clone();
    assert_eq!(redirected.pathname, "/dash");
    assert_eq!(redirected.controller.as_ref().and_then(Controller::as_redirect), Some("/login"));
    assert_eq!(router.current().map(|route| route.pathname), Some("/login".to_string()));
}

#[test]
fn test_regex_director_exposes_captures() {
    let (router, _history) = setup("/files/report.pdf");
    let recorder = Recorder::attach(&router);
    router.match_route(
        Some(Regex::new(r"^/files/(\w+)\.(\w+)$").unwrap().into()),
        Handler::noop(),
    );
    router.start();

    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.params.at(1), Some("report"));
    assert_eq!(route.params.at(2), Some("pdf"));
}

#[test]
fn test_view_controller_reaches_listeners() {
    let (router, _history) = setup("/users/7");
    router.match_route(pattern("/users/:id"), Handler::sync(|| Some(Controller::view(7u32))));

    let seen = Rc::new(Cell::new(None));
    let sink = seen.clone();
    router.on(RouteEvent::AfterChange, move |route| {
        sink.set(route.controller.as_ref().and_then(|c| c.downcast_ref::<u32>()).copied());
    });
    router.start();

    assert_eq!(seen.get(), Some(7));
}

#[test]
fn test_fallback_runs_only_without_named_match() {
    let (router, _history) = setup("/nowhere");
    let log = Rc::new(RefCell::new(Vec::new()));

    router
        .middleware(logging(&log, "middleware"))
        .match_route(pattern("/a"), logging(&log, "a"))
        .otherwise(logging(&log, "fallback"));

    router.start();
    assert_eq!(*log.borrow(), vec!["middleware", "fallback"]);

    router.redirect("/a");
    assert_eq!(*log.borrow(), vec!["middleware", "fallback", "middleware", "a"]);
}

#[test]
fn test_match_without_path_installs_default() {
    let (router, _history) = setup("/anything");
    let log = Rc::new(RefCell::new(Vec::new()));

    router
        .match_route(None, logging(&log, "first"))
        .get(None, logging(&log, "second"));
    router.start();

    assert_eq!(*log.borrow(), vec!["second"]);
    assert!(router.directors().is_empty());
}

#[test]
fn test_async_middleware_is_transitional() {
    let (router, _history) = setup("/a");
    let log = Rc::new(RefCell::new(Vec::new()));

    let middleware_log = log.clone();
    router
        .middleware(Handler::with_resolve(move |resolve| {
            middleware_log.borrow_mut().push("auth");
            resolve.pass();
        }))
        .match_route(pattern("/a"), logging(&log, "a"));

    router.start();
    assert_eq!(*log.borrow(), vec!["auth", "a"]);
}

#[test]
fn test_memoized_director_does_not_rerun() {
    let (router, _history) = setup("/a");
    let calls = Rc::new(Cell::new(0));

    let counter = calls.clone();
    router.match_route(
        pattern("/a"),
        Handler::sync(move || {
            counter.set(counter.get() + 1);
            Some(Controller::view("a"))
        }),
    );

    let recorder = Recorder::attach(&router);
    router.start();
    router.redirect("/b");
    router.redirect("/a");

    assert_eq!(calls.get(), 1);
    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.controller.as_ref().and_then(|c| c.downcast_ref::<&str>()), Some(&"a"));
}

// ============================================================================
// Single flight
// ============================================================================

#[test]
fn test_pop_while_resolving_is_stepped_back() {
    let (router, history) = setup("/a");
    let parked = Rc::new(RefCell::new(None));
    let calls = Rc::new(Cell::new(0));
    router.match_route(pattern("/slow"), parking(&parked, &calls));

    let recorder = Recorder::attach(&router);
    router.start();
    router.redirect("/b");
    router.redirect("/slow");
    assert!(router.is_resolving());

    let before_changes = recorder.count(RouteEvent::BeforeChange);
    let back_calls = history.back_calls();

    history.back();
    history.flush();

    // One back from the user, one corrective back from the router.
    assert_eq!(history.back_calls(), back_calls + 2);
    assert_eq!(recorder.count(RouteEvent::BeforeChange), before_changes);
    assert_eq!(history.pending(), 0);
    assert!(router.is_resolving());

    // Both backs moved the cursor, so the address now shows /a while the
    // in-flight /slow resolution still completes as the current route.
    assert_eq!(history.href(), "#/a");

    parked.borrow_mut().take().unwrap().pass();
    assert!(!router.is_resolving());
    assert_eq!(recorder.last(RouteEvent::AfterChange).unwrap().pathname, "/slow");
}

#[test]
fn test_failed_step_back_swallows_next_navigation() {
    let (router, history) = setup("/slow");
    let parked = Rc::new(RefCell::new(None));
    let calls = Rc::new(Cell::new(0));
    router.match_route(pattern("/slow"), parking(&parked, &calls));

    let recorder = Recorder::attach(&router);
    router.start();

    // At the first entry the corrective back has nowhere to go.
    router.rewrite("/other");
    assert_eq!(history.back_calls(), 1);
    assert_eq!(history.pending(), 0);

    parked.borrow_mut().take().unwrap().pass();
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 1);

    router.redirect("/next");
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 1);

    router.redirect("/again");
    assert_eq!(recorder.last(RouteEvent::BeforeChange).unwrap().pathname, "/again");
}

#[test]
fn test_programmatic_navigation_while_resolving_is_reverted() {
    let (router, history) = setup("/a");
    let parked = Rc::new(RefCell::new(None));
    let calls = Rc::new(Cell::new(0));
    router.match_route(pattern("/slow"), parking(&parked, &calls));

    let recorder = Recorder::attach(&router);
    router.start();
    router.redirect("/slow");

    router.redirect("/elsewhere");
    assert_eq!(history.back_calls(), 1);
    assert_eq!(history.href(), "#/slow");

    // The pop caused by the corrective back is swallowed.
    assert_eq!(history.flush(), 1);
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 2);

    parked.borrow_mut().take().unwrap().pass();
    assert_eq!(recorder.count(RouteEvent::AfterChange), 2);
}

#[test]
fn test_listener_can_navigate_after_change() {
    let (router, history) = setup("/a");
    router.match_route(pattern("/a"), Handler::noop());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let navigator = router.clone();
    let once = Rc::new(Cell::new(true));
    router.on(RouteEvent::AfterChange, move |route| {
        sink.borrow_mut().push(route.pathname.clone());
        if route.pathname == "/a" && once.replace(false) {
            navigator.redirect("/next");
        }
    });

    router.start();
    assert_eq!(*seen.borrow(), vec!["/a".to_string(), "/next".to_string()]);
    assert_eq!(history.href(), "#/next");
    assert_eq!(router.current().map(|route| route.pathname), Some("/next".to_string()));
    assert_eq!(history.back_calls(), 0);
}

// ============================================================================
// Redirect chains
// ============================================================================

#[rstest]
#[case(0, 1)]
#[case(1, 2)]
#[case(3, 4)]
fn test_redirect_loop_is_bounded(#[case] max_redirects: usize, #[case] resolutions: usize) {
    let options = RouterOptions::default().with_max_redirects(max_redirects);
    let (router, _history) = setup_with(options, "/ping");

    router
        .match_route(pattern("/ping"), Handler::sync(|| Some(Controller::redirect("/pong"))))
        .match_route(pattern("/pong"), Handler::sync(|| Some(Controller::redirect("/ping"))));

    let recorder = Recorder::attach(&router);
    router.start();

    assert_eq!(recorder.count(RouteEvent::AfterChange), resolutions);
    assert!(!router.is_resolving());
}

#[test]
fn test_redirect_not_followed_after_listener_navigates() {
    let (router, history) = setup("/a");
    router.match_route(pattern("/a"), Handler::sync(|| Some(Controller::redirect("/b"))));

    let recorder = Recorder::attach(&router);
    let navigator = router.clone();
    router.on(RouteEvent::AfterChange, move |route| {
        if route.pathname == "/a" {
            navigator.redirect("/c");
        }
    });

    router.start();

    assert_eq!(recorder.count(RouteEvent::Repeat), 0);
    assert_eq!(history.href(), "#/c");
    assert_eq!(router.current().map(|route| route.pathname), Some("/c".to_string()));
    assert_eq!(
        recorder.trail(),
        vec![
            (RouteEvent::BeforeChange, "/a".to_string()),
            (RouteEvent::AfterChange, "/a".to_string()),
            (RouteEvent::BeforeChange, "/c".to_string()),
            (RouteEvent::AfterChange, "/c".to_string()),
        ]
    );
}

#[test]
fn test_async_redirect_is_followed() {
    let (router, history) = setup("/private");
    let parked = Rc::new(RefCell::new(None));
    let calls = Rc::new(Cell::new(0));

    router
        .match_route(pattern("/private"), parking(&parked, &calls))
        .match_route(pattern("/login"), Handler::sync(|| Some(Controller::view("login"))));

    let recorder = Recorder::attach(&router);
    router.start();
    parked.borrow_mut().take().unwrap().redirect("/login");

    assert_eq!(history.href(), "#/login");
    assert_eq!(
        recorder.trail(),
        vec![
            (RouteEvent::BeforeChange, "/private".to_string()),
            (RouteEvent::AfterChange, "/private".to_string()),
            (RouteEvent::BeforeChange, "/login".to_string()),
            (RouteEvent::AfterChange, "/login".to_string()),
        ]
    );
}

// ============================================================================
// Query helpers
// ============================================================================

#[test]
fn test_set_and_remove_query_navigate() {
    let (router, history) = setup("/list");
    let recorder = Recorder::attach(&router);
    router.start();

    assert_eq!(router.set_query("page", Some("2")), "#/list?page=2");
    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.query["page"].first(), Some("2"));

    assert_eq!(router.remove_query("page"), "#/list");
    assert!(recorder.last(RouteEvent::AfterChange).unwrap().query.is_empty());
    assert_eq!(history.len(), 3);
}

#[test]
fn test_resolve_does_not_navigate() {
    let (router, history) = setup("/docs/intro");
    router.start();

    assert_eq!(router.resolve("setup"), "#/docs/setup");
    assert_eq!(history.href(), "#/docs/intro");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_destroy_mid_flight_drops_completion() {
    let (router, history) = setup("/slow");
    let parked = Rc::new(RefCell::new(None));
    let calls = Rc::new(Cell::new(0));
    router.match_route(pattern("/slow"), parking(&parked, &calls));

    let recorder = Recorder::attach(&router);
    router.start();
    assert!(router.is_resolving());

    router.destroy();
    parked.borrow_mut().take().unwrap().view("late");

    assert_eq!(recorder.count(RouteEvent::AfterChange), 0);
    assert!(router.is_destroyed());
    assert!(!router.is_resolving());
    assert_eq!(history.listener_count(), 0);
}

#[test]
fn test_pops_after_destroy_are_ignored() {
    let (router, history) = setup("/a");
    let recorder = Recorder::attach(&router);
    router.start();
    router.redirect("/b");
    router.destroy();
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 2);

    history.back();
    assert_eq!(history.flush(), 1);
    assert_eq!(recorder.count(RouteEvent::BeforeChange), 2);
    assert!(router.current().is_none());
}

#[test]
fn test_off_removes_listener() {
    let (router, _history) = setup("/a");
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let id = router.on(RouteEvent::AfterChange, move |_| counter.set(counter.get() + 1));

    router.start();
    assert!(router.off(id));
    router.redirect("/b");

    assert_eq!(hits.get(), 1);
    assert!(!router.off(id));
}

#[test]
fn test_path_mode_and_case_options() {
    let options = RouterOptions::default()
        .with_mode(rhtmx_navigate::Mode::Path)
        .with_ignore_case(true);
    let (router, history) = setup_with(options, "/Users/5/");
    let recorder = Recorder::attach(&router);
    router.match_route(pattern("/users/:id"), Handler::noop());
    router.start();

    let route = recorder.last(RouteEvent::AfterChange).unwrap();
    assert_eq!(route.params.get("id"), Some("5"));
    assert_eq!(history.href(), "/Users/5/");
}
