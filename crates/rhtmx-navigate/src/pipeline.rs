// File: src/pipeline.rs
// Purpose: Walks registered directors against one route

use crate::director::{Controller, Director, Evaluation, Resolve};
use crate::navigate::Navigator;
use crate::pattern::MatchOptions;
use crate::route::{Params, Route};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Completion {
    /// Address a redirect-class result rewrote to, when one cut the pipeline short
    pub redirect: Option<String>,
    /// Named directors that matched
    pub matched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Named,
    Fallback,
    Done,
}

enum Step {
    Run(Rc<Director>),
    Finish,
    Halt,
}

enum Flow {
    Continue,
    Stop(String),
    Halt,
}

enum Slot {
    Loading,
    Ready(Option<Controller>),
    Detached,
}

type OnComplete = Box<dyn FnOnce(Completion)>;

/// One in-flight dispatch
///
/// Directors run strictly one after another. A loader that resolves while
/// it is still on the stack is picked up by the [`Pipeline::drive`] loop;
/// one that resolves later re-enters through its [`Resolve`] handle.
pub(crate) struct Pipeline {
    route: Rc<RefCell<Route>>,
    directors: Vec<Rc<Director>>,
    fallback: Rc<Director>,
    options: MatchOptions,
    navigator: Rc<dyn Navigator>,
    alive: Rc<Cell<bool>>,
    cursor: usize,
    matched: usize,
    stage: Stage,
    on_complete: Option<OnComplete>,
}

/// Runs `directors` in registration order against `route`
///
/// When no named director matched, `fallback` runs once and its completion
/// completes the dispatch. `on_complete` is never called once `alive` has
/// been cleared.
pub(crate) fn dispatch(
    route: Rc<RefCell<Route>>,
    directors: Vec<Rc<Director>>,
    fallback: Rc<Director>,
    options: MatchOptions,
    navigator: Rc<dyn Navigator>,
    alive: Rc<Cell<bool>>,
    on_complete: impl FnOnce(Completion) + 'static,
) {
    let pipeline = Rc::new(RefCell::new(Pipeline {
        route,
        directors,
        fallback,
        options,
        navigator,
        alive,
        cursor: 0,
        matched: 0,
        stage: Stage::Named,
        on_complete: Some(Box::new(on_complete)),
    }));

    Pipeline::drive(&pipeline);
}

impl Pipeline {
    fn drive(this: &Rc<RefCell<Self>>) {
        loop {
            let step = this.borrow_mut().next_step();

            let director = match step {
                Step::Run(director) => director,
                Step::Finish => return Self::finish(this, None),
                Step::Halt => return,
            };

            let Some(result) = Self::execute(this, &director) else {
                // Waiting on an asynchronous loader.
                return;
            };

            match Self::settle(this, &director, result) {
                Flow::Continue => continue,
                Flow::Stop(redirect) => return Self::finish(this, Some(redirect)),
                Flow::Halt => return,
            }
        }
    }

    fn next_step(&mut self) -> Step {
        if !self.alive.get() {
            return Step::Halt;
        }

        match self.stage {
            Stage::Named => {
                while let Some(director) = self.directors.get(self.cursor).cloned() {
                    self.cursor += 1;

                    let pathname = self.route.borrow().pathname.clone();
                    match director.evaluate(&pathname, self.options) {
                        Evaluation::Matched(params) => {
                            trace!(director = director.id(), %pathname, "matched");
                            self.route.borrow_mut().params = params;
                            self.matched += 1;
                            return Step::Run(director);
                        }
                        Evaluation::Middleware => {
                            trace!(director = director.id(), "middleware");
                            return Step::Run(director);
                        }
                        Evaluation::Miss => {
                            trace!(director = director.id(), "skipped");
                            self.route.borrow_mut().params = Params::Unmatched;
                        }
                        Evaluation::Skip => {
                            trace!(director = director.id(), "skipped");
                        }
                    }
                }

                if self.matched > 0 {
                    self.stage = Stage::Done;
                    Step::Finish
                } else {
                    trace!(director = self.fallback.id(), "falling back to anonymous director");
                    self.stage = Stage::Fallback;
                    Step::Run(self.fallback.clone())
                }
            }
            Stage::Fallback => {
                self.stage = Stage::Done;
                Step::Finish
            }
            Stage::Done => Step::Halt,
        }
    }

    /// Runs one director; `None` means its loader has not resolved yet
    fn execute(this: &Rc<RefCell<Self>>, director: &Rc<Director>) -> Option<Option<Controller>> {
        if let Some(memoized) = director.controller() {
            return Some(Some(memoized));
        }

        let slot = Rc::new(RefCell::new(Slot::Loading));

        let resolve = {
            let slot = slot.clone();
            let pipeline = this.clone();
            let director = director.clone();
            Resolve::new(move |result| {
                let late = {
                    let mut slot = slot.borrow_mut();
                    match std::mem::replace(&mut *slot, Slot::Detached) {
                        Slot::Loading => {
                            *slot = Slot::Ready(result);
                            None
                        }
                        _ => Some(result),
                    }
                };

                if let Some(result) = late {
                    Self::resume(&pipeline, &director, result);
                }
            })
        };

        director.load(resolve);

        let taken = std::mem::replace(&mut *slot.borrow_mut(), Slot::Detached);
        match taken {
            Slot::Ready(result) => Some(result),
            _ => None,
        }
    }

    fn resume(this: &Rc<RefCell<Self>>, director: &Rc<Director>, result: Option<Controller>) {
        match Self::settle(this, director, result) {
            Flow::Continue => Self::drive(this),
            Flow::Stop(redirect) => Self::finish(this, Some(redirect)),
            Flow::Halt => {}
        }
    }

    /// Applies a director's result to the route and decides how to proceed
    fn settle(this: &Rc<RefCell<Self>>, director: &Director, result: Option<Controller>) -> Flow {
        let (route, navigator) = {
            let pipeline = this.borrow();
            if !pipeline.alive.get() {
                return Flow::Halt;
            }
            (pipeline.route.clone(), pipeline.navigator.clone())
        };

        if let Some(controller) = &result {
            director.memoize(controller.clone());
            route.borrow_mut().controller = Some(controller.clone());
        }

        match result {
            Some(Controller::Redirect(to)) => {
                trace!(director = director.id(), %to, "redirect");
                let href = navigator.rewrite(&to);
                this.borrow_mut().stage = Stage::Done;
                Flow::Stop(href)
            }
            None if director.is_async() => {
                trace!(director = director.id(), "transitional");
                Flow::Continue
            }
            _ => {
                trace!(director = director.id(), "terminal");
                Flow::Continue
            }
        }
    }

    fn finish(this: &Rc<RefCell<Self>>, redirect: Option<String>) {
        let (on_complete, matched) = {
            let mut pipeline = this.borrow_mut();
            pipeline.stage = Stage::Done;
            (pipeline.on_complete.take(), pipeline.matched)
        };

        if let Some(on_complete) = on_complete {
            on_complete(Completion { redirect, matched });
        }
    }
}
