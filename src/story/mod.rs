//! Stories: the Given/When/Then protocol and step dispatch.
//!
//! ```text
//! Feature::so_that ─► Story ─as_a─► Behaviour<Bound>
//!                                   └─given─► Behaviour<Given> ─and/when─► ...
//! ```
//!
//! Every step narrates itself to the story's sinks, then asks the bound
//! performer to carry it out. The phase types make out-of-order steps a
//! compile error: there is no `when` before a `given`, and nothing follows
//! `then` except `and`.

pub mod feature;
pub mod narration;

use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::{BindingError, Error, Result};
use crate::naming::{decapitalise_initial, humanize, short_type_name, Names};
use crate::persona::registry::Collaborators;
use crate::persona::{Action, AppRunner, Blueprint, Pending, PersonaRef, PersonaRegistry};
use crate::sink::NarrationLog;

pub use feature::{Feature, SinkFactory};

// ─────────────────────────────────────────────────────────────────
// Phases
// ─────────────────────────────────────────────────────────────────

/// Step phases a [`Behaviour`] can be in.
pub mod phase {
    /// A persona is bound; the next step is a `given`.
    pub struct Bound;
    pub struct Given;
    pub struct When;
    pub struct Then;
}

use phase::{Bound, Given, Then, When};

// ─────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────

/// Per-story state shared by every step.
pub struct Session {
    names: Names,
    log: NarrationLog,
    registry: Rc<PersonaRegistry>,
    layer: Option<String>,
    runner: Option<Rc<dyn AppRunner>>,
    bound: Option<Blueprint>,
    finished: bool,
}

impl Session {
    pub(crate) fn new(
        names: Names,
        log: NarrationLog,
        registry: Rc<PersonaRegistry>,
        layer: Option<String>,
        runner: Option<Rc<dyn AppRunner>>,
    ) -> Self {
        Self {
            names,
            log,
            registry,
            layer,
            runner,
            bound: None,
            finished: false,
        }
    }

    /// Open the story section with its heading and business value.
    fn start(&mut self, test_method: &str, business_value: &str) -> Result<()> {
        self.log.section_start()?;
        self.log.write_line(&narration::heading(test_method))?;
        self.log.steps_start()?;
        self.log.write_line(&narration::so_that(business_value))
    }

    /// Close the story section and dispose every sink. Runs once.
    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let closed = self
            .log
            .steps_stop()
            .and_then(|_| self.log.section_end());
        let disposed = self.log.dispose();
        info!("Story finished");
        closed.and(disposed)
    }

    fn bind(&mut self, persona: &PersonaRef) -> Result<()> {
        let blueprint = self.registry.resolve(persona, self.layer.as_deref())?;
        debug!(
            persona = short_type_name(blueprint.persona()),
            performer = blueprint.performer(),
            "Persona bound"
        );
        self.bound = Some(blueprint);
        self.log
            .write_line(&narration::as_persona(&self.names.name(persona)))
    }

    /// Narrate `action`, then have the bound performer carry it out.
    fn dispatch(&mut self, phase: &str, action: &Action) -> Result<()> {
        let line = narration::labelled(phase, &narration::narrate(&self.names, action));
        let opened = self
            .log
            .write_line(&line)
            .and_then(|_| self.log.steps_start());
        if opened.is_err() {
            action.entity().clear_verb();
            return opened;
        }

        let outcome = self.perform(action);

        action.entity().clear_verb();
        let closed = self.log.steps_stop();
        if let Err(e) = &outcome {
            warn!(
                phase,
                operation = action.operation(),
                error = %e.format_for_log(),
                "Step failed"
            );
        }
        outcome.and(closed)
    }

    fn perform(&self, action: &Action) -> Result<()> {
        let blueprint = self.bound.as_ref().ok_or(BindingError::NoPersonaBound)?;
        let entity = action.entity();
        let performer_name = short_type_name(blueprint.performer());
        let entity_name = short_type_name(entity.type_name());

        let mut performer = blueprint.construct()?;
        debug!(performer = performer_name, "Performer constructed");

        blueprint.inject_entity(performer.as_mut(), entity)?;
        blueprint.inject(
            performer.as_mut(),
            &Collaborators {
                log: &self.log,
                verb: entity.verb(),
                runner: self.runner.as_ref(),
            },
        );

        let operation = blueprint
            .operation(action.operation(), entity.value_type())
            .ok_or_else(|| Error::not_implemented(action.operation(), performer_name, entity_name))?;

        debug!(
            performer = performer_name,
            operation = action.operation(),
            "Invoking operation"
        );
        operation(performer.as_mut()).map_err(|e| {
            if e.downcast_ref::<Pending>().is_some() {
                Error::not_implemented(action.operation(), performer_name, entity_name)
            } else {
                Error::Invocation(e)
            }
        })
    }

    /// Run a nested behaviour under the current binding.
    fn dispatch_set<F>(&mut self, phase: &str, delegate: F) -> Result<()>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.log.write(&narration::labelled(&format!("{} we", phase), ""));
        self.log.section_start()?;
        let remembered = self.bound.clone();

        let mut set = Set {
            session: self,
            performed: 0,
        };
        let outcome = delegate(&mut set);
        let performed = set.performed;

        self.bound = remembered;
        if performed == 0 {
            self.log.discard_pending();
        }
        let mut closed = Ok(());
        for _ in 0..performed {
            closed = closed.and(self.log.steps_stop());
        }
        outcome.and(closed).and(self.log.section_end())
    }
}

// ─────────────────────────────────────────────────────────────────
// Story
// ─────────────────────────────────────────────────────────────────

/// A running story. Dropping it closes the narration and disposes the sinks;
/// call [`Story::finish`] to see disposal errors.
pub struct Story {
    session: Session,
}

impl Story {
    pub(crate) fn start(mut session: Session, test_method: &str, business_value: &str) -> Result<Self> {
        session.start(test_method, business_value)?;
        Ok(Self { session })
    }

    /// Bind `persona` and start the steps.
    pub fn as_a(&mut self, persona: &PersonaRef) -> Result<Behaviour<'_, Bound>> {
        self.session.bind(persona)?;
        Ok(Behaviour::new(&mut self.session))
    }

    pub fn names(&self) -> &Names {
        &self.session.names
    }

    /// Log handle for lines written outside any step.
    pub fn log(&self) -> &NarrationLog {
        &self.session.log
    }

    /// Files the story is written to.
    pub fn output_locations(&self) -> Vec<String> {
        self.session.log.output_locations()
    }

    pub fn finish(mut self) -> Result<()> {
        self.session.finish()
    }
}

impl Drop for Story {
    fn drop(&mut self) {
        if let Err(e) = self.session.finish() {
            warn!(error = %e.format_for_log(), "Story did not finish cleanly");
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Behaviour
// ─────────────────────────────────────────────────────────────────

/// Fluent step builder in phase `P`.
pub struct Behaviour<'s, P> {
    session: &'s mut Session,
    _phase: PhantomData<P>,
}

impl<'s, P> Behaviour<'s, P> {
    fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            _phase: PhantomData,
        }
    }

    fn step<Q>(self, phase: &str, action: &Action) -> Result<Behaviour<'s, Q>> {
        self.session.dispatch(phase, action)?;
        Ok(Behaviour::new(self.session))
    }

    fn nested<Q, F>(self, phase: &str, delegate: F) -> Result<Behaviour<'s, Q>>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.session.dispatch_set(phase, delegate)?;
        Ok(Behaviour::new(self.session))
    }
}

impl<'s> Behaviour<'s, Bound> {
    /// Bind a different persona for the steps that follow.
    pub fn as_a(self, persona: &PersonaRef) -> Result<Self> {
        self.session.bind(persona)?;
        Ok(self)
    }

    pub fn given(self, action: &Action) -> Result<Behaviour<'s, Given>> {
        self.step("given", action)
    }

    pub fn given_we<F>(self, delegate: F) -> Result<Behaviour<'s, Given>>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.nested("given", delegate)
    }
}

impl<'s> Behaviour<'s, Given> {
    pub fn and(self, action: &Action) -> Result<Self> {
        self.step("and", action)
    }

    pub fn and_we<F>(self, delegate: F) -> Result<Self>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.nested("and", delegate)
    }

    pub fn when(self, action: &Action) -> Result<Behaviour<'s, When>> {
        self.step("when", action)
    }

    pub fn when_we<F>(self, delegate: F) -> Result<Behaviour<'s, When>>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.nested("when", delegate)
    }
}

impl<'s> Behaviour<'s, When> {
    pub fn and(self, action: &Action) -> Result<Self> {
        self.step("and", action)
    }

    pub fn and_we<F>(self, delegate: F) -> Result<Self>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.nested("and", delegate)
    }

    pub fn then(self, action: &Action) -> Result<Behaviour<'s, Then>> {
        self.step("then", action)
    }

    pub fn then_we<F>(self, delegate: F) -> Result<Behaviour<'s, Then>>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.nested("then", delegate)
    }
}

impl<'s> Behaviour<'s, Then> {
    pub fn and(self, action: &Action) -> Result<Self> {
        self.step("and", action)
    }

    pub fn and_we<F>(self, delegate: F) -> Result<Self>
    where
        F: FnOnce(&mut Set<'_>) -> Result<()>,
    {
        self.nested("and", delegate)
    }
}

// ─────────────────────────────────────────────────────────────────
// Nested behaviours
// ─────────────────────────────────────────────────────────────────

/// Handle passed to `given_we`/`when_we`/`then_we`/`and_we` delegates.
pub struct Set<'a> {
    session: &'a mut Session,
    performed: usize,
}

impl<'a> Set<'a> {
    /// Title the nested behaviour and start its steps with the persona
    /// bound in the enclosing story.
    pub fn perform(&mut self, title: &str) -> Result<Behaviour<'_, Bound>> {
        let heading = decapitalise_initial(&humanize(title));
        self.session.log.write_line(&heading)?;
        self.session.log.steps_start()?;
        self.performed += 1;
        Ok(Behaviour::new(self.session))
    }

    pub fn names(&self) -> &Names {
        &self.session.names
    }
}
