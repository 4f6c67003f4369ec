//! Core types for the persona system.
//!
//! A persona is an abstract role ("web user") that tests speak in terms of.
//! Each persona is played by one performer per target layer; the performer is
//! the type that actually drives the application.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use uuid::Uuid;

use crate::naming::Identity;
use crate::sink::NarrationLog;

use super::entity::Verb;

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// Marker for role types. Implement it on a unit struct per role:
///
/// ```
/// use storyteller::persona::Persona;
///
/// pub struct WebUser;
/// impl Persona for WebUser {}
/// ```
pub trait Persona: 'static {}

/// A persona instance a story can be told as.
///
/// Instances of the same role type are distinct for naming purposes but
/// resolve to the same performers.
#[derive(Clone)]
pub struct PersonaRef {
    id: Uuid,
    type_id: TypeId,
    type_name: &'static str,
}

impl PersonaRef {
    pub fn of<P: Persona>() -> Self {
        Self {
            id: Uuid::new_v4(),
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
        }
    }

    pub fn persona_type(&self) -> TypeId {
        self.type_id
    }
}

impl Identity for PersonaRef {
    fn identity(&self) -> Uuid {
        self.id
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for PersonaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonaRef")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Performer
// ─────────────────────────────────────────────────────────────────

/// A layer-specific implementation of a persona.
///
/// A fresh performer is built for every step. Before the operation runs it
/// is handed the story's collaborators through these setters; each one
/// defaults to ignoring the value, so a performer only overrides what it
/// uses.
pub trait Performer: 'static {
    /// Log for narration the performer writes itself.
    fn set_log(&mut self, _log: NarrationLog) {}

    /// Verb attached to the step's entity, if any.
    fn set_verb(&mut self, _verb: Verb) {}

    /// Handle to the application under test, if the feature has one.
    fn set_runner(&mut self, _runner: Rc<dyn AppRunner>) {}
}

/// The application under test (a browser session, an HTTP client, ...).
///
/// Performers downcast it to the concrete runner they expect.
pub trait AppRunner {
    /// Short description used in diagnostics.
    fn label(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Returned by a performer operation that has not been written yet.
///
/// The story reports it as a pending implementation instead of a failure
/// inside the operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("pending implementation")]
pub struct Pending;

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
