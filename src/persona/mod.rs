//! Personas, the performers that play them, and the entities they act on.
//!
//! A story is told "as a" persona. For every step the registry supplies a
//! fresh performer for the configured layer, hands it the step's entity and
//! the story's collaborators, then runs the named operation.

pub mod entity;
pub mod registry;
pub mod types;

pub use entity::{Action, Entity, EntityRef, Verb};
pub use registry::{layer_key, performer_identifier, Blueprint, PerformerBuilder, PersonaRegistry, Registration};
pub use types::{AppRunner, Pending, Performer, Persona, PersonaRef};
