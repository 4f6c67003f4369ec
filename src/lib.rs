//! storyteller - Given/When/Then narration and dispatch for acceptance tests
//!
//! A story states a business value, binds a persona, then runs its steps.
//! Each step is narrated to the console and an HTML document, and carried
//! out by the performer registered for the persona on the configured layer
//! (presentation, REST API, ...).

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod identity;
pub mod logging;
pub mod naming;
pub mod persona;
pub mod sink;
pub mod story;

pub use config::StoryConfig;
pub use error::{BindingError, Error, ErrorCode, Result};
pub use identity::{FixedIdentity, TestIdentity, ThreadIdentity};
pub use naming::{humanize, Identity, Names};
pub use persona::{
    Action, AppRunner, Entity, Pending, Performer, Persona, PersonaRef, PersonaRegistry, Verb,
};
pub use sink::{CompositeSink, ConsoleSink, DocumentSink, Image, NarrationLog, Renderers, Sink};
pub use story::{Behaviour, Feature, Set, SinkFactory, Story};
