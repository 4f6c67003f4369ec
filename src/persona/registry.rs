//! Persona registry: which performer plays which persona on which layer.
//!
//! Performers are registered up front together with the entity slots they
//! accept and the operations they implement. Resolution is a plain lookup on
//! `(persona type, layer key)`; no names are parsed at dispatch time.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{BindingError, Error, Result};
use crate::naming::{short_type_name, snake_case, Identity};
use crate::sink::NarrationLog;

use super::entity::{Entity, EntityRef, Verb};
use super::types::{AppRunner, Performer, Persona, PersonaRef};

type Factory = Rc<dyn Fn() -> anyhow::Result<Box<dyn Any>>>;
type SlotFn = Rc<dyn Fn(&mut dyn Any, &dyn EntityRef) -> bool>;
pub(crate) type OperationFn = Rc<dyn Fn(&mut dyn Any) -> anyhow::Result<()>>;
type InjectFn = for<'a> fn(&mut dyn Any, &Collaborators<'a>);

/// Normalize a layer name: `" REST-api "` → `rest_api`.
pub fn layer_key(layer: &str) -> String {
    layer
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Where a performer for `persona_type` on `layer` is expected to live:
/// the persona's module path with its last segment replaced by the layer.
///
/// `shop::personas::WebUser` on `presentation` → `shop::presentation::WebUser`.
pub fn performer_identifier(persona_type: &str, layer: Option<&str>) -> String {
    let Some(layer) = layer else {
        return persona_type.to_string();
    };
    let layer = layer_key(layer);
    match persona_type.rsplit_once("::") {
        Some((namespace, name)) => match namespace.rsplit_once("::") {
            Some((parent, _)) => format!("{}::{}::{}", parent, layer, name),
            None => format!("{}::{}", layer, name),
        },
        None => format!("{}::{}", layer, persona_type),
    }
}

// ─────────────────────────────────────────────────────────────────
// Blueprint
// ─────────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Hash)]
enum OperationKey {
    Plain(String),
    Qualified(TypeId, String),
}

/// Collaborators handed to a fresh performer before its operation runs.
pub(crate) struct Collaborators<'a> {
    pub log: &'a NarrationLog,
    pub verb: Option<Verb>,
    pub runner: Option<&'a Rc<dyn AppRunner>>,
}

fn inject_collaborators<I: Performer>(target: &mut dyn Any, collaborators: &Collaborators<'_>) {
    let Some(performer) = target.downcast_mut::<I>() else {
        return;
    };
    performer.set_log(collaborators.log.clone());
    if let Some(verb) = &collaborators.verb {
        performer.set_verb(verb.clone());
    }
    if let Some(runner) = collaborators.runner {
        performer.set_runner(Rc::clone(runner));
    }
}

/// Everything needed to build and drive one performer type.
#[derive(Clone)]
pub struct Blueprint {
    persona: &'static str,
    performer: &'static str,
    layer: Option<String>,
    factory: Factory,
    inject: InjectFn,
    slots: HashMap<TypeId, SlotFn>,
    operations: HashMap<OperationKey, OperationFn>,
}

impl Blueprint {
    /// Type name of the persona this blueprint plays.
    pub fn persona(&self) -> &'static str {
        self.persona
    }

    /// Type name of the performer.
    pub fn performer(&self) -> &'static str {
        self.performer
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    /// Number of registered operations (plain and qualified).
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Build a fresh performer instance.
    pub(crate) fn construct(&self) -> std::result::Result<Box<dyn Any>, BindingError> {
        (self.factory)().map_err(|source| BindingError::Construct {
            performer: short_type_name(self.performer).to_string(),
            source,
        })
    }

    /// Hand `entity` to the slot registered for its type.
    pub(crate) fn inject_entity(
        &self,
        performer: &mut dyn Any,
        entity: &dyn EntityRef,
    ) -> std::result::Result<(), BindingError> {
        let injected = self
            .slots
            .get(&entity.value_type())
            .is_some_and(|slot| slot(performer, entity));
        if injected {
            return Ok(());
        }
        let entity_type = short_type_name(entity.type_name());
        Err(BindingError::MissingEntitySlot {
            performer: short_type_name(self.performer).to_string(),
            entity: entity_type.to_string(),
            reference: snake_case(entity_type),
        })
    }

    pub(crate) fn inject(&self, performer: &mut dyn Any, collaborators: &Collaborators<'_>) {
        (self.inject)(performer, collaborators);
    }

    /// The operation `name`, looked up as a plain name first and then as an
    /// operation qualified by the entity type.
    pub(crate) fn operation(&self, name: &str, entity_type: TypeId) -> Option<OperationFn> {
        self.operations
            .get(&OperationKey::Plain(name.to_string()))
            .or_else(|| {
                self.operations
                    .get(&OperationKey::Qualified(entity_type, name.to_string()))
            })
            .cloned()
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("persona", &self.persona)
            .field("performer", &self.performer)
            .field("layer", &self.layer)
            .field("slots", &self.slots.len())
            .field("operations", &self.operations.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────

/// One registered performer, for listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Registration {
    pub persona: &'static str,
    pub layer: Option<String>,
    pub performer: &'static str,
}

/// Maps `(persona, layer)` to the performer that plays it there.
#[derive(Default)]
pub struct PersonaRegistry {
    blueprints: HashMap<(TypeId, Option<String>), Blueprint>,
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register performer `I` for persona `P` on `layer` (`None`: the
    /// performer used when no layer is configured). Replaces any earlier
    /// registration for the same pair.
    pub fn register<P, I>(
        &mut self,
        layer: Option<&str>,
        factory: impl Fn() -> anyhow::Result<I> + 'static,
    ) -> PerformerBuilder<'_, I>
    where
        P: Persona,
        I: Performer,
    {
        let layer = layer.map(layer_key);
        debug!(
            persona = type_name::<P>(),
            performer = type_name::<I>(),
            layer = ?layer,
            "Registering performer"
        );
        let blueprint = Blueprint {
            persona: type_name::<P>(),
            performer: type_name::<I>(),
            layer: layer.clone(),
            factory: Rc::new(move || factory().map(|p| Box::new(p) as Box<dyn Any>)),
            inject: inject_collaborators::<I>,
            slots: HashMap::new(),
            operations: HashMap::new(),
        };
        let key = (TypeId::of::<P>(), layer);
        self.blueprints.insert(key.clone(), blueprint);
        PerformerBuilder {
            blueprint: self.blueprints.get_mut(&key),
            _performer: std::marker::PhantomData,
        }
    }

    /// Register a performer built with `Default::default()`.
    pub fn register_default<P, I>(&mut self, layer: Option<&str>) -> PerformerBuilder<'_, I>
    where
        P: Persona,
        I: Performer + Default,
    {
        self.register::<P, I>(layer, || Ok(I::default()))
    }

    /// Find the performer playing `persona` on `layer`.
    pub fn resolve(&self, persona: &PersonaRef, layer: Option<&str>) -> Result<Blueprint> {
        let key = layer.map(layer_key);
        let identifier = performer_identifier(persona.type_name(), layer);
        match self.blueprints.get(&(persona.persona_type(), key)) {
            Some(blueprint) => {
                debug!(identifier = %identifier, performer = blueprint.performer, "Resolved performer");
                Ok(blueprint.clone())
            }
            None => Err(Error::resolution(identifier, persona.type_name(), layer)),
        }
    }

    /// Every registration, sorted by persona then layer.
    pub fn registrations(&self) -> Vec<Registration> {
        let mut all: Vec<Registration> = self
            .blueprints
            .values()
            .map(|b| Registration {
                persona: b.persona,
                layer: b.layer.clone(),
                performer: b.performer,
            })
            .collect();
        all.sort();
        all
    }

    /// Distinct layer keys with at least one performer.
    pub fn layers(&self) -> Vec<String> {
        let mut layers: Vec<String> = self
            .blueprints
            .keys()
            .filter_map(|(_, layer)| layer.clone())
            .collect();
        layers.sort();
        layers.dedup();
        layers
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

/// Adds entity slots and operations to a freshly registered performer.
pub struct PerformerBuilder<'r, I> {
    blueprint: Option<&'r mut Blueprint>,
    _performer: std::marker::PhantomData<fn() -> I>,
}

impl<'r, I: Performer> PerformerBuilder<'r, I> {
    /// Accept entities of type `E` through `set`.
    pub fn entity<E: 'static>(mut self, set: impl Fn(&mut I, Entity<E>) + 'static) -> Self {
        if let Some(blueprint) = self.blueprint.as_deref_mut() {
            let slot: SlotFn = Rc::new(move |target, entity| {
                match (
                    target.downcast_mut::<I>(),
                    entity.as_any().downcast_ref::<Entity<E>>(),
                ) {
                    (Some(performer), Some(entity)) => {
                        set(performer, entity.clone());
                        true
                    }
                    _ => false,
                }
            });
            blueprint.slots.insert(TypeId::of::<E>(), slot);
        }
        self
    }

    /// Operation available on every entity type.
    pub fn operation(
        self,
        name: &str,
        run: impl Fn(&mut I) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.insert(OperationKey::Plain(name.to_string()), run)
    }

    /// Operation only available when the step's entity is an `E`.
    pub fn qualified_operation<E: 'static>(
        self,
        name: &str,
        run: impl Fn(&mut I) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.insert(OperationKey::Qualified(TypeId::of::<E>(), name.to_string()), run)
    }

    fn insert(
        mut self,
        key: OperationKey,
        run: impl Fn(&mut I) -> anyhow::Result<()> + 'static,
    ) -> Self {
        if let Some(blueprint) = self.blueprint.as_deref_mut() {
            let operation: OperationFn = Rc::new(move |target| match target.downcast_mut::<I>() {
                Some(performer) => run(performer),
                None => Err(anyhow::anyhow!(
                    "performer is not a {}",
                    short_type_name(type_name::<I>())
                )),
            });
            blueprint.operations.insert(key, operation);
        }
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
