//! Domain entities as seen by stories: shared handles with a one-shot verb.

use std::any::{type_name, Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::naming::{capitalise_initial, Identity};

const SUBJECT: &str = "[subject]";
const OBJECT: &str = "[object]";

/// Sentence template attached to an entity for the next step only.
///
/// `customer.has("completedRegistration")` narrates the next step as
/// `<customer name> has completed registration <operation>`; an empty value
/// still reads `<customer name> has <operation>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verb {
    value: String,
    sentence: String,
}

impl Verb {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let sentence = format!("{}Has{}{}", SUBJECT, capitalise_initial(&value), OBJECT);
        Self { value, sentence }
    }

    /// The raw value passed to `has`, readable by performers.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    /// Fill the template.
    pub fn narrate(&self, subject: &str, object: &str) -> String {
        self.sentence.replace(SUBJECT, subject).replace(OBJECT, object)
    }
}

struct EntityCell<T> {
    id: Uuid,
    value: RefCell<T>,
    verb: RefCell<Option<Verb>>,
}

/// Shared handle to a domain entity.
///
/// Clones share the value, the identity and the verb, so the copy injected
/// into a performer sees everything the test set up.
pub struct Entity<T> {
    cell: Rc<EntityCell<T>>,
}

impl<T: 'static> Entity<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(EntityCell {
                id: Uuid::new_v4(),
                value: RefCell::new(value),
                verb: RefCell::new(None),
            }),
        }
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.value.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.value.borrow_mut()
    }

    /// Attach a verb for the next step that uses this entity.
    pub fn has(&self, value: impl Into<String>) -> &Self {
        *self.cell.verb.borrow_mut() = Some(Verb::new(value));
        self
    }

    pub fn verb(&self) -> Option<Verb> {
        self.cell.verb.borrow().clone()
    }

    pub fn clear_verb(&self) {
        self.cell.verb.borrow_mut().take();
    }

    /// The step "perform `operation` on this entity".
    pub fn action(&self, operation: impl Into<String>) -> Action {
        Action {
            entity: Rc::new(self.clone()),
            operation: operation.into(),
        }
    }
}

impl<T> Clone for Entity<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: 'static> Identity for Entity<T> {
    fn identity(&self) -> Uuid {
        self.cell.id
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

impl<T: fmt::Debug> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.cell.id)
            .field("value", &self.cell.value)
            .finish()
    }
}

/// Type-erased view of an [`Entity`] used during dispatch.
pub trait EntityRef: Identity {
    /// `TypeId` of the wrapped value.
    fn value_type(&self) -> TypeId;

    fn verb(&self) -> Option<Verb>;

    fn clear_verb(&self);

    /// Downcast target: the concrete `Entity<T>`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> EntityRef for Entity<T> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn verb(&self) -> Option<Verb> {
        Entity::verb(self)
    }

    fn clear_verb(&self) {
        Entity::clear_verb(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An entity paired with the operation a step performs on it.
#[derive(Clone)]
pub struct Action {
    entity: Rc<dyn EntityRef>,
    operation: String,
}

impl Action {
    pub fn entity(&self) -> &dyn EntityRef {
        self.entity.as_ref()
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("entity", &self.entity.type_name())
            .field("operation", &self.operation)
            .finish()
    }
}
