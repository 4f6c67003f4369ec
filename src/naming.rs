//! Display names for story participants and identifier humanization.
//!
//! Entities and personas are named by identity, never by value: two customers
//! holding the same e-mail address keep their own names.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

/// Anything that can be named in a story.
pub trait Identity {
    /// Stable identity of this instance (shared by its clones).
    fn identity(&self) -> Uuid;

    /// Fully qualified type name used when no display name was registered.
    fn type_name(&self) -> &'static str;
}

/// Identity-keyed display names.
///
/// Cloning the handle shares the underlying map, so a test can keep naming
/// instances while a story that was handed the same `Names` is running.
/// Entries are never evicted; drop every handle to release them.
#[derive(Clone, Default)]
pub struct Names {
    entries: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl Names {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` for `instance` (replacing any earlier name) and hand the
    /// instance back so the call can sit inside a step expression.
    pub fn named<'a, T: Identity + ?Sized>(&self, instance: &'a T, name: impl Into<String>) -> &'a T {
        self.entries.write().insert(instance.identity(), name.into());
        instance
    }

    /// The registered name, or the humanized short type name.
    pub fn name<T: Identity + ?Sized>(&self, instance: &T) -> String {
        if let Some(name) = self.entries.read().get(&instance.identity()) {
            return name.clone();
        }
        humanize(short_type_name(instance.type_name()))
    }

    /// Number of named instances.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Last path segment of a type name, without generic arguments.
///
/// `my_tests::personas::WebUser` becomes `WebUser`,
/// `storyteller::Entity<app::Customer>` becomes `Entity`.
pub fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Turn an identifier into readable words: `MyMethodName` → `My method name`.
///
/// Applied in order:
/// 1. an uppercase letter following any letter becomes a space + lowercase letter
/// 2. a letter following a digit becomes a space + lowercase letter
/// 3. a digit following a letter gets a space in front
/// 4. runs of spaces collapse to one
///
/// The result is a fixed point: `humanize(&humanize(s)) == humanize(s)`.
pub fn humanize(text: &str) -> String {
    let text = split_on(text, |prev, c| prev.is_alphabetic() && c.is_uppercase(), true);
    let text = split_on(&text, |prev, c| prev.is_ascii_digit() && c.is_alphabetic(), true);
    let text = split_on(&text, |prev, c| prev.is_alphabetic() && c.is_ascii_digit(), false);
    collapse_spaces(&text)
}

/// One pass over `text`: each char for which `boundary(previous, current)`
/// holds (looking at the unmodified input) gets a space in front of it.
fn split_on(text: &str, boundary: impl Fn(char, char) -> bool, lowercase: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if prev.is_some_and(|p| boundary(p, c)) {
            out.push(' ');
            if lowercase {
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !last_was_space {
                out.push(c);
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Uppercase the first character.
pub fn capitalise_initial(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character.
pub fn decapitalise_initial(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `TestCustomer` → `test_customer`, used to name expected entity slots.
pub fn snake_case(identifier: &str) -> String {
    humanize(identifier)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
