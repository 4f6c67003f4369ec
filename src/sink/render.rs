//! Object rendering for `write_object`.

use std::any::Any;

use serde::Serialize;

type RenderFn = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

/// Ordered list of per-type renderers; the first one that accepts the value wins.
pub struct Renderers {
    entries: Vec<(&'static str, RenderFn)>,
}

impl Renderers {
    /// No renderers; every object renders to nothing.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Render values of type `T` with `render`.
    pub fn with<T: Any>(mut self, render: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.entries.push((
            std::any::type_name::<T>(),
            Box::new(move |object| object.downcast_ref::<T>().map(&render)),
        ));
        self
    }

    /// Render values of type `T` as compact JSON.
    pub fn json<T: Any + Serialize>(self) -> Self {
        self.with::<T>(|value| serde_json::to_string(value).unwrap_or_default())
    }

    /// Render `object`, or `None` when no renderer handles its type.
    pub fn render(&self, object: &dyn Any) -> Option<String> {
        self.entries.iter().find_map(|(_, render)| render(object))
    }

    /// Type names this set can render, in order.
    pub fn handled_types(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }
}

impl Default for Renderers {
    /// Strings render as themselves.
    fn default() -> Self {
        Self::empty()
            .with::<String>(|s| s.clone())
            .with::<&'static str>(|s| s.to_string())
    }
}
