//! Narration sinks
//!
//! A sink receives narration lines and the section/steps structure around
//! them. Every sink supports the core [`Sink`] calls; the optional
//! capabilities (emphasis, expandable sections, images) are exposed through
//! accessor methods that return `None` when a sink lacks them.

pub mod composite;
pub mod console;
pub mod document;
pub mod render;

use std::any::Any;

use crate::error::Result;

pub use composite::{CompositeSink, NarrationLog};
pub use console::ConsoleSink;
pub use document::DocumentSink;
pub use render::Renderers;

/// Marker separating the label column from the content column of a line.
///
/// Sinks that support alignment receive it untouched; every other sink
/// sees a single space instead.
pub const MID_ALIGN: &str = "<>";

/// Phrases emphasised and expanded by default.
pub const DEFAULT_PHRASES: &[&str] = &["I want", "So that", "As", "Given", "When", "Then", "And"];

/// Output destination for narration.
///
/// Calls to `section_start`/`section_end` and `steps_start`/`steps_stop`
/// always come in balanced pairs. `dispose` may be called more than once and
/// must only release resources the first time.
pub trait Sink: Send {
    /// Kind used to deduplicate sinks in a composite.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// A new collapsible section starts; the next line is its heading.
    fn section_start(&mut self) -> Result<()>;

    fn section_end(&mut self) -> Result<()>;

    /// A run of step lines starts.
    fn steps_start(&mut self) -> Result<()>;

    fn steps_stop(&mut self) -> Result<()>;

    fn write_line(&mut self, content: &str) -> Result<()>;

    /// Render an arbitrary value. Sinks without renderers ignore it.
    fn write_object(&mut self, _object: &dyn Any) -> Result<()> {
        Ok(())
    }

    /// Files this sink writes to.
    fn output_locations(&self) -> Vec<String> {
        Vec::new()
    }

    /// Tell the reader where else this run was logged.
    fn write_output_locations(&mut self, locations: &[String]) -> Result<()>;

    fn dispose(&mut self) -> Result<()>;

    /// Whether lines may carry the [`MID_ALIGN`] marker.
    fn supports_alignment(&self) -> bool {
        false
    }

    fn emphasis(&mut self) -> Option<&mut dyn Emphasis> {
        None
    }

    fn expandable_sections(&mut self) -> Option<&mut dyn ExpandableSections> {
        None
    }

    fn images(&mut self) -> Option<&mut dyn ImageAttachment> {
        None
    }
}

/// Highlight lines starting with one of a set of phrases.
pub trait Emphasis {
    fn set_start_texts_to_emphasise(&mut self, texts: &[String]);
}

/// Choose which sections render expanded.
pub trait ExpandableSections {
    fn set_start_texts_to_have_section_open(&mut self, texts: &[String]);
}

/// Attach screenshots next to step lines.
pub trait ImageAttachment {
    /// Attach `image` next to the lines written since the last attachment and
    /// keep `deferred` to be flushed when the current run of lines ends.
    fn attach_image(&mut self, image: Option<&Image>, deferred: Option<Image>) -> Result<()>;
}

/// An encoded PNG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    pub fn png(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Owned phrase list from string slices.
pub fn phrases(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

/// Phrase in `texts` that `content` starts with, ignoring case.
pub(crate) fn starting_phrase<'a>(content: &str, texts: &'a [String]) -> Option<&'a str> {
    texts
        .iter()
        .find(|t| {
            content
                .get(..t.len())
                .is_some_and(|head| head.to_lowercase() == t.to_lowercase())
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_phrase_ignores_case() {
        let texts = phrases(DEFAULT_PHRASES);
        assert_eq!(starting_phrase("given customer register", &texts), Some("Given"));
        assert_eq!(starting_phrase("I WANT to log in", &texts), Some("I want"));
        assert_eq!(starting_phrase("customer login", &texts), None);
        assert_eq!(starting_phrase("", &texts), None);
    }

    #[test]
    fn test_starting_phrase_respects_char_boundaries() {
        let texts = phrases(&["Given"]);
        assert_eq!(starting_phrase("gïven", &texts), None);
    }
}
