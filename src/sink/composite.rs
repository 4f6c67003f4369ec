//! Fan-out over several sinks plus the shared handle performers log through.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

use super::{Emphasis, ExpandableSections, Image, ImageAttachment, Sink, MID_ALIGN};

/// Forwards every call to each of its sinks.
///
/// At most one sink of each kind is kept (the first one wins). Text passed to
/// [`CompositeSink::write`] is held back and prepended to the next line, so a
/// step keyword can be written before the step knows its own wording.
pub struct CompositeSink {
    sinks: Vec<Box<dyn Sink>>,
    pending: String,
    disposed: bool,
}

impl CompositeSink {
    /// Build the composite and let each sink announce where the others write.
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut kept: Vec<Box<dyn Sink>> = Vec::with_capacity(sinks.len());
        for sink in sinks {
            if seen.insert(sink.kind()) {
                kept.push(sink);
            } else {
                debug!(kind = sink.kind(), "Dropping duplicate sink");
            }
        }

        let locations: Vec<Vec<String>> = kept.iter().map(|s| s.output_locations()).collect();
        for (index, sink) in kept.iter_mut().enumerate() {
            let elsewhere: Vec<String> = locations
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .flat_map(|(_, paths)| paths.iter().cloned())
                .collect();
            if !elsewhere.is_empty() {
                sink.write_output_locations(&elsewhere)?;
            }
        }

        Ok(Self {
            sinks: kept,
            pending: String::new(),
            disposed: false,
        })
    }

    /// A composite with no sinks; every call is a no-op.
    pub fn empty() -> Self {
        Self {
            sinks: Vec::new(),
            pending: String::new(),
            disposed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Kinds of the sinks kept, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.kind()).collect()
    }

    /// Hold `text` back until the next line.
    pub fn write(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Drop held-back text that no line will follow, returning it.
    pub fn discard_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    fn for_each(&mut self, mut f: impl FnMut(&mut dyn Sink) -> Result<()>) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            f(sink.as_mut())?;
        }
        Ok(())
    }
}

impl Sink for CompositeSink {
    fn section_start(&mut self) -> Result<()> {
        self.for_each(|s| s.section_start())
    }

    fn section_end(&mut self) -> Result<()> {
        self.for_each(|s| s.section_end())
    }

    fn steps_start(&mut self) -> Result<()> {
        self.for_each(|s| s.steps_start())
    }

    fn steps_stop(&mut self) -> Result<()> {
        self.for_each(|s| s.steps_stop())
    }

    fn write_line(&mut self, content: &str) -> Result<()> {
        let mut line = std::mem::take(&mut self.pending);
        line.push_str(content);
        let plain = line.replace(MID_ALIGN, " ");
        self.for_each(|s| {
            if s.supports_alignment() {
                s.write_line(&line)
            } else {
                s.write_line(&plain)
            }
        })
    }

    fn write_object(&mut self, object: &dyn Any) -> Result<()> {
        self.for_each(|s| s.write_object(object))
    }

    fn output_locations(&self) -> Vec<String> {
        self.sinks.iter().flat_map(|s| s.output_locations()).collect()
    }

    fn write_output_locations(&mut self, locations: &[String]) -> Result<()> {
        self.for_each(|s| s.write_output_locations(locations))
    }

    /// Dispose every sink once; later calls do nothing.
    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        let mut first_error = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.dispose() {
                warn!(kind = sink.kind(), error = %e, "Sink failed to dispose");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn supports_alignment(&self) -> bool {
        true
    }

    fn emphasis(&mut self) -> Option<&mut dyn Emphasis> {
        Some(self)
    }

    fn expandable_sections(&mut self) -> Option<&mut dyn ExpandableSections> {
        Some(self)
    }

    fn images(&mut self) -> Option<&mut dyn ImageAttachment> {
        Some(self)
    }
}

impl Emphasis for CompositeSink {
    fn set_start_texts_to_emphasise(&mut self, texts: &[String]) {
        for sink in self.sinks.iter_mut() {
            if let Some(target) = sink.emphasis() {
                target.set_start_texts_to_emphasise(texts);
            }
        }
    }
}

impl ExpandableSections for CompositeSink {
    fn set_start_texts_to_have_section_open(&mut self, texts: &[String]) {
        for sink in self.sinks.iter_mut() {
            if let Some(target) = sink.expandable_sections() {
                target.set_start_texts_to_have_section_open(texts);
            }
        }
    }
}

impl ImageAttachment for CompositeSink {
    fn attach_image(&mut self, image: Option<&Image>, deferred: Option<Image>) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            if let Some(target) = sink.images() {
                target.attach_image(image, deferred.clone())?;
            }
        }
        Ok(())
    }
}

impl Drop for CompositeSink {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!(error = %e, "Composite sink dispose failed on drop");
        }
    }
}

/// Cloneable handle to a story's sinks.
///
/// Performers receive one to log their own lines and attach screenshots.
/// The lock is only held for the duration of a single call.
#[derive(Clone)]
pub struct NarrationLog {
    inner: Arc<Mutex<CompositeSink>>,
}

impl NarrationLog {
    pub fn new(composite: CompositeSink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(composite)),
        }
    }

    /// A log that goes nowhere.
    pub fn discard() -> Self {
        Self::new(CompositeSink::empty())
    }

    /// Hold `text` back until the next line.
    pub fn write(&self, text: &str) {
        self.inner.lock().write(text);
    }

    pub fn write_line(&self, content: &str) -> Result<()> {
        self.inner.lock().write_line(content)
    }

    pub fn write_object(&self, object: &dyn Any) -> Result<()> {
        self.inner.lock().write_object(object)
    }

    /// Attach a screenshot to the sinks that can show one.
    pub fn attach_image(&self, image: Option<&Image>, deferred: Option<Image>) -> Result<()> {
        self.inner.lock().attach_image(image, deferred)
    }

    pub fn discard_pending(&self) -> String {
        self.inner.lock().discard_pending()
    }

    pub fn section_start(&self) -> Result<()> {
        self.inner.lock().section_start()
    }

    pub fn section_end(&self) -> Result<()> {
        self.inner.lock().section_end()
    }

    pub fn steps_start(&self) -> Result<()> {
        self.inner.lock().steps_start()
    }

    pub fn steps_stop(&self) -> Result<()> {
        self.inner.lock().steps_stop()
    }

    pub fn set_start_texts_to_emphasise(&self, texts: &[String]) {
        self.inner.lock().set_start_texts_to_emphasise(texts);
    }

    pub fn set_start_texts_to_have_section_open(&self, texts: &[String]) {
        self.inner.lock().set_start_texts_to_have_section_open(texts);
    }

    pub fn output_locations(&self) -> Vec<String> {
        self.inner.lock().output_locations()
    }

    pub fn dispose(&self) -> Result<()> {
        self.inner.lock().dispose()
    }
}
