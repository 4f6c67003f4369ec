//! Per-suite story setup: configuration, performers and sinks.

use std::path::PathBuf;
use std::rc::Rc;

use chrono::Utc;
use tracing::info;

use crate::config::StoryConfig;
use crate::error::Result;
use crate::identity::{test_method_name, TestIdentity};
use crate::naming::Names;
use crate::persona::{AppRunner, PersonaRegistry};
use crate::sink::{CompositeSink, ConsoleSink, DocumentSink, NarrationLog, Renderers, Sink};

use super::{Session, Story};

/// Builds the sinks for one story from its qualified test name.
pub type SinkFactory = Box<dyn Fn(&str, &StoryConfig) -> Result<Vec<Box<dyn Sink>>>>;

/// Shared setup for the stories of one test suite.
///
/// ```no_run
/// # use storyteller::{Feature, FixedIdentity, PersonaRegistry, StoryConfig};
/// # fn main() -> storyteller::Result<()> {
/// let feature = Feature::new(StoryConfig::default(), PersonaRegistry::new());
/// let story = feature.so_that(&FixedIdentity::new("shop::register_customer"), "WeIncreaseTheCustomerBase")?;
/// story.finish()
/// # }
/// ```
pub struct Feature {
    config: StoryConfig,
    registry: Rc<PersonaRegistry>,
    names: Names,
    renderers: Option<Rc<dyn Fn() -> Renderers>>,
    sinks: Option<SinkFactory>,
    runner: Option<Rc<dyn AppRunner>>,
}

impl Feature {
    pub fn new(config: StoryConfig, registry: PersonaRegistry) -> Self {
        Self {
            config,
            registry: Rc::new(registry),
            names: Names::new(),
            renderers: None,
            sinks: None,
            runner: None,
        }
    }

    /// Share display names with the tests of this feature.
    pub fn with_names(mut self, names: Names) -> Self {
        self.names = names;
        self
    }

    /// Replace the configured console/document sinks.
    pub fn with_sinks(
        mut self,
        factory: impl Fn(&str, &StoryConfig) -> Result<Vec<Box<dyn Sink>>> + 'static,
    ) -> Self {
        self.sinks = Some(Box::new(factory));
        self
    }

    /// Object renderers for the default sinks.
    pub fn with_renderers(mut self, renderers: impl Fn() -> Renderers + 'static) -> Self {
        self.renderers = Some(Rc::new(renderers));
        self
    }

    /// Application handle passed to every performer.
    pub fn with_runner(mut self, runner: Rc<dyn AppRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    /// A fresh document path for `test_name`:
    /// `<output_dir>/<test name with :: as .>/<UTC timestamp>.<extension>`.
    pub fn output_path(&self, test_name: &str, extension: &str) -> PathBuf {
        let folder = test_name.replace("::", ".");
        let stamp = Utc::now().format("%Y%m%d%H%M%S%6f");
        self.config
            .output_dir()
            .join(folder)
            .join(format!("{}.{}", stamp, extension.trim_start_matches('.')))
    }

    fn renderers(&self) -> Renderers {
        match &self.renderers {
            Some(make) => make(),
            None => Renderers::default(),
        }
    }

    /// Console and document sinks as configured.
    pub fn default_sinks(&self, test_name: &str) -> Result<Vec<Box<dyn Sink>>> {
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();

        let console = &self.config.console;
        if console.enabled {
            let mut sink = ConsoleSink::new()
                .with_indent_size(console.indent_size)
                .with_renderers(self.renderers());
            if console.aligned {
                sink = sink.with_label_width(self.config.story.label_width);
            }
            if let Some(level) = console.report_level {
                sink = sink.with_report_level(level);
            }
            sinks.push(Box::new(sink));
        }

        let document = &self.config.document;
        if document.enabled {
            let path = self.output_path(test_name, &document.extension);
            let sink = DocumentSink::create_with_stylesheet(path, &document.stylesheet)?
                .with_renderers(self.renderers());
            sinks.push(Box::new(sink));
        }

        Ok(sinks)
    }

    /// Start a story for the current test, stating its business value.
    pub fn so_that(&self, identity: &dyn TestIdentity, business_value: &str) -> Result<Story> {
        let test_name = identity.current_test()?;
        let sinks = match &self.sinks {
            Some(factory) => factory(&test_name, &self.config)?,
            None => self.default_sinks(&test_name)?,
        };

        let log = NarrationLog::new(CompositeSink::new(sinks)?);
        log.set_start_texts_to_emphasise(&self.config.narration.emphasis);
        log.set_start_texts_to_have_section_open(&self.config.narration.expand);

        info!(
            test = %test_name,
            layer = ?self.config.story.layer,
            "Story started"
        );

        let session = Session::new(
            self.names.clone(),
            log,
            Rc::clone(&self.registry),
            self.config.story.layer.clone(),
            self.runner.clone(),
        );
        Story::start(session, test_method_name(&test_name), business_value)
    }
}
