//! Common test utilities and fixtures
//!
//! A small shop domain with one persona played on the `presentation` layer,
//! plus a console capture so tests can read the narration back.

#![allow(dead_code)]

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use storyteller::{
    ConsoleSink, Entity, Feature, NarrationLog, Pending, Performer, Persona, PersonaRegistry, Sink,
    StoryConfig, Verb,
};

// ─────────────────────────────────────────────────────────────────
// Console capture
// ─────────────────────────────────────────────────────────────────

/// Shared in-memory writer standing in for stdout.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    /// Lines without their indentation.
    pub fn trimmed(&self) -> Vec<String> {
        self.lines().iter().map(|l| l.trim().to_string()).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Shop fixture
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Customer {
    pub email: String,
}

pub fn customer(email: &str) -> Entity<Customer> {
    Entity::new(Customer {
        email: email.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct Product;

pub struct WebUser;
impl Persona for WebUser {}

#[derive(Default)]
pub struct WebUserOnPresentation {
    customer: Option<Entity<Customer>>,
    log: Option<NarrationLog>,
    verb: Option<Verb>,
}

impl Performer for WebUserOnPresentation {
    fn set_log(&mut self, log: NarrationLog) {
        self.log = Some(log);
    }

    fn set_verb(&mut self, verb: Verb) {
        self.verb = Some(verb);
    }
}

impl WebUserOnPresentation {
    fn say(&self, line: String) -> anyhow::Result<()> {
        let log = self.log.as_ref().ok_or_else(|| anyhow!("no log"))?;
        log.write_line(&line)?;
        Ok(())
    }

    fn email(&self) -> anyhow::Result<String> {
        self.customer
            .as_ref()
            .map(|c| c.borrow().email.clone())
            .ok_or_else(|| anyhow!("no customer"))
    }
}

/// `WebUser` played on `presentation`:
/// - `Registration` and `Confirm_Registration` narrate what they did
/// - `Login` succeeds silently
/// - `Delete` is still pending
/// - `Explode` fails
pub fn shop_registry() -> PersonaRegistry {
    let mut registry = PersonaRegistry::new();
    registry
        .register_default::<WebUser, WebUserOnPresentation>(Some("presentation"))
        .entity::<Customer>(|p, c| p.customer = Some(c))
        .operation("Registration", |p| {
            let state = p.verb.as_ref().map(|v| v.value().to_string()).unwrap_or_default();
            let email = p.email()?;
            p.say(format!("registration {} for {}", state, email))
        })
        .operation("Confirm_Registration", |p| {
            let email = p.email()?;
            p.say(format!("confirmed {}", email))
        })
        .operation("Login", |_| Ok(()))
        .operation("Delete", |_| Err(Pending.into()))
        .operation("Explode", |_| Err(anyhow!("boom")));
    registry
}

/// Console on, document off, layer `presentation`.
pub fn console_config() -> StoryConfig {
    let mut config = StoryConfig::default();
    config.story.layer = Some("presentation".to_string());
    config.document.enabled = false;
    config
}

/// Console off, documents under `dir`.
pub fn document_config(dir: &Path) -> StoryConfig {
    let mut config = StoryConfig::default();
    config.console.enabled = false;
    config.document.output_dir = dir.to_string_lossy().into_owned();
    config
}

/// Feature narrating to a plain console sink writing into `capture`.
pub fn captured_feature(config: StoryConfig, registry: PersonaRegistry, capture: &Capture) -> Feature {
    let capture = capture.clone();
    Feature::new(config, registry).with_sinks(move |_, _| {
        let sink: Box<dyn Sink> = Box::new(ConsoleSink::with_writer(Box::new(capture.clone())));
        Ok(vec![sink])
    })
}
