//! Bundled walkthrough: customer registration told as a web user.
//!
//! The same two stories run against either layer. On `presentation` the web
//! user fills in forms and screenshots are attached; on `rest_api` it calls
//! endpoints. Both drive an in-memory [`ShopApp`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, bail};
use serde::Serialize;
use tracing::debug;

use crate::config::StoryConfig;
use crate::error::Result;
use crate::identity::FixedIdentity;
use crate::naming::Identity;
use crate::persona::{
    AppRunner, Entity, Pending, PerformerBuilder, Performer, Persona, PersonaRef, PersonaRegistry, Verb,
};
use crate::sink::{Image, NarrationLog, Renderers};
use crate::story::{Feature, Set};

/// Business value both stories serve.
pub const BUSINESS_VALUE: &str = "WeIncreaseTheCustomerBase";

/// Layers with a web user performer.
pub const LAYERS: [&str; 2] = ["presentation", "rest_api"];

/// 1x1 transparent PNG standing in for a browser screenshot.
const SCREENSHOT: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

// ─────────────────────────────────────────────────────────────────
// Domain
// ─────────────────────────────────────────────────────────────────

/// A shop customer.
#[derive(Debug, Clone, Default)]
pub struct Customer {
    pub email: String,
}

impl Customer {
    pub fn entity(email: impl Into<String>) -> Entity<Customer> {
        Entity::new(Self { email: email.into() })
    }
}

/// Someone using the shop through its public surface.
pub struct WebUser;
impl Persona for WebUser {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    pub confirmed: bool,
    pub logins: u32,
}

/// Account state shown after a login.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub email: String,
    pub confirmed: bool,
    pub logins: u32,
}

/// In-memory shop the performers drive.
#[derive(Default)]
pub struct ShopApp {
    accounts: RefCell<HashMap<String, Account>>,
}

impl ShopApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, email: &str) -> anyhow::Result<()> {
        let mut accounts = self.accounts.borrow_mut();
        if accounts.contains_key(email) {
            bail!("'{}' is already registered", email);
        }
        accounts.insert(email.to_string(), Account::default());
        Ok(())
    }

    pub fn confirm(&self, email: &str) -> anyhow::Result<()> {
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| anyhow!("'{}' has not registered", email))?;
        account.confirmed = true;
        Ok(())
    }

    pub fn login(&self, email: &str) -> anyhow::Result<AccountSummary> {
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts
            .get_mut(email)
            .ok_or_else(|| anyhow!("'{}' has not registered", email))?;
        if !account.confirmed {
            bail!("'{}' has not confirmed the registration", email);
        }
        account.logins += 1;
        Ok(AccountSummary {
            email: email.to_string(),
            confirmed: account.confirmed,
            logins: account.logins,
        })
    }

    pub fn account(&self, email: &str) -> Option<Account> {
        self.accounts.borrow().get(email).copied()
    }
}

impl AppRunner for ShopApp {
    fn label(&self) -> &str {
        "in-memory shop"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Performers
// ─────────────────────────────────────────────────────────────────

/// Collaborators every web user performer receives.
#[derive(Default)]
struct Stage {
    customer: Option<Entity<Customer>>,
    log: Option<NarrationLog>,
    verb: Option<Verb>,
    app: Option<Rc<dyn AppRunner>>,
}

impl Stage {
    fn email(&self) -> anyhow::Result<String> {
        self.customer
            .as_ref()
            .map(|c| c.borrow().email.clone())
            .ok_or_else(|| anyhow!("no customer was handed to the performer"))
    }

    fn with_shop<R>(&self, run: impl FnOnce(&ShopApp) -> anyhow::Result<R>) -> anyhow::Result<R> {
        let app = self.app.as_ref().ok_or_else(|| anyhow!("no application runner"))?;
        let shop = app
            .as_any()
            .downcast_ref::<ShopApp>()
            .ok_or_else(|| anyhow!("runner '{}' is not the shop", app.label()))?;
        run(shop)
    }

    fn say(&self, line: &str) -> anyhow::Result<()> {
        if let Some(log) = &self.log {
            log.write_line(line)?;
        }
        Ok(())
    }

    fn verb_value(&self) -> Option<&str> {
        self.verb.as_ref().map(Verb::value)
    }
}

/// Customer operations, written once per layer.
trait CustomerSteps: Performer + Default {
    fn stage(&mut self) -> &mut Stage;
    fn registration(&mut self) -> anyhow::Result<()>;
    fn confirm_registration(&mut self) -> anyhow::Result<()>;
    fn login(&mut self) -> anyhow::Result<()>;
}

fn customer_steps<I: CustomerSteps>(builder: PerformerBuilder<'_, I>) -> PerformerBuilder<'_, I> {
    builder
        .entity::<Customer>(|p, customer| p.stage().customer = Some(customer))
        .qualified_operation::<Customer>("Registration", I::registration)
        .qualified_operation::<Customer>("Confirm_Registration", I::confirm_registration)
        .qualified_operation::<Customer>("Login", I::login)
        .operation("Logout", |_| Err(Pending.into()))
}

macro_rules! stage_setters {
    () => {
        fn set_log(&mut self, log: NarrationLog) {
            self.stage.log = Some(log);
        }

        fn set_verb(&mut self, verb: Verb) {
            self.stage.verb = Some(verb);
        }

        fn set_runner(&mut self, runner: Rc<dyn AppRunner>) {
            self.stage.app = Some(runner);
        }
    };
}

/// Web user clicking through the site.
#[derive(Default)]
pub struct WebUserOnPresentation {
    stage: Stage,
}

impl Performer for WebUserOnPresentation {
    stage_setters!();
}

impl WebUserOnPresentation {
    fn screenshot(&self) -> anyhow::Result<()> {
        if let Some(log) = &self.stage.log {
            log.attach_image(Some(&Image::png(SCREENSHOT)), None)?;
        }
        Ok(())
    }
}

impl CustomerSteps for WebUserOnPresentation {
    fn stage(&mut self) -> &mut Stage {
        &mut self.stage
    }

    fn registration(&mut self) -> anyhow::Result<()> {
        let email = self.stage.email()?;
        let verb = self.stage.verb_value().map(str::to_string);
        match verb.as_deref() {
            Some("confirmed") => return self.confirm_registration(),
            Some("completed") | None => {}
            Some(other) => bail!("cannot narrate a registration that is '{}'", other),
        }
        self.stage.say("open the registration page")?;
        self.stage.say(&format!("enter e-mail address {}", email))?;
        self.stage.with_shop(|shop| shop.register(&email))?;
        self.screenshot()
    }

    fn confirm_registration(&mut self) -> anyhow::Result<()> {
        let email = self.stage.email()?;
        self.stage.say("follow the confirmation link")?;
        self.stage.with_shop(|shop| shop.confirm(&email))
    }

    fn login(&mut self) -> anyhow::Result<()> {
        let email = self.stage.email()?;
        self.stage.say("sign in from the home page")?;
        let summary = self.stage.with_shop(|shop| shop.login(&email))?;
        if let Some(log) = &self.stage.log {
            log.write_object(&summary)?;
        }
        self.screenshot()
    }
}

/// Web user calling the public HTTP API.
#[derive(Default)]
pub struct WebUserOnRestApi {
    stage: Stage,
}

impl Performer for WebUserOnRestApi {
    stage_setters!();
}

impl CustomerSteps for WebUserOnRestApi {
    fn stage(&mut self) -> &mut Stage {
        &mut self.stage
    }

    fn registration(&mut self) -> anyhow::Result<()> {
        let email = self.stage.email()?;
        let verb = self.stage.verb_value().map(str::to_string);
        match verb.as_deref() {
            Some("confirmed") => return self.confirm_registration(),
            Some("completed") | None => {}
            Some(other) => bail!("cannot narrate a registration that is '{}'", other),
        }
        self.stage.say("POST /customers")?;
        self.stage.with_shop(|shop| shop.register(&email))
    }

    fn confirm_registration(&mut self) -> anyhow::Result<()> {
        let email = self.stage.email()?;
        self.stage.say("POST /customers/confirmation")?;
        self.stage.with_shop(|shop| shop.confirm(&email))
    }

    fn login(&mut self) -> anyhow::Result<()> {
        let email = self.stage.email()?;
        self.stage.say("POST /sessions")?;
        let summary = self.stage.with_shop(|shop| shop.login(&email))?;
        if let Some(log) = &self.stage.log {
            log.write_object(&summary)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Stories
// ─────────────────────────────────────────────────────────────────

/// Performers for every walkthrough layer. The presentation performer also
/// plays the web user when no layer is configured.
pub fn registry() -> PersonaRegistry {
    let mut registry = PersonaRegistry::new();
    customer_steps(registry.register_default::<WebUser, WebUserOnPresentation>(None));
    customer_steps(registry.register_default::<WebUser, WebUserOnPresentation>(Some("presentation")));
    customer_steps(registry.register_default::<WebUser, WebUserOnRestApi>(Some("rest_api")));
    registry
}

/// Feature wired to a fresh shop, rendering account summaries as JSON.
pub fn feature(config: StoryConfig) -> Feature {
    Feature::new(config, registry())
        .with_runner(Rc::new(ShopApp::new()))
        .with_renderers(|| Renderers::default().json::<AccountSummary>())
}

/// Register, confirm, log in.
pub fn register_customer(feature: &Feature) -> Result<Vec<String>> {
    let names = feature.names();
    let web_user = PersonaRef::of::<WebUser>();
    let customer = Customer::entity("initial@example.com");

    let mut story = feature.so_that(&FixedIdentity::new("storyteller::demo::register_customer"), BUSINESS_VALUE)?;
    story
        .as_a(&web_user)?
        .given(&names.named(&customer, "initial customer").has("completed").action("Registration"))?
        .when(&customer.has("confirmed").action("Registration"))?
        .then(&names.named(&customer, "returning customer").action("Login"))?;

    let locations = story.output_locations();
    story.finish()?;
    Ok(locations)
}

/// The same journey reused for two customers as nested behaviours.
pub fn register_customers_in_nested_behaviours(feature: &Feature) -> Result<Vec<String>> {
    let names = feature.names();
    let web_user = PersonaRef::of::<WebUser>();
    let first = Customer::entity("first@example.com");
    let second = Customer::entity("second@example.com");
    names.named(&first, "customer 1");
    names.named(&second, "customer 2");

    let mut story = feature.so_that(
        &FixedIdentity::new("storyteller::demo::register_customers_in_nested_behaviours"),
        BUSINESS_VALUE,
    )?;
    story
        .as_a(&web_user)?
        .given_we(|set| register_and_confirm(set, &first))?
        .and_we(|set| register_and_confirm(set, &second))?;

    let locations = story.output_locations();
    story.finish()?;
    Ok(locations)
}

fn register_and_confirm(set: &mut Set<'_>, customer: &Entity<Customer>) -> Result<()> {
    let names = set.names().clone();
    debug!(customer = %customer.identity(), "Nested registration");
    set.perform("RegisterAndConfirmCustomerRegistration")?
        .given(&customer.has("completed").action("Registration"))?
        .when(&customer.action("Confirm_Registration"))?
        .then(&customer.action("Login"))?;
    names.named(customer, format!("returning {}", names.name(customer)));
    Ok(())
}

/// Run every walkthrough story, returning the files written.
pub fn run(feature: &Feature) -> Result<Vec<String>> {
    let mut locations = register_customer(feature)?;
    locations.extend(register_customers_in_nested_behaviours(feature)?);
    Ok(locations)
}
