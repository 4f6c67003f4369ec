//! Story integration tests
//!
//! Tell stories through the public API and read back what the console and
//! document sinks received.

mod common;

use std::fs;

use tempfile::TempDir;

use common::{
    captured_feature, console_config, customer, document_config, shop_registry, Capture, Product,
    WebUser,
};
use storyteller::{
    demo, ConsoleSink, DocumentSink, Entity, Error, ErrorCode, Feature, FixedIdentity, PersonaRef,
    Sink, ThreadIdentity,
};

const VALUE: &str = "WeIncreaseTheCustomerBase";

fn identity(test: &str) -> FixedIdentity {
    FixedIdentity::new(format!("shop::tests::{}", test))
}

// ─────────────────────────────────────────────────────────────────
// Narration
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_story_narration_order() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let names = feature.names();
    let web_user = PersonaRef::of::<WebUser>();
    let alice = customer("alice@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    story
        .as_a(&web_user)
        .unwrap()
        .given(&alice.has("completed").action("Registration"))
        .unwrap()
        .when(&alice.action("Confirm_Registration"))
        .unwrap()
        .then(&names.named(&alice, "returning customer").action("Login"))
        .unwrap();
    story.finish().unwrap();

    assert_eq!(
        capture.lines(),
        vec![
            "I want to register customer",
            "  so that we increase the customer base",
            "  as web user",
            "  given customer has completed registration",
            "    registration completed for alice@example.com",
            "  when confirm customer registration",
            "    confirmed alice@example.com",
            "  then returning customer login",
        ]
    );
}

#[test]
fn test_verb_applies_to_one_step_only() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let bob = customer("bob@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    story
        .as_a(&web_user)
        .unwrap()
        .given(&bob.has("started").action("Registration"))
        .unwrap()
        .and(&bob.action("Login"))
        .unwrap();
    story.finish().unwrap();

    let lines = capture.trimmed();
    assert!(lines.contains(&"given customer has started registration".to_string()));
    assert!(lines.contains(&"and customer login".to_string()));
    assert!(bob.verb().is_none());
}

#[test]
fn test_named_persona() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    feature.names().named(&web_user, "Returning visitor");

    let mut story = feature.so_that(&identity("login"), VALUE).unwrap();
    story.as_a(&web_user).unwrap();
    story.finish().unwrap();

    assert!(capture.trimmed().contains(&"as returning visitor".to_string()));
}

#[test]
fn test_thread_identity_names_the_story() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);

    let story = feature.so_that(&ThreadIdentity, VALUE).unwrap();
    story.finish().unwrap();

    assert_eq!(capture.lines()[0], "I want to thread identity names the story");
}

// ─────────────────────────────────────────────────────────────────
// Nested behaviours
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_nested_behaviour() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let carol = customer("carol@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    story
        .as_a(&web_user)
        .unwrap()
        .given_we(|set| {
            set.perform("RegisterCustomer")?
                .given(&carol.has("completed").action("Registration"))?
                .when(&carol.action("Confirm_Registration"))?;
            Ok(())
        })
        .unwrap()
        .when(&carol.action("Login"))
        .unwrap();
    story.finish().unwrap();

    assert_eq!(
        capture.trimmed()[3..],
        [
            "given we register customer",
            "given customer has completed registration",
            "registration completed for carol@example.com",
            "when confirm customer registration",
            "confirmed carol@example.com",
            "when customer login",
        ]
    );

    // the nested steps sit below the line that introduces them
    let lines = capture.lines();
    let indent = |line: &str| line.len() - line.trim_start().len();
    assert!(indent(&lines[4]) > indent(&lines[3]));
    assert_eq!(indent(&lines[8]), indent(&lines[2]));
}

#[test]
fn test_nested_behaviour_that_performs_nothing_writes_nothing() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let dave = customer("dave@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    story
        .as_a(&web_user)
        .unwrap()
        .given_we(|_| Ok(()))
        .unwrap()
        .when(&dave.action("Login"))
        .unwrap();
    story.finish().unwrap();

    let lines = capture.trimmed();
    assert!(lines.iter().all(|l| !l.contains("given we")));
    assert_eq!(lines.last().map(String::as_str), Some("when customer login"));
}

#[test]
fn test_nested_failure_propagates() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let erin = customer("erin@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    let err = story
        .as_a(&web_user)
        .unwrap()
        .given_we(|set| {
            set.perform("BreakThings")?.given(&erin.action("Explode"))?;
            Ok(())
        })
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::InvocationFailed);
}

// ─────────────────────────────────────────────────────────────────
// Dispatch failures
// ─────────────────────────────────────────────────────────────────

fn failed_step(operation: &str) -> Error {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let frank = customer("frank@example.com");

    let mut story = feature.so_that(&identity("dispatch"), VALUE).unwrap();
    let err = story
        .as_a(&web_user)
        .unwrap()
        .given(&frank.action(operation))
        .err()
        .unwrap();
    err
}

#[test]
fn test_unregistered_operation_is_pending() {
    let err = failed_step("Refund");
    assert!(err.is_pending());
    assert_eq!(err.exit_code(), 40);
    let message = err.to_string();
    assert!(message.contains("Customer.Refund"), "{}", message);
    assert!(message.contains("WebUserOnPresentation"), "{}", message);
}

#[test]
fn test_unregistered_operation_invokes_nothing() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let ivy = customer("ivy@example.com");

    let mut story = feature.so_that(&identity("dispatch"), VALUE).unwrap();
    let err = story
        .as_a(&web_user)
        .unwrap()
        .given(&ivy.has("started").action("Refund"))
        .err()
        .unwrap();
    assert!(err.is_pending());
    drop(story);

    // the step line is the last thing written and the verb is gone
    assert_eq!(
        capture.trimmed().last().map(String::as_str),
        Some("given customer has started refund")
    );
    assert!(ivy.verb().is_none());
}

#[test]
fn test_pending_marker_is_pending() {
    let err = failed_step("Delete");
    assert!(matches!(err, Error::NotImplemented { .. }));
}

#[test]
fn test_operation_failure_is_reported() {
    let err = failed_step("Explode");
    assert!(matches!(err, Error::Invocation(_)));
    assert_eq!(err.to_string(), "boom");
    assert!(err.is_dispatch());
}

#[test]
fn test_step_narrated_before_failure() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let gina = customer("gina@example.com");

    let mut story = feature.so_that(&identity("dispatch"), VALUE).unwrap();
    assert!(story.as_a(&web_user).unwrap().given(&gina.action("Explode")).is_err());
    drop(story);

    assert_eq!(capture.trimmed().last().map(String::as_str), Some("given customer explode"));
}

#[test]
fn test_entity_without_slot() {
    let capture = Capture::default();
    let feature = captured_feature(console_config(), shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();
    let product = Entity::new(Product);

    let mut story = feature.so_that(&identity("dispatch"), VALUE).unwrap();
    let err = story
        .as_a(&web_user)
        .unwrap()
        .given(&product.action("Login"))
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::EntitySlotMissing);
    assert!(err.to_string().contains("'product'"), "{}", err);
}

#[test]
fn test_unregistered_layer() {
    let mut config = console_config();
    config.story.layer = Some("mobile".to_string());
    let capture = Capture::default();
    let feature = captured_feature(config, shop_registry(), &capture);
    let web_user = PersonaRef::of::<WebUser>();

    let mut story = feature.so_that(&identity("dispatch"), VALUE).unwrap();
    let err = story.as_a(&web_user).err().unwrap();
    assert_eq!(err.code(), ErrorCode::PersonaUnresolved);
    assert!(err.to_string().contains("mobile::WebUser"), "{}", err);
}

#[test]
fn test_blank_test_name() {
    let feature = Feature::new(console_config(), shop_registry());
    let err = feature.so_that(&FixedIdentity::new("  "), VALUE).err().unwrap();
    assert_eq!(err.code(), ErrorCode::TestIdentityUnknown);
}

// ─────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_document_is_written() {
    let dir = TempDir::new().unwrap();
    let mut config = document_config(dir.path());
    config.story.layer = Some("presentation".to_string());
    let feature = Feature::new(config, shop_registry());
    let web_user = PersonaRef::of::<WebUser>();
    let hank = customer("hank@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    story
        .as_a(&web_user)
        .unwrap()
        .given(&hank.has("completed").action("Registration"))
        .unwrap();
    let locations = story.output_locations();
    story.finish().unwrap();

    assert_eq!(locations.len(), 1);
    let html = fs::read_to_string(&locations[0]).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<details open>"));
    assert!(html.contains("<summary><strong>I want</strong> to register customer</summary>"));
    assert!(html.contains("<strong>given</strong> customer has completed registration"));
    assert!(html.contains("hank@example.com"));
    assert!(html.trim_end().ends_with("</body>\n</html>"));

    let folder = dir.path().join("shop.tests.register_customer");
    assert!(folder.join("storyteller.css").exists());
}

/// Text of the `<summary>` and `<div>` lines of a document, in order,
/// without emphasis.
fn document_lines(html: &str) -> Vec<String> {
    html.lines()
        .filter_map(|line| {
            line.strip_prefix("<summary>")
                .and_then(|l| l.strip_suffix("</summary>"))
                .or_else(|| line.strip_prefix("<div>").and_then(|l| l.strip_suffix("</div>")))
        })
        .map(|line| line.replace("<strong>", "").replace("</strong>", ""))
        .collect()
}

#[test]
fn test_every_sink_receives_the_same_lines_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("both").join("story.html");
    let capture = Capture::default();
    let console_out = capture.clone();
    let document_path = path.clone();
    let feature = Feature::new(console_config(), shop_registry()).with_sinks(move |_, _| {
        let console: Box<dyn Sink> = Box::new(ConsoleSink::with_writer(Box::new(console_out.clone())));
        let document: Box<dyn Sink> = Box::new(DocumentSink::create(document_path.clone())?);
        Ok(vec![console, document])
    });
    let web_user = PersonaRef::of::<WebUser>();
    let jack = customer("jack@example.com");

    let mut story = feature.so_that(&identity("register_customer"), VALUE).unwrap();
    story
        .as_a(&web_user)
        .unwrap()
        .given_we(|set| {
            set.perform("RegisterCustomer")?
                .given(&jack.has("completed").action("Registration"))?;
            Ok(())
        })
        .unwrap()
        .when(&jack.action("Confirm_Registration"))
        .unwrap()
        .then(&jack.action("Login"))
        .unwrap();
    story.finish().unwrap();

    let console: Vec<String> = capture
        .trimmed()
        .into_iter()
        .filter(|line| !line.starts_with("(also logged at:"))
        .collect();
    let html = fs::read_to_string(&path).unwrap();

    assert_eq!(console.len(), 9, "{:?}", console);
    assert_eq!(document_lines(&html), console);
    assert_eq!(html.matches("<details").count(), html.matches("</details>").count());
    assert_eq!(html.matches("<table>").count(), html.matches("</table>").count());
}

#[test]
fn test_dropped_story_still_closes_document() {
    let dir = TempDir::new().unwrap();
    let feature = Feature::new(document_config(dir.path()), shop_registry());

    let story = feature.so_that(&identity("abandoned"), VALUE).unwrap();
    let locations = story.output_locations();
    drop(story);

    let html = fs::read_to_string(&locations[0]).unwrap();
    assert!(html.trim_end().ends_with("</body>\n</html>"));
}

// ─────────────────────────────────────────────────────────────────
// Walkthrough
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_walkthrough_on_every_layer() {
    for layer in demo::LAYERS {
        let dir = TempDir::new().unwrap();
        let mut config = document_config(dir.path());
        config.story.layer = Some(layer.to_string());

        let feature = demo::feature(config);
        let locations = demo::run(&feature).unwrap();
        assert_eq!(locations.len(), 2, "layer {}", layer);
        for location in &locations {
            let html = fs::read_to_string(location).unwrap();
            assert!(html.contains("we increase the customer base"), "layer {}", layer);
        }
    }
}

#[test]
fn test_walkthrough_attaches_screenshots_on_presentation() {
    let dir = TempDir::new().unwrap();
    let mut config = document_config(dir.path());
    config.story.layer = Some("presentation".to_string());

    let locations = demo::register_customer(&demo::feature(config)).unwrap();
    let html = fs::read_to_string(&locations[0]).unwrap();
    assert!(html.contains("<img src='images/"));

    let images = dir
        .path()
        .join("storyteller.demo.register_customer")
        .join("images");
    assert!(fs::read_dir(images).unwrap().count() >= 1);
}
