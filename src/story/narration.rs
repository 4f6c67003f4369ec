//! Turning steps and test names into narration lines.

use crate::naming::{capitalise_initial, decapitalise_initial, humanize, Names};
use crate::persona::Action;
use crate::sink::MID_ALIGN;

/// Word separator accepted in operation names: `Confirm_Registration`
/// narrates with the entity name in place of the underscore.
pub const SEPARATOR: char = '_';

const DROPPED_PREFIXES: [&str; 2] = ["test", "should"];
const REASON_PREFIXES: [&str; 2] = ["i want", "in order"];

/// Narration for an action, without the phase keyword.
///
/// - a verb on the entity fills its sentence with the entity name and operation
/// - an operation containing `_` gets the entity name at the separator
/// - otherwise the entity name is followed by the operation
pub fn narrate(names: &Names, action: &Action) -> String {
    let entity = action.entity();
    let subject = names.name(entity);
    let operation = action.operation();

    let line = match entity.verb() {
        Some(verb) => verb.narrate(&subject, &capitalise_initial(operation)),
        None if operation.contains(SEPARATOR) => {
            operation.replace(SEPARATOR, &format!(" {}", subject))
        }
        None => format!("{}{}", subject, capitalise_initial(operation)),
    };
    decapitalise_initial(&humanize(&line))
}

/// `label<>content`, the shape every step line takes.
pub fn labelled(label: &str, content: &str) -> String {
    format!("{}{}{}", label, MID_ALIGN, content)
}

/// Story heading from the test's method name.
///
/// `register_customer` → `I want to register customer`. A leading `test` or
/// `should` word is dropped; names already stating a reason
/// (`i_want_to_...`, `in_order_to_...`) are kept as they are.
pub fn heading(test_method: &str) -> String {
    let mut reason = humanize(&test_method.replace(SEPARATOR, " "))
        .trim()
        .to_string();
    for prefix in DROPPED_PREFIXES {
        if let Some(rest) = strip_word(&reason, prefix) {
            reason = rest.to_string();
        }
    }
    let lowered = reason.to_lowercase();
    if REASON_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        capitalise_initial(&reason)
    } else {
        format!("I want to {}", decapitalise_initial(&reason))
    }
}

/// `text` without a leading whole word `word` (case-insensitive).
fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let head = text.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &text[word.len()..];
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix(' ')
}

/// The "so that" line for a business value.
pub fn so_that(business_value: &str) -> String {
    labelled("so that", &decapitalise_initial(&humanize(business_value)))
}

/// The "as" line for a persona's display name.
pub fn as_persona(display_name: &str) -> String {
    labelled("as", &decapitalise_initial(display_name))
}
