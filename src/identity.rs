//! Identifying the test a story belongs to.
//!
//! The test name drives the story heading and the document path, so every
//! story needs one. The libtest harness names each test thread after the
//! test's path (`module::tests::register_customer`), which is what
//! [`ThreadIdentity`] reads.

use crate::error::{Error, Result};

/// Supplies the fully qualified name of the running test.
pub trait TestIdentity {
    fn current_test(&self) -> Result<String>;
}

/// A name given explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIdentity(pub String);

impl FixedIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl TestIdentity for FixedIdentity {
    fn current_test(&self) -> Result<String> {
        let name = self.0.trim();
        if name.is_empty() {
            return Err(Error::lookup("the test name is empty"));
        }
        Ok(name.to_string())
    }
}

/// The name of the current thread, as set by the test harness.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadIdentity;

impl TestIdentity for ThreadIdentity {
    fn current_test(&self) -> Result<String> {
        match std::thread::current().name() {
            Some(name) if !name.trim().is_empty() && name != "main" => Ok(name.to_string()),
            Some(name) => Err(Error::lookup(format!(
                "thread '{}' is not a test thread; pass a FixedIdentity instead",
                name
            ))),
            None => Err(Error::lookup(
                "the current thread is unnamed; pass a FixedIdentity instead",
            )),
        }
    }
}

/// Last path segment of a test name: `a::tests::register_customer` → `register_customer`.
pub fn test_method_name(qualified: &str) -> &str {
    qualified.rsplit("::").next().unwrap_or(qualified)
}
