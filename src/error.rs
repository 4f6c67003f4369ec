//! Error types for storyteller
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Dispatch diagnostics naming the operation, performer and entity involved
//! - Exit codes for the CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for storyteller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Resolution and binding errors (3xx)
    PersonaUnresolved = 300,
    NoPersonaBound = 301,
    PerformerConstruction = 302,
    EntitySlotMissing = 303,

    // Dispatch errors (4xx)
    OperationNotImplemented = 400,
    InvocationFailed = 401,

    // Test identity errors (5xx)
    TestIdentityUnknown = 500,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Resolution/binding errors
            400..=499 => 40, // Dispatch errors
            500..=599 => 50, // Test identity errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a performer could not be prepared for a step
#[derive(Error, Debug)]
pub enum BindingError {
    /// A step was dispatched before any persona was bound
    #[error("no persona has been specified; use `as_a` to bind a persona before dispatching steps")]
    NoPersonaBound,

    /// The performer factory failed to build a fresh instance
    #[error("could not construct the '{performer}' performer")]
    Construct {
        performer: String,
        #[source]
        source: anyhow::Error,
    },

    /// The performer has no slot registered for the step's entity
    #[error(
        "could not set the '{entity}' entity on the '{performer}' performer; \
         expected a slot named '{reference}' (or '{reference}_entity') of type Entity<{entity}>"
    )]
    MissingEntitySlot {
        performer: String,
        entity: String,
        reference: String,
    },
}

/// Main error type for storyteller
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Resolution and Binding Errors
    // ─────────────────────────────────────────────────────────────

    /// No performer registered for the persona on the configured layer
    #[error("Could not resolve a performer for persona '{persona}' at {identifier}")]
    Resolution {
        identifier: String,
        persona: String,
        layer: Option<String>,
    },

    /// The bound performer could not be prepared for the step
    #[error("Binding failed: {0}")]
    Binding(#[from] BindingError),

    // ─────────────────────────────────────────────────────────────
    // Dispatch Errors
    // ─────────────────────────────────────────────────────────────

    /// The performer does not implement the requested operation
    #[error("Pending implementation {entity}.{operation} in the {performer} performer")]
    NotImplemented {
        operation: String,
        performer: String,
        entity: String,
    },

    /// Any other failure raised by a performer operation
    #[error(transparent)]
    Invocation(anyhow::Error),

    // ─────────────────────────────────────────────────────────────
    // Test Identity Errors
    // ─────────────────────────────────────────────────────────────

    /// The currently executing test could not be identified
    #[error("Could not determine the current test: {reason}")]
    Lookup { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::Resolution { .. } => ErrorCode::PersonaUnresolved,
            Error::Binding(BindingError::NoPersonaBound) => ErrorCode::NoPersonaBound,
            Error::Binding(BindingError::Construct { .. }) => ErrorCode::PerformerConstruction,
            Error::Binding(BindingError::MissingEntitySlot { .. }) => ErrorCode::EntitySlotMissing,

            Error::NotImplemented { .. } => ErrorCode::OperationNotImplemented,
            Error::Invocation(_) => ErrorCode::InvocationFailed,

            Error::Lookup { .. } => ErrorCode::TestIdentityUnknown,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error comes from the step-dispatch protocol
    /// (as opposed to configuration or output plumbing)
    pub fn is_dispatch(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. }
                | Error::Binding(_)
                | Error::NotImplemented { .. }
                | Error::Invocation(_)
        )
    }

    /// Check if the error means a step is still waiting for an implementation
    pub fn is_pending(&self) -> bool {
        matches!(self, Error::NotImplemented { .. })
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'storyteller config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'storyteller config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),

            Error::Resolution { .. } => Some(
                "Register a performer for this persona and layer with PersonaRegistry::register, or unset the layer."
            ),
            Error::Binding(BindingError::NoPersonaBound) => Some(
                "Call `as_a(&persona)` before the first given/when/then step."
            ),
            Error::Binding(BindingError::Construct { .. }) => Some(
                "Make sure the performer factory can build a fresh instance without arguments."
            ),
            Error::Binding(BindingError::MissingEntitySlot { .. }) => Some(
                "Register the entity on the performer with `.entity::<T>(setter)`."
            ),

            Error::NotImplemented { .. } => Some(
                "Register the operation on the performer with `.operation(..)` or `.qualified_operation::<T>(..)`."
            ),

            Error::Lookup { .. } => Some(
                "Pass a FixedIdentity naming the test, or run the story from a #[test] thread."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a resolution error for the computed performer identifier
    pub fn resolution(
        identifier: impl Into<String>,
        persona: impl Into<String>,
        layer: Option<&str>,
    ) -> Self {
        Error::Resolution {
            identifier: identifier.into(),
            persona: persona.into(),
            layer: layer.map(str::to_string),
        }
    }

    /// Create a not-implemented error for an operation
    pub fn not_implemented(
        operation: impl Into<String>,
        performer: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Error::NotImplemented {
            operation: operation.into(),
            performer: performer.into(),
            entity: entity.into(),
        }
    }

    /// Create a lookup error
    pub fn lookup(reason: impl Into<String>) -> Self {
        Error::Lookup {
            reason: reason.into(),
        }
    }

    /// Create a write error for an output file
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoWrite {
            path: path.into(),
            source,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
