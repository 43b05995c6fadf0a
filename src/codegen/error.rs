// Errors and side-channel diagnostics for code generation.

use thiserror::Error;

/// Result type alias for generator operations
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Error type for generator operations
#[derive(Error, Debug)]
pub enum CodegenError {
    /// The field type code has no entry in the type mapping table
    #[error("unsupported field type code {code}")]
    UnsupportedFieldType { code: i32 },

    /// A message-typed field names no type we can resolve
    #[error("cannot resolve type {type_name:?} of field {field}")]
    TypeResolution { field: String, type_name: String },

    /// Upstream schema violates a descriptor invariant
    #[error("malformed schema in {message}: {reason}")]
    MalformedSchema { message: String, reason: String },

    /// Plugin parameter string could not be parsed
    #[error("invalid plugin parameter {parameter:?}")]
    InvalidParameter { parameter: String },

    /// Emitted tokens did not form a valid Rust file
    #[error("generated code does not parse: {0}")]
    Syntax(#[from] syn::Error),
}

/// A non-fatal problem found while generating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Fully qualified name of the message that owns the field.
    pub message: String,
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.message, self.field, self.reason)
    }
}

/// Receives diagnostics for fields the generator degraded instead of failing.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
