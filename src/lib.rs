//! protocodec: a protoc plugin that emits dependency-free protobuf3 codecs.
//!
//! For every message in a schema the generator writes a plain Rust struct and
//! a `<Message>Codec` unit with `encode`, `encode_to` and `decode`. The
//! generated code calls into a small fixed runtime, [`runtime`], which is
//! emitted once per run as `protobuf_runtime.rs`.
//!
//! # Example
//!
//! ```
//! use prost_types::compiler::CodeGeneratorRequest;
//!
//! let response = protocodec::generate_request(&CodeGeneratorRequest::default());
//! assert!(response.error.is_none());
//! // Only the runtime unit: nothing was requested.
//! assert_eq!(response.file.len(), 1);
//! ```

pub mod codegen;
pub mod runtime;


pub use codegen::error::{CodegenError, Diagnostic, DiagnosticSink};
pub use codegen::{GeneratedFile, Options, generate_descriptor_set, generate_file, generate_files, generate_request};
