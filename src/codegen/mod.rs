// protocodec codegen module

use anyhow::{Context as _, Result};
use proc_macro2::TokenStream;
use prost::Message;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use quote::ToTokens;
use tracing::{debug, warn};

pub mod comments;
pub mod descriptor;
pub mod error;
pub mod fields;
pub mod messages;
pub mod names;
pub mod tables;

use descriptor::FileDescriptor;
use error::{CodegenError, CodegenResult, Diagnostic, DiagnosticSink};

/// The fixed runtime unit, emitted once per run next to the generated files.
pub const RUNTIME_SOURCE: &str = include_str!("../runtime.rs");

/// Generator settings, parsed from the protoc plugin parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Rust path generated code uses to reach the runtime unit.
    pub runtime_module: String,
    /// Output name of the runtime unit.
    pub runtime_file: String,
    /// Copy `.proto` comments onto generated items.
    pub comments: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            runtime_module: "crate::protobuf_runtime".to_string(),
            runtime_file: "protobuf_runtime.rs".to_string(),
            comments: true,
        }
    }
}

impl Options {
    /// Parse `key=value,key=value`.
    pub fn parse(parameter: &str) -> CodegenResult<Options> {
        let mut options = Options::default();
        for pair in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let invalid = || CodegenError::InvalidParameter {
                parameter: pair.to_string(),
            };
            let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
            match key.trim() {
                "runtime_module" => options.runtime_module = value.trim().to_string(),
                "runtime_file" => options.runtime_file = value.trim().to_string(),
                "comments" => options.comments = value.trim().parse().map_err(|_| invalid())?,
                _ => return Err(invalid()),
            }
        }
        Ok(options)
    }
}

/// Per-run state shared by the field and message generators.
#[derive(Debug, Clone)]
pub struct Context {
    pub runtime: TokenStream,
    pub emit_comments: bool,
}

impl Context {
    pub fn new(options: &Options) -> CodegenResult<Context> {
        let path: syn::Path =
            syn::parse_str(&options.runtime_module).map_err(|_| CodegenError::InvalidParameter {
                parameter: format!("runtime_module={}", options.runtime_module),
            })?;
        Ok(Context {
            runtime: path.into_token_stream(),
            emit_comments: options.comments,
        })
    }
}

/// One output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

/// Generate the codec unit for a single schema file.
pub fn generate_file(
    file: &FileDescriptorProto,
    options: &Options,
    sink: &mut dyn DiagnosticSink,
) -> CodegenResult<GeneratedFile> {
    let ctx = Context::new(options)?;
    let model = FileDescriptor::from_proto(file)?;
    debug!(file = %model.name, messages = model.messages.len(), "generating file");

    let tokens = messages::assemble_file(&ctx, &model, sink)?;
    let syntax_tree = syn::parse2(tokens)?;
    let body = prettyplease::unparse(&syntax_tree);

    Ok(GeneratedFile {
        name: names::output_file_name(&model.name, &model.package),
        content: format!(
            "// @generated by protoc-gen-protocodec. DO NOT EDIT.\n// source: {}\n\n{body}",
            model.name
        ),
    })
}

/// Generate every requested file plus the runtime unit.
///
/// Any file-level failure fails the whole run; diagnostics for degraded
/// fields are returned alongside the output.
pub fn generate_files(
    proto_files: &[FileDescriptorProto],
    files_to_generate: &[String],
    options: &Options,
) -> Result<(Vec<GeneratedFile>, Vec<Diagnostic>)> {
    let mut diagnostics = Vec::new();
    let mut output = Vec::new();

    for file in proto_files
        .iter()
        .filter(|file| files_to_generate.iter().any(|name| name == file.name()))
    {
        let generated = generate_file(file, options, &mut diagnostics)
            .with_context(|| format!("failed to generate {}", file.name()))?;
        output.push(generated);
    }

    output.push(GeneratedFile {
        name: options.runtime_file.clone(),
        content: RUNTIME_SOURCE.to_string(),
    });

    Ok((output, diagnostics))
}

/// Handle a protoc plugin request. Never fails: errors travel in the response.
pub fn generate_request(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let result = Options::parse(request.parameter())
        .map_err(anyhow::Error::from)
        .and_then(|options| generate_files(&request.proto_file, &request.file_to_generate, &options));

    match result {
        Ok((files, diagnostics)) => {
            report(&diagnostics);
            CodeGeneratorResponse {
                supported_features: Some(Feature::Proto3Optional as u64),
                file: files
                    .into_iter()
                    .map(|generated| File {
                        name: Some(generated.name),
                        content: Some(generated.content),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }
        }
        Err(err) => CodeGeneratorResponse {
            error: Some(format!("{err:#}")),
            supported_features: Some(Feature::Proto3Optional as u64),
            ..Default::default()
        },
    }
}

/// Generate every file of a serialized `FileDescriptorSet`.
pub fn generate_descriptor_set(descriptor_bytes: &[u8], parameter: &str) -> Result<Vec<GeneratedFile>> {
    let file_set = FileDescriptorSet::decode(descriptor_bytes).context("failed to decode file descriptor set")?;
    let options = Options::parse(parameter)?;
    let names: Vec<String> = file_set.file.iter().map(|file| file.name().to_string()).collect();
    let (files, diagnostics) = generate_files(&file_set.file, &names, &options)?;
    report(&diagnostics);
    Ok(files)
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        warn!(message = %diagnostic.message, field = %diagnostic.field, "{}", diagnostic.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{DescriptorProto, FieldDescriptorProto};

    fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(ty as i32),
            label: Some(Label::Optional as i32),
            ..Default::default()
        }
    }

    fn proto_file(name: &str, package: &str, fields: Vec<FieldDescriptorProto>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Ping".to_string()),
                field: fields,
                ..Default::default()
            }],
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }
    }

    fn request(files: Vec<FileDescriptorProto>, to_generate: &[&str], parameter: Option<&str>) -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: to_generate.iter().map(|s| s.to_string()).collect(),
            parameter: parameter.map(str::to_string),
            proto_file: files,
            ..Default::default()
        }
    }

    #[test]
    fn parses_parameters() {
        assert_eq!(Options::parse("").unwrap(), Options::default());
        let options = Options::parse("runtime_module=my_crate::pb, comments=false,runtime_file=pb.rs").unwrap();
        assert_eq!(options.runtime_module, "my_crate::pb");
        assert_eq!(options.runtime_file, "pb.rs");
        assert!(!options.comments);
    }

    #[test]
    fn rejects_unknown_parameters() {
        assert!(matches!(
            Options::parse("flavor=spicy"),
            Err(CodegenError::InvalidParameter { ref parameter }) if parameter == "flavor=spicy"
        ));
        assert!(Options::parse("comments=maybe").is_err());
        assert!(Options::parse("comments").is_err());
    }

    #[test]
    fn rejects_unparseable_runtime_path() {
        let options = Options {
            runtime_module: "not a path".to_string(),
            ..Options::default()
        };
        assert!(matches!(Context::new(&options), Err(CodegenError::InvalidParameter { .. })));
    }

    #[test]
    fn emits_requested_files_and_one_runtime() {
        let response = generate_request(&request(
            vec![
                proto_file("net/ping.proto", "net.v1", vec![field("seq", 1, Type::Uint32)]),
                proto_file("net/pong.proto", "net.v1", vec![field("seq", 1, Type::Uint32)]),
                proto_file("dep.proto", "", vec![]),
            ],
            &["net/ping.proto", "net/pong.proto"],
            None,
        ));

        assert_eq!(response.error, None);
        let names: Vec<_> = response.file.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["net/v1/Ping.pb.rs", "net/v1/Pong.pb.rs", "protobuf_runtime.rs"]);
        assert_eq!(response.file[2].content(), RUNTIME_SOURCE);

        let content = response.file[0].content();
        assert!(content.starts_with("// @generated by protoc-gen-protocodec"));
        assert!(content.contains("pub struct PingCodec;"));
        assert!(content.contains("crate::protobuf_runtime::encode_uint32(buf, msg.seq);"));
    }

    #[test]
    fn runtime_module_parameter_is_used() {
        let response = generate_request(&request(
            vec![proto_file("a.proto", "", vec![field("seq", 1, Type::Uint32)])],
            &["a.proto"],
            Some("runtime_module=wire"),
        ));
        let content = response.file[0].content();
        assert!(content.contains("wire::encode_uint32(buf, msg.seq);"));
        assert!(!content.contains("protobuf_runtime"));
    }

    #[test]
    fn unsupported_field_does_not_fail_the_run() {
        let response = generate_request(&request(
            vec![proto_file("a.proto", "", vec![field("seq", 1, Type::Uint32), field("old", 2, Type::Group)])],
            &["a.proto"],
            None,
        ));
        assert_eq!(response.error, None);
        assert!(response.file[0].content().contains("/// protocodec: field `old` (2) skipped"));
    }

    #[test]
    fn file_level_failure_yields_no_files() {
        let mut broken = proto_file("b.proto", "", vec![field("orphan", 2, Type::Message)]);
        broken.message_type[0].field[0].type_name = None;
        let response = generate_request(&request(
            vec![proto_file("a.proto", "", vec![field("seq", 1, Type::Uint32)]), broken],
            &["a.proto", "b.proto"],
            None,
        ));

        assert!(response.file.is_empty());
        let error = response.error.unwrap();
        assert!(error.contains("failed to generate b.proto"), "{error}");
        assert!(error.contains("orphan"), "{error}");
    }

    #[test]
    fn bad_parameter_is_reported_in_response() {
        let response = generate_request(&request(vec![], &[], Some("nope")));
        assert!(response.file.is_empty());
        assert!(response.error.unwrap().contains("nope"));
    }

    #[test]
    fn descriptor_set_roundtrip() {
        let set = FileDescriptorSet {
            file: vec![proto_file("x.proto", "x", vec![field("id", 1, Type::Int64)])],
            ..Default::default()
        };
        let files = generate_descriptor_set(&set.encode_to_vec(), "").unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "x/X.pb.rs");
    }

    #[test]
    fn runtime_source_carries_no_tests() {
        assert!(!RUNTIME_SOURCE.contains("#[cfg(test)]"));
        assert!(!RUNTIME_SOURCE.contains("#[test]"));
    }

    #[test]
    fn digit_leading_field_name_gets_a_prefix() {
        let file = proto_file("m.proto", "", vec![field("_1abc", 1, Type::Int32)]);
        let generated = generate_file(&file, &Options::default(), &mut Vec::new()).unwrap();
        assert!(generated.content.contains("pub _1abc: i32,"));
    }

    #[test]
    fn mutually_recursive_messages_are_boxed() {
        let mut file = proto_file("r.proto", "r", vec![]);
        file.message_type = vec![
            DescriptorProto {
                name: Some("A".to_string()),
                field: vec![FieldDescriptorProto {
                    type_name: Some(".r.B".to_string()),
                    ..field("b", 1, Type::Message)
                }],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("B".to_string()),
                field: vec![FieldDescriptorProto {
                    type_name: Some(".r.A".to_string()),
                    ..field("a", 1, Type::Message)
                }],
                ..Default::default()
            },
        ];
        let mut diagnostics = Vec::new();
        let generated = generate_file(&file, &Options::default(), &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        assert!(generated.content.contains("pub b: Option<Box<B>>,"));
        assert!(generated.content.contains("pub a: Option<Box<A>>,"));
    }

    #[test]
    fn generation_is_deterministic() {
        let file = proto_file("d.proto", "d", vec![field("a", 1, Type::Sint32), field("b", 2, Type::Bytes)]);
        let first = generate_file(&file, &Options::default(), &mut Vec::new()).unwrap();
        let second = generate_file(&file, &Options::default(), &mut Vec::new()).unwrap();
        assert_eq!(first, second);
    }
}
