//! Per-field code generation.
//!
//! Every field is classified into a [`FieldShape`] and each shape has one
//! rule for its struct member(s), its encode statements and its decode
//! match arm(s). Generated code refers to these locals:
//!
//! - encode: `msg: &T`, `buf: &mut Vec<u8>`
//! - decode: `msg: T`, `data: &[u8]`, `pos: usize`

use proc_macro2::{Ident, Literal, TokenStream};
use prost_types::field_descriptor_proto::Label;
use quote::{ToTokens, format_ident, quote};

use super::Context;
use super::descriptor::{FieldDescriptor, MessageDescriptor};
use super::error::{CodegenError, CodegenResult, Diagnostic, DiagnosticSink};
use super::names::{codec_ident, field_ident, map_field_idents, message_ident};
use super::tables::{ScalarType, TypeMapping, WireType, resolve_message_type, tag, type_map};

/// Field numbers protobuf assigns inside a synthesized map entry.
const MAP_KEY_NUMBER: u32 = 1;
const MAP_VALUE_NUMBER: u32 = 2;

/// How one value is represented and moved on the wire.
#[derive(Debug, Clone)]
pub enum ValueCodec {
    Primitive {
        scalar: &'static ScalarType,
        target: TokenStream,
        default: TokenStream,
    },
    /// Delegates to the referenced message's own codec.
    Message { target: Ident, codec: Ident },
}

#[derive(Debug, Clone)]
pub enum FieldShape {
    Singular(ValueCodec),
    Repeated(ValueCodec),
    /// Flattened into parallel key and value sequences.
    Map { key: ValueCodec, value: ValueCodec },
}

/// Code fragments for one field.
#[derive(Debug, Default)]
pub struct FieldCode {
    pub members: Vec<TokenStream>,
    /// Member names, in the same order as `members`.
    pub idents: Vec<Ident>,
    pub encode: TokenStream,
    pub decode_arms: Vec<TokenStream>,
    /// Set when the field was skipped; becomes a doc line on the struct.
    pub marker: Option<String>,
}

impl ValueCodec {
    pub fn resolve(
        type_code: i32,
        type_name: Option<&str>,
        field: &FieldDescriptor,
    ) -> CodegenResult<ValueCodec> {
        match type_map(type_code)? {
            TypeMapping::Scalar(scalar) => Ok(ValueCodec::Primitive {
                scalar,
                target: syn::parse_str::<syn::Type>(scalar.target_type)?.into_token_stream(),
                default: syn::parse_str::<syn::Expr>(scalar.default_value)?.into_token_stream(),
            }),
            TypeMapping::Message => {
                let name = type_name.and_then(resolve_message_type).ok_or_else(|| {
                    CodegenError::TypeResolution {
                        field: field.name.clone(),
                        type_name: type_name.unwrap_or_default().to_string(),
                    }
                })?;
                Ok(ValueCodec::Message {
                    target: message_ident(name),
                    codec: codec_ident(name),
                })
            }
        }
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            ValueCodec::Primitive { scalar, .. } => scalar.wire_type,
            ValueCodec::Message { .. } => WireType::LengthDelimited,
        }
    }

    pub fn target_type(&self) -> TokenStream {
        match self {
            ValueCodec::Primitive { target, .. } => target.clone(),
            ValueCodec::Message { target, .. } => quote! { #target },
        }
    }

    pub fn default_value(&self) -> TokenStream {
        match self {
            ValueCodec::Primitive { default, .. } => default.clone(),
            ValueCodec::Message { .. } => quote! { Default::default() },
        }
    }

    /// Write `key` then the value found at `place` into `buf`.
    fn encode(&self, ctx: &Context, buf: &TokenStream, key: u32, place: TokenStream) -> TokenStream {
        let rt = &ctx.runtime;
        let key = Literal::u64_unsuffixed(u64::from(key));
        match self {
            ValueCodec::Primitive { scalar, .. } => {
                let encoder = format_ident!("{}", scalar.encoder);
                let arg = if scalar.by_ref {
                    quote! { &#place }
                } else {
                    quote! { #place }
                };
                quote! {
                    #rt::encode_key(#buf, #key);
                    #rt::#encoder(#buf, #arg);
                }
            }
            ValueCodec::Message { codec, .. } => quote! {
                #rt::encode_key(#buf, #key);
                #rt::encode_bytes(#buf, &#codec::encode(&#place));
            },
        }
    }

    /// Bind `(value, end)` from reading one value out of `input` at `at`.
    fn decode(&self, ctx: &Context, input: &Ident, at: &Ident, value: &Ident, end: &Ident) -> TokenStream {
        let rt = &ctx.runtime;
        match self {
            ValueCodec::Primitive { scalar, .. } => {
                let decoder = format_ident!("{}", scalar.decoder);
                quote! {
                    let (#value, #end) = #rt::#decoder(#input, #at)?;
                }
            }
            ValueCodec::Message { codec, .. } => quote! {
                let (nested, #end) = #rt::decode_length_delimited(#input, #at)?;
                let #value = #codec::decode(nested)?;
            },
        }
    }
}

impl FieldShape {
    pub fn from_descriptor(field: &FieldDescriptor) -> CodegenResult<FieldShape> {
        if let Some(entry) = &field.map_entry {
            // Map keys are never messages, the key has no type name.
            let key = ValueCodec::resolve(entry.key_type, None, field)?;
            let value = ValueCodec::resolve(entry.value_type, entry.value_type_name.as_deref(), field)?;
            return Ok(FieldShape::Map { key, value });
        }

        let codec = ValueCodec::resolve(field.type_code, field.type_name.as_deref(), field)?;
        Ok(match field.label {
            Label::Repeated => FieldShape::Repeated(codec),
            Label::Optional | Label::Required => FieldShape::Singular(codec),
        })
    }
}

/// `#[doc]` attributes for an optional comment, one per line.
pub(crate) fn doc_attrs(ctx: &Context, doc: Option<&str>) -> TokenStream {
    let Some(doc) = doc.filter(|_| ctx.emit_comments) else {
        return TokenStream::new();
    };
    let lines = doc.lines().map(|line| format!(" {line}"));
    quote! { #(#[doc = #lines])* }
}

/// Generate the member, encode and decode fragments for one field.
///
/// Fields whose type has no mapping are skipped with a marker and a
/// diagnostic; type resolution failures abort the enclosing file.
pub fn generate_field(
    ctx: &Context,
    message: &MessageDescriptor,
    field: &FieldDescriptor,
    sink: &mut dyn DiagnosticSink,
) -> CodegenResult<FieldCode> {
    let shape = match FieldShape::from_descriptor(field) {
        Ok(shape) => shape,
        Err(err @ CodegenError::UnsupportedFieldType { .. }) => {
            return Ok(skip_field(message, field, err.to_string(), sink));
        }
        Err(err) => return Err(err),
    };

    let number = field.number as u32;
    let doc = doc_attrs(ctx, field.doc.as_deref());
    let buf = quote! { buf };
    let data = format_ident!("data");
    let pos = format_ident!("pos");
    let decoded = format_ident!("decoded");
    let end = format_ident!("end");
    let rt = &ctx.runtime;

    let code = match &shape {
        FieldShape::Singular(codec @ ValueCodec::Primitive { .. }) => {
            let ident = field_ident(&field.name);
            let ty = codec.target_type();
            let key = tag(number, codec.wire_type());
            let encode = codec.encode(ctx, &buf, key, quote! { msg.#ident });
            let decode = codec.decode(ctx, &data, &pos, &decoded, &end);
            let key = Literal::u64_unsuffixed(u64::from(key));
            FieldCode {
                members: vec![quote! {
                    #doc
                    pub #ident: #ty,
                }],
                idents: vec![ident.clone()],
                encode,
                decode_arms: vec![quote! {
                    #key => {
                        #decode
                        msg.#ident = #decoded;
                        #pos = #end;
                    }
                }],
                marker: None,
            }
        }
        // Option<Box<_>> keeps recursive messages finite; `None` is not written.
        FieldShape::Singular(codec @ ValueCodec::Message { .. }) => {
            let ident = field_ident(&field.name);
            let ty = codec.target_type();
            let key = tag(number, codec.wire_type());
            let element = codec.encode(ctx, &buf, key, quote! { **value });
            let decode = codec.decode(ctx, &data, &pos, &decoded, &end);
            let key = Literal::u64_unsuffixed(u64::from(key));
            FieldCode {
                members: vec![quote! {
                    #doc
                    pub #ident: Option<Box<#ty>>,
                }],
                idents: vec![ident.clone()],
                encode: quote! {
                    if let Some(value) = &msg.#ident {
                        #element
                    }
                },
                decode_arms: vec![quote! {
                    #key => {
                        #decode
                        msg.#ident = Some(Box::new(#decoded));
                        #pos = #end;
                    }
                }],
                marker: None,
            }
        }
        FieldShape::Repeated(codec) => {
            let ident = field_ident(&field.name);
            let ty = codec.target_type();
            let key = tag(number, codec.wire_type());
            let element = codec.encode(ctx, &buf, key, quote! { *value });
            let decode = codec.decode(ctx, &data, &pos, &decoded, &end);
            let key = Literal::u64_unsuffixed(u64::from(key));
            let mut decode_arms = vec![quote! {
                #key => {
                    #decode
                    msg.#ident.push(#decoded);
                    #pos = #end;
                }
            }];

            // Accept packed input for numeric elements; we only ever write unpacked.
            if codec.wire_type().is_packable() {
                let packed_key = Literal::u64_unsuffixed(u64::from(tag(number, WireType::LengthDelimited)));
                let packed = format_ident!("packed");
                let packed_pos = format_ident!("packed_pos");
                let next = format_ident!("next");
                let decode_packed = codec.decode(ctx, &packed, &packed_pos, &decoded, &next);
                decode_arms.push(quote! {
                    #packed_key => {
                        let (#packed, #end) = #rt::decode_length_delimited(#data, #pos)?;
                        let mut #packed_pos = 0usize;
                        while #packed_pos < #packed.len() {
                            #decode_packed
                            msg.#ident.push(#decoded);
                            #packed_pos = #next;
                        }
                        #pos = #end;
                    }
                });
            }

            FieldCode {
                members: vec![quote! {
                    #doc
                    pub #ident: Vec<#ty>,
                }],
                idents: vec![ident.clone()],
                encode: quote! {
                    for value in &msg.#ident {
                        #element
                    }
                },
                decode_arms,
                marker: None,
            }
        }
        FieldShape::Map { key, value } => generate_map_field(ctx, field, key, value, doc),
    };

    Ok(code)
}

fn generate_map_field(
    ctx: &Context,
    field: &FieldDescriptor,
    key: &ValueCodec,
    value: &ValueCodec,
    doc: TokenStream,
) -> FieldCode {
    let rt = &ctx.runtime;
    let (keys_ident, values_ident) = map_field_idents(&field.name);
    let key_ty = key.target_type();
    let value_ty = value.target_type();
    let key_default = key.default_value();
    let value_default = value.default_value();

    let outer_key = Literal::u64_unsuffixed(u64::from(tag(field.number as u32, WireType::LengthDelimited)));
    let key_tag = tag(MAP_KEY_NUMBER, key.wire_type());
    let value_tag = tag(MAP_VALUE_NUMBER, value.wire_type());

    let entry_buf = quote! { &mut entry };
    let encode_key = key.encode(ctx, &entry_buf, key_tag, quote! { *key });
    let encode_value = value.encode(ctx, &entry_buf, value_tag, quote! { *value });

    let entry = format_ident!("entry");
    let entry_pos = format_ident!("entry_pos");
    let decoded = format_ident!("decoded");
    let next = format_ident!("next");
    let decode_key = key.decode(ctx, &entry, &entry_pos, &decoded, &next);
    let decode_value = value.decode(ctx, &entry, &entry_pos, &decoded, &next);
    let key_tag = Literal::u64_unsuffixed(u64::from(key_tag));
    let value_tag = Literal::u64_unsuffixed(u64::from(value_tag));

    FieldCode {
        members: vec![
            quote! {
                #doc
                pub #keys_ident: Vec<#key_ty>,
            },
            quote! {
                #doc
                pub #values_ident: Vec<#value_ty>,
            },
        ],
        idents: vec![keys_ident.clone(), values_ident.clone()],
        encode: quote! {
            debug_assert_eq!(
                msg.#keys_ident.len(),
                msg.#values_ident.len(),
                "map keys and values must have the same length",
            );
            for (key, value) in msg.#keys_ident.iter().zip(&msg.#values_ident) {
                let mut entry = Vec::new();
                #encode_key
                #encode_value
                #rt::encode_key(buf, #outer_key);
                #rt::encode_bytes(buf, &entry);
            }
        },
        decode_arms: vec![quote! {
            #outer_key => {
                let (#entry, end) = #rt::decode_length_delimited(data, pos)?;
                let mut entry_key: #key_ty = #key_default;
                let mut entry_value: #value_ty = #value_default;
                let mut #entry_pos = 0usize;
                while #entry_pos < #entry.len() {
                    let (entry_tag, #next) = #rt::decode_key(#entry, #entry_pos)?;
                    #entry_pos = #next;
                    match entry_tag {
                        #key_tag => {
                            #decode_key
                            entry_key = #decoded;
                            #entry_pos = #next;
                        }
                        #value_tag => {
                            #decode_value
                            entry_value = #decoded;
                            #entry_pos = #next;
                        }
                        _ => return Err(#rt::DecodeError::UnexpectedMapEntryTag(entry_tag)),
                    }
                }
                msg.#keys_ident.push(entry_key);
                msg.#values_ident.push(entry_value);
                pos = end;
            }
        }],
        marker: None,
    }
}

fn skip_field(
    message: &MessageDescriptor,
    field: &FieldDescriptor,
    reason: String,
    sink: &mut dyn DiagnosticSink,
) -> FieldCode {
    let marker = format!(
        " protocodec: field `{}` ({}) skipped: {reason}",
        field.name, field.number
    );
    sink.report(Diagnostic {
        message: message.full_name.clone(),
        field: field.name.clone(),
        reason,
    });
    FieldCode {
        marker: Some(marker),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::descriptor::MapEntry;
    use prost_types::field_descriptor_proto::Type;

    fn ctx() -> Context {
        Context {
            runtime: quote! { crate::protobuf_runtime },
            emit_comments: true,
        }
    }

    fn message(name: &str) -> MessageDescriptor {
        MessageDescriptor {
            name: name.to_string(),
            full_name: format!("demo.{name}"),
            fields: Vec::new(),
            nested: Vec::new(),
            is_map_entry: false,
            doc: None,
        }
    }

    fn field(name: &str, number: i32, ty: Type, label: Label, type_name: Option<&str>) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            number,
            type_code: ty as i32,
            type_name: type_name.map(str::to_string),
            label,
            oneof_index: None,
            map_entry: None,
            doc: None,
        }
    }

    fn generate(field: &FieldDescriptor) -> (CodegenResult<FieldCode>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let code = generate_field(&ctx(), &message("Holder"), field, &mut diagnostics);
        (code, diagnostics)
    }

    #[test]
    fn singular_scalar_writes_key_then_value() {
        let (code, diagnostics) = generate(&field("user_id", 3, Type::Int32, Label::Optional, None));
        let code = code.unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(code.members[0].to_string(), quote! { pub userId: i32, }.to_string());
        assert_eq!(
            code.encode.to_string(),
            quote! {
                crate::protobuf_runtime::encode_key(buf, 24);
                crate::protobuf_runtime::encode_int32(buf, msg.userId);
            }
            .to_string()
        );
        assert_eq!(code.decode_arms.len(), 1);
        assert!(code.decode_arms[0].to_string().starts_with("24 =>"));
    }

    #[test]
    fn string_is_passed_by_reference() {
        let (code, _) = generate(&field("name", 1, Type::String, Label::Optional, None));
        let encode = code.unwrap().encode.to_string();
        assert!(encode.contains(&quote! { encode_string(buf, &msg.name) }.to_string()));
    }

    #[test]
    fn message_field_delegates_to_nested_codec() {
        let (code, _) = generate(&field("home", 2, Type::Message, Label::Optional, Some(".demo.Outer.Address")));
        let code = code.unwrap();
        assert_eq!(code.members[0].to_string(), quote! { pub home: Option<Box<Address>>, }.to_string());
        let encode = code.encode.to_string();
        assert!(encode.starts_with(&quote! { if let Some(value) = &msg.home }.to_string()));
        assert!(encode.contains(&quote! { AddressCodec::encode(&**value) }.to_string()));
        let arm = code.decode_arms[0].to_string();
        assert!(arm.starts_with("18 =>"));
        assert!(arm.contains(&quote! { AddressCodec::decode(nested)? }.to_string()));
        assert!(arm.contains(&quote! { msg.home = Some(Box::new(decoded)); }.to_string()));
    }

    #[test]
    fn repeated_numeric_also_accepts_packed() {
        let (code, _) = generate(&field("deltas", 4, Type::Sint64, Label::Repeated, None));
        let code = code.unwrap();
        assert_eq!(code.members[0].to_string(), quote! { pub deltas: Vec<i64>, }.to_string());
        let arms: Vec<_> = code.decode_arms.iter().map(|arm| arm.to_string()).collect();
        assert_eq!(arms.len(), 2);
        assert!(arms[0].starts_with("32 =>"));
        assert!(arms[1].starts_with("34 =>"));
        assert!(code.encode.to_string().starts_with("for value in & msg . deltas"));
    }

    #[test]
    fn repeated_strings_are_never_packed() {
        let (code, _) = generate(&field("tags", 5, Type::String, Label::Repeated, None));
        assert_eq!(code.unwrap().decode_arms.len(), 1);
    }

    #[test]
    fn map_field_flattens_into_two_sequences() {
        let mut labels = field("labels", 6, Type::Message, Label::Repeated, Some(".demo.Holder.LabelsEntry"));
        labels.map_entry = Some(MapEntry {
            key_type: Type::Int32 as i32,
            value_type: Type::String as i32,
            value_type_name: None,
        });
        let (code, _) = generate(&labels);
        let code = code.unwrap();
        assert_eq!(code.members.len(), 2);
        assert_eq!(code.members[0].to_string(), quote! { pub labelsKeys: Vec<i32>, }.to_string());
        assert_eq!(code.members[1].to_string(), quote! { pub labelsValues: Vec<String>, }.to_string());
        let encode = code.encode.to_string();
        assert!(encode.contains(&quote! { encode_key(&mut entry, 8) }.to_string()));
        assert!(encode.contains(&quote! { encode_key(&mut entry, 18) }.to_string()));
        assert!(encode.contains(&quote! { encode_key(buf, 50) }.to_string()));
        assert!(encode.starts_with("debug_assert_eq !"));
        assert!(code.decode_arms[0].to_string().contains("UnexpectedMapEntryTag"));
    }

    #[test]
    fn group_field_degrades_to_marker() {
        let (code, diagnostics) = generate(&field("legacy", 7, Type::Group, Label::Optional, Some(".demo.Legacy")));
        let code = code.unwrap();
        assert!(code.members.is_empty());
        assert!(code.encode.is_empty());
        assert!(code.decode_arms.is_empty());
        assert!(code.marker.unwrap().contains("`legacy` (7)"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "demo.Holder");
        assert_eq!(diagnostics[0].reason, "unsupported field type code 10");
    }

    #[test]
    fn map_with_unsupported_value_degrades() {
        let mut weird = field("weird", 8, Type::Message, Label::Repeated, Some(".demo.Holder.WeirdEntry"));
        weird.map_entry = Some(MapEntry {
            key_type: Type::String as i32,
            value_type: 42,
            value_type_name: None,
        });
        let (code, diagnostics) = generate(&weird);
        assert!(code.unwrap().marker.is_some());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn message_without_type_name_aborts() {
        let (code, diagnostics) = generate(&field("orphan", 9, Type::Message, Label::Optional, None));
        assert!(matches!(code, Err(CodegenError::TypeResolution { ref field, .. }) if field == "orphan"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn self_reference_is_boxed() {
        let (code, diagnostics) = generate(&field("parent", 1, Type::Message, Label::Optional, Some(".demo.Holder")));
        let code = code.unwrap();
        assert!(code.marker.is_none());
        assert!(diagnostics.is_empty());
        assert_eq!(code.members[0].to_string(), quote! { pub parent: Option<Box<Holder>>, }.to_string());

        let (code, diagnostics) = generate(&field("children", 2, Type::Message, Label::Repeated, Some(".demo.Holder")));
        assert_eq!(code.unwrap().members[0].to_string(), quote! { pub children: Vec<Holder>, }.to_string());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn member_idents_are_reported() {
        let (code, _) = generate(&field("user_id", 1, Type::Int32, Label::Optional, None));
        assert_eq!(code.unwrap().idents, [format_ident!("userId")]);

        let mut tags = field("tags", 2, Type::Message, Label::Repeated, Some(".demo.Holder.TagsEntry"));
        tags.map_entry = Some(MapEntry {
            key_type: Type::String as i32,
            value_type: Type::String as i32,
            value_type_name: None,
        });
        let (code, _) = generate(&tags);
        assert_eq!(code.unwrap().idents, [format_ident!("tagsKeys"), format_ident!("tagsValues")]);
    }

    #[test]
    fn comments_become_doc_attributes() {
        let mut documented = field("id", 1, Type::Uint64, Label::Optional, None);
        documented.doc = Some("Primary key.\nNever zero.".to_string());
        let (code, _) = generate(&documented);
        assert_eq!(
            code.unwrap().members[0].to_string(),
            quote! {
                #[doc = " Primary key."]
                #[doc = " Never zero."]
                pub id: u64,
            }
            .to_string()
        );
    }
}
