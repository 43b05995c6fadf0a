//! Message assembly: one struct plus one `<Name>Codec` unit per message.

use std::collections::{HashMap, HashSet};

use proc_macro2::TokenStream;
use quote::quote;
use tracing::debug;

use super::Context;
use super::descriptor::{FileDescriptor, MessageDescriptor};
use super::error::{CodegenError, CodegenResult, DiagnosticSink};
use super::fields::{doc_attrs, generate_field};
use super::names::{codec_ident, message_ident};

/// Assemble every non-map-entry message of a file, parents before their
/// nested messages, in declaration order.
pub fn assemble_file(
    ctx: &Context,
    file: &FileDescriptor,
    sink: &mut dyn DiagnosticSink,
) -> CodegenResult<TokenStream> {
    let mut messages = Vec::new();
    for message in &file.messages {
        message.walk(&mut |m| {
            if !m.is_map_entry {
                messages.push(m);
            }
        });
    }

    // Nested messages share the file scope, so local names must be unique.
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for message in &messages {
        if let Some(previous) = seen.insert(&message.name, &message.full_name) {
            return Err(CodegenError::MalformedSchema {
                message: message.full_name.clone(),
                reason: format!("local name {} is already used by {previous}", message.name),
            });
        }
    }

    let items = messages
        .into_iter()
        .map(|message| assemble_message(ctx, message, sink))
        .collect::<CodegenResult<Vec<_>>>()?;

    Ok(quote! { #(#items)* })
}

/// Struct definition and codec unit for a single message (nested messages
/// are not included).
pub fn assemble_message(
    ctx: &Context,
    message: &MessageDescriptor,
    sink: &mut dyn DiagnosticSink,
) -> CodegenResult<TokenStream> {
    debug!(message = %message.full_name, fields = message.fields.len(), "assembling message");

    let rt = &ctx.runtime;
    let ident = message_ident(&message.name);
    let codec = codec_ident(&message.name);

    let mut members = Vec::new();
    let mut encodes = Vec::new();
    let mut decode_arms = Vec::new();
    let mut markers = Vec::new();
    let mut member_names = HashSet::new();
    for field in &message.fields {
        let code = generate_field(ctx, message, field, sink)?;
        for ident in &code.idents {
            if !member_names.insert(ident.to_string()) {
                return Err(CodegenError::MalformedSchema {
                    message: message.full_name.clone(),
                    reason: format!("field {} maps to member {ident}, which is already used", field.name),
                });
            }
        }
        members.extend(code.members);
        encodes.push(code.encode);
        decode_arms.extend(code.decode_arms);
        markers.extend(code.marker);
    }

    let doc = doc_attrs(ctx, message.doc.as_deref());

    Ok(quote! {
        #doc
        #(#[doc = #markers])*
        #[allow(non_snake_case)]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #ident {
            #(#members)*
        }

        pub struct #codec;

        impl #codec {
            pub fn encode(msg: &#ident) -> Vec<u8> {
                let mut buf = Vec::new();
                Self::encode_to(msg, &mut buf);
                buf
            }

            #[allow(unused_variables)]
            pub fn encode_to(msg: &#ident, buf: &mut Vec<u8>) {
                #(#encodes)*
            }

            #[allow(unused_mut, clippy::match_single_binding)]
            pub fn decode(data: &[u8]) -> Result<#ident, #rt::DecodeError> {
                let mut msg = #ident::default();
                let mut pos = 0usize;
                while pos < data.len() {
                    let (key, next) = #rt::decode_key(data, pos)?;
                    pos = next;
                    match key {
                        #(#decode_arms)*
                        _ => pos = #rt::skip_field(data, pos, key & 7)?,
                    }
                }
                Ok(msg)
            }
        }
    })
}
