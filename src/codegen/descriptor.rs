//! Internal descriptor model.
//!
//! Normalizes the `prost-types` schema tree into an owned tree of messages
//! and fields. Map fields are recognized here: a repeated field whose type is
//! a synthesized map-entry message carries the entry's key/value types in
//! [`FieldDescriptor::map_entry`].

use std::collections::HashMap;

use prost_types::field_descriptor_proto::Label;
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

use super::comments::{CommentIndex, FILE_MESSAGE_TYPE, MESSAGE_FIELD, MESSAGE_NESTED_TYPE};
use super::error::{CodegenError, CodegenResult};

/// Largest field number protobuf allows.
pub const MAX_FIELD_NUMBER: i32 = (1 << 29) - 1;

#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub name: String,
    pub package: String,
    pub messages: Vec<MessageDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    pub name: String,
    /// Dotted ancestor chain rooted at the package, without a leading dot.
    pub full_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub nested: Vec<MessageDescriptor>,
    pub is_map_entry: bool,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: i32,
    /// Raw `FieldDescriptorProto.type` code; unsupported codes are kept.
    pub type_code: i32,
    pub type_name: Option<String>,
    pub label: Label,
    pub oneof_index: Option<i32>,
    pub map_entry: Option<MapEntry>,
    pub doc: Option<String>,
}

/// Key and value types of a map field, taken from its entry message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub key_type: i32,
    pub value_type: i32,
    pub value_type_name: Option<String>,
}

impl FieldDescriptor {
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

impl MessageDescriptor {
    /// Depth-first visit of this message and all nested messages, parent first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a MessageDescriptor)) {
        visit(self);
        for nested in &self.nested {
            nested.walk(visit);
        }
    }
}

impl FileDescriptor {
    pub fn from_proto(file: &FileDescriptorProto) -> CodegenResult<Self> {
        let package = file.package().to_string();

        let mut map_entries = HashMap::new();
        index_map_entries(&file.message_type, &package, &mut map_entries);

        let builder = Builder {
            comments: CommentIndex::from_file(file),
            map_entries,
        };

        let messages = file
            .message_type
            .iter()
            .enumerate()
            .map(|(i, message)| builder.message(message, &package, vec![FILE_MESSAGE_TYPE, i as i32]))
            .collect::<CodegenResult<Vec<_>>>()?;

        Ok(FileDescriptor {
            name: file.name().to_string(),
            package,
            messages,
        })
    }
}

fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .is_some_and(|options| options.map_entry())
}

/// Collect map-entry messages by the dotted name fields use to reference them.
fn index_map_entries<'a>(
    messages: &'a [DescriptorProto],
    parent: &str,
    index: &mut HashMap<String, &'a DescriptorProto>,
) {
    for message in messages {
        let full_name = qualify(parent, message.name());
        if is_map_entry(message) {
            index.insert(format!(".{full_name}"), message);
        }
        index_map_entries(&message.nested_type, &full_name, index);
    }
}

struct Builder<'a> {
    comments: CommentIndex,
    map_entries: HashMap<String, &'a DescriptorProto>,
}

impl Builder<'_> {
    fn message(
        &self,
        message: &DescriptorProto,
        parent: &str,
        path: Vec<i32>,
    ) -> CodegenResult<MessageDescriptor> {
        let full_name = qualify(parent, message.name());

        let fields = message
            .field
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let mut field_path = path.clone();
                field_path.extend([MESSAGE_FIELD, i as i32]);
                self.field(field, &full_name, &field_path)
            })
            .collect::<CodegenResult<Vec<_>>>()?;

        let nested = message
            .nested_type
            .iter()
            .enumerate()
            .map(|(i, nested)| {
                let mut nested_path = path.clone();
                nested_path.extend([MESSAGE_NESTED_TYPE, i as i32]);
                self.message(nested, &full_name, nested_path)
            })
            .collect::<CodegenResult<Vec<_>>>()?;

        Ok(MessageDescriptor {
            name: message.name().to_string(),
            doc: self.comments.get(&path),
            full_name,
            fields,
            nested,
            is_map_entry: is_map_entry(message),
        })
    }

    fn field(
        &self,
        field: &FieldDescriptorProto,
        message_name: &str,
        path: &[i32],
    ) -> CodegenResult<FieldDescriptor> {
        let number = field.number();
        if !(1..=MAX_FIELD_NUMBER).contains(&number) {
            return Err(CodegenError::MalformedSchema {
                message: message_name.to_string(),
                reason: format!("field {} has invalid number {number}", field.name()),
            });
        }

        let map_entry = match field
            .type_name
            .as_deref()
            .and_then(|type_name| self.map_entries.get(type_name))
        {
            Some(entry) => {
                if field.label() != Label::Repeated {
                    return Err(CodegenError::MalformedSchema {
                        message: message_name.to_string(),
                        reason: format!("map field {} is not repeated", field.name()),
                    });
                }
                Some(map_entry_types(entry, message_name)?)
            }
            None => None,
        };

        Ok(FieldDescriptor {
            name: field.name().to_string(),
            number,
            type_code: field.r#type.unwrap_or_default(),
            type_name: field.type_name.clone().filter(|name| !name.is_empty()),
            label: field.label(),
            oneof_index: field.oneof_index,
            map_entry,
            doc: self.comments.get(path),
        })
    }
}

/// A map entry must be exactly `key = 1` and `value = 2`.
fn map_entry_types(entry: &DescriptorProto, message_name: &str) -> CodegenResult<MapEntry> {
    let malformed = |reason: String| CodegenError::MalformedSchema {
        message: message_name.to_string(),
        reason,
    };

    let [first, second] = entry.field.as_slice() else {
        return Err(malformed(format!(
            "map entry {} has {} fields, expected key and value",
            entry.name(),
            entry.field.len()
        )));
    };

    let find = |name: &str, number: i32| {
        [first, second]
            .into_iter()
            .find(|field| field.name() == name && field.number() == number)
            .ok_or_else(|| {
                malformed(format!(
                    "map entry {} lacks a `{name}` field numbered {number}",
                    entry.name()
                ))
            })
    };

    let key = find("key", 1)?;
    let value = find("value", 2)?;

    Ok(MapEntry {
        key_type: key.r#type.unwrap_or_default(),
        value_type: value.r#type.unwrap_or_default(),
        value_type_name: value.type_name.clone().filter(|name| !name.is_empty()),
    })
}
