// build.rs
//
// Generates codecs for the fixture schema below into OUT_DIR. The schema is
// assembled as descriptors directly so the build needs no protoc.

use std::path::PathBuf;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, SourceCodeInfo,
};

const PACKAGE: &str = "codegen.test";

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(ty as i32),
        label: Some(Label::Optional as i32),
        ..Default::default()
    }
}

fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

fn typed(mut field: FieldDescriptorProto, type_name: &str) -> FieldDescriptorProto {
    field.type_name = Some(format!(".{PACKAGE}.{type_name}"));
    field
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>, nested: Vec<DescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        nested_type: nested,
        ..Default::default()
    }
}

fn map_entry(name: &str, key: FieldDescriptorProto, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(name, vec![key, value], vec![])
    }
}

fn fixture() -> FileDescriptorProto {
    let scalars = message(
        "Scalars",
        vec![
            field("f_double", 1, Type::Double),
            field("f_float", 2, Type::Float),
            field("f_int64", 3, Type::Int64),
            field("f_uint64", 4, Type::Uint64),
            field("f_int32", 5, Type::Int32),
            field("f_fixed64", 6, Type::Fixed64),
            field("f_fixed32", 7, Type::Fixed32),
            field("f_bool", 8, Type::Bool),
            field("f_string", 9, Type::String),
            field("f_bytes", 12, Type::Bytes),
            field("f_uint32", 13, Type::Uint32),
            typed(field("f_enum", 14, Type::Enum), "Color"),
            field("f_sfixed32", 15, Type::Sfixed32),
            field("f_sfixed64", 16, Type::Sfixed64),
            field("f_sint32", 17, Type::Sint32),
            field("f_sint64", 18, Type::Sint64),
        ],
        vec![],
    );

    let inner = message(
        "Inner",
        vec![field("x", 1, Type::Int32), field("label", 2, Type::String)],
        vec![],
    );

    let leaf = message("Leaf", vec![field("depth", 1, Type::Uint32)], vec![]);
    let middle = message(
        "Middle",
        vec![typed(field("leaf", 1, Type::Message), "Outer.Middle.Leaf")],
        vec![leaf],
    );

    let outer = message(
        "Outer",
        vec![
            typed(field("child", 1, Type::Message), "Inner"),
            repeated(typed(field("children", 2, Type::Message), "Inner")),
            repeated(field("deltas", 3, Type::Sint64)),
            repeated(field("names", 4, Type::String)),
            repeated(typed(field("labels", 5, Type::Message), "Outer.LabelsEntry")),
            repeated(typed(field("lookup", 6, Type::Message), "Outer.LookupEntry")),
            typed(field("middle", 7, Type::Message), "Outer.Middle"),
            field("display_name", 8, Type::String),
        ],
        vec![
            map_entry("LabelsEntry", field("key", 1, Type::Int32), field("value", 2, Type::String)),
            map_entry(
                "LookupEntry",
                field("key", 1, Type::String),
                typed(field("value", 2, Type::Message), "Inner"),
            ),
            middle,
        ],
    );

    let batch = message(
        "Batch",
        vec![
            repeated(field("ids", 1, Type::Uint64)),
            repeated(typed(field("items", 2, Type::Message), "Inner")),
        ],
        vec![],
    );

    let legacy = message(
        "Legacy",
        vec![
            field("id", 1, Type::Int32),
            typed(field("blob", 2, Type::Group), "Legacy.Blob"),
            field("note", 3, Type::String),
        ],
        vec![message("Blob", vec![field("a", 1, Type::Int32)], vec![])],
    );

    let node = message(
        "Node",
        vec![field("value", 1, Type::Int32), typed(field("next", 2, Type::Message), "Node")],
        vec![],
    );
    let author = message(
        "Author",
        vec![field("name", 1, Type::String), typed(field("latest", 2, Type::Message), "Book")],
        vec![],
    );
    let book = message(
        "Book",
        vec![field("title", 1, Type::String), typed(field("author", 2, Type::Message), "Author")],
        vec![],
    );

    let color = EnumDescriptorProto {
        name: Some("Color".to_string()),
        value: ["COLOR_UNSPECIFIED", "COLOR_RED"]
            .iter()
            .enumerate()
            .map(|(i, name)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(i as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("codegen/codegen_tests.proto".to_string()),
        package: Some(PACKAGE.to_string()),
        message_type: vec![scalars, inner, outer, batch, legacy, node, author, book],
        enum_type: vec![color],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![4, 2],
                    leading_comments: Some(" Exercises every field shape.\n".to_string()),
                    ..Default::default()
                },
                Location {
                    path: vec![4, 2, 2, 4],
                    leading_comments: Some(" Stored as labelsKeys / labelsValues.\n".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let file = fixture();
    let (files, _diagnostics) = protocodec::generate_files(
        std::slice::from_ref(&file),
        &[file.name().to_string()],
        &protocodec::Options::default(),
    )
    .expect("protocodec failed on the fixture schema");

    for generated in files {
        let path = out_dir.join(&generated.name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, generated.content).unwrap();
    }
}
