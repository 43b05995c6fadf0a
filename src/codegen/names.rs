// protocodec/src/codegen/names.rs

use proc_macro2::{Ident, Span};

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "gen", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Output file suffix for generated codec units.
pub const OUTPUT_SUFFIX: &str = ".pb.rs";

/// Turn a name into an identifier, escaping keywords.
///
/// Names that camel-case to nothing or to a leading digit (`_1abc`) get a
/// `_` prefix.
pub fn sanitize_ident(name: &str) -> Ident {
    if name.is_empty() || name == "_" {
        return Ident::new("__", Span::call_site());
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Ident::new(&format!("_{name}"), Span::call_site());
    }
    if NON_RAW_KEYWORDS.contains(&name) {
        // can't use r# for these, append underscore instead
        Ident::new(&format!("{name}_"), Span::call_site())
    } else if RUST_KEYWORDS.contains(&name) {
        Ident::new_raw(name, Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

/// Convert snake_case to camelCase (`display_name` -> `displayName`).
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert snake_case to PascalCase (`my_file` -> `MyFile`).
pub fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Struct member for a field.
pub fn field_ident(field_name: &str) -> Ident {
    sanitize_ident(&to_camel_case(field_name))
}

/// Key and value members for a map field.
pub fn map_field_idents(field_name: &str) -> (Ident, Ident) {
    let camel = to_camel_case(field_name);
    (
        sanitize_ident(&format!("{camel}Keys")),
        sanitize_ident(&format!("{camel}Values")),
    )
}

pub fn message_ident(message_name: &str) -> Ident {
    sanitize_ident(message_name)
}

pub fn codec_ident(message_name: &str) -> Ident {
    Ident::new(&format!("{message_name}Codec"), Span::call_site())
}

/// `dir/my_file.proto` in package `a.b` -> `a/b/MyFile.pb.rs`.
pub fn output_file_name(proto_file: &str, package: &str) -> String {
    let file_name = proto_file.rsplit('/').next().unwrap_or(proto_file);
    let base = file_name.strip_suffix(".proto").unwrap_or(file_name);
    let mut path: Vec<String> = package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    path.push(format!("{}{OUTPUT_SUFFIX}", to_pascal_case(base)));
    path.join("/")
}
