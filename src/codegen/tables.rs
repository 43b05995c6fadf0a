// Type mapping table: proto field-type code -> target type, wire category
// and the runtime primitives that read and write it.

use super::error::{CodegenError, CodegenResult};
use prost_types::field_descriptor_proto::Type;

/// The four physical encodings a field value can take on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl WireType {
    pub fn from_u32(value: u32) -> Option<WireType> {
        match value {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    /// Whether repeated values of this category may arrive packed.
    pub fn is_packable(self) -> bool {
        self != WireType::LengthDelimited
    }
}

/// Table entry for a field type with a fixed target representation.
#[derive(Debug, PartialEq, Eq)]
pub struct ScalarType {
    pub proto_name: &'static str,
    pub target_type: &'static str,
    pub wire_type: WireType,
    pub default_value: &'static str,
    pub encoder: &'static str,
    pub decoder: &'static str,
    /// Encoder takes `&str` / `&[u8]` rather than the value itself.
    pub by_ref: bool,
}

/// Result of looking up a field type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMapping {
    Scalar(&'static ScalarType),
    /// Resolved per occurrence from the field's type name.
    Message,
}

impl TypeMapping {
    pub fn wire_type(self) -> WireType {
        match self {
            TypeMapping::Scalar(scalar) => scalar.wire_type,
            TypeMapping::Message => WireType::LengthDelimited,
        }
    }
}

const fn scalar(
    proto_name: &'static str,
    target_type: &'static str,
    wire_type: WireType,
    default_value: &'static str,
    encoder: &'static str,
    decoder: &'static str,
    by_ref: bool,
) -> ScalarType {
    ScalarType { proto_name, target_type, wire_type, default_value, encoder, decoder, by_ref }
}

use WireType::{Fixed32, Fixed64, LengthDelimited, Varint};

static DOUBLE: ScalarType = scalar("double", "f64", Fixed64, "0.0", "encode_double", "decode_double", false);
static FLOAT: ScalarType = scalar("float", "f32", Fixed32, "0.0", "encode_float", "decode_float", false);
static INT64: ScalarType = scalar("int64", "i64", Varint, "0", "encode_int64", "decode_int64", false);
static UINT64: ScalarType = scalar("uint64", "u64", Varint, "0", "encode_uint64", "decode_uint64", false);
static INT32: ScalarType = scalar("int32", "i32", Varint, "0", "encode_int32", "decode_int32", false);
static FIXED64: ScalarType = scalar("fixed64", "u64", Fixed64, "0", "encode_fixed64", "decode_fixed64", false);
static FIXED32: ScalarType = scalar("fixed32", "u32", Fixed32, "0", "encode_fixed32", "decode_fixed32", false);
static BOOL: ScalarType = scalar("bool", "bool", Varint, "false", "encode_bool", "decode_bool", false);
static STRING: ScalarType = scalar("string", "String", LengthDelimited, "String::new()", "encode_string", "decode_string", true);
static BYTES: ScalarType = scalar("bytes", "Vec<u8>", LengthDelimited, "Vec::new()", "encode_bytes", "decode_bytes", true);
static UINT32: ScalarType = scalar("uint32", "u32", Varint, "0", "encode_uint32", "decode_uint32", false);
static ENUM: ScalarType = scalar("enum", "i32", Varint, "0", "encode_enum", "decode_enum", false);
static SFIXED32: ScalarType = scalar("sfixed32", "i32", Fixed32, "0", "encode_sfixed32", "decode_sfixed32", false);
static SFIXED64: ScalarType = scalar("sfixed64", "i64", Fixed64, "0", "encode_sfixed64", "decode_sfixed64", false);
static SINT32: ScalarType = scalar("sint32", "i32", Varint, "0", "encode_sint32", "decode_sint32", false);
static SINT64: ScalarType = scalar("sint64", "i64", Varint, "0", "encode_sint64", "decode_sint64", false);

/// Look up a `FieldDescriptorProto.type` code.
pub fn type_map(code: i32) -> CodegenResult<TypeMapping> {
    let ty = Type::try_from(code).map_err(|_| CodegenError::UnsupportedFieldType { code })?;
    let scalar = match ty {
        Type::Double => &DOUBLE,
        Type::Float => &FLOAT,
        Type::Int64 => &INT64,
        Type::Uint64 => &UINT64,
        Type::Int32 => &INT32,
        Type::Fixed64 => &FIXED64,
        Type::Fixed32 => &FIXED32,
        Type::Bool => &BOOL,
        Type::String => &STRING,
        Type::Bytes => &BYTES,
        Type::Uint32 => &UINT32,
        Type::Enum => &ENUM,
        Type::Sfixed32 => &SFIXED32,
        Type::Sfixed64 => &SFIXED64,
        Type::Sint32 => &SINT32,
        Type::Sint64 => &SINT64,
        Type::Message => return Ok(TypeMapping::Message),
        Type::Group => return Err(CodegenError::UnsupportedFieldType { code }),
    };
    Ok(TypeMapping::Scalar(scalar))
}

/// Local name of a referenced message: ".pkg.Outer.Inner" -> "Inner".
pub fn resolve_message_type(type_name: &str) -> Option<&str> {
    type_name
        .rsplit('.')
        .next()
        .filter(|name| !name.is_empty())
}

pub fn tag(field_number: u32, wire_type: WireType) -> u32 {
    (field_number << 3) | wire_type as u32
}

pub fn split_tag(tag: u32) -> (u32, Option<WireType>) {
    (tag >> 3, WireType::from_u32(tag & 7))
}
