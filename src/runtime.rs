// Protobuf3 wire-format primitives called by protocodec-generated codecs.
//
// This file is written verbatim next to the generated sources as
// `protobuf_runtime.rs`. It has no dependencies beyond `core`/`alloc` types
// from std and must stay usable through `include!`, so it carries no inner
// attributes or inner doc comments.
//
// Every decoder takes the input buffer and a read position and returns the
// decoded value together with the position just past it.

use std::fmt;

pub const WIRE_VARINT: u64 = 0;
pub const WIRE_FIXED64: u64 = 1;
pub const WIRE_LENGTH_DELIMITED: u64 = 2;
pub const WIRE_FIXED32: u64 = 5;

/// Errors raised while decoding wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read would run past the end of the buffer.
    BufferOverflow,
    /// A varint ran longer than ten bytes.
    InvalidVarint,
    /// A key carried a wire type this runtime cannot skip (groups, 6, 7).
    UnknownWireType(u64),
    /// A string field did not hold UTF-8.
    InvalidUtf8,
    /// A map entry held a tag other than its key (1) or value (2).
    UnexpectedMapEntryTag(u64),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BufferOverflow => write!(f, "protobuf: buffer overflow"),
            DecodeError::InvalidVarint => write!(f, "protobuf: invalid varint"),
            DecodeError::UnknownWireType(wt) => write!(f, "protobuf: unknown wire type {}", wt),
            DecodeError::InvalidUtf8 => write!(f, "protobuf: invalid UTF-8 in string field"),
            DecodeError::UnexpectedMapEntryTag(tag) => {
                write!(f, "protobuf: unexpected tag {} inside map entry", tag)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

// Keys

#[inline]
pub fn encode_key(buf: &mut Vec<u8>, key: u64) {
    encode_varint(buf, key);
}

#[inline]
pub fn decode_key(data: &[u8], pos: usize) -> Result<(u64, usize), DecodeError> {
    decode_varint(data, pos)
}

// Varint

#[inline]
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

#[inline]
pub fn decode_varint(data: &[u8], mut pos: usize) -> Result<(u64, usize), DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if shift > 63 {
            return Err(DecodeError::InvalidVarint);
        }
        let Some(&byte) = data.get(pos) else {
            return Err(DecodeError::BufferOverflow);
        };
        pos += 1;
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, pos));
        }
        shift += 7;
    }
}

// Plain varint integers. Negative int32 values are sign extended to ten bytes.

#[inline]
pub fn encode_int32(buf: &mut Vec<u8>, value: i32) {
    encode_varint(buf, value as i64 as u64);
}

#[inline]
pub fn decode_int32(data: &[u8], pos: usize) -> Result<(i32, usize), DecodeError> {
    let (raw, pos) = decode_varint(data, pos)?;
    Ok((raw as i32, pos))
}

#[inline]
pub fn encode_int64(buf: &mut Vec<u8>, value: i64) {
    encode_varint(buf, value as u64);
}

#[inline]
pub fn decode_int64(data: &[u8], pos: usize) -> Result<(i64, usize), DecodeError> {
    let (raw, pos) = decode_varint(data, pos)?;
    Ok((raw as i64, pos))
}

#[inline]
pub fn encode_uint32(buf: &mut Vec<u8>, value: u32) {
    encode_varint(buf, u64::from(value));
}

#[inline]
pub fn decode_uint32(data: &[u8], pos: usize) -> Result<(u32, usize), DecodeError> {
    let (raw, pos) = decode_varint(data, pos)?;
    Ok((raw as u32, pos))
}

#[inline]
pub fn encode_uint64(buf: &mut Vec<u8>, value: u64) {
    encode_varint(buf, value);
}

#[inline]
pub fn decode_uint64(data: &[u8], pos: usize) -> Result<(u64, usize), DecodeError> {
    decode_varint(data, pos)
}

#[inline]
pub fn encode_enum(buf: &mut Vec<u8>, value: i32) {
    encode_int32(buf, value);
}

#[inline]
pub fn decode_enum(data: &[u8], pos: usize) -> Result<(i32, usize), DecodeError> {
    decode_int32(data, pos)
}

#[inline]
pub fn encode_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(u8::from(value));
}

#[inline]
pub fn decode_bool(data: &[u8], pos: usize) -> Result<(bool, usize), DecodeError> {
    let (raw, pos) = decode_varint(data, pos)?;
    Ok((raw != 0, pos))
}

// Zigzag (sint32 / sint64)

#[inline]
pub fn encode_sint32(buf: &mut Vec<u8>, value: i32) {
    let zigzag = ((value << 1) ^ (value >> 31)) as u32;
    encode_varint(buf, u64::from(zigzag));
}

#[inline]
pub fn decode_sint32(data: &[u8], pos: usize) -> Result<(i32, usize), DecodeError> {
    let (raw, pos) = decode_varint(data, pos)?;
    let n = raw as u32;
    Ok((((n >> 1) as i32) ^ -((n & 1) as i32), pos))
}

#[inline]
pub fn encode_sint64(buf: &mut Vec<u8>, value: i64) {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    encode_varint(buf, zigzag);
}

#[inline]
pub fn decode_sint64(data: &[u8], pos: usize) -> Result<(i64, usize), DecodeError> {
    let (raw, pos) = decode_varint(data, pos)?;
    Ok((((raw >> 1) as i64) ^ -((raw & 1) as i64), pos))
}

// 64-bit fixed, little endian

#[inline]
pub fn encode_fixed64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn decode_fixed64(data: &[u8], pos: usize) -> Result<(u64, usize), DecodeError> {
    let (bytes, pos) = slice(data, pos, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok((u64::from_le_bytes(raw), pos))
}

#[inline]
pub fn encode_sfixed64(buf: &mut Vec<u8>, value: i64) {
    encode_fixed64(buf, value as u64);
}

#[inline]
pub fn decode_sfixed64(data: &[u8], pos: usize) -> Result<(i64, usize), DecodeError> {
    let (raw, pos) = decode_fixed64(data, pos)?;
    Ok((raw as i64, pos))
}

#[inline]
pub fn encode_double(buf: &mut Vec<u8>, value: f64) {
    encode_fixed64(buf, value.to_bits());
}

#[inline]
pub fn decode_double(data: &[u8], pos: usize) -> Result<(f64, usize), DecodeError> {
    let (raw, pos) = decode_fixed64(data, pos)?;
    Ok((f64::from_bits(raw), pos))
}

// 32-bit fixed, little endian

#[inline]
pub fn encode_fixed32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn decode_fixed32(data: &[u8], pos: usize) -> Result<(u32, usize), DecodeError> {
    let (bytes, pos) = slice(data, pos, 4)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    Ok((u32::from_le_bytes(raw), pos))
}

#[inline]
pub fn encode_sfixed32(buf: &mut Vec<u8>, value: i32) {
    encode_fixed32(buf, value as u32);
}

#[inline]
pub fn decode_sfixed32(data: &[u8], pos: usize) -> Result<(i32, usize), DecodeError> {
    let (raw, pos) = decode_fixed32(data, pos)?;
    Ok((raw as i32, pos))
}

#[inline]
pub fn encode_float(buf: &mut Vec<u8>, value: f32) {
    encode_fixed32(buf, value.to_bits());
}

#[inline]
pub fn decode_float(data: &[u8], pos: usize) -> Result<(f32, usize), DecodeError> {
    let (raw, pos) = decode_fixed32(data, pos)?;
    Ok((f32::from_bits(raw), pos))
}

// Length-delimited

/// Borrow `len` bytes starting at `pos`.
#[inline]
pub fn slice(data: &[u8], pos: usize, len: usize) -> Result<(&[u8], usize), DecodeError> {
    let end = pos.checked_add(len).ok_or(DecodeError::BufferOverflow)?;
    match data.get(pos..end) {
        Some(bytes) => Ok((bytes, end)),
        None => Err(DecodeError::BufferOverflow),
    }
}

/// Read a varint length prefix and borrow the bytes it covers.
#[inline]
pub fn decode_length_delimited(data: &[u8], pos: usize) -> Result<(&[u8], usize), DecodeError> {
    let (len, pos) = decode_varint(data, pos)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::BufferOverflow)?;
    slice(data, pos, len)
}

#[inline]
pub fn encode_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    encode_varint(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

#[inline]
pub fn decode_bytes(data: &[u8], pos: usize) -> Result<(Vec<u8>, usize), DecodeError> {
    let (bytes, pos) = decode_length_delimited(data, pos)?;
    Ok((bytes.to_vec(), pos))
}

#[inline]
pub fn encode_string(buf: &mut Vec<u8>, value: &str) {
    encode_bytes(buf, value.as_bytes());
}

#[inline]
pub fn decode_string(data: &[u8], pos: usize) -> Result<(String, usize), DecodeError> {
    let (bytes, pos) = decode_length_delimited(data, pos)?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok((s.to_owned(), pos)),
        Err(_) => Err(DecodeError::InvalidUtf8),
    }
}

// Unknown fields

/// Skip the value of an unrecognized field whose key carried `wire_type`.
#[inline]
pub fn skip_field(data: &[u8], pos: usize, wire_type: u64) -> Result<usize, DecodeError> {
    match wire_type {
        WIRE_VARINT => decode_varint(data, pos).map(|(_, pos)| pos),
        WIRE_FIXED64 => slice(data, pos, 8).map(|(_, pos)| pos),
        WIRE_LENGTH_DELIMITED => decode_length_delimited(data, pos).map(|(_, pos)| pos),
        WIRE_FIXED32 => slice(data, pos, 4).map(|(_, pos)| pos),
        other => Err(DecodeError::UnknownWireType(other)),
    }
}
