//
// Copyright (c) The yang-ctx Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Typed leaf value wire codec.
//!
//! Each value is written as `[type_tag_byte, body]`. The tag packs the
//! resolved [`BaseType`] into its low 5 bits (room for up to 32 base types,
//! covering the 20 currently defined) and three flag bits above that: bit 7
//! marks the value as the node's schema default rather than an explicit
//! one, bit 6 is reserved for a user-defined (plugin) type, which this
//! codec never sets since it has no plugin mechanism, and bit 5 marks the
//! value as still carrying an unresolved reference (leafref/
//! instance-identifier/identityref/union) rather than a concrete value.
//! String and binary bodies are framed through [`super::framing`] rather
//! than a flat length prefix, like every other on-wire string in this
//! codec.

use crate::error::{Error, Result};
use crate::value::{BaseType, Decimal64, Value};

const FLAG_DEFAULT: u8 = 0x80;
const FLAG_USER_TYPE: u8 = 0x40;
const FLAG_UNRESOLVED: u8 = 0x20;

/// Encodes `value` and appends it to `out`. `is_default` records whether
/// the value came from the schema default rather than being explicitly
/// present in the source data.
pub fn encode(out: &mut Vec<u8>, value: &Value, is_default: bool) {
    let mut tag = value.base_type() as u8 & 0x1f;
    if is_default {
        tag |= FLAG_DEFAULT;
    }
    if value.is_unresolved_reference() {
        tag |= FLAG_UNRESOLVED;
    }
    out.push(tag);
    encode_body(out, value);
}

fn encode_body(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Int8(v) => out.push(*v as u8),
        Value::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Uint8(v) => out.push(*v),
        Value::Uint16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Uint32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Uint64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Dec64(d) => {
            out.extend_from_slice(&d.digits.to_le_bytes());
            out.push(d.fraction_digits);
        }
        Value::Bool(v) => out.push(u8::from(*v)),
        Value::Empty => {}
        Value::String(s)
        | Value::IdentityRef(s)
        | Value::InstanceId(s)
        | Value::LeafRef(s)
        | Value::Union(s) => write_string(out, s),
        Value::Binary(bytes) => write_bytes(out, bytes),
        Value::Enum { name, ordinal } => {
            write_string(out, name);
            out.extend_from_slice(&ordinal.to_le_bytes());
        }
        Value::Bits(names) => {
            out.extend_from_slice(&(names.len() as u16).to_le_bytes());
            for name in names {
                write_string(out, name);
            }
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    write_bytes(out, s.as_bytes());
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    super::framing::write_block(out, bytes);
}

/// Decodes one value starting at `*pos`, returning `(value, is_default)`
/// and advancing `*pos` past it.
pub fn decode(data: &[u8], pos: &mut usize) -> Result<(Value, bool)> {
    let tag = read_u8(data, pos)?;
    let base = BaseType::from_u8(tag & 0x1f)
        .ok_or_else(|| Error::invalid(format!("unknown LYB value type tag {:#x}", tag & 0x1f)))?;
    let is_default = tag & FLAG_DEFAULT != 0;
    let unresolved = tag & FLAG_UNRESOLVED != 0;
    if tag & FLAG_USER_TYPE != 0 {
        return Err(Error::invalid("LYB value uses a user-defined type, which this codec cannot decode"));
    }

    let value = decode_body(data, pos, base, unresolved)?;
    Ok((value, is_default))
}

fn decode_body(data: &[u8], pos: &mut usize, base: BaseType, unresolved: bool) -> Result<Value> {
    Ok(match base {
        BaseType::Int8 => Value::Int8(read_u8(data, pos)? as i8),
        BaseType::Int16 => Value::Int16(i16::from_le_bytes(read_array(data, pos)?)),
        BaseType::Int32 => Value::Int32(i32::from_le_bytes(read_array(data, pos)?)),
        BaseType::Int64 => Value::Int64(i64::from_le_bytes(read_array(data, pos)?)),
        BaseType::Uint8 => Value::Uint8(read_u8(data, pos)?),
        BaseType::Uint16 => Value::Uint16(u16::from_le_bytes(read_array(data, pos)?)),
        BaseType::Uint32 => Value::Uint32(u32::from_le_bytes(read_array(data, pos)?)),
        BaseType::Uint64 => Value::Uint64(u64::from_le_bytes(read_array(data, pos)?)),
        BaseType::Dec64 => {
            let digits = i64::from_le_bytes(read_array(data, pos)?);
            let fraction_digits = read_u8(data, pos)?;
            Value::Dec64(Decimal64 { digits, fraction_digits })
        }
        BaseType::Bool => Value::Bool(read_u8(data, pos)? != 0),
        BaseType::Empty => Value::Empty,
        BaseType::String => Value::String(read_string(data, pos)?),
        BaseType::Binary => Value::Binary(read_bytes(data, pos)?),
        BaseType::Enum => {
            let name = read_string(data, pos)?;
            let ordinal = u32::from_le_bytes(read_array(data, pos)?);
            Value::Enum { name, ordinal }
        }
        BaseType::Bits => {
            let count = u16::from_le_bytes(read_array(data, pos)?);
            let mut names = Vec::with_capacity(count as usize);
            for _ in 0..count {
                names.push(read_string(data, pos)?);
            }
            Value::Bits(names)
        }
        BaseType::IdentityRef => Value::IdentityRef(read_string(data, pos)?),
        BaseType::InstanceId => Value::InstanceId(read_string(data, pos)?),
        BaseType::LeafRef => Value::LeafRef(read_string(data, pos)?),
        BaseType::Union => {
            let text = read_string(data, pos)?;
            if unresolved {
                Value::Union(text)
            } else {
                Value::String(text)
            }
        }
        BaseType::Unknown => return Err(Error::invalid("LYB value of unknown base type")),
    })
}

fn read_u8(data: &[u8], pos: &mut usize) -> Result<u8> {
    let byte = *data
        .get(*pos)
        .ok_or_else(|| Error::invalid("truncated LYB value"))?;
    *pos += 1;
    Ok(byte)
}

fn read_array<const N: usize>(data: &[u8], pos: &mut usize) -> Result<[u8; N]> {
    let slice = data
        .get(*pos..*pos + N)
        .ok_or_else(|| Error::invalid("truncated LYB value"))?;
    *pos += N;
    Ok(slice.try_into().expect("slice length matches N"))
}

fn read_bytes(data: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    super::framing::read_block(data, pos)
}

fn read_string(data: &[u8], pos: &mut usize) -> Result<String> {
    let bytes = read_bytes(data, pos)?;
    String::from_utf8(bytes).map_err(|e| Error::invalid(format!("LYB string is not UTF-8: {e}")))
}
