//! Message encoding.
//!
//! Builds a payload from an application-supplied field map in wire order,
//! then frames it for the requested protocol version. Absent fields encode
//! as zero; enum-typed fields accept symbolic keys or numbers; bitmask
//! fields accept flag sets or raw masks.

use std::collections::BTreeMap;

use crate::buf::BytesMut;
use crate::dialect::{Dialect, FieldSpec, MessageSpec};
use crate::error::EncodeError;
use crate::frame::{MavlinkV1FrameRaw, MavlinkV2FrameRaw};
use crate::signing::SignState;
use crate::types::MavType;
use crate::value::{EnumValue, MavValue};
use crate::{MavHeader, MavlinkVersion, MAVLINK_IFLAG_SIGNED, MAX_PAYLOAD_LEN};

/// Encode one message into a framed byte buffer.
///
/// `signing` only applies to MAVLink 2 frames; when present, the signed
/// incompatibility flag is set and the signature trailer appended.
pub(crate) fn encode_frame(
    dialect: &Dialect,
    spec: &MessageSpec,
    fields: &BTreeMap<String, MavValue>,
    version: MavlinkVersion,
    header: MavHeader,
    signing: Option<&mut SignState>,
) -> Result<Vec<u8>, EncodeError> {
    if version == MavlinkVersion::V1 && (spec.has_extensions || spec.id > u8::MAX as u32) {
        // extension fields and 24-bit ids only exist in MAVLink 2
        return Err(EncodeError::BadProtocol {
            message: spec.name.clone(),
            version,
        });
    }

    for name in fields.keys() {
        if spec.field(name).is_none() {
            return Err(EncodeError::FieldUnknown {
                message: spec.name.clone(),
                field: name.clone(),
            });
        }
    }

    if version == MavlinkVersion::V1 && spec.payload_len > MAX_PAYLOAD_LEN {
        return Err(EncodeError::Overflow {
            message: spec.name.clone(),
            len: spec.payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut scratch = vec![0u8; spec.max_payload_len];
    let mut buf = BytesMut::new(&mut scratch);
    for field in spec.wire_fields() {
        if field.is_extension && version == MavlinkVersion::V1 {
            continue;
        }
        write_field(dialect, spec, field, fields.get(&field.name), &mut buf)?;
    }
    let written = buf.len();

    let payload_len = match version {
        // v1 always sends the full declared length
        MavlinkVersion::V1 => written,
        MavlinkVersion::V2 => remove_trailing_zeroes(&scratch[..written]),
    };
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(EncodeError::Overflow {
            message: spec.name.clone(),
            len: payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    let payload = &scratch[..payload_len];

    match version {
        MavlinkVersion::V1 => {
            let mut frame = MavlinkV1FrameRaw::new();
            frame.serialize(header, spec.id as u8, payload, spec.crc_extra);
            Ok(frame.raw_bytes().to_vec())
        }
        MavlinkVersion::V2 => {
            let incompat_flags = if signing.is_some() {
                MAVLINK_IFLAG_SIGNED
            } else {
                0
            };
            let mut frame = MavlinkV2FrameRaw::new();
            frame.serialize(header, spec.id, payload, spec.crc_extra, incompat_flags);
            if let Some(signer) = signing {
                signer.sign_frame(&mut frame);
            }
            Ok(frame.raw_bytes().to_vec())
        }
    }
}

/// Trim trailing zero payload bytes for MAVLink 2, keeping at least one.
pub(crate) fn remove_trailing_zeroes(data: &[u8]) -> usize {
    let mut len = data.len();
    while len > 1 && data[len - 1] == 0 {
        len -= 1;
    }
    len
}

fn write_field(
    dialect: &Dialect,
    spec: &MessageSpec,
    field: &FieldSpec,
    value: Option<&MavValue>,
    buf: &mut BytesMut<'_>,
) -> Result<(), EncodeError> {
    let default_value;
    let value = match value {
        Some(value) => value,
        None => {
            default_value = field.mavtype.default_value();
            &default_value
        }
    };

    match &field.mavtype {
        MavType::CharArray(size) => {
            let MavValue::String(s) = value else {
                return Err(out_of_range(spec, field, "expected a string"));
            };
            if s.len() > *size {
                return Err(out_of_range(
                    spec,
                    field,
                    &format!("string of {} bytes in a char[{size}] field", s.len()),
                ));
            }
            buf.put_slice(s.as_bytes());
            for _ in s.len()..*size {
                buf.put_u8(0);
            }
            Ok(())
        }
        MavType::Array(element, size) => {
            let MavValue::Array(values) = value else {
                return Err(out_of_range(spec, field, "expected an array"));
            };
            if values.len() > *size {
                return Err(out_of_range(
                    spec,
                    field,
                    &format!("{} elements in a {size}-element field", values.len()),
                ));
            }
            for v in values {
                write_scalar(dialect, spec, field, element, v, buf)?;
            }
            // short arrays are zero-padded to the declared length
            let zero = element.default_value();
            for _ in values.len()..*size {
                write_scalar(dialect, spec, field, element, &zero, buf)?;
            }
            Ok(())
        }
        scalar => write_scalar(dialect, spec, field, scalar, value, buf),
    }
}

fn write_scalar(
    dialect: &Dialect,
    spec: &MessageSpec,
    field: &FieldSpec,
    mavtype: &MavType,
    value: &MavValue,
    buf: &mut BytesMut<'_>,
) -> Result<(), EncodeError> {
    use MavType::*;
    match mavtype {
        Float => {
            let v = value
                .as_f64()
                .ok_or_else(|| out_of_range(spec, field, "expected a number"))?;
            buf.put_f32_le(v as f32);
            Ok(())
        }
        Double => {
            let v = value
                .as_f64()
                .ok_or_else(|| out_of_range(spec, field, "expected a number"))?;
            buf.put_f64_le(v);
            Ok(())
        }
        Char => {
            // a one-byte text field accepts a single character or a number
            if let MavValue::String(s) = value {
                return match s.as_bytes() {
                    [b] => {
                        buf.put_u8(*b);
                        Ok(())
                    }
                    _ => Err(out_of_range(spec, field, "expected a single character")),
                };
            }
            let v = resolve_int(dialect, spec, field, value)?;
            put_int(spec, field, mavtype, v, buf)
        }
        UInt8 | UInt16 | UInt32 | UInt64 | Int8 | Int16 | Int32 | Int64 => {
            let v = resolve_int(dialect, spec, field, value)?;
            put_int(spec, field, mavtype, v, buf)
        }
        CharArray(_) | Array(_, _) => {
            // arrays of arrays cannot be declared; element types are scalar
            Err(out_of_range(spec, field, "nested array value"))
        }
    }
}

/// Resolve an integer-typed input: a plain number, a symbolic enum key, a
/// raw enum value, or a bitmask flag set.
fn resolve_int(
    dialect: &Dialect,
    spec: &MessageSpec,
    field: &FieldSpec,
    value: &MavValue,
) -> Result<i128, EncodeError> {
    match value {
        MavValue::UInt8(v) => Ok(*v as i128),
        MavValue::UInt16(v) => Ok(*v as i128),
        MavValue::UInt32(v) => Ok(*v as i128),
        MavValue::UInt64(v) => Ok(*v as i128),
        MavValue::Int8(v) => Ok(*v as i128),
        MavValue::Int16(v) => Ok(*v as i128),
        MavValue::Int32(v) => Ok(*v as i128),
        MavValue::Int64(v) => Ok(*v as i128),
        MavValue::Enum(EnumValue::Raw(v)) => Ok(*v as i128),
        MavValue::Enum(EnumValue::Known(key)) => {
            let group = field
                .enum_group
                .as_deref()
                .and_then(|name| dialect.enum_group(name))
                .ok_or_else(|| out_of_range(spec, field, "symbolic value for a plain field"))?;
            group
                .value_for(key)
                .map(|v| v as i128)
                .ok_or_else(|| out_of_range(spec, field, &format!("unknown enum key {key:?}")))
        }
        MavValue::Bitmask(mask) => {
            if !field.bitmask {
                return Err(out_of_range(spec, field, "flag set for a non-bitmask field"));
            }
            let group = field
                .enum_group
                .as_deref()
                .and_then(|name| dialect.enum_group(name))
                .ok_or_else(|| out_of_range(spec, field, "flag set for a plain field"))?;
            let mut bits = mask.unknown_bits;
            for flag in &mask.flags {
                bits |= group
                    .value_for(flag)
                    .ok_or_else(|| out_of_range(spec, field, &format!("unknown flag {flag:?}")))?;
            }
            Ok(bits as i128)
        }
        _ => Err(out_of_range(spec, field, "expected an integer")),
    }
}

fn put_int(
    spec: &MessageSpec,
    field: &FieldSpec,
    mavtype: &MavType,
    v: i128,
    buf: &mut BytesMut<'_>,
) -> Result<(), EncodeError> {
    use MavType::*;
    let fits = match mavtype {
        UInt8 | Char => (0..=u8::MAX as i128).contains(&v),
        UInt16 => (0..=u16::MAX as i128).contains(&v),
        UInt32 => (0..=u32::MAX as i128).contains(&v),
        UInt64 => (0..=u64::MAX as i128).contains(&v),
        Int8 => (i8::MIN as i128..=i8::MAX as i128).contains(&v),
        Int16 => (i16::MIN as i128..=i16::MAX as i128).contains(&v),
        Int32 => (i32::MIN as i128..=i32::MAX as i128).contains(&v),
        Int64 => (i64::MIN as i128..=i64::MAX as i128).contains(&v),
        _ => false,
    };
    if !fits {
        return Err(out_of_range(
            spec,
            field,
            &format!("{v} does not fit {:?}", mavtype),
        ));
    }
    match mavtype {
        UInt8 | Char => buf.put_u8(v as u8),
        UInt16 => buf.put_u16_le(v as u16),
        UInt32 => buf.put_u32_le(v as u32),
        UInt64 => buf.put_u64_le(v as u64),
        Int8 => buf.put_i8(v as i8),
        Int16 => buf.put_i16_le(v as i16),
        Int32 => buf.put_i32_le(v as i32),
        Int64 => buf.put_i64_le(v as i64),
        _ => {}
    }
    Ok(())
}

fn out_of_range(spec: &MessageSpec, field: &FieldSpec, reason: &str) -> EncodeError {
    EncodeError::FieldOutOfRange {
        message: spec.name.clone(),
        field: field.name.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeroes_keep_one_byte() {
        assert_eq!(remove_trailing_zeroes(&[0, 0, 0]), 1);
        assert_eq!(remove_trailing_zeroes(&[1, 2, 0, 0]), 2);
        assert_eq!(remove_trailing_zeroes(&[1, 2, 3]), 3);
        assert_eq!(remove_trailing_zeroes(&[]), 0);
    }
}
