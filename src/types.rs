//! Primitive wire types.
//!
//! Every dialect field carries one of these. The type decides the encoded
//! width, the position in the wire-order sort, and the name hashed into the
//! message's CRC_EXTRA seed.

use crate::value::MavValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A MAVLink primitive wire type.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MavType {
    #[default]
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Char,
    Float,
    Double,
    /// `char[N]`: a fixed-length text field, NUL-padded on the wire.
    CharArray(usize),
    /// `T[N]`: a fixed-length vector of a scalar primitive.
    Array(Box<Self>, usize),
}

impl MavType {
    /// Parse a dialect `type` attribute (`uint8_t`, `float`, `char[16]`,
    /// `uint16_t[4]`, ...). Returns `None` for names outside the closed set.
    pub fn parse_wire_name(s: &str) -> Option<Self> {
        use self::MavType::*;
        match s {
            // wire-identical alias used by HEARTBEAT's version field
            "uint8_t_mavlink_version" => Some(UInt8),
            "uint8_t" => Some(UInt8),
            "uint16_t" => Some(UInt16),
            "uint32_t" => Some(UInt32),
            "uint64_t" => Some(UInt64),
            "int8_t" => Some(Int8),
            "int16_t" => Some(Int16),
            "int32_t" => Some(Int32),
            "int64_t" => Some(Int64),
            "char" => Some(Char),
            "float" => Some(Float),
            "double" => Some(Double),
            _ if s.starts_with("char[") && s.ends_with(']') => {
                let size = s[5..s.len() - 1].parse::<usize>().ok()?;
                Some(CharArray(size))
            }
            _ if s.ends_with(']') => {
                let start = s.find('[')?;
                let size = s[start + 1..s.len() - 1].parse::<usize>().ok()?;
                match Self::parse_wire_name(&s[..start])? {
                    // no nested arrays
                    Array(_, _) | CharArray(_) => None,
                    mtype => Some(Array(Box::new(mtype), size)),
                }
            }
            _ => None,
        }
    }

    /// Encoded width in bytes.
    pub fn wire_len(&self) -> usize {
        use self::MavType::*;
        match self {
            UInt8 | Int8 | Char => 1,
            UInt16 | Int16 => 2,
            UInt32 | Int32 | Float => 4,
            UInt64 | Int64 | Double => 8,
            CharArray(size) => *size,
            Array(t, size) => t.wire_len() * size,
        }
    }

    /// Sort key for wire ordering: element width, not total width.
    pub fn order_len(&self) -> usize {
        use self::MavType::*;
        match self {
            CharArray(_) => 1,
            Array(t, _) => t.order_len(),
            _ => self.wire_len(),
        }
    }

    /// The C-style type name fed into the CRC_EXTRA seed.
    pub fn wire_name(&self) -> &'static str {
        use self::MavType::*;
        match self {
            UInt8 => "uint8_t",
            Int8 => "int8_t",
            Char | CharArray(_) => "char",
            UInt16 => "uint16_t",
            Int16 => "int16_t",
            UInt32 => "uint32_t",
            Int32 => "int32_t",
            Float => "float",
            UInt64 => "uint64_t",
            Int64 => "int64_t",
            Double => "double",
            Array(t, _) => t.wire_name(),
        }
    }

    /// Number of elements: 1 for scalars, `N` for `T[N]` and `char[N]`.
    pub fn array_len(&self) -> usize {
        use self::MavType::*;
        match self {
            CharArray(size) | Array(_, size) => *size,
            _ => 1,
        }
    }

    /// Largest integer a field of this type can hold. Floats cap at the
    /// largest precisely representable integer.
    pub fn max_int_value(&self) -> u64 {
        use self::MavType::*;
        match self {
            UInt8 => u8::MAX as u64,
            UInt16 => u16::MAX as u64,
            UInt32 => u32::MAX as u64,
            UInt64 => u64::MAX,
            Int8 | Char | CharArray(_) => i8::MAX as u64,
            Int16 => i16::MAX as u64,
            Int32 => i32::MAX as u64,
            Int64 => i64::MAX as u64,
            Float => (1 << f32::MANTISSA_DIGITS) - 1,
            Double => (1 << f64::MANTISSA_DIGITS) - 1,
            Array(t, _) => t.max_int_value(),
        }
    }

    /// The zero/empty value of this type, used for absent fields and for
    /// generating test records.
    pub fn default_value(&self) -> MavValue {
        use self::MavType::*;
        match self {
            UInt8 | Char => MavValue::UInt8(0),
            Int8 => MavValue::Int8(0),
            UInt16 => MavValue::UInt16(0),
            Int16 => MavValue::Int16(0),
            UInt32 => MavValue::UInt32(0),
            Int32 => MavValue::Int32(0),
            UInt64 => MavValue::UInt64(0),
            Int64 => MavValue::Int64(0),
            Float => MavValue::Float(0.0),
            Double => MavValue::Double(0.0),
            CharArray(_) => MavValue::String(String::new()),
            Array(t, size) => MavValue::Array(vec![t.default_value(); *size]),
        }
    }
}
