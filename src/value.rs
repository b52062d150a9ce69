//! Runtime field values.
//!
//! Messages are open records: the encoder takes a map of field name to
//! [`MavValue`], the decoder produces one. Enum-typed fields keep the
//! symbolic/numeric duality on both sides, so `"MAV_STATE_ACTIVE"` and `4`
//! are interchangeable on input and decoded values stay readable without
//! the caller holding the enum tables.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
pub enum MavValue {
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    /// A `char[N]` field. Decoded values have trailing NULs trimmed;
    /// encoded values are NUL-padded to the field length.
    String(String),
    /// A `T[N]` field; elements are the scalar variant of `T`.
    Array(Vec<MavValue>),
    /// A value of an enum-typed field.
    Enum(EnumValue),
    /// A value of a bitmask-typed field.
    Bitmask(BitmaskValue),
}

/// An enum-typed value: symbolic when the group knows it, numeric otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
pub enum EnumValue {
    /// A key defined by the field's enum group.
    Known(String),
    /// A wire value the group has no key for.
    Raw(u64),
}

/// A bitmask-typed value decomposed into known flags plus whatever bits
/// were left over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitmaskValue {
    /// Flags the enum group defines, in ascending bit order.
    pub flags: Vec<String>,
    /// Set bits no flag covers; zero when the mask decomposed fully.
    pub unknown_bits: u64,
}

impl BitmaskValue {
    /// A mask built from symbolic flags only.
    pub fn from_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            unknown_bits: 0,
        }
    }
}

impl MavValue {
    /// The value as a non-negative integer, if it is one. Signed variants
    /// only convert when they are not negative; enum and bitmask values do
    /// not convert here because resolving them needs the enum group.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::UInt8(v) => Some(v as u64),
            Self::UInt16(v) => Some(v as u64),
            Self::UInt32(v) => Some(v as u64),
            Self::UInt64(v) => Some(v),
            Self::Int8(v) => u64::try_from(v).ok(),
            Self::Int16(v) => u64::try_from(v).ok(),
            Self::Int32(v) => u64::try_from(v).ok(),
            Self::Int64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// The value as a signed integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::UInt8(v) => Some(v as i64),
            Self::UInt16(v) => Some(v as i64),
            Self::UInt32(v) => Some(v as i64),
            Self::UInt64(v) => i64::try_from(v).ok(),
            Self::Int8(v) => Some(v as i64),
            Self::Int16(v) => Some(v as i64),
            Self::Int32(v) => Some(v as i64),
            Self::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// The value as a float, widening integers and `f32` losslessly.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            Self::UInt64(v) => Some(v as f64),
            Self::Int64(v) => Some(v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }
}

impl From<&str> for MavValue {
    fn from(key: &str) -> Self {
        Self::Enum(EnumValue::Known(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widening() {
        assert_eq!(MavValue::UInt8(7).as_u64(), Some(7));
        assert_eq!(MavValue::Int32(-1).as_u64(), None);
        assert_eq!(MavValue::Int32(-1).as_i64(), Some(-1));
        assert_eq!(MavValue::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(MavValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(MavValue::String("x".into()).as_u64(), None);
    }

    #[test]
    fn symbolic_shorthand() {
        let v: MavValue = "MAV_STATE_ACTIVE".into();
        assert_eq!(v, MavValue::Enum(EnumValue::Known("MAV_STATE_ACTIVE".into())));
    }
}
