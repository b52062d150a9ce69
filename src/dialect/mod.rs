//! The dialect catalog.
//!
//! A [`Dialect`] is built once from one or more XML documents and is
//! immutable afterwards; share it between channels with
//! [`Arc`](std::sync::Arc). Later documents extend earlier ones: new
//! messages are added, enum groups with the same name merge their entries.
//! A collision on message id, message name or enum entry aborts loading.

use std::collections::BTreeMap;

use crate::error::DialectError;
use crate::types::MavType;
use crate::value::MavValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod parser;

/// One field of a message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSpec {
    pub name: String,
    pub mavtype: MavType,
    /// The enum group named by the field's `enum` attribute, if any.
    pub enum_group: Option<String>,
    /// True when `enum_group` names a bitmask group. Resolved after all
    /// documents are merged.
    pub bitmask: bool,
    pub description: Option<String>,
    /// True for fields declared after the `<extensions/>` marker.
    pub is_extension: bool,
}

/// One message of the dialect.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageSpec {
    pub id: u32,
    pub name: String,
    /// Fields in declaration order.
    fields: Vec<FieldSpec>,
    /// Indices into `fields` in wire order: core fields stably sorted by
    /// descending element width, then extension fields in declaration order.
    wire_order: Vec<usize>,
    /// The 8-bit seed folded into this message's frame checksums.
    pub crc_extra: u8,
    pub has_extensions: bool,
    /// Payload length of the core fields; a MAVLink 1 frame carries exactly
    /// this many payload bytes.
    pub payload_len: usize,
    /// Payload length including extensions; a MAVLink 2 frame carries at
    /// most this many.
    pub max_payload_len: usize,
}

impl MessageSpec {
    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Fields in wire order.
    pub fn wire_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.wire_order.iter().map(|&i| &self.fields[i])
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A record with every field set to its type's zero/empty value.
    pub fn default_record(&self) -> BTreeMap<String, MavValue> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.mavtype.default_value()))
            .collect()
    }
}

/// One enum group: a value ↔ key mapping, optionally a bitmask.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumSpec {
    pub name: String,
    pub bitmask: bool,
    by_value: BTreeMap<u64, String>,
    by_key: BTreeMap<String, u64>,
}

impl EnumSpec {
    pub fn key_for(&self, value: u64) -> Option<&str> {
        self.by_value.get(&value).map(String::as_str)
    }

    pub fn value_for(&self, key: &str) -> Option<u64> {
        self.by_key.get(key).copied()
    }

    /// Entries in ascending value order.
    pub fn entries(&self) -> impl Iterator<Item = (u64, &str)> {
        self.by_value.iter().map(|(&v, k)| (v, k.as_str()))
    }

    fn insert(&mut self, value: u64, key: String) -> Result<(), DialectError> {
        if self.by_value.contains_key(&value) || self.by_key.contains_key(&key) {
            return Err(DialectError::DuplicateEnumEntry {
                group: self.name.clone(),
                entry: key,
            });
        }
        self.by_value.insert(value, key.clone());
        self.by_key.insert(key, value);
        Ok(())
    }
}

/// A message the loader refused, and why. Loading continues past these.
#[derive(Debug, Clone)]
pub struct RejectedMessage {
    pub name: String,
    pub id: u32,
    pub reason: String,
}

/// An immutable catalog of message and enum specifications.
#[derive(Debug, Default)]
pub struct Dialect {
    messages: BTreeMap<u32, MessageSpec>,
    by_name: BTreeMap<String, u32>,
    enums: BTreeMap<String, EnumSpec>,
    version: Option<u8>,
    dialect_number: Option<u8>,
    rejected: Vec<RejectedMessage>,
}

impl Dialect {
    /// Build a catalog from an ordered sequence of dialect documents.
    pub fn from_sources(sources: &[&str]) -> Result<Self, DialectError> {
        let mut dialect = Self::default();
        for source in sources {
            parser::parse_document(&mut dialect, source)?;
        }
        dialect.resolve_enum_references()?;
        Ok(dialect)
    }

    /// Build a catalog from a single dialect document.
    pub fn from_source(source: &str) -> Result<Self, DialectError> {
        Self::from_sources(&[source])
    }

    pub fn message_by_id(&self, id: u32) -> Option<&MessageSpec> {
        self.messages.get(&id)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&MessageSpec> {
        self.by_name.get(name).and_then(|id| self.messages.get(id))
    }

    pub fn enum_group(&self, name: &str) -> Option<&EnumSpec> {
        self.enums.get(name)
    }

    /// All messages, ascending by id.
    pub fn messages(&self) -> impl Iterator<Item = &MessageSpec> {
        self.messages.values()
    }

    /// Messages the loader refused.
    pub fn rejected(&self) -> &[RejectedMessage] {
        &self.rejected
    }

    /// The `<version>` element of the first document that carried one.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    /// The `<dialect>` element of the first document that carried one.
    pub fn dialect_number(&self) -> Option<u8> {
        self.dialect_number
    }

    fn add_message(&mut self, message: MessageSpec) -> Result<(), DialectError> {
        if let Some(existing) = self.messages.get(&message.id) {
            return Err(DialectError::DuplicateMessageId {
                id: message.id,
                first: existing.name.clone(),
                second: message.name,
            });
        }
        if self.by_name.contains_key(&message.name) {
            return Err(DialectError::DuplicateMessageName(message.name));
        }
        self.by_name.insert(message.name.clone(), message.id);
        self.messages.insert(message.id, message);
        Ok(())
    }

    fn merge_enum(
        &mut self,
        name: String,
        bitmask: bool,
        entries: Vec<(u64, String)>,
    ) -> Result<(), DialectError> {
        let group = self.enums.entry(name.clone()).or_insert_with(|| EnumSpec {
            name,
            bitmask: false,
            by_value: BTreeMap::new(),
            by_key: BTreeMap::new(),
        });
        group.bitmask |= bitmask;
        for (value, key) in entries {
            group.insert(value, key)?;
        }
        Ok(())
    }

    /// Validate enum references and resolve per-field bitmask flags once all
    /// documents are in (a field may reference a group a later document
    /// defines).
    fn resolve_enum_references(&mut self) -> Result<(), DialectError> {
        for message in self.messages.values_mut() {
            for field in &mut message.fields {
                let Some(group_name) = &field.enum_group else {
                    continue;
                };
                let Some(group) = self.enums.get(group_name) else {
                    return Err(DialectError::UnknownEnumGroup {
                        message: message.name.clone(),
                        field: field.name.clone(),
                        group: group_name.clone(),
                    });
                };
                field.bitmask = group.bitmask;
                if group.bitmask {
                    // every flag must fit the field carrying the mask
                    let max = field.mavtype.max_int_value();
                    for (value, key) in group.entries() {
                        if value > max {
                            return Err(DialectError::EnumEntryOverflow {
                                message: message.name.clone(),
                                field: field.name.clone(),
                                group: group_name.clone(),
                                entry: key.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
