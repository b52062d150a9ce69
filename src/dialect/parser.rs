//! XML dialect parsing.
//!
//! Event-driven over `quick-xml`: a stack of open elements is validated
//! against the dialect schema, attributes and text are collected into raw
//! message/enum builders, and each message is finalized (wire order,
//! CRC_EXTRA) when its closing tag arrives.

use crc_any::CRCu16;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::DialectError;
use crate::types::MavType;

use super::{Dialect, FieldSpec, MessageSpec, RejectedMessage};

/// Largest message id the 24-bit MAVLink 2 id field can carry.
const MAX_MESSAGE_ID: u64 = 0x00FF_FFFF;

/// MAVLink caps messages at 64 fields.
const MAX_FIELD_COUNT: usize = 64;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum XmlElement {
    Mavlink,
    Version,
    Dialect,
    Include,
    Enums,
    Enum,
    Entry,
    Description,
    Param,
    Deprecated,
    Wip,
    Messages,
    Message,
    Field,
    Extensions,
}

impl XmlElement {
    fn name(self) -> &'static str {
        match self {
            Self::Mavlink => "mavlink",
            Self::Version => "version",
            Self::Dialect => "dialect",
            Self::Include => "include",
            Self::Enums => "enums",
            Self::Enum => "enum",
            Self::Entry => "entry",
            Self::Description => "description",
            Self::Param => "param",
            Self::Deprecated => "deprecated",
            Self::Wip => "wip",
            Self::Messages => "messages",
            Self::Message => "message",
            Self::Field => "field",
            Self::Extensions => "extensions",
        }
    }
}

fn identify_element(s: &[u8]) -> Option<XmlElement> {
    use self::XmlElement::*;
    match s {
        b"mavlink" => Some(Mavlink),
        b"version" => Some(Version),
        b"dialect" => Some(Dialect),
        b"include" => Some(Include),
        b"enums" => Some(Enums),
        b"enum" => Some(Enum),
        b"entry" => Some(Entry),
        b"description" => Some(Description),
        b"param" => Some(Param),
        b"deprecated" => Some(Deprecated),
        b"wip" => Some(Wip),
        b"messages" => Some(Messages),
        b"message" => Some(Message),
        b"field" => Some(Field),
        b"extensions" => Some(Extensions),
        _ => None,
    }
}

fn is_valid_parent(p: Option<XmlElement>, s: XmlElement) -> bool {
    use self::XmlElement::*;
    match s {
        Mavlink => p.is_none(),
        Version | Dialect | Include | Enums | Messages => p == Some(Mavlink),
        Enum => p == Some(Enums),
        Entry => p == Some(Enum),
        Description => matches!(p, Some(Enum | Entry | Message)),
        Param => p == Some(Entry),
        Deprecated | Wip => matches!(p, Some(Enum | Entry | Message)),
        Message => p == Some(Messages),
        Field => p == Some(Message),
        Extensions => p == Some(Message),
    }
}

#[derive(Default)]
struct RawField {
    name: String,
    typename: String,
    enum_group: Option<String>,
    description: Option<String>,
    is_extension: bool,
}

#[derive(Default)]
struct RawMessage {
    id: Option<u64>,
    name: String,
    fields: Vec<RawField>,
}

#[derive(Default)]
struct RawEnum {
    name: String,
    bitmask: bool,
    entries: Vec<(u64, String)>,
}

/// Parse one dialect document into the catalog under construction.
pub(super) fn parse_document(dialect: &mut Dialect, source: &str) -> Result<(), DialectError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut text: Option<String> = None;

    let mut message = RawMessage::default();
    let mut field = RawField::default();
    let mut mavenum = RawEnum::default();
    let mut entry_name: Option<String> = None;
    let mut entry_value: Option<u64> = None;
    let mut in_extensions = false;

    loop {
        match reader.read_event()? {
            Event::Start(bytes) => {
                let Some(id) = identify_element(bytes.name().into_inner()) else {
                    return Err(DialectError::UnexpectedElement {
                        element: String::from_utf8_lossy(bytes.name().into_inner()).into_owned(),
                        parent: stack.last().map_or("document root", |e| e.name()).into(),
                    });
                };
                if !is_valid_parent(stack.last().copied(), id) {
                    return Err(DialectError::UnexpectedElement {
                        element: id.name().into(),
                        parent: stack.last().map_or("document root", |e| e.name()).into(),
                    });
                }

                match id {
                    XmlElement::Message => {
                        message = RawMessage::default();
                        in_extensions = false;
                    }
                    XmlElement::Extensions => {
                        in_extensions = true;
                    }
                    XmlElement::Field => {
                        field = RawField {
                            is_extension: in_extensions,
                            ..Default::default()
                        };
                    }
                    XmlElement::Enum => {
                        mavenum = RawEnum::default();
                    }
                    XmlElement::Entry => {
                        entry_name = None;
                        entry_value = None;
                    }
                    _ => (),
                }

                for attr in bytes.attributes() {
                    let attr = attr.map_err(|err| DialectError::BadAttribute {
                        message: id.name().into(),
                        attribute: err.to_string(),
                    })?;
                    let key = attr.key.into_inner();
                    let value = String::from_utf8_lossy(&attr.value);
                    match id {
                        XmlElement::Enum => match key {
                            b"name" => mavenum.name = value.into_owned(),
                            b"bitmask" => mavenum.bitmask = value.as_ref() == "true",
                            _ => (),
                        },
                        XmlElement::Entry => match key {
                            b"name" => entry_name = Some(value.into_owned()),
                            b"value" => {
                                entry_value = parse_entry_value(&value);
                                if entry_value.is_none() {
                                    return Err(DialectError::BadAttribute {
                                        message: mavenum.name.clone(),
                                        attribute: format!("entry value {value:?}"),
                                    });
                                }
                            }
                            _ => (),
                        },
                        XmlElement::Message => match key {
                            b"name" => message.name = value.into_owned(),
                            b"id" => {
                                message.id = value.parse::<u64>().ok();
                                if message.id.is_none() {
                                    return Err(DialectError::BadAttribute {
                                        message: message.name.clone(),
                                        attribute: format!("id {value:?}"),
                                    });
                                }
                            }
                            _ => (),
                        },
                        XmlElement::Field => match key {
                            b"name" => field.name = value.into_owned(),
                            b"type" => field.typename = value.into_owned(),
                            b"enum" => field.enum_group = Some(value.into_owned()),
                            _ => (),
                        },
                        _ => (),
                    }
                }

                stack.push(id);
            }
            Event::Text(bytes) => {
                let s = String::from_utf8_lossy(&bytes).into_owned();
                text = Some(match text.take() {
                    Some(t) => t + &s,
                    None => s,
                });
            }
            Event::End(_) => {
                match stack.last() {
                    Some(XmlElement::Field) => {
                        field.description = text.take().map(|t| t.replace('\n', " "));
                        message.fields.push(std::mem::take(&mut field));
                    }
                    Some(XmlElement::Entry) => {
                        let name = entry_name.take().unwrap_or_default();
                        let Some(value) = entry_value.take() else {
                            return Err(DialectError::BadAttribute {
                                message: mavenum.name.clone(),
                                attribute: format!("entry {name:?} has no value"),
                            });
                        };
                        mavenum.entries.push((value, name));
                    }
                    Some(XmlElement::Message) => {
                        in_extensions = false;
                        finalize_message(dialect, std::mem::take(&mut message))?;
                    }
                    Some(XmlElement::Enum) => {
                        let raw = std::mem::take(&mut mavenum);
                        dialect.merge_enum(raw.name, raw.bitmask, raw.entries)?;
                    }
                    Some(XmlElement::Include) => {
                        return Err(DialectError::UnsupportedInclude(
                            text.take().unwrap_or_default(),
                        ));
                    }
                    Some(XmlElement::Version) => {
                        if dialect.version.is_none() {
                            dialect.version = text.as_deref().and_then(|t| t.trim().parse().ok());
                        }
                    }
                    Some(XmlElement::Dialect) => {
                        if dialect.dialect_number.is_none() {
                            dialect.dialect_number =
                                text.as_deref().and_then(|t| t.trim().parse().ok());
                        }
                    }
                    _ => (),
                }
                text = None;
                stack.pop();
            }
            Event::Eof => break,
            // declarations, comments, CDATA, processing instructions
            _ => (),
        }
    }

    if let Some(open) = stack.last() {
        return Err(DialectError::UnclosedElement(open.name().into()));
    }

    Ok(())
}

/// Entry values may be decimal or `0x`-prefixed hexadecimal.
fn parse_entry_value(value: &str) -> Option<u64> {
    let (src, radix) = value
        .strip_prefix("0x")
        .map_or((value, 10), |stripped| (stripped, 16));
    u64::from_str_radix(src, radix).ok()
}

/// Resolve field types, compute the wire order and CRC_EXTRA, and add the
/// message to the catalog. A message the dialect schema allows but this
/// codec cannot carry is recorded as rejected; loading continues.
fn finalize_message(dialect: &mut Dialect, raw: RawMessage) -> Result<(), DialectError> {
    let Some(id) = raw.id else {
        return Err(DialectError::BadAttribute {
            message: raw.name,
            attribute: "id".into(),
        });
    };
    if raw.name.is_empty() {
        return Err(DialectError::BadAttribute {
            message: format!("(id {id})"),
            attribute: "name".into(),
        });
    }
    if id > MAX_MESSAGE_ID {
        return Err(DialectError::MessageIdOutOfRange {
            message: raw.name,
            id,
        });
    }
    let id = id as u32;

    if let Err(reason) = validate_fields(&raw) {
        log::warn!("rejecting message {} (id {id}): {reason}", raw.name);
        dialect.rejected.push(RejectedMessage {
            name: raw.name,
            id,
            reason,
        });
        return Ok(());
    }

    let fields: Vec<FieldSpec> = raw
        .fields
        .into_iter()
        .map(|f| {
            FieldSpec {
                // checked by validate_fields
                mavtype: MavType::parse_wire_name(&f.typename).unwrap_or_default(),
                name: f.name,
                enum_group: f.enum_group,
                bitmask: false,
                description: f.description,
                is_extension: f.is_extension,
            }
        })
        .collect();

    // Wire order: core fields stably sorted by descending element width,
    // extension fields appended in declaration order, unsorted.
    let mut wire_order: Vec<usize> = (0..fields.len())
        .filter(|&i| !fields[i].is_extension)
        .collect();
    wire_order.sort_by_key(|&i| std::cmp::Reverse(fields[i].mavtype.order_len()));
    wire_order.extend((0..fields.len()).filter(|&i| fields[i].is_extension));

    let crc_extra = extra_crc(
        &raw.name,
        wire_order
            .iter()
            .map(|&i| &fields[i])
            .filter(|f| !f.is_extension),
    );

    let payload_len = fields
        .iter()
        .filter(|f| !f.is_extension)
        .map(|f| f.mavtype.wire_len())
        .sum();
    let max_payload_len = fields.iter().map(|f| f.mavtype.wire_len()).sum();
    let has_extensions = fields.iter().any(|f| f.is_extension);

    dialect.add_message(MessageSpec {
        id,
        name: raw.name,
        fields,
        wire_order,
        crc_extra,
        has_extensions,
        payload_len,
        max_payload_len,
    })
}

fn validate_fields(raw: &RawMessage) -> Result<(), String> {
    if raw.fields.is_empty() {
        return Err("message has no fields".into());
    }
    if raw.fields.len() > MAX_FIELD_COUNT {
        return Err(format!(
            "message has {} fields, more than the {MAX_FIELD_COUNT} MAVLink allows",
            raw.fields.len()
        ));
    }
    for (i, field) in raw.fields.iter().enumerate() {
        if field.name.is_empty() {
            return Err(format!("field {i} has no name"));
        }
        if MavType::parse_wire_name(&field.typename).is_none() {
            return Err(format!(
                "field {:?} has unknown wire type {:?}",
                field.name, field.typename
            ));
        }
        if raw.fields[..i].iter().any(|f| f.name == field.name) {
            return Err(format!("duplicate field name {:?}", field.name));
        }
    }
    Ok(())
}

/// The per-message CRC_EXTRA seed: an 8-bit checksum of the message name and
/// the wire-ordered core field layout, so dialect skew between peers shows
/// up as checksum failures. Extension fields are excluded.
fn extra_crc<'a>(name: &str, core_wire_fields: impl Iterator<Item = &'a FieldSpec>) -> u8 {
    let mut crc = CRCu16::crc16mcrf4cc();

    crc.digest(name.as_bytes());
    crc.digest(b" ");

    for field in core_wire_fields {
        crc.digest(field.mavtype.wire_name().as_bytes());
        crc.digest(b" ");
        crc.digest(field.name.as_bytes());
        crc.digest(b" ");
        if let MavType::Array(_, size) | MavType::CharArray(size) = &field.mavtype {
            crc.digest(&[*size as u8]);
        }
    }

    let crcval = crc.get_crc();
    ((crcval & 0xFF) ^ (crcval >> 8)) as u8
}
