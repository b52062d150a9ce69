//! Error types.
//!
//! [`DialectError`] is fatal: catalog construction aborts. [`EncodeError`]
//! and [`FrameError`] are recoverable at the channel level; the channel
//! stays usable after reporting them.

use thiserror::Error;

use crate::MavlinkVersion;

/// Fatal failure while building a dialect catalog.
#[derive(Error, Debug)]
pub enum DialectError {
    /// The XML could not be parsed at all.
    #[error("malformed dialect XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An element appeared somewhere the dialect schema does not allow it.
    #[error("unexpected element <{element}> under <{parent}>")]
    UnexpectedElement { element: String, parent: String },
    /// The document ended with elements still open.
    #[error("dialect XML ended with <{0}> unclosed")]
    UnclosedElement(String),
    /// `<include>` is not supported; pass included documents explicitly,
    /// in order.
    #[error("<include> of {0:?} is not supported; pass the included document as a separate source")]
    UnsupportedInclude(String),
    /// A required attribute was missing or unparseable.
    #[error("message {message:?}: bad or missing attribute {attribute:?}")]
    BadAttribute { message: String, attribute: String },
    /// Two loaded documents define the same message id.
    #[error("message id {id} defined twice: {first:?} and {second:?}")]
    DuplicateMessageId { id: u32, first: String, second: String },
    /// Two loaded documents define the same message name.
    #[error("message {0:?} defined twice with different ids")]
    DuplicateMessageName(String),
    /// A merged enum group ended up with two entries on the same value or key.
    #[error("enum {group:?}: duplicate entry {entry:?}")]
    DuplicateEnumEntry { group: String, entry: String },
    /// A field references an enum group no loaded document defines.
    #[error("message {message:?} field {field:?}: unknown enum group {group:?}")]
    UnknownEnumGroup {
        message: String,
        field: String,
        group: String,
    },
    /// A bitmask enum has entries that cannot fit the field carrying it.
    #[error("message {message:?} field {field:?}: enum {group:?} entry {entry:?} does not fit the field type")]
    EnumEntryOverflow {
        message: String,
        field: String,
        group: String,
        entry: String,
    },
    /// A message id fell outside the 24-bit range.
    #[error("message {message:?}: id {id} exceeds 24 bits")]
    MessageIdOutOfRange { message: String, id: u64 },
}

/// Failure to encode an application-supplied message record.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The id or name is not in the catalog.
    #[error("unknown message {0:?}")]
    UnknownMessage(String),
    /// The message cannot be represented under the effective protocol
    /// version.
    #[error("message {message:?} cannot be encoded under {version:?}")]
    BadProtocol {
        message: String,
        version: MavlinkVersion,
    },
    /// Once a channel speaks MAVLink 2 it must not go back.
    #[error("a MAVLink 2 channel cannot be downgraded to MAVLink 1")]
    Downgrade,
    /// A supplied field name is not part of the message.
    #[error("message {message:?} has no field {field:?}")]
    FieldUnknown { message: String, field: String },
    /// A supplied value does not fit the field's wire type, or names an
    /// enum key / bitmask flag the group does not define.
    #[error("message {message:?} field {field:?}: value out of range: {reason}")]
    FieldOutOfRange {
        message: String,
        field: String,
        reason: String,
    },
    /// The payload does not fit a frame's 255-byte length field.
    #[error("message {message:?}: payload of {len} bytes exceeds the maximum of {max}")]
    Overflow {
        message: String,
        len: usize,
        max: usize,
    },
}

/// A malformed or unverifiable frame on the inbound byte stream.
///
/// The decoder reports these and returns to idle; the stream keeps flowing.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Frame checksum did not match.
    #[error("bad checksum for message id {id}: expected {expected:#06x}, found {found:#06x}")]
    BadChecksum { id: u32, expected: u16, found: u16 },
    /// A MAVLink 1 frame's length disagreed with the dialect's layout.
    #[error("bad length for message {message:?}: declared {expected} bytes, received {got}")]
    BadLength {
        message: String,
        expected: usize,
        got: usize,
    },
    /// Signature verification failed and the accept predicate rejected
    /// the frame.
    #[error("bad signature on frame from system {system_id} component {component_id} link {link_id}")]
    BadSignature {
        system_id: u8,
        component_id: u8,
        link_id: u8,
    },
    /// Message id is not in the catalog.
    #[error("unknown message with id {id}")]
    UnknownMessage { id: u32 },
    /// Payload bytes ran out mid-field. Cannot happen for catalog-validated
    /// layouts; kept so decoding never panics.
    #[error("payload truncated mid-field: {0}")]
    Payload(#[from] std::io::Error),
}
