//! Stream decoding.
//!
//! [`Decoder`] is a byte-at-a-time state machine over an interleaved stream
//! of MAVLink 1 and MAVLink 2 frames. Partial frames persist across calls,
//! so a caller can feed whatever a transport hands it and resume later;
//! frames are emitted atomically once fully validated.
//!
//! Resynchronization: a start marker can occur anywhere inside garbage or a
//! torn frame. When a candidate frame fails before its framing is proven
//! (checksum mismatch, an unknown message id with no CRC_EXTRA to check
//! against, or a MAVLink 1 header whose length disagrees with the dialect),
//! every byte collected after the start marker is replayed through the
//! machine, so a genuine frame hiding inside a false one is never lost.
//! Only a bad signature discards without replay: by the time the trailer is
//! checked the checksum has already validated, so the framing was genuine.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::buf::Bytes;
use crate::dialect::{Dialect, EnumSpec, FieldSpec, MessageSpec};
use crate::error::FrameError;
use crate::frame::MavlinkV2FrameRaw;
use crate::signing::{SignatureVerdict, SigningConfig, VerifyState};
use crate::types::MavType;
use crate::value::{BitmaskValue, EnumValue, MavValue};
use crate::{calculate_crc, MavlinkVersion, MAV_STX, MAV_STX_V2, MAX_FRAME_SIZE};

#[cfg(feature = "serde")]
use serde::Serialize;

/// A fully decoded and validated frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DecodedFrame {
    pub message_id: u32,
    pub message_name: String,
    /// Every field of the message, keyed by name. Fields a truncated
    /// MAVLink 2 payload did not carry are present with zero values.
    pub fields: BTreeMap<String, MavValue>,
    /// The framing version this frame arrived under.
    pub protocol: MavlinkVersion,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    /// Link id of the signature trailer; `None` for unsigned frames.
    pub link_id: Option<u8>,
    /// `Some(true)` when the signature verified, `Some(false)` when it did
    /// not but the accept predicate let the frame through, `None` unsigned.
    pub signature_valid: Option<bool>,
}

/// One decoder output: a frame or a frame-level error.
#[derive(Debug)]
pub enum DecoderEvent {
    Decoded(DecodedFrame),
    Error(FrameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Hunting for a start marker.
    Idle,
    /// Expecting the payload length byte.
    Len,
    /// Expecting the MAVLink 2 incompatibility flags.
    IncompatFlags,
    /// Expecting the MAVLink 2 compatibility flags.
    CompatFlags,
    /// Collecting sequence, system id, component id and message id.
    Header,
    /// Collecting `len` payload bytes.
    Payload,
    ChecksumLo,
    ChecksumHi,
    /// Collecting the 13-byte signature trailer.
    Signature,
}

/// Byte-stream decoder for one channel.
pub struct Decoder {
    dialect: Arc<Dialect>,
    verify: Option<VerifyState>,
    state: DecoderState,
    version: MavlinkVersion,
    buf: [u8; MAX_FRAME_SIZE],
    len: usize,
    payload_len: usize,
    signed: bool,
}

impl Decoder {
    pub fn new(dialect: Arc<Dialect>) -> Self {
        Self {
            dialect,
            verify: None,
            state: DecoderState::Idle,
            version: MavlinkVersion::V1,
            buf: [0; MAX_FRAME_SIZE],
            len: 0,
            payload_len: 0,
            signed: false,
        }
    }

    /// A decoder that verifies signature trailers. Without signing, signed
    /// frames are discarded as `bad-signature`.
    pub fn with_signing(dialect: Arc<Dialect>, config: SigningConfig) -> Self {
        let mut decoder = Self::new(dialect);
        decoder.set_signing(config);
        decoder
    }

    /// Install or replace the signing configuration. Per-stream timestamp
    /// history starts over for the new key.
    pub fn set_signing(&mut self, config: SigningConfig) {
        self.verify = Some(VerifyState::new(config));
    }

    /// Run bytes through the state machine, returning the decoded frames
    /// and frame errors they completed, in stream order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecoderEvent> {
        let mut events = Vec::new();
        let mut queue: VecDeque<u8> = bytes.iter().copied().collect();
        while let Some(byte) = queue.pop_front() {
            if let Some(replay) = self.step(byte, &mut events) {
                for byte in replay.into_iter().rev() {
                    queue.push_front(byte);
                }
            }
        }
        events
    }

    /// Feed a single byte.
    pub fn push_byte(&mut self, byte: u8) -> Vec<DecoderEvent> {
        self.feed(&[byte])
    }

    /// True while a partial frame is buffered.
    pub fn mid_frame(&self) -> bool {
        self.state != DecoderState::Idle
    }

    /// Advance the machine by one byte. Returns bytes to replay when a
    /// candidate frame collapsed.
    fn step(&mut self, byte: u8, events: &mut Vec<DecoderEvent>) -> Option<Vec<u8>> {
        match self.state {
            DecoderState::Idle => {
                match byte {
                    MAV_STX => self.begin(MavlinkVersion::V1, byte),
                    MAV_STX_V2 => self.begin(MavlinkVersion::V2, byte),
                    // garbage between frames
                    _ => {}
                }
                None
            }
            DecoderState::Len => {
                self.push(byte);
                self.payload_len = byte as usize;
                self.state = match self.version {
                    MavlinkVersion::V1 => DecoderState::Header,
                    MavlinkVersion::V2 => DecoderState::IncompatFlags,
                };
                None
            }
            DecoderState::IncompatFlags => {
                self.push(byte);
                self.signed = byte & crate::MAVLINK_IFLAG_SIGNED != 0;
                self.state = DecoderState::CompatFlags;
                None
            }
            DecoderState::CompatFlags => {
                self.push(byte);
                self.state = DecoderState::Header;
                None
            }
            DecoderState::Header => {
                self.push(byte);
                if self.len == self.header_total() {
                    return self.on_header_complete(events);
                }
                None
            }
            DecoderState::Payload => {
                self.push(byte);
                if self.len == self.header_total() + self.payload_len {
                    self.state = DecoderState::ChecksumLo;
                }
                None
            }
            DecoderState::ChecksumLo => {
                self.push(byte);
                self.state = DecoderState::ChecksumHi;
                None
            }
            DecoderState::ChecksumHi => {
                self.push(byte);
                self.on_checksum_complete(events)
            }
            DecoderState::Signature => {
                self.push(byte);
                let full =
                    self.header_total() + self.payload_len + 2 + MavlinkV2FrameRaw::SIGNATURE_SIZE;
                if self.len == full {
                    self.on_signature_complete(events);
                }
                None
            }
        }
    }

    fn begin(&mut self, version: MavlinkVersion, stx: u8) {
        self.version = version;
        self.signed = false;
        self.payload_len = 0;
        self.len = 0;
        self.push(stx);
        self.state = DecoderState::Len;
    }

    fn push(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
    }

    /// Start marker plus header bytes for the current framing version.
    fn header_total(&self) -> usize {
        match self.version {
            MavlinkVersion::V1 => 1 + 5,
            MavlinkVersion::V2 => 1 + MavlinkV2FrameRaw::HEADER_SIZE,
        }
    }

    fn message_id(&self) -> u32 {
        match self.version {
            MavlinkVersion::V1 => self.buf[5] as u32,
            MavlinkVersion::V2 => u32::from_le_bytes([self.buf[7], self.buf[8], self.buf[9], 0]),
        }
    }

    fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.len = 0;
    }

    /// Drop the frame, handing back everything after the start marker for
    /// re-examination.
    fn reset_with_replay(&mut self) -> Option<Vec<u8>> {
        let replay = self.buf[1..self.len].to_vec();
        self.reset();
        Some(replay)
    }

    fn on_header_complete(&mut self, events: &mut Vec<DecoderEvent>) -> Option<Vec<u8>> {
        let id = self.message_id();
        let dialect = Arc::clone(&self.dialect);
        let Some(spec) = dialect.message_by_id(id) else {
            events.push(DecoderEvent::Error(FrameError::UnknownMessage { id }));
            return self.reset_with_replay();
        };

        // a MAVLink 1 frame always carries the full declared payload
        if self.version == MavlinkVersion::V1 && self.payload_len != spec.payload_len {
            events.push(DecoderEvent::Error(FrameError::BadLength {
                message: spec.name.clone(),
                expected: spec.payload_len,
                got: self.payload_len,
            }));
            return self.reset_with_replay();
        }

        self.state = if self.payload_len == 0 {
            DecoderState::ChecksumLo
        } else {
            DecoderState::Payload
        };
        None
    }

    fn on_checksum_complete(&mut self, events: &mut Vec<DecoderEvent>) -> Option<Vec<u8>> {
        let id = self.message_id();
        let dialect = Arc::clone(&self.dialect);
        let Some(spec) = dialect.message_by_id(id) else {
            // id was in the catalog at header time; catalog is immutable
            events.push(DecoderEvent::Error(FrameError::UnknownMessage { id }));
            return self.reset_with_replay();
        };

        let payload_end = self.header_total() + self.payload_len;
        let expected = calculate_crc(&self.buf[1..payload_end], spec.crc_extra);
        let found = u16::from_le_bytes([self.buf[payload_end], self.buf[payload_end + 1]]);
        if expected != found {
            log::debug!(
                "bad checksum for message id {id}, re-examining {} bytes",
                self.len - 1
            );
            events.push(DecoderEvent::Error(FrameError::BadChecksum {
                id,
                expected,
                found,
            }));
            return self.reset_with_replay();
        }

        if self.version == MavlinkVersion::V2 && self.signed {
            self.state = DecoderState::Signature;
            return None;
        }
        self.finish_frame(&dialect, spec, None, events);
        None
    }

    fn on_signature_complete(&mut self, events: &mut Vec<DecoderEvent>) {
        let id = self.message_id();
        let dialect = Arc::clone(&self.dialect);
        let Some(spec) = dialect.message_by_id(id) else {
            events.push(DecoderEvent::Error(FrameError::UnknownMessage { id }));
            self.reset();
            return;
        };

        let frame = MavlinkV2FrameRaw::from_slice(&self.buf[..self.len]);
        let verdict = match &mut self.verify {
            Some(verify) => verify.verify_frame(&frame),
            // signed traffic with no signing configured cannot be verified
            None => SignatureVerdict::Rejected,
        };
        match verdict {
            SignatureVerdict::Valid => {
                self.finish_frame(&dialect, spec, Some((frame.signature_link_id(), true)), events);
            }
            SignatureVerdict::AcceptedInvalid => {
                self.finish_frame(
                    &dialect,
                    spec,
                    Some((frame.signature_link_id(), false)),
                    events,
                );
            }
            SignatureVerdict::Rejected => {
                events.push(DecoderEvent::Error(FrameError::BadSignature {
                    system_id: frame.system_id(),
                    component_id: frame.component_id(),
                    link_id: frame.signature_link_id(),
                }));
                self.reset();
            }
        }
    }

    fn finish_frame(
        &mut self,
        dialect: &Dialect,
        spec: &MessageSpec,
        signature: Option<(u8, bool)>,
        events: &mut Vec<DecoderEvent>,
    ) {
        let start = self.header_total();
        // an overlong MAVLink 2 payload (newer peer dialect) is cut at our
        // declared maximum; the checksum already covered the received bytes
        let take = self.payload_len.min(spec.max_payload_len);
        let payload = &self.buf[start..start + take];

        let (sequence, system_id, component_id) = match self.version {
            MavlinkVersion::V1 => (self.buf[2], self.buf[3], self.buf[4]),
            MavlinkVersion::V2 => (self.buf[4], self.buf[5], self.buf[6]),
        };

        match decode_payload(dialect, spec, payload) {
            Ok(fields) => events.push(DecoderEvent::Decoded(DecodedFrame {
                message_id: spec.id,
                message_name: spec.name.clone(),
                fields,
                protocol: self.version,
                sequence,
                system_id,
                component_id,
                link_id: signature.map(|(link_id, _)| link_id),
                signature_valid: signature.map(|(_, valid)| valid),
            })),
            Err(err) => events.push(DecoderEvent::Error(err)),
        }
        self.reset();
    }
}

/// Decode a payload into a field map. Short MAVLink 2 payloads are
/// zero-extended to the declared maximum before reading.
fn decode_payload(
    dialect: &Dialect,
    spec: &MessageSpec,
    payload: &[u8],
) -> Result<BTreeMap<String, MavValue>, FrameError> {
    let mut padded = vec![0u8; spec.max_payload_len];
    padded[..payload.len()].copy_from_slice(payload);
    let mut buf = Bytes::new(&padded);

    let mut fields = BTreeMap::new();
    for field in spec.wire_fields() {
        let value = read_field(dialect, field, &mut buf)?;
        fields.insert(field.name.clone(), value);
    }
    Ok(fields)
}

fn read_field(
    dialect: &Dialect,
    field: &FieldSpec,
    buf: &mut Bytes<'_>,
) -> Result<MavValue, FrameError> {
    match &field.mavtype {
        MavType::CharArray(size) => {
            let bytes = buf.get_bytes(*size)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(MavValue::String(
                String::from_utf8_lossy(&bytes[..end]).into_owned(),
            ))
        }
        MavType::Array(element, size) => {
            let mut values = Vec::with_capacity(*size);
            for _ in 0..*size {
                values.push(read_scalar(element, buf)?);
            }
            Ok(MavValue::Array(values))
        }
        scalar => {
            let value = read_scalar(scalar, buf)?;
            let Some(group) = field
                .enum_group
                .as_deref()
                .and_then(|name| dialect.enum_group(name))
            else {
                return Ok(value);
            };
            // symbolic mapping needs a non-negative wire value
            let Some(raw) = value.as_u64() else {
                return Ok(value);
            };
            if field.bitmask {
                Ok(MavValue::Bitmask(decompose_bitmask(group, raw)))
            } else {
                Ok(match group.key_for(raw) {
                    Some(key) => MavValue::Enum(EnumValue::Known(key.to_string())),
                    None => MavValue::Enum(EnumValue::Raw(raw)),
                })
            }
        }
    }
}

fn read_scalar(mavtype: &MavType, buf: &mut Bytes<'_>) -> Result<MavValue, FrameError> {
    use MavType::*;
    Ok(match mavtype {
        UInt8 | Char => MavValue::UInt8(buf.get_u8()?),
        UInt16 => MavValue::UInt16(buf.get_u16_le()?),
        UInt32 => MavValue::UInt32(buf.get_u32_le()?),
        UInt64 => MavValue::UInt64(buf.get_u64_le()?),
        Int8 => MavValue::Int8(buf.get_i8()?),
        Int16 => MavValue::Int16(buf.get_i16_le()?),
        Int32 => MavValue::Int32(buf.get_i32_le()?),
        Int64 => MavValue::Int64(buf.get_i64_le()?),
        Float => MavValue::Float(buf.get_f32_le()?),
        Double => MavValue::Double(buf.get_f64_le()?),
        CharArray(_) | Array(_, _) => {
            // parser never nests arrays
            return Err(FrameError::Payload(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "array element with array type",
            )));
        }
    })
}

/// Split a wire mask into the flags the group defines plus leftover bits.
fn decompose_bitmask(group: &EnumSpec, bits: u64) -> BitmaskValue {
    let mut remaining = bits;
    let mut flags = Vec::new();
    for (value, key) in group.entries() {
        if value != 0 && bits & value == value {
            flags.push(key.to_string());
            remaining &= !value;
        }
    }
    BitmaskValue {
        flags,
        unknown_bits: remaining,
    }
}
