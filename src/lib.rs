//! Runtime-dialect MAVLink codec.
//!
//! # Dialects at runtime
//! Instead of generating one struct per message at build time, this crate
//! parses MAVLink dialect XML into an immutable [`Dialect`] catalog and
//! treats messages as open records: a [`BTreeMap`](std::collections::BTreeMap)
//! of field name to [`MavValue`]. The catalog knows each message's wire
//! layout and CRC_EXTRA seed, so encoding and decoding work for any dialect
//! the process is handed, including ones that did not exist when the binary
//! was built.
//!
//! # Channels
//! A [`Channel`] holds the per-endpoint state MAVLink requires: the current
//! protocol version, the outbound sequence counter, signing keys and
//! timestamps, and statistics. [`Channel::encode`] turns a field map into a
//! framed byte buffer; [`Channel::feed`] runs incoming bytes through the
//! decoder state machine and returns decoded records and frame errors.
//! Transport is the caller's business: both ends of the channel are plain
//! byte slices.
//!
//! Both MAVLink 1 (`0xFE`) and MAVLink 2 (`0xFD`) frames are accepted on the
//! same stream. The first valid MAVLink 2 frame upgrades a MAVLink 1 channel;
//! downgrading is refused.

#![deny(clippy::all)]
#![warn(clippy::use_self)]

use crc_any::CRCu16;

pub mod buf;
pub mod channel;
pub mod decode;
pub mod dialect;
pub mod encode;
pub mod error;
pub mod frame;
pub mod signing;
pub mod types;
pub mod value;

pub use channel::{Channel, ChannelConf, MessageKey, Statistics};
pub use decode::{DecodedFrame, Decoder, DecoderEvent};
pub use dialect::{Dialect, EnumSpec, FieldSpec, MessageSpec, RejectedMessage};
pub use error::{DialectError, EncodeError, FrameError};
pub use frame::{MavlinkV1FrameRaw, MavlinkV2FrameRaw};
pub use signing::{SignedFrameInfo, SigningConfig};
pub use types::MavType;
pub use value::{BitmaskValue, EnumValue, MavValue};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame start marker for MAVLink 1.
pub const MAV_STX: u8 = 0xFE;

/// Frame start marker for MAVLink 2.
pub const MAV_STX_V2: u8 = 0xFD;

/// MAVLink 2 incompatibility flag: a signature trailer follows the checksum.
pub const MAVLINK_IFLAG_SIGNED: u8 = 0x01;

/// Largest possible frame: MAVLink 2 header, full payload, checksum, signature.
pub const MAX_FRAME_SIZE: usize = 280;

/// Largest payload either framing version can carry.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Versions of the MAVLink protocol that we support.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum MavlinkVersion {
    V1,
    V2,
}

/// Metadata from a MAVLink frame header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MavHeader {
    pub system_id: u8,
    pub component_id: u8,
    pub sequence: u8,
}

/// A default GCS-style header; the channel replaces the sequence on encode.
impl Default for MavHeader {
    fn default() -> Self {
        Self {
            system_id: 255,
            component_id: 0,
            sequence: 0,
        }
    }
}

/// X.25 checksum over `data`, finalized with the message's CRC_EXTRA seed.
///
/// The checksum covers the frame from the length byte through the last
/// payload byte; the start marker is excluded. The low byte goes on the
/// wire first.
pub fn calculate_crc(data: &[u8], extra_crc: u8) -> u16 {
    let mut crc_calculator = CRCu16::crc16mcrf4cc();
    crc_calculator.digest(data);

    crc_calculator.digest(&[extra_crc]);
    crc_calculator.get_crc()
}
