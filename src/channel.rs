//! Per-endpoint channel state.
//!
//! A [`Channel`] ties the codec together for one endpoint: it owns the
//! current protocol version, the outbound sequence counter, the signing
//! state and the statistics, and serializes encode and decode requests so
//! those state transitions are race-free. One channel per peer link;
//! channels share the catalog through an [`Arc`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::decode::{Decoder, DecoderEvent};
use crate::dialect::{Dialect, MessageSpec};
use crate::encode::encode_frame;
use crate::error::{EncodeError, FrameError};
use crate::signing::{SignState, SigningConfig};
use crate::value::MavValue;
use crate::{MavHeader, MavlinkVersion};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A message reference: catalog id or catalog name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKey {
    Id(u32),
    Name(String),
}

impl MessageKey {
    fn lookup<'a>(&self, dialect: &'a Dialect) -> Option<&'a MessageSpec> {
        match self {
            Self::Id(id) => dialect.message_by_id(*id),
            Self::Name(name) => dialect.message_by_name(name),
        }
    }
}

impl From<u32> for MessageKey {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for MessageKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for MessageKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Monotonic per-channel counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statistics {
    pub frames_encoded: u64,
    pub frames_decoded: u64,
    pub bad_checksum: u64,
    pub bad_length: u64,
    pub bad_signature: u64,
    pub bad_protocol: u64,
    pub unknown_message: u64,
}

/// Channel construction options.
#[derive(Debug, Clone)]
pub struct ChannelConf {
    protocol: MavlinkVersion,
    system_id: u8,
    component_id: u8,
    signing: Option<SigningConfig>,
}

impl Default for ChannelConf {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelConf {
    /// Defaults: MAVLink 2, system 255 (ground station), component 0.
    pub fn new() -> Self {
        Self {
            protocol: MavlinkVersion::V2,
            system_id: 255,
            component_id: 0,
            signing: None,
        }
    }

    /// Initial protocol version. A channel may later auto-upgrade to
    /// MAVLink 2 when it hears MAVLink 2 from the peer.
    pub fn protocol(mut self, protocol: MavlinkVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn system_id(mut self, system_id: u8) -> Self {
        self.system_id = system_id;
        self
    }

    pub fn component_id(mut self, component_id: u8) -> Self {
        self.component_id = component_id;
        self
    }

    /// Enable signing: outbound MAVLink 2 frames carry a signature trailer,
    /// inbound signed frames are verified.
    pub fn signing(mut self, config: SigningConfig) -> Self {
        self.signing = Some(config);
        self
    }

    pub fn build(self, dialect: Arc<Dialect>) -> Channel {
        let decoder = match self.signing.clone() {
            Some(config) => Decoder::with_signing(Arc::clone(&dialect), config),
            None => Decoder::new(Arc::clone(&dialect)),
        };
        Channel {
            dialect,
            protocol: self.protocol,
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: 0,
            signer: self.signing.map(SignState::new),
            decoder,
            inbound_sequences: HashMap::new(),
            stats: Statistics::default(),
        }
    }
}

/// Encode and decode endpoint for one peer link.
pub struct Channel {
    dialect: Arc<Dialect>,
    protocol: MavlinkVersion,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    signer: Option<SignState>,
    decoder: Decoder,
    inbound_sequences: HashMap<(u8, u8), u8>,
    stats: Statistics,
}

impl Channel {
    /// Encode a message under the channel's current protocol.
    pub fn encode(
        &mut self,
        key: impl Into<MessageKey>,
        fields: &BTreeMap<String, MavValue>,
    ) -> Result<Vec<u8>, EncodeError> {
        self.encode_versioned(key.into(), fields, None)
    }

    /// Encode a message under an explicit protocol version, overriding the
    /// channel's current one for this frame only.
    pub fn encode_with_protocol(
        &mut self,
        key: impl Into<MessageKey>,
        fields: &BTreeMap<String, MavValue>,
        version: MavlinkVersion,
    ) -> Result<Vec<u8>, EncodeError> {
        self.encode_versioned(key.into(), fields, Some(version))
    }

    fn encode_versioned(
        &mut self,
        key: MessageKey,
        fields: &BTreeMap<String, MavValue>,
        version: Option<MavlinkVersion>,
    ) -> Result<Vec<u8>, EncodeError> {
        let dialect = Arc::clone(&self.dialect);
        let Some(spec) = key.lookup(&dialect) else {
            self.stats.unknown_message += 1;
            return Err(EncodeError::UnknownMessage(key.to_string()));
        };
        let version = version.unwrap_or(self.protocol);
        // only MAVLink 2 frames carry a signature
        let signing = match version {
            MavlinkVersion::V2 => self.signer.as_mut(),
            MavlinkVersion::V1 => None,
        };

        let header = MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence,
        };
        let result = encode_frame(&dialect, spec, fields, version, header, signing);
        match &result {
            Ok(_) => {
                self.sequence = self.sequence.wrapping_add(1);
                self.stats.frames_encoded += 1;
            }
            Err(EncodeError::BadProtocol { .. } | EncodeError::Downgrade) => {
                self.stats.bad_protocol += 1;
            }
            Err(_) => {}
        }
        result
    }

    /// Run inbound bytes through the decoder. Returns decoded frames and
    /// frame errors in stream order; partial frames persist until the next
    /// call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecoderEvent> {
        let events = self.decoder.feed(bytes);
        for event in &events {
            self.account(event);
        }
        events
    }

    /// Feed a single inbound byte.
    pub fn push_byte(&mut self, byte: u8) -> Vec<DecoderEvent> {
        self.feed(&[byte])
    }

    fn account(&mut self, event: &DecoderEvent) {
        match event {
            DecoderEvent::Decoded(frame) => {
                self.stats.frames_decoded += 1;
                self.inbound_sequences
                    .insert((frame.system_id, frame.component_id), frame.sequence);
                if frame.protocol == MavlinkVersion::V2 && self.protocol == MavlinkVersion::V1 {
                    log::debug!(
                        "system {} component {} speaks MAVLink 2, upgrading channel",
                        frame.system_id,
                        frame.component_id
                    );
                    self.protocol = MavlinkVersion::V2;
                }
            }
            DecoderEvent::Error(err) => match err {
                FrameError::BadChecksum { .. } => self.stats.bad_checksum += 1,
                FrameError::BadLength { .. } => self.stats.bad_length += 1,
                FrameError::BadSignature { .. } => self.stats.bad_signature += 1,
                FrameError::UnknownMessage { .. } => self.stats.unknown_message += 1,
                FrameError::Payload(_) => {}
            },
        }
    }

    /// Install or replace signing after construction: outbound MAVLink 2
    /// frames are signed from the next encode on, inbound signed frames are
    /// verified against the new key.
    pub fn configure_signing(&mut self, config: SigningConfig) {
        self.signer = Some(SignState::new(config.clone()));
        self.decoder.set_signing(config);
    }

    pub fn protocol(&self) -> MavlinkVersion {
        self.protocol
    }

    /// Switch the channel protocol. Downgrading from MAVLink 2 is refused.
    pub fn set_protocol(&mut self, version: MavlinkVersion) -> Result<(), EncodeError> {
        if self.protocol == MavlinkVersion::V2 && version == MavlinkVersion::V1 {
            self.stats.bad_protocol += 1;
            return Err(EncodeError::Downgrade);
        }
        self.protocol = version;
        Ok(())
    }

    pub fn system_id(&self) -> u8 {
        self.system_id
    }

    pub fn component_id(&self) -> u8 {
        self.component_id
    }

    /// The sequence number the next encoded frame will carry.
    pub fn next_sequence(&self) -> u8 {
        self.sequence
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Last sequence number decoded from a given origin.
    pub fn last_inbound_sequence(&self, system_id: u8, component_id: u8) -> Option<u8> {
        self.inbound_sequences
            .get(&(system_id, component_id))
            .copied()
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }
}
