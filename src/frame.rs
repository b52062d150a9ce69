//! Raw frame buffers.
//!
//! Fixed-size scratch buffers holding one frame each, with accessors over
//! the framing layout. The encoder serializes into them, the decoder
//! reassembles received bytes into them; neither allocates per frame.
//!
//! Layouts (all multi-byte values little-endian):
//!
//! v1: `0xFE | len | seq | sysid | compid | msgid | payload[len] | crc(2)`
//!
//! v2: `0xFD | len | incompat | compat | seq | sysid | compid | msgid(3) |
//!      payload[len] | crc(2) | [linkid | timestamp(6) | sig(6)]`

use sha2::{Digest, Sha256};

use crate::{calculate_crc, MavHeader, MAVLINK_IFLAG_SIGNED, MAV_STX, MAV_STX_V2};

/// A raw MAVLink 1 frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MavlinkV1FrameRaw([u8; 1 + Self::HEADER_SIZE + 255 + 2]);

impl Default for MavlinkV1FrameRaw {
    fn default() -> Self {
        Self::new()
    }
}

impl MavlinkV1FrameRaw {
    /// Header bytes after the start marker: len, seq, sysid, compid, msgid.
    pub const HEADER_SIZE: usize = 5;

    pub const fn new() -> Self {
        Self([0; 1 + Self::HEADER_SIZE + 255 + 2])
    }

    /// Reassemble a frame from received bytes (at most one frame's worth).
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut frame = Self::new();
        let len = bytes.len().min(frame.0.len());
        frame.0[..len].copy_from_slice(&bytes[..len]);
        frame
    }

    #[inline]
    pub fn payload_length(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn sequence(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn system_id(&self) -> u8 {
        self.0[3]
    }

    #[inline]
    pub fn component_id(&self) -> u8 {
        self.0[4]
    }

    #[inline]
    pub fn message_id(&self) -> u32 {
        self.0[5] as u32
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        let payload_length: usize = self.payload_length().into();
        &self.0[1 + Self::HEADER_SIZE..1 + Self::HEADER_SIZE + payload_length]
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        let payload_length: usize = self.payload_length().into();
        u16::from_le_bytes([
            self.0[1 + Self::HEADER_SIZE + payload_length],
            self.0[1 + Self::HEADER_SIZE + payload_length + 1],
        ])
    }

    #[inline]
    pub fn has_valid_crc(&self, crc_extra: u8) -> bool {
        self.checksum() == self.calculate_crc(crc_extra)
    }

    /// The checksum this frame's bytes should carry.
    pub fn calculate_crc(&self, crc_extra: u8) -> u16 {
        let payload_length: usize = self.payload_length().into();
        calculate_crc(
            &self.0[1..1 + Self::HEADER_SIZE + payload_length],
            crc_extra,
        )
    }

    /// Everything that goes on the wire.
    pub fn raw_bytes(&self) -> &[u8] {
        let payload_length = self.payload_length() as usize;
        &self.0[..1 + Self::HEADER_SIZE + payload_length + 2]
    }

    /// Fill the buffer with a complete frame, checksum included.
    pub fn serialize(&mut self, header: MavHeader, message_id: u8, payload: &[u8], crc_extra: u8) {
        self.0[0] = MAV_STX;
        self.0[1..=Self::HEADER_SIZE].copy_from_slice(&[
            payload.len() as u8,
            header.sequence,
            header.system_id,
            header.component_id,
            message_id,
        ]);
        self.0[1 + Self::HEADER_SIZE..1 + Self::HEADER_SIZE + payload.len()]
            .copy_from_slice(payload);

        let crc = self.calculate_crc(crc_extra);
        self.0[1 + Self::HEADER_SIZE + payload.len()..1 + Self::HEADER_SIZE + payload.len() + 2]
            .copy_from_slice(&crc.to_le_bytes());
    }
}

/// A raw MAVLink 2 frame, signature trailer included.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MavlinkV2FrameRaw([u8; 1 + Self::HEADER_SIZE + 255 + 2 + Self::SIGNATURE_SIZE]);

impl Default for MavlinkV2FrameRaw {
    fn default() -> Self {
        Self::new()
    }
}

impl MavlinkV2FrameRaw {
    /// Header bytes after the start marker: len, incompat, compat, seq,
    /// sysid, compid, msgid(3).
    pub const HEADER_SIZE: usize = 9;

    /// Signature trailer: link id, 48-bit timestamp, 48-bit signature.
    pub const SIGNATURE_SIZE: usize = 13;

    pub const fn new() -> Self {
        Self([0; 1 + Self::HEADER_SIZE + 255 + 2 + Self::SIGNATURE_SIZE])
    }

    /// Reassemble a frame from received bytes (at most one frame's worth).
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut frame = Self::new();
        let len = bytes.len().min(frame.0.len());
        frame.0[..len].copy_from_slice(&bytes[..len]);
        frame
    }

    #[inline]
    pub fn payload_length(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn incompatibility_flags(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn compatibility_flags(&self) -> u8 {
        self.0[3]
    }

    #[inline]
    pub fn sequence(&self) -> u8 {
        self.0[4]
    }

    #[inline]
    pub fn system_id(&self) -> u8 {
        self.0[5]
    }

    #[inline]
    pub fn component_id(&self) -> u8 {
        self.0[6]
    }

    #[inline]
    pub fn message_id(&self) -> u32 {
        u32::from_le_bytes([self.0[7], self.0[8], self.0[9], 0])
    }

    /// Whether the incompatibility flags announce a signature trailer.
    #[inline]
    pub fn is_signed(&self) -> bool {
        self.incompatibility_flags() & MAVLINK_IFLAG_SIGNED != 0
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        let payload_length: usize = self.payload_length().into();
        &self.0[1 + Self::HEADER_SIZE..1 + Self::HEADER_SIZE + payload_length]
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        let payload_length: usize = self.payload_length().into();
        u16::from_le_bytes([
            self.0[1 + Self::HEADER_SIZE + payload_length],
            self.0[1 + Self::HEADER_SIZE + payload_length + 1],
        ])
    }

    #[inline]
    fn signature_offset(&self) -> usize {
        1 + Self::HEADER_SIZE + self.payload_length() as usize + 2
    }

    #[inline]
    pub fn signature_link_id(&self) -> u8 {
        self.0[self.signature_offset()]
    }

    pub fn signature_link_id_mut(&mut self) -> &mut u8 {
        let offset = self.signature_offset();
        &mut self.0[offset]
    }

    /// The 48-bit signature timestamp, in 10 µs ticks since 2015-01-01.
    #[inline]
    pub fn signature_timestamp(&self) -> u64 {
        let offset = self.signature_offset() + 1;
        let mut bytes = [0u8; 8];
        bytes[..6].copy_from_slice(&self.0[offset..offset + 6]);
        u64::from_le_bytes(bytes)
    }

    pub fn signature_timestamp_bytes_mut(&mut self) -> &mut [u8] {
        let offset = self.signature_offset() + 1;
        &mut self.0[offset..offset + 6]
    }

    #[inline]
    pub fn signature_value(&self) -> [u8; 6] {
        let offset = self.signature_offset() + 7;
        let mut sig = [0u8; 6];
        sig.copy_from_slice(&self.0[offset..offset + 6]);
        sig
    }

    pub fn signature_value_mut(&mut self) -> &mut [u8] {
        let offset = self.signature_offset() + 7;
        &mut self.0[offset..offset + 6]
    }

    /// SHA-256 of key, frame bytes through the checksum, link id and
    /// timestamp; the leading 6 bytes are the wire signature.
    pub fn calculate_signature(&self, secret_key: &[u8], target_buffer: &mut [u8; 6]) {
        let mut hasher = Sha256::new();
        hasher.update(secret_key);
        hasher.update(&self.0[..self.signature_offset() + 7]);
        target_buffer.copy_from_slice(&hasher.finalize()[0..6]);
    }

    #[inline]
    pub fn has_valid_crc(&self, crc_extra: u8) -> bool {
        self.checksum() == self.calculate_crc(crc_extra)
    }

    /// The checksum this frame's bytes should carry.
    pub fn calculate_crc(&self, crc_extra: u8) -> u16 {
        let payload_length: usize = self.payload_length().into();
        calculate_crc(
            &self.0[1..1 + Self::HEADER_SIZE + payload_length],
            crc_extra,
        )
    }

    /// Everything that goes on the wire, signature trailer included when
    /// the frame is signed.
    pub fn raw_bytes(&self) -> &[u8] {
        let payload_length = self.payload_length() as usize;
        let signature_size = if self.is_signed() {
            Self::SIGNATURE_SIZE
        } else {
            0
        };
        &self.0[..1 + Self::HEADER_SIZE + payload_length + 2 + signature_size]
    }

    /// Fill the buffer with a complete frame, checksum included. Pass the
    /// signed incompatibility flag here so the checksum covers it; the
    /// signature trailer itself is written afterwards by the signer.
    pub fn serialize(
        &mut self,
        header: MavHeader,
        message_id: u32,
        payload: &[u8],
        crc_extra: u8,
        incompat_flags: u8,
    ) {
        self.0[0] = MAV_STX_V2;
        let msgid_bytes = message_id.to_le_bytes();
        self.0[1..=Self::HEADER_SIZE].copy_from_slice(&[
            payload.len() as u8,
            incompat_flags,
            0, // compat_flags
            header.sequence,
            header.system_id,
            header.component_id,
            msgid_bytes[0],
            msgid_bytes[1],
            msgid_bytes[2],
        ]);
        self.0[1 + Self::HEADER_SIZE..1 + Self::HEADER_SIZE + payload.len()]
            .copy_from_slice(payload);

        let crc = self.calculate_crc(crc_extra);
        self.0[1 + Self::HEADER_SIZE + payload.len()..1 + Self::HEADER_SIZE + payload.len() + 2]
            .copy_from_slice(&crc.to_le_bytes());
    }
}
