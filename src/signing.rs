//! MAVLink 2 message signing.
//!
//! Signing binds a frame to a shared 32-byte key, an 8-bit link id and a
//! 48-bit monotonic timestamp (10 µs ticks since 2015-01-01 UTC). Outbound
//! timestamps are strictly monotonic per channel even when the wall clock
//! stalls; inbound timestamps are tracked per `(link, system, component)`
//! stream to reject replays.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::frame::MavlinkV2FrameRaw;

/// Identity of a signed frame, handed to the accept predicate when its
/// signature did not verify.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SignedFrameInfo {
    pub system_id: u8,
    pub component_id: u8,
    pub link_id: u8,
    /// The timestamp the frame carried.
    pub timestamp: u64,
}

/// Decides whether a frame whose signature failed verification is emitted
/// anyway (flagged invalid) or discarded.
pub type AcceptSignature = Arc<dyn Fn(&SignedFrameInfo) -> bool + Send + Sync>;

/// Signing configuration for one channel.
#[derive(Clone)]
pub struct SigningConfig {
    pub(crate) secret_key: [u8; 32],
    pub(crate) link_id: u8,
    pub(crate) accept: Option<AcceptSignature>,
}

impl SigningConfig {
    pub fn new(secret_key: [u8; 32], link_id: u8) -> Self {
        Self {
            secret_key,
            link_id,
            accept: None,
        }
    }

    /// Install an accept predicate. Without one, frames that fail
    /// verification are discarded.
    pub fn with_accept<F>(mut self, accept: F) -> Self
    where
        F: Fn(&SignedFrameInfo) -> bool + Send + Sync + 'static,
    {
        self.accept = Some(Arc::new(accept));
        self
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret_key", &"[redacted]")
            .field("link_id", &self.link_id)
            .field("accept", &self.accept.is_some())
            .finish()
    }
}

/// Outbound signing state: the channel's monotonic timestamp counter.
pub(crate) struct SignState {
    config: SigningConfig,
    timestamp: u64,
}

impl SignState {
    pub(crate) fn new(config: SigningConfig) -> Self {
        Self {
            config,
            timestamp: 0,
        }
    }

    /// Write link id, timestamp and signature into a serialized frame whose
    /// signed incompatibility flag is already set (the checksum covers it).
    pub(crate) fn sign_frame(&mut self, frame: &mut MavlinkV2FrameRaw) {
        self.timestamp = u64::max(self.timestamp, current_timestamp());
        let ts_bytes = self.timestamp.to_le_bytes();
        frame
            .signature_timestamp_bytes_mut()
            .copy_from_slice(&ts_bytes[..6]);
        *frame.signature_link_id_mut() = self.config.link_id;

        let mut signature = [0u8; 6];
        frame.calculate_signature(&self.config.secret_key, &mut signature);
        frame.signature_value_mut().copy_from_slice(&signature);

        // never hand out the same timestamp twice, stalled clock or not
        self.timestamp += 1;
    }
}

/// Outcome of verifying a signed inbound frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SignatureVerdict {
    /// Signature and timestamp check out.
    Valid,
    /// Verification failed but the accept predicate let the frame through;
    /// it is emitted flagged as unverified.
    AcceptedInvalid,
    /// Verification failed and the frame is discarded.
    Rejected,
}

/// Inbound verification state: per-stream timestamps for replay protection.
pub(crate) struct VerifyState {
    config: SigningConfig,
    /// Latest accepted timestamp across all streams.
    timestamp: u64,
    stream_timestamps: HashMap<(u8, u8, u8), u64>,
}

impl VerifyState {
    pub(crate) fn new(config: SigningConfig) -> Self {
        Self {
            config,
            timestamp: 0,
            stream_timestamps: HashMap::new(),
        }
    }

    pub(crate) fn verify_frame(&mut self, frame: &MavlinkV2FrameRaw) -> SignatureVerdict {
        self.timestamp = u64::max(self.timestamp, current_timestamp());
        let timestamp = frame.signature_timestamp();
        let stream_key = (
            frame.signature_link_id(),
            frame.system_id(),
            frame.component_id(),
        );

        let timestamp_ok = match self.stream_timestamps.get(&stream_key) {
            // replayed or reordered frame on a known stream
            Some(&stream_timestamp) => timestamp >= stream_timestamp,
            // a new stream must not start more than a minute in the past
            None => timestamp + 60 * 1000 * 100 >= self.timestamp,
        };

        let mut signature = [0u8; 6];
        frame.calculate_signature(&self.config.secret_key, &mut signature);

        if timestamp_ok && signature == frame.signature_value() {
            self.stream_timestamps.insert(stream_key, timestamp);
            self.timestamp = u64::max(self.timestamp, timestamp);
            return SignatureVerdict::Valid;
        }

        let info = SignedFrameInfo {
            system_id: frame.system_id(),
            component_id: frame.component_id(),
            link_id: frame.signature_link_id(),
            timestamp,
        };
        match &self.config.accept {
            Some(accept) if accept(&info) => SignatureVerdict::AcceptedInvalid,
            _ => SignatureVerdict::Rejected,
        }
    }
}

/// 48-bit signing clock: 10 µs ticks since 1st January 2015 GMT. Falls back
/// to 0 if the system clock reads earlier than that.
fn current_timestamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|n| n.as_micros())
        .unwrap_or(0);
    ((now.checked_sub(1_420_070_400u128 * 1_000_000u128).unwrap_or_default()) / 10u128) as u64
}
