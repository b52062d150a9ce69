mod test_shared;

use mavkit::{
    DecoderEvent, FrameError, MavlinkVersion, MavlinkV2FrameRaw, SigningConfig,
};

use crate::test_shared::{channel, heartbeat_fields, signing_channel, SECRET_KEY};

#[test]
fn signed_frames_carry_the_trailer() {
    let mut chan = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let encoded = chan.encode("HEARTBEAT", &heartbeat_fields()).unwrap();

    let frame = MavlinkV2FrameRaw::from_slice(&encoded);
    assert!(frame.is_signed());
    assert_eq!(frame.incompatibility_flags(), 0x01);
    assert_eq!(frame.signature_link_id(), 1);
    assert_eq!(encoded.len(), 1 + 9 + 9 + 2 + 13);
}

#[test]
fn sign_and_verify_end_to_end() {
    let mut sender = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let mut receiver = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));

    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let mut events = receiver.feed(&encoded);
    assert_eq!(events.len(), 1);
    let DecoderEvent::Decoded(decoded) = events.remove(0) else {
        panic!("expected a decoded frame");
    };
    assert_eq!(decoded.signature_valid, Some(true));
    assert_eq!(decoded.link_id, Some(1));
    assert_eq!(receiver.statistics().frames_decoded, 1);
    assert_eq!(receiver.statistics().bad_signature, 0);
}

#[test]
fn back_to_back_timestamps_strictly_increase() {
    let mut chan = signing_channel(MavlinkVersion::V2, SigningConfig::new([0u8; 32], 1));
    let first = chan.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let second = chan.encode("HEARTBEAT", &heartbeat_fields()).unwrap();

    let first_ts = MavlinkV2FrameRaw::from_slice(&first).signature_timestamp();
    let second_ts = MavlinkV2FrameRaw::from_slice(&second).signature_timestamp();
    // even on a stalled clock the second timestamp is bumped past the first
    assert!(second_ts > first_ts);
}

#[test]
fn wrong_key_is_rejected() {
    let mut sender = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let mut receiver = signing_channel(MavlinkVersion::V2, SigningConfig::new([9u8; 32], 1));

    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let events = receiver.feed(&encoded);
    assert!(events.iter().any(|e| matches!(
        e,
        DecoderEvent::Error(FrameError::BadSignature { link_id: 1, .. })
    )));
    assert_eq!(receiver.statistics().bad_signature, 1);
    assert_eq!(receiver.statistics().frames_decoded, 0);
}

#[test]
fn accept_predicate_emits_flagged_record() {
    let mut sender = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let config = SigningConfig::new([9u8; 32], 1).with_accept(|info| info.system_id == 99);
    let mut receiver = signing_channel(MavlinkVersion::V2, config);

    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let mut events = receiver.feed(&encoded);
    let DecoderEvent::Decoded(decoded) = events.remove(0) else {
        panic!("expected a decoded frame");
    };
    // emitted, but marked unverified
    assert_eq!(decoded.signature_valid, Some(false));
    assert_eq!(receiver.statistics().bad_signature, 0);
}

#[test]
fn stale_timestamp_is_rejected() {
    let mut sender = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let older = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let newer = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();

    let mut receiver = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let events = receiver.feed(&newer);
    assert!(matches!(events[0], DecoderEvent::Decoded(_)));

    // the older timestamp arrives late and must be treated as a replay
    let events = receiver.feed(&older);
    assert!(matches!(
        events[0],
        DecoderEvent::Error(FrameError::BadSignature { .. })
    ));
    assert_eq!(receiver.statistics().bad_signature, 1);
}

#[test]
fn identical_timestamp_verifies_again() {
    let mut sender = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();

    let mut receiver = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    assert!(matches!(receiver.feed(&encoded)[0], DecoderEvent::Decoded(_)));
    assert!(matches!(receiver.feed(&encoded)[0], DecoderEvent::Decoded(_)));
}

#[test]
fn unsigned_frames_pass_a_signing_channel() {
    let mut sender = channel(MavlinkVersion::V2);
    let mut receiver = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));

    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let mut events = receiver.feed(&encoded);
    let DecoderEvent::Decoded(decoded) = events.remove(0) else {
        panic!("expected a decoded frame");
    };
    assert_eq!(decoded.signature_valid, None);
    assert_eq!(decoded.link_id, None);
}

#[test]
fn signed_frames_need_a_signing_channel() {
    let mut sender = signing_channel(MavlinkVersion::V2, SigningConfig::new(SECRET_KEY, 1));
    let mut receiver = channel(MavlinkVersion::V2);

    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let events = receiver.feed(&encoded);
    assert!(matches!(
        events[0],
        DecoderEvent::Error(FrameError::BadSignature { .. })
    ));
    assert_eq!(receiver.statistics().bad_signature, 1);
}

#[test]
fn signing_can_be_installed_after_construction() {
    let mut sender = channel(MavlinkVersion::V2);
    sender.configure_signing(SigningConfig::new(SECRET_KEY, 2));
    let encoded = sender.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    let frame = MavlinkV2FrameRaw::from_slice(&encoded);
    assert!(frame.is_signed());
    assert_eq!(frame.signature_link_id(), 2);

    let mut receiver = channel(MavlinkVersion::V2);
    receiver.configure_signing(SigningConfig::new(SECRET_KEY, 2));
    let mut events = receiver.feed(&encoded);
    let DecoderEvent::Decoded(decoded) = events.remove(0) else {
        panic!("expected a decoded frame");
    };
    assert_eq!(decoded.signature_valid, Some(true));
    assert_eq!(decoded.link_id, Some(2));
}

#[test]
fn v1_frames_are_never_signed() {
    let mut chan = signing_channel(MavlinkVersion::V1, SigningConfig::new(SECRET_KEY, 1));
    let encoded = chan.encode("HEARTBEAT", &heartbeat_fields()).unwrap();
    assert_eq!(encoded[0], 0xFE);
    assert_eq!(encoded.len(), 1 + 5 + 9 + 2);
}
