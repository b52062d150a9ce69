mod test_shared;

use mavkit::{Dialect, DialectError, MavType, MavValue};

use crate::test_shared::TEST_DIALECT;

#[test]
fn catalog_shape() {
    let dialect = test_shared::test_dialect();

    assert_eq!(dialect.messages().count(), 7);
    assert!(dialect.rejected().is_empty());
    assert_eq!(dialect.version(), Some(3));
    assert_eq!(dialect.dialect_number(), Some(0));

    let heartbeat = dialect.message_by_id(0).unwrap();
    assert_eq!(heartbeat.name, "HEARTBEAT");
    assert_eq!(heartbeat.payload_len, 9);
    assert_eq!(heartbeat.max_payload_len, 9);
    assert!(!heartbeat.has_extensions);

    let servo = dialect.message_by_name("SERVO_OUTPUT_RAW").unwrap();
    assert_eq!(servo.id, 36);
    assert!(servo.has_extensions);
    assert_eq!(servo.payload_len, 21);
    assert_eq!(servo.max_payload_len, 37);

    let log = dialect.message_by_name("TELEMETRY_LOG").unwrap();
    assert_eq!(log.id, 100_000);
}

#[test]
fn crc_extra_matches_published_values() {
    let dialect = test_shared::test_dialect();
    // the official seeds for these common-dialect messages
    assert_eq!(dialect.message_by_name("HEARTBEAT").unwrap().crc_extra, 50);
    assert_eq!(dialect.message_by_name("ATTITUDE").unwrap().crc_extra, 39);
    assert_eq!(dialect.message_by_name("STATUSTEXT").unwrap().crc_extra, 83);
    assert_eq!(
        dialect.message_by_name("SERVO_OUTPUT_RAW").unwrap().crc_extra,
        222
    );
}

#[test]
fn crc_extra_is_deterministic() {
    let first = test_shared::test_dialect();
    let second = test_shared::test_dialect();
    for message in first.messages() {
        assert_eq!(
            message.crc_extra,
            second.message_by_id(message.id).unwrap().crc_extra,
            "CRC_EXTRA for {} changed between loads",
            message.name
        );
    }
}

#[test]
fn wire_order_is_width_sorted_and_stable() {
    let dialect = test_shared::test_dialect();
    let names: Vec<&str> = dialect
        .message_by_name("HEARTBEAT")
        .unwrap()
        .wire_fields()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "custom_mode",
            "type",
            "autopilot",
            "base_mode",
            "system_status",
            "mavlink_version",
        ]
    );

    // extensions stay in declaration order behind the sorted core
    let servo_names: Vec<&str> = dialect
        .message_by_name("SERVO_OUTPUT_RAW")
        .unwrap()
        .wire_fields()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(servo_names[0], "time_usec");
    assert_eq!(servo_names[9], "port");
    assert_eq!(&servo_names[10..], [
        "servo9_raw",
        "servo10_raw",
        "servo11_raw",
        "servo12_raw",
        "servo13_raw",
        "servo14_raw",
        "servo15_raw",
        "servo16_raw",
    ]);
}

#[test]
fn enum_groups_resolve() {
    let dialect = test_shared::test_dialect();

    let state = dialect.enum_group("MAV_STATE").unwrap();
    assert!(!state.bitmask);
    assert_eq!(state.key_for(4), Some("MAV_STATE_ACTIVE"));
    assert_eq!(state.value_for("MAV_STATE_STANDBY"), Some(3));
    assert_eq!(state.key_for(200), None);

    let flags = dialect.enum_group("SENSOR_FLAGS").unwrap();
    assert!(flags.bitmask);
    // hex entry values parse
    assert_eq!(flags.value_for("SENSOR_MAG"), Some(8));

    let heartbeat = dialect.message_by_name("HEARTBEAT").unwrap();
    assert!(heartbeat.field("base_mode").unwrap().bitmask);
    assert!(!heartbeat.field("system_status").unwrap().bitmask);
}

#[test]
fn default_record_is_all_zeroes() {
    let dialect = test_shared::test_dialect();
    let record = dialect
        .message_by_name("STATUSTEXT")
        .unwrap()
        .default_record();
    assert_eq!(record["severity"], MavValue::UInt8(0));
    assert_eq!(record["text"], MavValue::String(String::new()));
}

#[test]
fn message_id_collision_is_fatal() {
    let other = r#"<mavlink><messages>
      <message id="0" name="IMPOSTOR">
        <field type="uint8_t" name="value">A value.</field>
      </message>
    </messages></mavlink>"#;
    match Dialect::from_sources(&[TEST_DIALECT, other]) {
        Err(DialectError::DuplicateMessageId { id: 0, .. }) => {}
        other => panic!("expected a duplicate-id error, got {other:?}"),
    }
}

#[test]
fn message_name_collision_is_fatal() {
    let other = r#"<mavlink><messages>
      <message id="9000" name="HEARTBEAT">
        <field type="uint8_t" name="value">A value.</field>
      </message>
    </messages></mavlink>"#;
    assert!(matches!(
        Dialect::from_sources(&[TEST_DIALECT, other]),
        Err(DialectError::DuplicateMessageName(name)) if name == "HEARTBEAT"
    ));
}

#[test]
fn later_documents_extend_enums() {
    let extension = r#"<mavlink><enums>
      <enum name="MAV_STATE">
        <entry name="MAV_STATE_EMERGENCY" value="6">Emergency landing</entry>
      </enum>
    </enums></mavlink>"#;
    let dialect = Dialect::from_sources(&[TEST_DIALECT, extension]).unwrap();
    let state = dialect.enum_group("MAV_STATE").unwrap();
    assert_eq!(state.key_for(6), Some("MAV_STATE_EMERGENCY"));
    assert_eq!(state.key_for(4), Some("MAV_STATE_ACTIVE"));
}

#[test]
fn enum_entry_collision_is_fatal() {
    let collision = r#"<mavlink><enums>
      <enum name="MAV_STATE">
        <entry name="MAV_STATE_SOMETHING_ELSE" value="4">Clashes with ACTIVE</entry>
      </enum>
    </enums></mavlink>"#;
    assert!(matches!(
        Dialect::from_sources(&[TEST_DIALECT, collision]),
        Err(DialectError::DuplicateEnumEntry { group, .. }) if group == "MAV_STATE"
    ));
}

#[test]
fn unknown_enum_reference_is_fatal() {
    let xml = r#"<mavlink><messages>
      <message id="1" name="BROKEN">
        <field type="uint8_t" name="mode" enum="NO_SUCH_GROUP">A mode.</field>
      </message>
    </messages></mavlink>"#;
    assert!(matches!(
        Dialect::from_source(xml),
        Err(DialectError::UnknownEnumGroup { group, .. }) if group == "NO_SUCH_GROUP"
    ));
}

#[test]
fn unknown_wire_type_rejects_only_that_message() {
    let xml = r#"<mavlink><messages>
      <message id="1" name="GOOD">
        <field type="uint8_t" name="value">A value.</field>
      </message>
      <message id="2" name="BAD">
        <field type="uint128_t" name="value">A value.</field>
      </message>
      <message id="3" name="ALSO_GOOD">
        <field type="float" name="value">A value.</field>
      </message>
    </messages></mavlink>"#;
    let dialect = Dialect::from_source(xml).unwrap();
    assert!(dialect.message_by_id(1).is_some());
    assert!(dialect.message_by_id(2).is_none());
    assert!(dialect.message_by_id(3).is_some());
    assert_eq!(dialect.rejected().len(), 1);
    assert_eq!(dialect.rejected()[0].name, "BAD");
    assert!(dialect.rejected()[0].reason.contains("uint128_t"));
}

#[test]
fn duplicate_field_name_rejects_the_message() {
    let xml = r#"<mavlink><messages>
      <message id="1" name="TWINS">
        <field type="uint8_t" name="value">A value.</field>
        <field type="uint16_t" name="value">Another value.</field>
      </message>
    </messages></mavlink>"#;
    let dialect = Dialect::from_source(xml).unwrap();
    assert!(dialect.message_by_id(1).is_none());
    assert_eq!(dialect.rejected().len(), 1);
}

#[test]
fn message_id_above_24_bits_is_fatal() {
    let xml = r#"<mavlink><messages>
      <message id="16777216" name="TOO_BIG">
        <field type="uint8_t" name="value">A value.</field>
      </message>
    </messages></mavlink>"#;
    assert!(matches!(
        Dialect::from_source(xml),
        Err(DialectError::MessageIdOutOfRange { id: 16_777_216, .. })
    ));
}

#[test]
fn malformed_xml_is_fatal() {
    assert!(Dialect::from_source("<mavlink><messages>").is_err());
    assert!(Dialect::from_source("<mavlink><field/></mavlink>").is_err());
}

#[test]
fn array_type_layout() {
    let dialect = test_shared::test_dialect();
    let bulk = dialect.message_by_name("BULK_DATA").unwrap();
    let words = &bulk.field("words").unwrap().mavtype;
    assert_eq!(*words, MavType::Array(Box::new(MavType::UInt64), 40));
    assert_eq!(words.array_len(), 40);
    assert_eq!(bulk.field("data").unwrap().mavtype.array_len(), 1);
    assert_eq!(bulk.payload_len, 328);
}
