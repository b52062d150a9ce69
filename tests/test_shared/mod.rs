#![allow(unused)]

use std::collections::BTreeMap;
use std::sync::Arc;

use mavkit::{Channel, ChannelConf, Dialect, MavValue, MavlinkVersion, SigningConfig};

/// Hand-picked slice of the common dialect plus a few synthetic messages:
/// HEARTBEAT / ATTITUDE / STATUSTEXT / SERVO_OUTPUT_RAW keep their official
/// shapes, so their CRC_EXTRA seeds must come out at the published values
/// (50, 39, 83, 222).
pub const TEST_DIALECT: &str = r#"<?xml version="1.0"?>
<mavlink>
  <version>3</version>
  <dialect>0</dialect>
  <enums>
    <enum name="MAV_TYPE">
      <entry name="MAV_TYPE_GENERIC" value="0">Generic micro air vehicle</entry>
      <entry name="MAV_TYPE_FIXED_WING" value="1">Fixed wing aircraft</entry>
      <entry name="MAV_TYPE_QUADROTOR" value="2">Quadrotor</entry>
    </enum>
    <enum name="MAV_AUTOPILOT">
      <entry name="MAV_AUTOPILOT_GENERIC" value="0">Generic autopilot</entry>
      <entry name="MAV_AUTOPILOT_RESERVED" value="1">Reserved for future use</entry>
      <entry name="MAV_AUTOPILOT_SLUGS" value="2">SLUGS autopilot</entry>
      <entry name="MAV_AUTOPILOT_ARDUPILOTMEGA" value="3">ArduPilot</entry>
    </enum>
    <enum name="MAV_STATE">
      <entry name="MAV_STATE_UNINIT" value="0">Uninitialized system</entry>
      <entry name="MAV_STATE_BOOT" value="1">Booting up</entry>
      <entry name="MAV_STATE_CALIBRATING" value="2">Calibrating</entry>
      <entry name="MAV_STATE_STANDBY" value="3">Grounded and standing by</entry>
      <entry name="MAV_STATE_ACTIVE" value="4">Active, motors engaged</entry>
      <entry name="MAV_STATE_CRITICAL" value="5">Critical failure</entry>
    </enum>
    <enum name="MAV_MODE_FLAG" bitmask="true">
      <entry name="MAV_MODE_FLAG_CUSTOM_MODE_ENABLED" value="1">Custom mode enabled</entry>
      <entry name="MAV_MODE_FLAG_TEST_ENABLED" value="2">Test mode enabled</entry>
      <entry name="MAV_MODE_FLAG_AUTO_ENABLED" value="4">Autonomous mode enabled</entry>
      <entry name="MAV_MODE_FLAG_GUIDED_ENABLED" value="8">Guided mode enabled</entry>
      <entry name="MAV_MODE_FLAG_STABILIZE_ENABLED" value="16">Stabilization enabled</entry>
      <entry name="MAV_MODE_FLAG_HIL_ENABLED" value="32">Hardware in the loop</entry>
      <entry name="MAV_MODE_FLAG_MANUAL_INPUT_ENABLED" value="64">Manual input enabled</entry>
      <entry name="MAV_MODE_FLAG_SAFETY_ARMED" value="128">Safety armed</entry>
    </enum>
    <enum name="MAV_SEVERITY">
      <entry name="MAV_SEVERITY_EMERGENCY" value="0">System is unusable</entry>
      <entry name="MAV_SEVERITY_ALERT" value="1">Action must be taken immediately</entry>
      <entry name="MAV_SEVERITY_CRITICAL" value="2">Critical conditions</entry>
      <entry name="MAV_SEVERITY_ERROR" value="3">Error conditions</entry>
      <entry name="MAV_SEVERITY_WARNING" value="4">Warning conditions</entry>
      <entry name="MAV_SEVERITY_NOTICE" value="5">Normal but significant</entry>
      <entry name="MAV_SEVERITY_INFO" value="6">Informational</entry>
      <entry name="MAV_SEVERITY_DEBUG" value="7">Debug messages</entry>
    </enum>
    <enum name="SENSOR_FLAGS" bitmask="true">
      <entry name="SENSOR_GYRO" value="0x01">Gyroscope healthy</entry>
      <entry name="SENSOR_ACCEL" value="0x02">Accelerometer healthy</entry>
      <entry name="SENSOR_MAG" value="0x08">Magnetometer healthy</entry>
    </enum>
  </enums>
  <messages>
    <message id="0" name="HEARTBEAT">
      <description>The heartbeat message shows that a system is present and responding.</description>
      <field type="uint8_t" name="type" enum="MAV_TYPE">Vehicle or component type.</field>
      <field type="uint8_t" name="autopilot" enum="MAV_AUTOPILOT">Autopilot type.</field>
      <field type="uint8_t" name="base_mode" enum="MAV_MODE_FLAG">System mode bitmap.</field>
      <field type="uint32_t" name="custom_mode">A bitfield for autopilot-specific flags.</field>
      <field type="uint8_t" name="system_status" enum="MAV_STATE">System status flag.</field>
      <field type="uint8_t_mavlink_version" name="mavlink_version">MAVLink version.</field>
    </message>
    <message id="30" name="ATTITUDE">
      <description>The attitude in the aeronautical frame.</description>
      <field type="uint32_t" name="time_boot_ms">Timestamp since system boot.</field>
      <field type="float" name="roll">Roll angle (rad).</field>
      <field type="float" name="pitch">Pitch angle (rad).</field>
      <field type="float" name="yaw">Yaw angle (rad).</field>
      <field type="float" name="rollspeed">Roll angular speed (rad/s).</field>
      <field type="float" name="pitchspeed">Pitch angular speed (rad/s).</field>
      <field type="float" name="yawspeed">Yaw angular speed (rad/s).</field>
    </message>
    <message id="36" name="SERVO_OUTPUT_RAW">
      <description>The RAW values of the servo outputs.</description>
      <field type="uint32_t" name="time_usec">Timestamp in microseconds.</field>
      <field type="uint8_t" name="port">Servo output port.</field>
      <field type="uint16_t" name="servo1_raw">Servo output 1 value.</field>
      <field type="uint16_t" name="servo2_raw">Servo output 2 value.</field>
      <field type="uint16_t" name="servo3_raw">Servo output 3 value.</field>
      <field type="uint16_t" name="servo4_raw">Servo output 4 value.</field>
      <field type="uint16_t" name="servo5_raw">Servo output 5 value.</field>
      <field type="uint16_t" name="servo6_raw">Servo output 6 value.</field>
      <field type="uint16_t" name="servo7_raw">Servo output 7 value.</field>
      <field type="uint16_t" name="servo8_raw">Servo output 8 value.</field>
      <extensions/>
      <field type="uint16_t" name="servo9_raw">Servo output 9 value.</field>
      <field type="uint16_t" name="servo10_raw">Servo output 10 value.</field>
      <field type="uint16_t" name="servo11_raw">Servo output 11 value.</field>
      <field type="uint16_t" name="servo12_raw">Servo output 12 value.</field>
      <field type="uint16_t" name="servo13_raw">Servo output 13 value.</field>
      <field type="uint16_t" name="servo14_raw">Servo output 14 value.</field>
      <field type="uint16_t" name="servo15_raw">Servo output 15 value.</field>
      <field type="uint16_t" name="servo16_raw">Servo output 16 value.</field>
    </message>
    <message id="253" name="STATUSTEXT">
      <description>Status text message.</description>
      <field type="uint8_t" name="severity" enum="MAV_SEVERITY">Severity of status.</field>
      <field type="char[50]" name="text">Status text message.</field>
    </message>
    <message id="7000" name="SENSOR_HEALTH">
      <field type="uint16_t" name="flags" enum="SENSOR_FLAGS">Sensor health bitmap.</field>
    </message>
    <message id="7001" name="BULK_DATA">
      <field type="uint64_t" name="data">Raw data words.</field>
      <field type="uint64_t[40]" name="words">Bulk payload words.</field>
    </message>
    <message id="100000" name="TELEMETRY_LOG">
      <field type="uint64_t" name="time_usec">Timestamp in microseconds.</field>
      <field type="uint32_t" name="index">Log record index.</field>
      <field type="char[16]" name="tag">Record tag.</field>
    </message>
  </messages>
</mavlink>
"#;

pub const SECRET_KEY: [u8; 32] = [
    0x00, 0x01, 0xf2, 0xe3, 0xd4, 0xc5, 0xb6, 0xa7, 0x98, 0x00, 0x70, 0x76, 0x34, 0x32, 0x00,
    0x16, 0x22, 0x42, 0x00, 0xcc, 0xff, 0x7a, 0x00, 0x52, 0x75, 0x73, 0x74, 0x00, 0x4d, 0x41,
    0x56, 0xb3,
];

pub fn test_dialect() -> Arc<Dialect> {
    Arc::new(Dialect::from_source(TEST_DIALECT).expect("test dialect must load"))
}

/// A channel with the header values the reference frames use.
pub fn channel(protocol: MavlinkVersion) -> Channel {
    ChannelConf::new()
        .protocol(protocol)
        .system_id(99)
        .component_id(88)
        .build(test_dialect())
}

pub fn signing_channel(protocol: MavlinkVersion, config: SigningConfig) -> Channel {
    ChannelConf::new()
        .protocol(protocol)
        .system_id(99)
        .component_id(88)
        .signing(config)
        .build(test_dialect())
}

pub fn fields(pairs: &[(&str, MavValue)]) -> BTreeMap<String, MavValue> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// type=1, autopilot=2, base_mode=0, custom_mode=0, system_status=4,
/// mavlink_version=3; payload on the wire is `00 00 00 00 01 02 00 04 03`.
pub fn heartbeat_fields() -> BTreeMap<String, MavValue> {
    fields(&[
        ("type", MavValue::UInt8(1)),
        ("autopilot", MavValue::UInt8(2)),
        ("base_mode", MavValue::UInt8(0)),
        ("custom_mode", MavValue::UInt32(0)),
        ("system_status", MavValue::UInt8(4)),
        ("mavlink_version", MavValue::UInt8(3)),
    ])
}

pub fn attitude_fields() -> BTreeMap<String, MavValue> {
    fields(&[
        ("time_boot_ms", MavValue::UInt32(49115)),
        ("roll", MavValue::Float(-0.1589)),
        ("pitch", MavValue::Float(0.0327)),
        ("yaw", MavValue::Float(1.5708)),
        ("rollspeed", MavValue::Float(0.0)),
        ("pitchspeed", MavValue::Float(0.002)),
        ("yawspeed", MavValue::Float(-0.0013)),
    ])
}
