//! Stateless UDP broadcast datagram parser.
//!
//! `parse_datagram` is a pure function: same bytes in, same `Device` (or
//! error) out, every time. It never touches a socket.

use tracing::warn;

use crate::codec::{ascii_trim_nul, format_mac, ipv4_from_be, ipv4_from_le, read_u16_le, read_u32_le, seconds_to_hms, to_hex};
use crate::device::{
    Device, DeviceCategory, DeviceIdentity, DeviceState, DeviceType, PowerPlug, ProtocolFamily,
    Shutter, ShutterDirection, Thermostat, ThermostatFanLevel, ThermostatMode, ThermostatSwing,
    WaterHeater,
};
use crate::error::{Error, Result};

const MAGIC: [u8; 2] = [0xFE, 0xF0];
const ACCEPTED_LENGTHS: [usize; 3] = [165, 168, 159];

const OFFSET_DEVICE_ID: usize = 18;
const OFFSET_NAME: usize = 42;
const NAME_LEN: usize = 32;
const OFFSET_MODEL_CODE: usize = 74;
const OFFSET_IP_TYPE1: usize = 76;
const OFFSET_IP_TYPE2: usize = 77;
const OFFSET_MAC: usize = 80;
const MAC_LEN: usize = 6;
const OFFSET_STATE_TYPE1: usize = 133;
const OFFSET_POWER: usize = 135;
const OFFSET_REMAINING: usize = 147;
const OFFSET_AUTO_SHUTDOWN: usize = 155;

const OFFSET_SHUTTER_DIRECTION: usize = 137;

const OFFSET_BREEZE_ON_OFF: usize = 137;
const OFFSET_BREEZE_MODE: usize = 138;
const OFFSET_BREEZE_TARGET_TEMP: usize = 139;
const OFFSET_BREEZE_FAN_SWING: usize = 140;
const OFFSET_BREEZE_REMOTE_ID: usize = 143;
const REMOTE_ID_LEN: usize = 8;

/// Gate: does `datagram` look like it came from a Switcher device at all?
fn is_switcher_originator(datagram: &[u8]) -> bool {
    datagram.len() >= 2
        && datagram[0..2] == MAGIC
        && ACCEPTED_LENGTHS.contains(&datagram.len())
}

fn device_id(datagram: &[u8]) -> String {
    to_hex(&datagram[OFFSET_DEVICE_ID..OFFSET_DEVICE_ID + 3])
}

fn name(datagram: &[u8]) -> String {
    ascii_trim_nul(&datagram[OFFSET_NAME..OFFSET_NAME + NAME_LEN])
}

fn model_hex(datagram: &[u8]) -> String {
    to_hex(&datagram[OFFSET_MODEL_CODE..OFFSET_MODEL_CODE + 2])
}

fn mac(datagram: &[u8]) -> String {
    format_mac(&datagram[OFFSET_MAC..OFFSET_MAC + MAC_LEN])
}

fn identity(datagram: &[u8], device_type: DeviceType) -> DeviceIdentity {
    let ip = match device_type.protocol_family() {
        ProtocolFamily::Type1 => ipv4_from_le(datagram, OFFSET_IP_TYPE1),
        ProtocolFamily::Type2 => ipv4_from_be(datagram, OFFSET_IP_TYPE2),
    };
    DeviceIdentity {
        device_id: device_id(datagram),
        mac: mac(datagram),
        ip,
        name: name(datagram),
        device_type,
    }
}

fn power_consumption(datagram: &[u8]) -> u16 {
    read_u16_le(datagram, OFFSET_POWER)
}

fn remaining(datagram: &[u8]) -> u32 {
    read_u32_le(datagram, OFFSET_REMAINING)
}

fn auto_shutdown(datagram: &[u8]) -> u32 {
    read_u32_le(datagram, OFFSET_AUTO_SHUTDOWN)
}

/// Known-idiosyncratic shutter position decoding: the high byte is taken as
/// its raw integer value, the low byte is taken as the *decimal reading* of
/// its own hex digits (e.g. a low byte of `0x32` contributes `32`, not
/// `0x32 == 50`). Reproduced exactly from the reference parser — do not
/// "fix" this without device evidence.
fn shutter_position(datagram: &[u8]) -> u8 {
    let high = datagram[OFFSET_POWER];
    let low = datagram[OFFSET_POWER + 1];
    let decimal_digits_of_low = format!("{low:02x}").parse::<u32>().unwrap_or(0);
    (high as u32 + decimal_digits_of_low) as u8
}

fn shutter_direction(datagram: &[u8]) -> ShutterDirection {
    let hex = to_hex(&datagram[OFFSET_SHUTTER_DIRECTION..OFFSET_SHUTTER_DIRECTION + 2]);
    ShutterDirection::from_wire_hex(&hex).unwrap_or(ShutterDirection::Stop)
}

fn breeze_current_temp_tenths(datagram: &[u8]) -> u16 {
    read_u16_le(datagram, OFFSET_POWER)
}

fn breeze_state(datagram: &[u8]) -> DeviceState {
    DeviceState::from_wire_byte(datagram[OFFSET_BREEZE_ON_OFF])
}

fn breeze_mode(datagram: &[u8]) -> ThermostatMode {
    let hex = to_hex(&datagram[OFFSET_BREEZE_MODE..OFFSET_BREEZE_MODE + 1]);
    let mode = ThermostatMode::from_wire_hex(&hex);
    if hex != mode.wire_hex() {
        warn!(hex = %hex, "unrecognised breeze mode byte, defaulting to cool");
    }
    mode
}

fn breeze_target_temp(datagram: &[u8]) -> u8 {
    datagram[OFFSET_BREEZE_TARGET_TEMP]
}

fn breeze_fan_level(datagram: &[u8]) -> ThermostatFanLevel {
    let byte = datagram[OFFSET_BREEZE_FAN_SWING];
    let high_nibble = format!("{:x}", byte >> 4);
    ThermostatFanLevel::from_wire_hex(&high_nibble).unwrap_or(ThermostatFanLevel::Auto)
}

fn breeze_swing(datagram: &[u8]) -> ThermostatSwing {
    let byte = datagram[OFFSET_BREEZE_FAN_SWING];
    let low_nibble = format!("{:x}", byte & 0x0f);
    ThermostatSwing::from_wire_nibble(&low_nibble)
}

fn breeze_remote_id(datagram: &[u8]) -> String {
    String::from_utf8_lossy(&datagram[OFFSET_BREEZE_REMOTE_ID..OFFSET_BREEZE_REMOTE_ID + REMOTE_ID_LEN]).into_owned()
}

/// Parse one UDP broadcast payload into a typed `Device`.
///
/// Returns `Error::NotSwitcherOrigin` if the magic/length gate fails, and
/// `Error::UnknownModel` if the gate passes but the embedded model code
/// doesn't resolve to a known `DeviceType`.
pub fn parse_datagram(datagram: &[u8]) -> Result<Device> {
    if !is_switcher_originator(datagram) {
        return Err(Error::NotSwitcherOrigin);
    }

    let model = model_hex(datagram);
    let device_type = DeviceType::from_hex_rep(&model).ok_or_else(|| Error::UnknownModel(model.clone()))?;

    let identity = identity(datagram, device_type);

    let device = match device_type.category() {
        DeviceCategory::WaterHeater => {
            let state = DeviceState::from_wire_byte(datagram[OFFSET_STATE_TYPE1]);
            let (power_watts, remaining_str) = if state == DeviceState::On {
                (power_consumption(datagram), seconds_to_hms(remaining(datagram)))
            } else {
                (0, "00:00:00".to_owned())
            };
            Device::WaterHeater(WaterHeater {
                identity,
                state,
                power_watts,
                remaining: remaining_str,
                auto_shutdown: seconds_to_hms(auto_shutdown(datagram)),
            })
        }
        DeviceCategory::PowerPlug => {
            let state = DeviceState::from_wire_byte(datagram[OFFSET_STATE_TYPE1]);
            let power_watts = if state == DeviceState::On { power_consumption(datagram) } else { 0 };
            Device::PowerPlug(PowerPlug { identity, state, power_watts })
        }
        DeviceCategory::Shutter => Device::Shutter(Shutter {
            identity,
            position: shutter_position(datagram),
            direction: shutter_direction(datagram),
        }),
        DeviceCategory::Thermostat => Device::Thermostat(Thermostat {
            identity,
            state: breeze_state(datagram),
            current_temp_tenths: breeze_current_temp_tenths(datagram),
            target_temp: breeze_target_temp(datagram),
            mode: breeze_mode(datagram),
            fan_level: breeze_fan_level(datagram),
            swing: breeze_swing(datagram),
            remote_id: breeze_remote_id(datagram),
        }),
    };

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a zero-filled 165-byte type1 datagram and patch in the given
    /// fields, mirroring the S1 scenario fixture.
    fn water_heater_datagram() -> Vec<u8> {
        let mut buf = vec![0u8; 165];
        buf[0..2].copy_from_slice(&MAGIC);
        // device_id "3933ac" -> bytes 0x39 0x33 0xac at offset 18
        buf[18..21].copy_from_slice(&[0x39, 0x33, 0xac]);
        // name "Boiler\0..."
        let name = b"Boiler";
        buf[42..42 + name.len()].copy_from_slice(name);
        // model "0100"
        buf[74..76].copy_from_slice(&[0x01, 0x00]);
        // ip bytes 04 03 02 01 (LE -> 1.2.3.4)
        buf[76..80].copy_from_slice(&[0x04, 0x03, 0x02, 0x01]);
        // power bytes A0 05 -> 0x05A0 = 1440
        buf[135..137].copy_from_slice(&[0xA0, 0x05]);
        // remaining seconds: 4126 = 0x0000101E, LE -> 1E 10 00 00
        buf[147..151].copy_from_slice(&[0x1E, 0x10, 0x00, 0x00]);
        // state on
        buf[133] = 0x01;
        buf
    }

    #[test]
    fn s1_water_heater_discovery() {
        let datagram = water_heater_datagram();
        let device = parse_datagram(&datagram).expect("should parse");
        match device {
            Device::WaterHeater(w) => {
                assert_eq!(w.identity.device_id, "3933ac");
                assert_eq!(w.identity.ip.to_string(), "1.2.3.4");
                assert_eq!(w.state, DeviceState::On);
                assert_eq!(w.power_watts, 1440);
                assert_eq!(w.electric_current(), 6.5);
                assert_eq!(w.remaining, "01:08:46");
            }
            other => panic!("expected water heater, got {other:?}"),
        }
    }

    #[test]
    fn s2_unknown_origin_is_rejected() {
        let mut datagram = vec![0u8; 165];
        datagram[0..2].copy_from_slice(&[0xDE, 0xAD]);
        assert!(matches!(parse_datagram(&datagram), Err(Error::NotSwitcherOrigin)));
    }

    #[test]
    fn magic_gate_rejects_wrong_length() {
        let mut datagram = vec![0u8; 166];
        datagram[0..2].copy_from_slice(&MAGIC);
        assert!(matches!(parse_datagram(&datagram), Err(Error::NotSwitcherOrigin)));
    }

    #[test]
    fn unknown_model_code_is_rejected() {
        let mut datagram = water_heater_datagram();
        datagram[74..76].copy_from_slice(&[0xff, 0xff]);
        assert!(matches!(parse_datagram(&datagram), Err(Error::UnknownModel(_))));
    }

    #[test]
    fn off_water_heater_has_zero_power_and_current() {
        let mut datagram = water_heater_datagram();
        datagram[133] = 0x00;
        let device = parse_datagram(&datagram).unwrap();
        match device {
            Device::WaterHeater(w) => {
                assert_eq!(w.power_watts, 0);
                assert_eq!(w.electric_current(), 0.0);
                assert_eq!(w.remaining, "00:00:00");
            }
            other => panic!("expected water heater, got {other:?}"),
        }
    }

    #[test]
    fn parser_is_deterministic() {
        let datagram = water_heater_datagram();
        assert_eq!(parse_datagram(&datagram), parse_datagram(&datagram));
    }

    #[test]
    fn shutter_position_quirk_matches_reference() {
        let mut datagram = vec![0u8; 159];
        datagram[0..2].copy_from_slice(&MAGIC);
        // Runner model code
        datagram[74..76].copy_from_slice(&[0x03, 0x01]);
        datagram[77..81].copy_from_slice(&[1, 2, 3, 4]);
        // high byte 0x00, low byte 0x32 -> decimal digits "32" -> 32 + 0 = 32
        datagram[135] = 0x00;
        datagram[136] = 0x32;
        datagram[137..139].copy_from_slice(&[0x00, 0x01]);
        let device = parse_datagram(&datagram).unwrap();
        match device {
            Device::Shutter(s) => {
                assert_eq!(s.position, 32);
                assert_eq!(s.direction, ShutterDirection::Up);
            }
            other => panic!("expected shutter, got {other:?}"),
        }
    }

    #[test]
    fn breeze_unknown_mode_falls_back_to_cool() {
        let mut datagram = vec![0u8; 168];
        datagram[0..2].copy_from_slice(&MAGIC);
        datagram[74..76].copy_from_slice(&[0x09, 0x00]);
        datagram[77..81].copy_from_slice(&[1, 2, 3, 4]);
        datagram[138] = 0xff;
        let device = parse_datagram(&datagram).unwrap();
        match device {
            Device::Thermostat(t) => assert_eq!(t.mode, ThermostatMode::Cool),
            other => panic!("expected thermostat, got {other:?}"),
        }
    }
}
