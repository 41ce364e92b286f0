//! The device identity and state data model.
//!
//! Every type here is a plain, immutable value — no I/O, no async, nothing
//! that needs a runtime. `discovery::parse_datagram` and `api::messages`
//! are the only producers.

use std::fmt;
use std::net::Ipv4Addr;

/// Which UDP port / login packet shape / framing a device family uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    /// Water heaters, power plugs — UDP port 20002.
    Type1,
    /// Shutters/runners, Breeze thermostats — UDP port 20003.
    Type2,
}

/// The high-level product category, independent of wire-protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCategory {
    WaterHeater,
    PowerPlug,
    Shutter,
    Thermostat,
}

/// A closed enumeration of known device models. Carries the 4-hex-digit
/// model code observed on the wire, its protocol family, and its category —
/// an enum-of-enums rather than a class hierarchy.
///
/// Model codes below are the representative set for each product line
/// named in the reference bridge module's port comments; see DESIGN.md for
/// how they were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    WaterHeaterV2,
    WaterHeaterTouch,
    WaterHeaterV4,
    Mini,
    PowerPlug,
    Breeze,
    Runner,
    RunnerMini,
}

impl DeviceType {
    /// The 4-hex-digit model code for this device type, as seen at
    /// datagram offset 74.
    pub fn hex_rep(self) -> &'static str {
        match self {
            DeviceType::WaterHeaterV2 => "0100",
            DeviceType::WaterHeaterTouch => "0A00",
            DeviceType::WaterHeaterV4 => "0A01",
            DeviceType::Mini => "0501",
            DeviceType::PowerPlug => "0200",
            DeviceType::Breeze => "0900",
            DeviceType::Runner => "0301",
            DeviceType::RunnerMini => "0341",
        }
    }

    pub fn protocol_family(self) -> ProtocolFamily {
        match self {
            DeviceType::WaterHeaterV2
            | DeviceType::WaterHeaterTouch
            | DeviceType::WaterHeaterV4
            | DeviceType::Mini
            | DeviceType::PowerPlug => ProtocolFamily::Type1,
            DeviceType::Breeze | DeviceType::Runner | DeviceType::RunnerMini => {
                ProtocolFamily::Type2
            }
        }
    }

    pub fn category(self) -> DeviceCategory {
        match self {
            DeviceType::WaterHeaterV2 | DeviceType::WaterHeaterTouch | DeviceType::WaterHeaterV4
            | DeviceType::Mini => DeviceCategory::WaterHeater,
            DeviceType::PowerPlug => DeviceCategory::PowerPlug,
            DeviceType::Breeze => DeviceCategory::Thermostat,
            DeviceType::Runner | DeviceType::RunnerMini => DeviceCategory::Shutter,
        }
    }

    /// Look up a device type by its wire `hex_rep`. Built once, as a static
    /// table, rather than reconstructed on every call.
    pub fn from_hex_rep(hex_rep: &str) -> Option<Self> {
        const ALL: &[DeviceType] = &[
            DeviceType::WaterHeaterV2,
            DeviceType::WaterHeaterTouch,
            DeviceType::WaterHeaterV4,
            DeviceType::Mini,
            DeviceType::PowerPlug,
            DeviceType::Breeze,
            DeviceType::Runner,
            DeviceType::RunnerMini,
        ];
        ALL.iter().copied().find(|t| t.hex_rep().eq_ignore_ascii_case(hex_rep))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    /// Wire encoding: `"01"` for on, `"00"` for off.
    pub fn from_wire_byte(byte: u8) -> Self {
        if byte == 0x01 {
            DeviceState::On
        } else {
            DeviceState::Off
        }
    }

    pub fn wire_byte(self) -> u8 {
        match self {
            DeviceState::On => 0x01,
            DeviceState::Off => 0x00,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatMode {
    Auto,
    Dry,
    Fan,
    Cool,
    Heat,
}

impl ThermostatMode {
    pub fn display(self) -> &'static str {
        match self {
            ThermostatMode::Auto => "auto",
            ThermostatMode::Dry => "dry",
            ThermostatMode::Fan => "fan",
            ThermostatMode::Cool => "cool",
            ThermostatMode::Heat => "heat",
        }
    }

    pub fn wire_hex(self) -> &'static str {
        match self {
            ThermostatMode::Auto => "01",
            ThermostatMode::Dry => "02",
            ThermostatMode::Fan => "03",
            ThermostatMode::Cool => "04",
            ThermostatMode::Heat => "05",
        }
    }

    /// Decode the wire byte, falling back to `Cool` for any unrecognised
    /// value.
    pub fn from_wire_hex(hex: &str) -> Self {
        match hex.to_ascii_lowercase().as_str() {
            "01" => ThermostatMode::Auto,
            "02" => ThermostatMode::Dry,
            "03" => ThermostatMode::Fan,
            "04" => ThermostatMode::Cool,
            "05" => ThermostatMode::Heat,
            _ => ThermostatMode::Cool,
        }
    }
}

impl fmt::Display for ThermostatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

impl ThermostatMode {
    /// Parse a remote-database mode name (`"auto"`, `"dry"`, ...).
    pub fn from_display(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(ThermostatMode::Auto),
            "dry" => Some(ThermostatMode::Dry),
            "fan" => Some(ThermostatMode::Fan),
            "cool" => Some(ThermostatMode::Cool),
            "heat" => Some(ThermostatMode::Heat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatFanLevel {
    Auto,
    Low,
    Medium,
    High,
}

impl ThermostatFanLevel {
    pub fn wire_hex(self) -> &'static str {
        match self {
            ThermostatFanLevel::Auto => "0",
            ThermostatFanLevel::Low => "1",
            ThermostatFanLevel::Medium => "2",
            ThermostatFanLevel::High => "3",
        }
    }

    pub fn from_wire_hex(hex: &str) -> Option<Self> {
        match hex {
            "0" => Some(ThermostatFanLevel::Auto),
            "1" => Some(ThermostatFanLevel::Low),
            "2" => Some(ThermostatFanLevel::Medium),
            "3" => Some(ThermostatFanLevel::High),
            _ => None,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            ThermostatFanLevel::Auto => "auto",
            ThermostatFanLevel::Low => "low",
            ThermostatFanLevel::Medium => "medium",
            ThermostatFanLevel::High => "high",
        }
    }

    /// Parse a remote-database fan level name.
    pub fn from_display(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(ThermostatFanLevel::Auto),
            "low" => Some(ThermostatFanLevel::Low),
            "medium" => Some(ThermostatFanLevel::Medium),
            "high" => Some(ThermostatFanLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for ThermostatFanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatSwing {
    On,
    Off,
}

impl ThermostatSwing {
    pub fn from_wire_nibble(nibble: &str) -> Self {
        if nibble == "0" {
            ThermostatSwing::Off
        } else {
            ThermostatSwing::On
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterDirection {
    Up,
    Down,
    Stop,
}

impl ShutterDirection {
    pub fn from_wire_hex(hex: &str) -> Option<Self> {
        match hex.to_ascii_lowercase().as_str() {
            "01" => Some(ShutterDirection::Up),
            "02" => Some(ShutterDirection::Down),
            "00" => Some(ShutterDirection::Stop),
            _ => None,
        }
    }
}

/// Shared identity fields common to every discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// 6-hex-digit device id, e.g. `"3933ac"`.
    pub device_id: String,
    /// Canonical `AA:BB:CC:DD:EE:FF` MAC address.
    pub mac: String,
    pub ip: Ipv4Addr,
    pub name: String,
    pub device_type: DeviceType,
}

/// `current = power / 220`, rounded to one decimal, truncated.
pub fn power_to_current(power_watts: u16) -> f64 {
    if power_watts == 0 {
        return 0.0;
    }
    ((power_watts as f64 / 220.0) * 10.0).trunc() / 10.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterHeater {
    pub identity: DeviceIdentity,
    pub state: DeviceState,
    pub power_watts: u16,
    pub remaining: String,
    pub auto_shutdown: String,
}

impl WaterHeater {
    pub fn electric_current(&self) -> f64 {
        power_to_current(self.power_watts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerPlug {
    pub identity: DeviceIdentity,
    pub state: DeviceState,
    pub power_watts: u16,
}

impl PowerPlug {
    pub fn electric_current(&self) -> f64 {
        power_to_current(self.power_watts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shutter {
    pub identity: DeviceIdentity,
    pub position: u8,
    pub direction: ShutterDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thermostat {
    pub identity: DeviceIdentity,
    pub state: DeviceState,
    /// Tenths of a degree Celsius, e.g. `215` means 21.5°C.
    pub current_temp_tenths: u16,
    pub target_temp: u8,
    pub mode: ThermostatMode,
    pub fan_level: ThermostatFanLevel,
    pub swing: ThermostatSwing,
    pub remote_id: String,
}

impl Thermostat {
    pub fn current_temp_celsius(&self) -> f64 {
        self.current_temp_tenths as f64 / 10.0
    }
}

/// A discovered device, tagged by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    WaterHeater(WaterHeater),
    PowerPlug(PowerPlug),
    Shutter(Shutter),
    Thermostat(Thermostat),
}

impl Device {
    pub fn identity(&self) -> &DeviceIdentity {
        match self {
            Device::WaterHeater(d) => &d.identity,
            Device::PowerPlug(d) => &d.identity,
            Device::Shutter(d) => &d.identity,
            Device::Thermostat(d) => &d.identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_lookup_round_trips_every_known_code() {
        for t in [
            DeviceType::WaterHeaterV2,
            DeviceType::WaterHeaterTouch,
            DeviceType::WaterHeaterV4,
            DeviceType::Mini,
            DeviceType::PowerPlug,
            DeviceType::Breeze,
            DeviceType::Runner,
            DeviceType::RunnerMini,
        ] {
            assert_eq!(DeviceType::from_hex_rep(t.hex_rep()), Some(t));
        }
    }

    #[test]
    fn device_type_lookup_rejects_unknown_code() {
        assert_eq!(DeviceType::from_hex_rep("ffff"), None);
    }

    #[test]
    fn power_to_current_zero_power_is_zero() {
        assert_eq!(power_to_current(0), 0.0);
    }

    #[test]
    fn power_to_current_matches_s1_fixture() {
        // 1440 W / 220 = 6.5454... -> truncated to one decimal = 6.5
        assert_eq!(power_to_current(1440), 6.5);
    }

    #[test]
    fn thermostat_mode_unknown_byte_falls_back_to_cool() {
        assert_eq!(ThermostatMode::from_wire_hex("ff"), ThermostatMode::Cool);
    }

    #[test]
    fn thermostat_swing_nibble_decoding() {
        assert_eq!(ThermostatSwing::from_wire_nibble("0"), ThermostatSwing::Off);
        assert_eq!(ThermostatSwing::from_wire_nibble("1"), ThermostatSwing::On);
        assert_eq!(ThermostatSwing::from_wire_nibble("f"), ThermostatSwing::On);
    }
}
