//! Response parsers.
//!
//! Every response type keeps `unparsed_response` verbatim alongside its
//! decoded fields, matching the reference implementation's habit of never
//! discarding the raw bytes — callers that hit a parsing surprise can still
//! inspect exactly what the device sent.
//!
//! Wire layout note: the retrieved reference source only documents the UDP
//! broadcast layout (`discovery::parser`); the TCP *response* body layout
//! below is this crate's own design, built on top of the common 20-byte
//! header from `api::build_packet`. See DESIGN.md for the field offsets
//! chosen and why.

use crate::codec::{read_u16_le, read_u32_le, seconds_to_hms};
use crate::device::{DeviceState, ShutterDirection, ThermostatFanLevel, ThermostatMode, ThermostatSwing};
use crate::error::{Error, Result};

use super::HEADER_LEN;

fn require_non_empty(raw: &[u8]) -> Result<()> {
    if raw.is_empty() {
        return Err(Error::TransportClosed);
    }
    Ok(())
}

/// `LoginResponse`: the session token is the uint32 LE at
/// offset 16, inside the common header every packet shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub session_token: u32,
    pub unparsed_response: Vec<u8>,
}

impl LoginResponse {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        require_non_empty(raw)?;
        if raw.len() < HEADER_LEN {
            return Err(Error::TransportClosed);
        }
        Ok(Self {
            session_token: read_u32_le(raw, 16),
            unparsed_response: raw.to_vec(),
        })
    }
}

/// `BaseResponse`: success iff the single ack byte immediately following
/// the header equals `0x00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseResponse {
    pub success: bool,
    pub unparsed_response: Vec<u8>,
}

impl BaseResponse {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        require_non_empty(raw)?;
        let ack = raw.get(HEADER_LEN).copied().unwrap_or(0xFF);
        Ok(Self { success: ack == 0x00, unparsed_response: raw.to_vec() })
    }
}

/// `StateResponse` (type1: water heater / power plug).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateResponse {
    pub state: DeviceState,
    pub power_watts: u16,
    pub remaining: String,
    pub auto_shutdown: String,
    pub unparsed_response: Vec<u8>,
}

impl StateResponse {
    const BODY_LEN: usize = 11;

    pub fn parse(raw: &[u8]) -> Result<Self> {
        require_non_empty(raw)?;
        if raw.len() < HEADER_LEN + Self::BODY_LEN {
            return Err(Error::TransportClosed);
        }
        let state = DeviceState::from_wire_byte(raw[HEADER_LEN]);
        let (power_watts, remaining) = if state == DeviceState::On {
            (read_u16_le(raw, HEADER_LEN + 1), seconds_to_hms(read_u32_le(raw, HEADER_LEN + 3)))
        } else {
            (0, "00:00:00".to_owned())
        };
        let auto_shutdown = seconds_to_hms(read_u32_le(raw, HEADER_LEN + 7));
        Ok(Self { state, power_watts, remaining, auto_shutdown, unparsed_response: raw.to_vec() })
    }

    /// Derived electric current, `power / 220` to one decimal.
    pub fn electric_current(&self) -> f64 {
        crate::device::power_to_current(self.power_watts)
    }
}

/// `ThermostatStateResponse` (type2: Breeze).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThermostatStateResponse {
    pub state: DeviceState,
    pub mode: ThermostatMode,
    pub current_temp_tenths: u16,
    pub target_temp: u8,
    pub fan_level: ThermostatFanLevel,
    pub swing: ThermostatSwing,
    pub unparsed_response: Vec<u8>,
}

impl ThermostatStateResponse {
    const BODY_LEN: usize = 6;

    pub fn parse(raw: &[u8]) -> Result<Self> {
        require_non_empty(raw)?;
        if raw.len() < HEADER_LEN + Self::BODY_LEN {
            return Err(Error::TransportClosed);
        }
        let state = DeviceState::from_wire_byte(raw[HEADER_LEN]);
        let mode = ThermostatMode::from_wire_hex(&format!("{:02x}", raw[HEADER_LEN + 1]));
        let current_temp_tenths = read_u16_le(raw, HEADER_LEN + 2);
        let target_temp = raw[HEADER_LEN + 4];
        let fan_swing_byte = raw[HEADER_LEN + 5];
        let fan_level = ThermostatFanLevel::from_wire_hex(&format!("{:x}", fan_swing_byte >> 4))
            .unwrap_or(ThermostatFanLevel::Auto);
        let swing = ThermostatSwing::from_wire_nibble(&format!("{:x}", fan_swing_byte & 0x0f));
        Ok(Self {
            state,
            mode,
            current_temp_tenths,
            target_temp,
            fan_level,
            swing,
            unparsed_response: raw.to_vec(),
        })
    }

    pub fn current_temp_celsius(&self) -> f64 {
        self.current_temp_tenths as f64 / 10.0
    }
}

/// `ShutterStateResponse` (type2: Runner / Runner Mini).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutterStateResponse {
    pub position: u8,
    pub direction: ShutterDirection,
    pub unparsed_response: Vec<u8>,
}

impl ShutterStateResponse {
    const BODY_LEN: usize = 2;

    pub fn parse(raw: &[u8]) -> Result<Self> {
        require_non_empty(raw)?;
        if raw.len() < HEADER_LEN + Self::BODY_LEN {
            return Err(Error::TransportClosed);
        }
        let position = raw[HEADER_LEN];
        let direction_hex = format!("{:02x}", raw[HEADER_LEN + 1]);
        let direction = ShutterDirection::from_wire_hex(&direction_hex).unwrap_or(ShutterDirection::Stop);
        Ok(Self { position, direction, unparsed_response: raw.to_vec() })
    }
}

/// One fixed-width schedule slot: 1-byte slot id, 1-byte
/// enabled flag, 1-byte recurrence bitmask, two 4-byte minutes-since-
/// midnight fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub slot_id: u8,
    pub enabled: bool,
    pub recurrence: u8,
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl Schedule {
    pub(crate) const WIRE_LEN: usize = 11;

    pub(crate) fn parse_one(raw: &[u8]) -> Self {
        Schedule {
            slot_id: raw[0],
            enabled: raw[1] != 0,
            recurrence: raw[2],
            start_minutes: read_u32_le(raw, 3),
            end_minutes: read_u32_le(raw, 7),
        }
    }

    /// `true` for slots where bit 0 of the recurrence mask is set — a
    /// one-shot schedule rather than a weekly recurrence.
    pub fn is_one_shot(&self) -> bool {
        self.recurrence & 0x01 != 0
    }

    /// `true` if this schedule recurs on `weekday` (`0` = Sunday,
    /// `Sun..Sat = bits 1..7`).
    pub fn recurs_on(&self, weekday: u8) -> bool {
        weekday <= 6 && self.recurrence & (1 << (weekday + 1)) != 0
    }
}

/// `GetSchedulesResponse`: a concatenation of fixed-width schedule records,
/// parsing stops at the first record whose `enabled` byte is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSchedulesResponse {
    pub schedules: Vec<Schedule>,
    pub unparsed_response: Vec<u8>,
}

impl GetSchedulesResponse {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        require_non_empty(raw)?;
        let body = &raw[HEADER_LEN.min(raw.len())..];
        let mut schedules = Vec::new();
        for chunk in body.chunks(Schedule::WIRE_LEN) {
            if chunk.len() < Schedule::WIRE_LEN {
                break;
            }
            let schedule = Schedule::parse_one(chunk);
            if !schedule.enabled {
                break;
            }
            schedules.push(schedule);
        }
        Ok(Self { schedules, unparsed_response: raw.to_vec() })
    }
}
