//! The TCP protocol engine.
//!
//! Every logical operation is `connect -> login -> one request -> parse ->
//! disconnect`; sessions are never pooled. `Type1Api` covers water heaters
//! and power plugs, `Type2Api` covers shutters and Breeze thermostats —
//! they share packet framing and session lifecycle but carry different
//! login bodies and command sets.
//!
//! Wire layout note: the TCP *response body* layout past the common
//! 20-byte header, and the numeric command codes below, are this crate's
//! own self-consistent design. See DESIGN.md.

pub mod messages;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::codec::{append_crc, write_u16_le, write_u32_le};
use crate::error::{Error, Result};
use crate::remote::SwitcherBreezeCommand;

use self::messages::{
    BaseResponse, GetSchedulesResponse, LoginResponse, ShutterStateResponse, StateResponse,
    ThermostatStateResponse,
};

/// TCP control port every Switcher device listens on.
pub const CONTROL_PORT: u16 = 9957;

/// Default read/connect deadline; overridable via
/// `Type1Api::with_timeout` / `Type2Api::with_timeout`.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sentinel session token carried by the login request, before a real
/// token has been issued.
const PRE_LOGIN_SESSION_TOKEN: u32 = 0xFFFF_FFFE;

/// Length of the common packet header: magic(2) + length(2) + command(4) +
/// session token(4) + reserved(2) + counter(2) + timestamp(4).
pub(crate) const HEADER_LEN: usize = 20;

const MAX_RESPONSE_SIZE: usize = 4096;

mod command_code {
    pub const LOGIN_TYPE1: u32 = 0x0000_0001;
    pub const LOGIN_TYPE2: u32 = 0x0000_0030;
    pub const GET_STATE: u32 = 0x0000_0002;
    pub const CONTROL_DEVICE: u32 = 0x0000_0003;
    pub const SET_NAME: u32 = 0x0000_0004;
    pub const SET_AUTO_SHUTDOWN: u32 = 0x0000_0005;
    pub const GET_SCHEDULES: u32 = 0x0000_0006;
    pub const DELETE_SCHEDULE: u32 = 0x0000_0007;
    pub const CREATE_SCHEDULE: u32 = 0x0000_0008;
    pub const GET_BREEZE_STATE: u32 = 0x0000_0020;
    pub const CONTROL_BREEZE: u32 = 0x0000_0021;
    pub const GET_SHUTTER_STATE: u32 = 0x0000_0022;
    pub const SET_POSITION: u32 = 0x0000_0023;
    pub const STOP: u32 = 0x0000_0024;
}

/// Turn a device on or off (type1 `control_device`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
}

/// Assemble one outgoing packet: `magic | length | command | session token
/// | reserved | counter | timestamp | body | crc`.
fn build_packet(command: u32, session_token: u32, counter: u16, body: &[u8]) -> Vec<u8> {
    let mut rest = Vec::with_capacity(16 + body.len());
    write_u32_le(&mut rest, command);
    write_u32_le(&mut rest, session_token);
    write_u16_le(&mut rest, 0); // reserved
    write_u16_le(&mut rest, counter);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32;
    write_u32_le(&mut rest, timestamp);
    rest.extend_from_slice(body);

    let mut packet = Vec::with_capacity(4 + rest.len() + 2);
    packet.extend_from_slice(&[0xFE, 0xF0]);
    // Length field covers everything following it: header tail + body + crc.
    write_u16_le(&mut packet, (rest.len() + 2) as u16);
    packet.extend_from_slice(&rest);
    append_crc(&mut packet);
    packet
}

/// One TCP connection, live for exactly one logical operation.
struct Session {
    stream: TcpStream,
    counter: u16,
    deadline: Duration,
}

impl Session {
    async fn connect(host: &str, port: u16, deadline: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = timeout(deadline, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Timeout)??;
        Ok(Self { stream, counter: 0, deadline })
    }

    /// Send one packet and read exactly one response. An empty read (peer
    /// closed mid-frame) is returned as `Ok(vec![])` — callers decide
    /// whether that means `LoginFailed` or `RequestFailed`.
    async fn exchange(&mut self, command: u32, session_token: u32, body: &[u8]) -> Result<Vec<u8>> {
        let packet = build_packet(command, session_token, self.counter, body);
        self.counter = self.counter.wrapping_add(1);

        timeout(self.deadline, self.stream.write_all(&packet))
            .await
            .map_err(|_| Error::Timeout)??;

        let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
        let n = timeout(self.deadline, self.stream.read(&mut buf))
            .await
            .map_err(|_| Error::Timeout)??;
        buf.truncate(n);
        Ok(buf)
    }
}

fn parse_hhmm(value: &str) -> Result<u32> {
    let (h, m) = value
        .split_once(':')
        .ok_or_else(|| Error::InvalidArgument(format!("expected \"HH:MM\", got {value:?}")))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid hour in {value:?}")))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid minute in {value:?}")))?;
    if hour > 23 || minute > 59 {
        return Err(Error::InvalidArgument(format!("time out of range: {value:?}")));
    }
    Ok(hour * 60 + minute)
}

fn parse_slot_id(slot_id: &str) -> Result<u8> {
    match slot_id {
        "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" => Ok(slot_id.as_bytes()[0] - b'0'),
        other => Err(Error::InvalidArgument(format!(
            "schedule slot id must be \"0\"..\"7\", got {other:?}"
        ))),
    }
}

/// Water heater / power plug control.
pub struct Type1Api {
    host: String,
    #[allow(dead_code)]
    device_id: String,
    port: u16,
    timeout: Duration,
}

impl Type1Api {
    pub fn new(host: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self { host: host.into(), device_id: device_id.into(), port: CONTROL_PORT, timeout: DEFAULT_TIMEOUT }
    }

    /// Override the default 5s read/connect deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the control port. Real devices always listen on
    /// [`CONTROL_PORT`]; this exists so tests can drive the engine against
    /// an in-process loopback listener.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn login(&self, session: &mut Session) -> Result<LoginResponse> {
        // Local phone-id (4 bytes) + device key (4 bytes), both
        // device-instance-specific. Zeroed here — see DESIGN.md.
        let body = [0u8; 8];
        let raw = session.exchange(command_code::LOGIN_TYPE1, PRE_LOGIN_SESSION_TOKEN, &body).await?;
        LoginResponse::parse(&raw).map_err(|_| Error::LoginFailed)
    }

    async fn run<T>(&self, op: &'static str, command: u32, body: &[u8], parse: fn(&[u8]) -> Result<T>) -> Result<T> {
        info!(host = %self.host, op, "opening switcher tcp session");
        let mut session = Session::connect(&self.host, self.port, self.timeout).await?;
        let login = self.login(&mut session).await?;
        debug!(session_token = login.session_token, "login succeeded");

        let raw = session.exchange(command, login.session_token, body).await?;
        parse(&raw).map_err(|_| Error::RequestFailed(op))
    }

    pub async fn get_state(&self) -> Result<StateResponse> {
        self.run("get state", command_code::GET_STATE, &[], StateResponse::parse).await
    }

    pub async fn control_device(&self, command: Command, minutes: u32) -> Result<BaseResponse> {
        let mut body = Vec::with_capacity(5);
        body.push(match command {
            Command::On => 0x01,
            Command::Off => 0x00,
        });
        write_u32_le(&mut body, if command == Command::On { minutes } else { 0 });
        let op = match command {
            Command::On => "turn on",
            Command::Off => "turn off",
        };
        self.run(op, command_code::CONTROL_DEVICE, &body, BaseResponse::parse).await
    }

    pub async fn set_device_name(&self, name: &str) -> Result<BaseResponse> {
        if name.len() > 32 {
            return Err(Error::InvalidArgument(format!(
                "device name must be at most 32 bytes, got {}",
                name.len()
            )));
        }
        let mut body = vec![0u8; 32];
        body[..name.len()].copy_from_slice(name.as_bytes());
        self.run("set name", command_code::SET_NAME, &body, BaseResponse::parse).await
    }

    /// `duration` is rounded to the nearest minute and must fall within
    /// `[1h, 23h59m]` inclusive.
    pub async fn set_auto_shutdown(&self, duration: Duration) -> Result<BaseResponse> {
        let total_secs = duration.as_secs();
        let rounded = (total_secs + 30) / 60 * 60;
        if !(3600..=86340).contains(&rounded) {
            return Err(Error::InvalidArgument(format!(
                "auto shutdown must round to a value within [3600, 86340] seconds, got {total_secs}"
            )));
        }
        let mut body = Vec::with_capacity(4);
        write_u32_le(&mut body, rounded as u32);
        self.run("set auto shutdown", command_code::SET_AUTO_SHUTDOWN, &body, BaseResponse::parse).await
    }

    pub async fn get_schedules(&self) -> Result<GetSchedulesResponse> {
        self.run("get schedules", command_code::GET_SCHEDULES, &[], GetSchedulesResponse::parse).await
    }

    pub async fn delete_schedule(&self, slot_id: &str) -> Result<BaseResponse> {
        let slot = parse_slot_id(slot_id)?;
        self.run("delete schedule", command_code::DELETE_SCHEDULE, &[slot], BaseResponse::parse).await
    }

    /// `weekday_mask` defaults to one-shot (bit 0 set, no weekday bits) when
    /// `None`, matching the reference test suite's two-argument call shape.
    pub async fn create_schedule(&self, start: &str, end: &str, weekday_mask: Option<u8>) -> Result<BaseResponse> {
        let start_minutes = parse_hhmm(start)?;
        let end_minutes = parse_hhmm(end)?;
        let recurrence = weekday_mask.unwrap_or(0x01);

        // Body mirrors the schedule record layout the device hands back from
        // `get_schedules` (`Schedule::parse_one`, WIRE_LEN = 11): slot id,
        // enabled flag, recurrence, start, end. `0xFF` asks the device to
        // assign the first free slot rather than naming one.
        let mut body = Vec::with_capacity(11);
        body.push(0xFF);
        body.push(0x01);
        body.push(recurrence);
        write_u32_le(&mut body, start_minutes);
        write_u32_le(&mut body, end_minutes);
        self.run("create schedule", command_code::CREATE_SCHEDULE, &body, BaseResponse::parse).await
    }
}

/// Shutter/Runner and Breeze thermostat control.
pub struct Type2Api {
    host: String,
    device_id: String,
    port: u16,
    timeout: Duration,
}

impl Type2Api {
    pub fn new(host: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self { host: host.into(), device_id: device_id.into(), port: CONTROL_PORT, timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn login(&self, session: &mut Session) -> Result<LoginResponse> {
        // 8-byte device key + 6-hex device id.
        let mut body = Vec::with_capacity(14);
        body.extend_from_slice(&[0u8; 8]);
        body.extend_from_slice(self.device_id.as_bytes());
        let raw = session.exchange(command_code::LOGIN_TYPE2, PRE_LOGIN_SESSION_TOKEN, &body).await?;
        LoginResponse::parse(&raw).map_err(|_| Error::LoginFailed)
    }

    async fn run<T>(&self, op: &'static str, command: u32, body: &[u8], parse: fn(&[u8]) -> Result<T>) -> Result<T> {
        info!(host = %self.host, op, "opening switcher tcp session");
        let mut session = Session::connect(&self.host, self.port, self.timeout).await?;
        let login = self.login(&mut session).await?;
        debug!(session_token = login.session_token, "login succeeded");

        let raw = session.exchange(command, login.session_token, body).await?;
        parse(&raw).map_err(|_| Error::RequestFailed(op))
    }

    pub async fn get_breeze_state(&self) -> Result<ThermostatStateResponse> {
        self.run("get breeze state", command_code::GET_BREEZE_STATE, &[], ThermostatStateResponse::parse).await
    }

    pub async fn control_breeze_device(&self, command: &SwitcherBreezeCommand) -> Result<BaseResponse> {
        self.run("control breeze", command_code::CONTROL_BREEZE, &command.bytes, BaseResponse::parse).await
    }

    pub async fn get_shutter_state(&self) -> Result<ShutterStateResponse> {
        self.run("get shutter state", command_code::GET_SHUTTER_STATE, &[], ShutterStateResponse::parse).await
    }

    pub async fn set_position(&self, position: u8) -> Result<BaseResponse> {
        if position > 100 {
            return Err(Error::InvalidArgument(format!("shutter position must be 0..=100, got {position}")));
        }
        self.run("set position", command_code::SET_POSITION, &[position], BaseResponse::parse).await
    }

    pub async fn stop(&self) -> Result<BaseResponse> {
        self.run("stop", command_code::STOP, &[], BaseResponse::parse).await
    }

    /// Control devices also accept `control_device`; `Type2Api` reuses
    /// `Type1Api`'s body shape for the few type2 devices that mirror it
    /// (none currently bundled, kept for parity with the abstract public
    /// interface).
    pub async fn control_device(&self, command: Command, minutes: u32) -> Result<BaseResponse> {
        let mut body = Vec::with_capacity(5);
        body.push(match command {
            Command::On => 0x01,
            Command::Off => 0x00,
        });
        write_u32_le(&mut body, if command == Command::On { minutes } else { 0 });
        let op = match command {
            Command::On => "turn on",
            Command::Off => "turn off",
        };
        self.run(op, command_code::CONTROL_DEVICE, &body, BaseResponse::parse).await
    }
}
