//! Wire schema for the IR-remote definition JSON file.
//!
//! These types mirror the on-disk document structure exactly; `RemoteDef`
//! (in `mod.rs`) is the validated, query-ready form built from them.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawRemoteDef {
    #[serde(rename = "SupportedModes")]
    pub supported_modes: Vec<RawModeEntry>,
    #[serde(rename = "MinTemperature")]
    pub min_temperature: i32,
    #[serde(rename = "MaxTemperature")]
    pub max_temperature: i32,
    #[serde(rename = "OnOffType")]
    pub on_off_type: String,
    #[serde(rename = "SwingType")]
    pub swing_type: String,
    #[serde(rename = "ToggleCommand")]
    pub toggle_command: Option<String>,
    #[serde(rename = "OffCommand")]
    pub off_command: Option<String>,
    #[serde(rename = "SwingCommand")]
    pub swing_command: Option<String>,
    /// Keyed `"{mode}|{fan}|{target_temp}"`, hex-encoded payload fragment.
    #[serde(rename = "Commands", default)]
    pub commands: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct RawModeEntry {
    #[serde(rename = "Mode")]
    pub mode: String,
    #[serde(rename = "Temperatures")]
    pub temperatures: Vec<i32>,
    #[serde(rename = "FanLevels")]
    pub fan_levels: Vec<String>,
    #[serde(rename = "SwingHexCode")]
    pub swing_hex_code: Option<String>,
}
