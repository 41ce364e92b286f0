//! Client library for Switcher-family smart-home devices: water heaters,
//! power plugs, shutters/runners, and Breeze IR thermostat controllers.
//!
//! Two independent capabilities, sharing only the data model and codec
//! primitives:
//!
//! - passive discovery — [`discovery::Bridge`] listens for UDP broadcasts
//!   and hands parsed [`device::Device`] values to a caller-supplied sink;
//! - active control — [`api::Type1Api`] / [`api::Type2Api`] open one TCP
//!   session per operation (login, then exactly one request) against a
//!   device's control port, and [`remote::RemoteManager`] synthesises the
//!   IR payload a Breeze thermostat sends to emulate a remote button press.
//!
//! Nothing here is a service: there is no persistent state across process
//! restarts, no connection pooling, and no cloud access.

pub mod api;
pub mod codec;
pub mod device;
pub mod discovery;
pub mod error;
pub mod remote;

pub use device::Device;
pub use discovery::{Bridge, DeviceSink};
pub use error::{Error, Result};
pub use remote::RemoteManager;
