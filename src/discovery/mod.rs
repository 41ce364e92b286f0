//! Passive discovery: the datagram parser and the UDP bridge that drives it.

mod bridge;
mod parser;

pub use bridge::{Bridge, DeviceSink, UDP_PORT_TYPE1, UDP_PORT_TYPE2};
pub use parser::parse_datagram;
