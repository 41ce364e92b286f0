//! The UDP discovery bridge.
//!
//! Binds the two fixed Switcher broadcast ports and forwards every
//! successfully parsed device to a caller-supplied sink. Mirrors the
//! reference implementation's `SwitcherBridge`: two sockets, no pooling,
//! a double-start is a caller error.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::parser::parse_datagram;
use crate::device::Device;
use crate::error::{Error, Result};

/// Protocol type 1 devices: water heaters, power plugs.
pub const UDP_PORT_TYPE1: u16 = 20002;
/// Protocol type 2 devices: Breeze thermostats, Runner/Runner-Mini shutters.
pub const UDP_PORT_TYPE2: u16 = 20003;

const MAX_DATAGRAM_SIZE: usize = 2048;

/// A sink that receives every device discovered on the network.
///
/// The contract is "cheap enqueue" — implementations must not
/// block the bridge's receive loop for long.
pub trait DeviceSink: Send + Sync + 'static {
    fn on_device(&self, device: Device);
}

impl<F> DeviceSink for F
where
    F: Fn(Device) + Send + Sync + 'static,
{
    fn on_device(&self, device: Device) {
        self(device)
    }
}

/// Owns the two UDP discovery sockets and the tasks reading from them.
pub struct Bridge<S: DeviceSink> {
    sink: Arc<S>,
    ports: Vec<u16>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: DeviceSink> Bridge<S> {
    /// Create a bridge listening on the default type1/type2 ports.
    pub fn new(sink: S) -> Self {
        Self::with_ports(sink, vec![UDP_PORT_TYPE1, UDP_PORT_TYPE2])
    }

    /// Create a bridge listening on an explicit port list (used by tests to
    /// avoid colliding with real devices on the standard ports).
    pub fn with_ports(sink: S, ports: Vec<u16>) -> Self {
        Self { sink: Arc::new(sink), ports, tasks: Mutex::new(Vec::new()) }
    }

    pub async fn is_running(&self) -> bool {
        !self.tasks.lock().await.is_empty()
    }

    /// Bind every configured port and start forwarding parsed devices to the
    /// sink. A bind failure is fatal and returned immediately; any sockets
    /// already bound in this call are dropped. Calling `start` on an
    /// already-running bridge is a caller error (`Error::AlreadyRunning`).
    pub async fn start(&self) -> Result<()> {
        if self.is_running().await {
            return Err(Error::AlreadyRunning);
        }

        let mut tasks = Vec::with_capacity(self.ports.len());
        for &port in &self.ports {
            info!(port, "starting the udp bridge");
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
            debug!(port, "udp bridge socket bound");

            let sink = Arc::clone(&self.sink);
            tasks.push(tokio::spawn(async move {
                receive_loop(socket, sink).await;
            }));
        }

        *self.tasks.lock().await = tasks;
        Ok(())
    }

    /// Stop the bridge, aborting every receive task and releasing the
    /// sockets.
    pub async fn stop(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            task.abort();
        }
    }
}

async fn receive_loop(socket: UdpSocket, sink: Arc<impl DeviceSink>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, _addr) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "udp bridge receive error");
                continue;
            }
        };

        match parse_datagram(&buf[..len]) {
            Ok(device) => sink.on_device(device),
            Err(Error::NotSwitcherOrigin) => {
                debug!("received datagram from an unknown source");
            }
            Err(Error::UnknownModel(code)) => {
                warn!(model_code = %code, "discovered an unknown switcher device");
            }
            Err(e) => {
                debug!(error = %e, "failed to parse datagram");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::UdpSocket as ClientSocket;
    use tokio::time::{sleep, Duration};

    struct CountingSink {
        count: Arc<AtomicUsize>,
    }

    impl DeviceSink for CountingSink {
        fn on_device(&self, _device: Device) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn water_heater_datagram() -> Vec<u8> {
        let mut buf = vec![0u8; 165];
        buf[0..2].copy_from_slice(&[0xFE, 0xF0]);
        buf[18..21].copy_from_slice(&[0x39, 0x33, 0xac]);
        buf[74..76].copy_from_slice(&[0x01, 0x00]);
        buf[76..80].copy_from_slice(&[0x04, 0x03, 0x02, 0x01]);
        buf
    }

    #[tokio::test]
    async fn bridge_delivers_parsed_devices_to_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let test_port = 30102;
        let bridge = Bridge::with_ports(CountingSink { count: count.clone() }, vec![test_port]);
        bridge.start().await.unwrap();

        let client = ClientSocket::bind(("127.0.0.1", 0)).await.unwrap();
        client
            .send_to(&water_heater_datagram(), ("127.0.0.1", test_port))
            .await
            .unwrap();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn double_start_is_a_caller_error() {
        let bridge = Bridge::with_ports(CountingSink { count: Arc::new(AtomicUsize::new(0)) }, vec![30103]);
        bridge.start().await.unwrap();
        let err = bridge.start().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning));
        bridge.stop().await;
    }

    #[tokio::test]
    async fn malformed_datagram_does_not_reach_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let bridge = Bridge::with_ports(CountingSink { count: count.clone() }, vec![30104]);
        bridge.start().await.unwrap();

        let client = ClientSocket::bind(("127.0.0.1", 0)).await.unwrap();
        client.send_to(b"not a switcher datagram", ("127.0.0.1", 30104)).await.unwrap();

        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        bridge.stop().await;
    }
}
