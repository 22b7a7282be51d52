//! In-memory GATT network for tests and simulations.
//!
//! Devices are scripted per MAC: pairing replies, connect refusal/latency,
//! and per-characteristic write failures. Every write is captured, and the
//! network tracks connection attempts plus the concurrent-link high-water
//! mark so tests can assert the single-gateway invariant.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lumen_core::MacAddress;

use crate::{Characteristic, GattConnector, GattLink, TransportError};

/// Response random baked into the default scripted pairing reply.
pub const DEFAULT_RESPONSE_RANDOM: [u8; 8] = [0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18];

/// How a scripted write failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// Every write to the characteristic fails.
    Always,
    /// The next `n` writes fail, then writes succeed again.
    Next(usize),
}

/// One captured characteristic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub characteristic: Characteristic,
    pub bytes: Vec<u8>,
    pub with_response: bool,
    /// Whether the device accepted the write.
    pub accepted: bool,
}

#[derive(Default)]
struct DeviceState {
    pair_reply: Vec<u8>,
    refuse_connect: bool,
    connect_delay: Duration,
    write_failures: HashMap<Characteristic, WriteFailure>,
    writes: Vec<WriteRecord>,
    notify_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl DeviceState {
    fn should_fail_write(&mut self, characteristic: Characteristic) -> bool {
        match self.write_failures.get_mut(&characteristic) {
            Some(WriteFailure::Always) => true,
            Some(WriteFailure::Next(0)) => {
                self.write_failures.remove(&characteristic);
                false
            }
            Some(WriteFailure::Next(remaining)) => {
                if *remaining > 1 {
                    *remaining -= 1;
                } else {
                    self.write_failures.remove(&characteristic);
                }
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct NetworkState {
    devices: HashMap<MacAddress, DeviceState>,
    connect_attempts: Vec<MacAddress>,
    open_links: usize,
    peak_open_links: usize,
}

/// Shared scripted network; clone freely, all clones observe the same state.
#[derive(Clone, Default)]
pub struct MockNetwork {
    inner: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, NetworkState> {
        self.inner.lock().unwrap()
    }

    /// Adds a device that accepts pairing with [`DEFAULT_RESPONSE_RANDOM`].
    pub fn add_device(&self, mac: MacAddress) {
        let mut reply = vec![0x0D];
        reply.extend_from_slice(&DEFAULT_RESPONSE_RANDOM);
        self.add_device_with_pair_reply(mac, reply);
    }

    /// Adds a device with an explicit scripted pairing reply.
    pub fn add_device_with_pair_reply(&self, mac: MacAddress, pair_reply: Vec<u8>) {
        self.state().devices.insert(
            mac,
            DeviceState {
                pair_reply,
                ..DeviceState::default()
            },
        );
    }

    /// Replaces the scripted pairing-characteristic read value.
    pub fn set_pair_reply(&self, mac: MacAddress, pair_reply: Vec<u8>) {
        if let Some(device) = self.state().devices.get_mut(&mac) {
            device.pair_reply = pair_reply;
        }
    }

    /// Makes connection attempts to `mac` fail immediately.
    pub fn set_refuse_connect(&self, mac: MacAddress, refuse: bool) {
        if let Some(device) = self.state().devices.get_mut(&mac) {
            device.refuse_connect = refuse;
        }
    }

    /// Delays connection establishment (used to trigger connect timeouts).
    pub fn set_connect_delay(&self, mac: MacAddress, delay: Duration) {
        if let Some(device) = self.state().devices.get_mut(&mac) {
            device.connect_delay = delay;
        }
    }

    /// Scripts write failures for one characteristic of one device.
    pub fn fail_writes(&self, mac: MacAddress, characteristic: Characteristic, how: WriteFailure) {
        if let Some(device) = self.state().devices.get_mut(&mac) {
            device.write_failures.insert(characteristic, how);
        }
    }

    /// Clears any scripted write failure for the characteristic.
    pub fn clear_write_failures(&self, mac: MacAddress, characteristic: Characteristic) {
        if let Some(device) = self.state().devices.get_mut(&mac) {
            device.write_failures.remove(&characteristic);
        }
    }

    /// All writes captured for a device, in arrival order.
    pub fn writes(&self, mac: MacAddress) -> Vec<WriteRecord> {
        self.state()
            .devices
            .get(&mac)
            .map(|device| device.writes.clone())
            .unwrap_or_default()
    }

    /// Accepted write payloads for one characteristic, in arrival order.
    pub fn accepted_writes(&self, mac: MacAddress, characteristic: Characteristic) -> Vec<Vec<u8>> {
        self.writes(mac)
            .into_iter()
            .filter(|record| record.accepted && record.characteristic == characteristic)
            .map(|record| record.bytes)
            .collect()
    }

    /// Pushes a raw notification to the device's subscriber, if any.
    pub fn notify(&self, mac: MacAddress, bytes: Vec<u8>) -> bool {
        let state = self.state();
        match state.devices.get(&mac).and_then(|d| d.notify_tx.as_ref()) {
            Some(tx) => tx.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Every connection attempt in order, including refused and timed-out
    /// ones.
    pub fn connect_attempts(&self) -> Vec<MacAddress> {
        self.state().connect_attempts.clone()
    }

    /// Forgets recorded connection attempts (captured writes are kept).
    pub fn clear_connect_attempts(&self) {
        self.state().connect_attempts.clear();
    }

    /// Currently open links.
    pub fn open_links(&self) -> usize {
        self.state().open_links
    }

    /// Highest number of simultaneously open links observed so far.
    pub fn peak_open_links(&self) -> usize {
        self.state().peak_open_links
    }

    /// A connector handle for this network.
    pub fn connector(&self) -> MockConnector {
        MockConnector {
            network: self.clone(),
        }
    }
}

/// Connector over a [`MockNetwork`].
#[derive(Clone)]
pub struct MockConnector {
    network: MockNetwork,
}

#[async_trait]
impl GattConnector for MockConnector {
    type Link = MockLink;

    async fn connect(
        &self,
        mac: MacAddress,
        timeout: Duration,
    ) -> Result<Self::Link, TransportError> {
        let (refuse, delay) = {
            let mut state = self.network.state();
            let device = state
                .devices
                .get(&mac)
                .ok_or_else(|| TransportError::ConnectFailed {
                    mac,
                    reason: "unknown device".into(),
                })?;
            let scripted = (device.refuse_connect, device.connect_delay);
            state.connect_attempts.push(mac);
            scripted
        };

        if !delay.is_zero()
            && tokio::time::timeout(timeout, tokio::time::sleep(delay))
                .await
                .is_err()
        {
            return Err(TransportError::ConnectTimeout { mac, timeout });
        }
        if refuse {
            return Err(TransportError::ConnectFailed {
                mac,
                reason: "connection refused".into(),
            });
        }

        let mut state = self.network.state();
        state.open_links += 1;
        state.peak_open_links = state.peak_open_links.max(state.open_links);
        Ok(MockLink {
            mac,
            network: self.network.clone(),
            open: true,
        })
    }
}

/// One scripted link; closing it (or dropping it) releases the connection.
pub struct MockLink {
    mac: MacAddress,
    network: MockNetwork,
    open: bool,
}

impl std::fmt::Debug for MockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLink")
            .field("mac", &self.mac)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl MockLink {
    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut state = self.network.state();
        state.open_links -= 1;
        if let Some(device) = state.devices.get_mut(&self.mac) {
            device.notify_tx = None;
        }
    }
}

#[async_trait]
impl GattLink for MockLink {
    async fn write(
        &mut self,
        characteristic: Characteristic,
        bytes: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        let mut state = self.network.state();
        let device = state
            .devices
            .get_mut(&self.mac)
            .ok_or(TransportError::Disconnected)?;
        let accepted = !device.should_fail_write(characteristic);
        device.writes.push(WriteRecord {
            characteristic,
            bytes: bytes.to_vec(),
            with_response,
            accepted,
        });
        if accepted {
            Ok(())
        } else {
            Err(TransportError::WriteFailed {
                characteristic,
                reason: "scripted failure".into(),
            })
        }
    }

    async fn read(&mut self, characteristic: Characteristic) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        let state = self.network.state();
        let device = state
            .devices
            .get(&self.mac)
            .ok_or(TransportError::Disconnected)?;
        match characteristic {
            Characteristic::Pair => Ok(device.pair_reply.clone()),
            other => Err(TransportError::ReadFailed {
                characteristic: other,
                reason: "no scripted value".into(),
            }),
        }
    }

    async fn subscribe_status(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<Vec<u8>>, TransportError> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.network.state();
        let device = state
            .devices
            .get_mut(&self.mac)
            .ok_or(TransportError::Disconnected)?;
        device.notify_tx = Some(tx);
        Ok(rx)
    }

    async fn disconnect(&mut self) {
        self.close();
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{MockNetwork, WriteFailure, DEFAULT_RESPONSE_RANDOM};
    use crate::{Characteristic, GattConnector, GattLink, TransportError};
    use lumen_core::MacAddress;

    fn mac(last: u8) -> MacAddress {
        MacAddress([0xA4, 0xC1, 0x38, 0x00, 0x00, last])
    }

    #[tokio::test]
    async fn connect_write_read_and_capture() {
        let network = MockNetwork::new();
        network.add_device(mac(1));
        let connector = network.connector();

        let mut link = connector
            .connect(mac(1), Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        link.write(Characteristic::Pair, &[0x0C, 0xFF], true)
            .await
            .expect("write should succeed");

        let reply = link
            .read(Characteristic::Pair)
            .await
            .expect("read should succeed");
        assert_eq!(reply[0], 0x0D);
        assert_eq!(&reply[1..], &DEFAULT_RESPONSE_RANDOM);

        let writes = network.writes(mac(1));
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].bytes, vec![0x0C, 0xFF]);
        assert!(writes[0].accepted);
        assert_eq!(network.connect_attempts(), vec![mac(1)]);
    }

    #[tokio::test]
    async fn scripted_write_failures_count_down() {
        let network = MockNetwork::new();
        network.add_device(mac(2));
        network.fail_writes(mac(2), Characteristic::Command, WriteFailure::Next(2));
        let connector = network.connector();

        let mut link = connector
            .connect(mac(2), Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        assert!(link
            .write(Characteristic::Command, &[1], false)
            .await
            .is_err());
        assert!(link
            .write(Characteristic::Command, &[2], false)
            .await
            .is_err());
        assert!(link
            .write(Characteristic::Command, &[3], false)
            .await
            .is_ok());

        // Failures are scoped to one characteristic.
        network.fail_writes(mac(2), Characteristic::Command, WriteFailure::Always);
        assert!(link.write(Characteristic::Pair, &[4], false).await.is_ok());
        assert_eq!(network.accepted_writes(mac(2), Characteristic::Command), vec![vec![3]]);
    }

    #[tokio::test]
    async fn connect_delay_turns_into_timeout() {
        let network = MockNetwork::new();
        network.add_device(mac(3));
        network.set_connect_delay(mac(3), Duration::from_secs(5));
        let connector = network.connector();

        let err = connector
            .connect(mac(3), Duration::from_millis(10))
            .await
            .expect_err("connect should time out");
        assert!(matches!(err, TransportError::ConnectTimeout { .. }));
        assert_eq!(network.connect_attempts(), vec![mac(3)]);
        assert_eq!(network.open_links(), 0);
    }

    #[tokio::test]
    async fn links_track_open_and_peak_counts() {
        let network = MockNetwork::new();
        network.add_device(mac(4));
        network.add_device(mac(5));
        let connector = network.connector();

        let mut a = connector
            .connect(mac(4), Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        let b = connector
            .connect(mac(5), Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        assert_eq!(network.open_links(), 2);

        a.disconnect().await;
        a.disconnect().await; // idempotent
        assert_eq!(network.open_links(), 1);
        drop(b);
        assert_eq!(network.open_links(), 0);
        assert_eq!(network.peak_open_links(), 2);
    }

    #[tokio::test]
    async fn notifications_flow_until_disconnect() {
        let network = MockNetwork::new();
        network.add_device(mac(6));
        let connector = network.connector();

        let mut link = connector
            .connect(mac(6), Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        let mut rx = link
            .subscribe_status()
            .await
            .expect("subscribe should succeed");

        assert!(network.notify(mac(6), vec![9, 9, 9]));
        assert_eq!(rx.recv().await, Some(vec![9, 9, 9]));

        link.disconnect().await;
        assert!(!network.notify(mac(6), vec![1]));
        assert_eq!(rx.recv().await, None);
    }
}
