//! GATT transport abstractions for lumen.
//!
//! The session and scheduler only depend on the byte-oriented link and
//! connector traits defined here. Enable the `btleplug` feature for the
//! hardware backend; the in-memory mock lives in [`mock`] for tests and
//! simulations.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use lumen_core::MacAddress;

#[cfg(feature = "btleplug")]
pub mod btleplug_backend;
pub mod mock;

/// GATT characteristics of the mesh lighting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Pairing handshake and credential updates.
    Pair,
    /// Encrypted command packets.
    Command,
    /// Status reads and the notification-enable switch.
    Status,
    /// Firmware transfer.
    Ota,
}

impl Characteristic {
    /// The characteristic's fixed UUID in the device's GATT table.
    pub fn uuid(self) -> &'static str {
        match self {
            Characteristic::Pair => "00010203-0405-0607-0809-0a0b0c0d1914",
            Characteristic::Command => "00010203-0405-0607-0809-0a0b0c0d1912",
            Characteristic::Status => "00010203-0405-0607-0809-0a0b0c0d1911",
            Characteristic::Ota => "00010203-0405-0607-0809-0a0b0c0d1913",
        }
    }
}

/// Errors surfaced by GATT links and connectors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection could be established within the allotted time.
    #[error("connect to {mac} timed out after {timeout:?}")]
    ConnectTimeout { mac: MacAddress, timeout: Duration },
    /// The peripheral refused or dropped the connection attempt.
    #[error("connect to {mac} failed: {reason}")]
    ConnectFailed { mac: MacAddress, reason: String },
    /// The link dropped; the session holding it is dead.
    #[error("link disconnected")]
    Disconnected,
    /// A characteristic write was not accepted.
    #[error("write to {characteristic:?} failed: {reason}")]
    WriteFailed {
        characteristic: Characteristic,
        reason: String,
    },
    /// A characteristic read failed.
    #[error("read from {characteristic:?} failed: {reason}")]
    ReadFailed {
        characteristic: Characteristic,
        reason: String,
    },
    /// The device's GATT table is missing a protocol characteristic.
    #[error("characteristic {0:?} not present on device")]
    MissingCharacteristic(Characteristic),
    /// No usable platform Bluetooth adapter.
    #[error("bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

/// One open GATT connection to one physical mesh member.
///
/// Implementations own the underlying platform connection exclusively; the
/// link is created by a [`GattConnector`] and destroyed by `disconnect` or
/// drop.
#[async_trait]
pub trait GattLink: Send {
    /// Writes `bytes` to a characteristic, optionally waiting for the
    /// peripheral's acknowledgement.
    async fn write(
        &mut self,
        characteristic: Characteristic,
        bytes: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError>;

    /// Reads the current value of a characteristic.
    async fn read(&mut self, characteristic: Characteristic) -> Result<Vec<u8>, TransportError>;

    /// Subscribes to status-characteristic notifications.
    ///
    /// The receiver yields raw (still encrypted) notification payloads and
    /// closes when the link goes away.
    async fn subscribe_status(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<Vec<u8>>, TransportError>;

    /// Tears the connection down. Must be idempotent and must never fail;
    /// it is called from error-recovery paths.
    async fn disconnect(&mut self);
}

/// Opens GATT links to mesh members by address.
#[async_trait]
pub trait GattConnector: Send + Sync {
    type Link: GattLink + 'static;

    /// Connects to `mac`, bounded by `timeout`. Timeouts are reported as
    /// [`TransportError::ConnectTimeout`] so callers can distinguish them
    /// from refusals.
    async fn connect(&self, mac: MacAddress, timeout: Duration)
        -> Result<Self::Link, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::Characteristic;

    #[test]
    fn characteristic_uuids_match_the_gatt_table() {
        assert_eq!(
            Characteristic::Pair.uuid(),
            "00010203-0405-0607-0809-0a0b0c0d1914"
        );
        assert_eq!(
            Characteristic::Command.uuid(),
            "00010203-0405-0607-0809-0a0b0c0d1912"
        );
        assert_eq!(
            Characteristic::Status.uuid(),
            "00010203-0405-0607-0809-0a0b0c0d1911"
        );
        assert_eq!(
            Characteristic::Ota.uuid(),
            "00010203-0405-0607-0809-0a0b0c0d1913"
        );
    }
}
