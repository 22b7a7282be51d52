//! Hardware GATT backend over btleplug.
//!
//! Experimental: resolves the peripheral by address (scanning while the
//! connect timeout allows), connects, and maps the protocol characteristics
//! by their fixed UUIDs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{BDAddr, Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use lumen_core::MacAddress;

use crate::{Characteristic, GattConnector, GattLink, TransportError};

const SCAN_PAUSE: Duration = Duration::from_millis(250);

const ALL_CHARACTERISTICS: [Characteristic; 4] = [
    Characteristic::Pair,
    Characteristic::Command,
    Characteristic::Status,
    Characteristic::Ota,
];

fn characteristic_uuid(characteristic: Characteristic) -> Result<Uuid, TransportError> {
    Uuid::parse_str(characteristic.uuid())
        .map_err(|_| TransportError::MissingCharacteristic(characteristic))
}

/// Connector backed by the first available platform Bluetooth adapter.
pub struct BtleplugConnector {
    adapter: Adapter,
}

impl BtleplugConnector {
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new()
            .await
            .map_err(|err| TransportError::AdapterUnavailable(err.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|err| TransportError::AdapterUnavailable(err.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::AdapterUnavailable("no adapter found".into()))?;
        Ok(Self { adapter })
    }

    async fn find_peripheral(&self, target: BDAddr) -> Result<Peripheral, TransportError> {
        loop {
            let peripherals = self
                .adapter
                .peripherals()
                .await
                .map_err(|err| TransportError::AdapterUnavailable(err.to_string()))?;
            if let Some(peripheral) = peripherals.into_iter().find(|p| p.address() == target) {
                return Ok(peripheral);
            }
            if let Err(err) = self.adapter.start_scan(ScanFilter::default()).await {
                warn!("bluetooth scan failed: {}", err);
            }
            tokio::time::sleep(SCAN_PAUSE).await;
        }
    }
}

#[async_trait]
impl GattConnector for BtleplugConnector {
    type Link = BtleplugLink;

    async fn connect(
        &self,
        mac: MacAddress,
        timeout: Duration,
    ) -> Result<Self::Link, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let target = BDAddr::from(mac.0);

        let peripheral =
            match tokio::time::timeout_at(deadline, self.find_peripheral(target)).await {
                Ok(found) => found?,
                Err(_) => return Err(TransportError::ConnectTimeout { mac, timeout }),
            };

        let establish = async {
            peripheral
                .connect()
                .await
                .map_err(|err| TransportError::ConnectFailed {
                    mac,
                    reason: err.to_string(),
                })?;
            peripheral
                .discover_services()
                .await
                .map_err(|err| TransportError::ConnectFailed {
                    mac,
                    reason: err.to_string(),
                })
        };
        match tokio::time::timeout_at(deadline, establish).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::ConnectTimeout { mac, timeout }),
        }

        let mut characteristics = HashMap::new();
        let table = peripheral.characteristics();
        for entry in ALL_CHARACTERISTICS {
            let uuid = characteristic_uuid(entry)?;
            match table.iter().find(|c| c.uuid == uuid) {
                Some(gatt_char) => {
                    characteristics.insert(entry, gatt_char.clone());
                }
                None => {
                    let _ = peripheral.disconnect().await;
                    return Err(TransportError::MissingCharacteristic(entry));
                }
            }
        }

        debug!("connected to {}", mac);
        Ok(BtleplugLink {
            mac,
            peripheral,
            characteristics,
            notify_task: None,
            open: true,
        })
    }
}

/// One open btleplug connection with the protocol characteristics resolved.
pub struct BtleplugLink {
    mac: MacAddress,
    peripheral: Peripheral,
    characteristics: HashMap<Characteristic, btleplug::api::Characteristic>,
    notify_task: Option<tokio::task::JoinHandle<()>>,
    open: bool,
}

impl BtleplugLink {
    fn resolved(
        &self,
        characteristic: Characteristic,
    ) -> Result<&btleplug::api::Characteristic, TransportError> {
        self.characteristics
            .get(&characteristic)
            .ok_or(TransportError::MissingCharacteristic(characteristic))
    }
}

#[async_trait]
impl GattLink for BtleplugLink {
    async fn write(
        &mut self,
        characteristic: Characteristic,
        bytes: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        let gatt_char = self.resolved(characteristic)?.clone();
        self.peripheral
            .write(&gatt_char, bytes, write_type)
            .await
            .map_err(|err| TransportError::WriteFailed {
                characteristic,
                reason: err.to_string(),
            })
    }

    async fn read(&mut self, characteristic: Characteristic) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        let gatt_char = self.resolved(characteristic)?.clone();
        self.peripheral
            .read(&gatt_char)
            .await
            .map_err(|err| TransportError::ReadFailed {
                characteristic,
                reason: err.to_string(),
            })
    }

    async fn subscribe_status(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<Vec<u8>>, TransportError> {
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        let status_char = self.resolved(Characteristic::Status)?.clone();
        let status_uuid = status_char.uuid;
        self.peripheral
            .subscribe(&status_char)
            .await
            .map_err(|err| TransportError::ReadFailed {
                characteristic: Characteristic::Status,
                reason: err.to_string(),
            })?;

        let mut stream =
            self.peripheral
                .notifications()
                .await
                .map_err(|err| TransportError::ReadFailed {
                    characteristic: Characteristic::Status,
                    reason: err.to_string(),
                })?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.notify_task = Some(tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid != status_uuid {
                    continue;
                }
                if tx.send(notification.value).is_err() {
                    break;
                }
            }
        }));
        Ok(rx)
    }

    async fn disconnect(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        if let Err(err) = self.peripheral.disconnect().await {
            warn!("disconnect from {} failed: {}", self.mac, err);
        }
    }
}
