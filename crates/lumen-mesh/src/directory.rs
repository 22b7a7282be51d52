use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_core::{MacAddress, MeshId, StatusFrame};

/// Sentinel signal strength for devices never seen by a scan.
///
/// Far below any configurable reachability floor, so unknown devices are
/// never ranked as gateway candidates.
pub const RSSI_UNKNOWN: i32 = -999_999;

/// Per-device event delivered through the registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Fresh state decoded from a status reply or notification.
    Status(StatusFrame),
    /// Synthesized when the device stops reporting; the host should show
    /// the device state as unknown.
    Unavailable,
}

/// Capability handed in by the host at registration; the directory never
/// owns host state, it only calls back into it.
pub type StatusCallback = Arc<dyn Fn(DeviceEvent) + Send + Sync>;

/// One registered physical node.
pub struct DeviceRecord {
    pub mesh_id: MeshId,
    pub mac: MacAddress,
    pub name: String,
    pub rssi: i32,
    pub last_update: Option<Instant>,
    pub update_count: u64,
    pub status_request_count: u64,
    callback: StatusCallback,
}

impl DeviceRecord {
    fn emit(&self, event: DeviceEvent) {
        (self.callback)(event);
    }
}

/// The scheduler-owned directory of known mesh devices, ordered by mesh id.
///
/// Only the scheduler worker mutates it; callbacks observe eventually
/// consistent values and must never block.
#[derive(Default)]
pub struct DeviceDirectory {
    devices: BTreeMap<MeshId, DeviceRecord>,
}

impl DeviceDirectory {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, mesh_id: MeshId) -> Option<&DeviceRecord> {
        self.devices.get(&mesh_id)
    }

    /// Registers (or re-registers) a physical node. A previously scanned
    /// signal strength survives re-registration.
    pub fn register(
        &mut self,
        mesh_id: MeshId,
        mac: MacAddress,
        name: String,
        callback: StatusCallback,
    ) {
        let rssi = self
            .devices
            .get(&mesh_id)
            .map(|existing| existing.rssi)
            .unwrap_or(RSSI_UNKNOWN);
        self.devices.insert(
            mesh_id,
            DeviceRecord {
                mesh_id,
                mac,
                name,
                rssi,
                last_update: None,
                update_count: 0,
                status_request_count: 0,
                callback,
            },
        );
    }

    /// Gateway candidates: every device above the reachability floor,
    /// strongest signal first, ties in directory (mesh id) order.
    pub fn ranked_candidates(&self, floor: i32) -> Vec<(MeshId, MacAddress)> {
        let mut candidates: Vec<&DeviceRecord> = self
            .devices
            .values()
            .filter(|device| device.rssi > floor)
            .collect();
        candidates.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        candidates
            .into_iter()
            .map(|device| (device.mesh_id, device.mac))
            .collect()
    }

    /// Merges scan readings into the directory; devices missing from the
    /// scan keep their previous value. Returns how many were updated.
    pub fn apply_rssi(&mut self, readings: &[crate::scan::RssiReading]) -> usize {
        let mut updated = 0;
        for device in self.devices.values_mut() {
            if let Some(reading) = readings.iter().find(|r| r.mac == device.mac) {
                device.rssi = reading.rssi;
                updated += 1;
            }
        }
        updated
    }

    /// Records a decoded status frame and forwards it to the device's
    /// callback. Returns false when the mesh id is not registered.
    pub fn record_status(&mut self, frame: &StatusFrame, now: Instant) -> bool {
        match self.devices.get_mut(&frame.mesh_id) {
            Some(device) => {
                device.last_update = Some(now);
                device.update_count += 1;
                device.status_request_count = 0;
                device.emit(DeviceEvent::Status(*frame));
                true
            }
            None => false,
        }
    }

    /// Bumps the outstanding-request counter for a directed poll.
    pub fn note_status_request(&mut self, mesh_id: MeshId) {
        if let Some(device) = self.devices.get_mut(&mesh_id) {
            device.status_request_count += 1;
        }
    }

    /// Devices not heard from within `window` (or never heard from at all),
    /// in directory order.
    pub fn quiet_devices(&self, window: Duration, now: Instant) -> Vec<MeshId> {
        self.devices
            .values()
            .filter(|device| match device.last_update {
                None => true,
                Some(at) => now.duration_since(at) > window,
            })
            .map(|device| device.mesh_id)
            .collect()
    }

    /// Synthesizes one unavailable event per device that fell past the
    /// staleness window and resets its counters, so the next sweep skips it
    /// until it reports again. Returns how many were swept.
    pub fn sweep_stale(&mut self, window: Duration, now: Instant) -> usize {
        let mut swept = 0;
        for device in self.devices.values_mut() {
            if let Some(at) = device.last_update {
                if now.duration_since(at) > window {
                    device.last_update = None;
                    device.update_count = 0;
                    device.status_request_count = 0;
                    device.emit(DeviceEvent::Unavailable);
                    swept += 1;
                }
            }
        }
        swept
    }

    /// Marks every device that still looks alive as unavailable; used when
    /// consecutive poll cycles found no gateway at all.
    pub fn mark_all_unavailable(&mut self) -> usize {
        let mut swept = 0;
        for device in self.devices.values_mut() {
            if device.last_update.is_some() {
                device.last_update = None;
                device.update_count = 0;
                device.status_request_count = 0;
                device.emit(DeviceEvent::Unavailable);
                swept += 1;
            }
        }
        swept
    }
}
