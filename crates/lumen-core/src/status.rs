use serde::{Deserialize, Serialize};

use crate::types::MeshId;

/// Which decoded frame layout produced a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    /// Reply to an explicit status request (command code 0xDB).
    Response,
    /// Unsolicited state notification (command code 0xDC).
    Notification,
}

/// Decoded per-device state carried by status and notification frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub kind: StatusKind,
    /// Mesh id of the node this state belongs to.
    pub mesh_id: MeshId,
    pub on: bool,
    pub color_mode: bool,
    pub transition_mode: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// White temperature, 0..=0x7F.
    pub white_temperature: u8,
    /// White brightness, 1..=0x7F.
    pub white_brightness: u8,
    /// Color brightness, 0x0A..=0x64.
    pub color_brightness: u8,
}
