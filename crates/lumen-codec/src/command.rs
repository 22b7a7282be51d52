//! Command opcodes understood by the mesh firmware.

/// Set mesh groups. Data: 3 bytes.
pub const CMD_MESH_GROUP: u8 = 0xD7;
/// Set the mesh id; the device keeps answering to id 0 as well.
/// Data: the new mesh id, 2 bytes little endian.
pub const CMD_MESH_ADDRESS: u8 = 0xE0;
/// Restore factory mesh credentials; disconnects the device.
pub const CMD_MESH_RESET: u8 = 0xE3;
/// On/off. Data: one byte, 0 or 1.
pub const CMD_POWER: u8 = 0xD0;
/// Data: one byte.
pub const CMD_LIGHT_MODE: u8 = 0x33;
/// Preset color sequence. Data: one byte, 0..=6.
pub const CMD_PRESET: u8 = 0xC8;
/// White temperature. Data: one byte, 0..=0x7F.
pub const CMD_WHITE_TEMPERATURE: u8 = 0xF0;
/// White brightness. Data: one byte, 1..=0x7F.
pub const CMD_WHITE_BRIGHTNESS: u8 = 0xF1;
/// Color. Data: 0x04 followed by red, green, blue.
pub const CMD_COLOR: u8 = 0xE2;
/// Color brightness. Data: one byte, 0x0A..=0x64.
pub const CMD_COLOR_BRIGHTNESS: u8 = 0xF2;
/// How long each color of a sequence is shown, milliseconds LE u32.
pub const CMD_SEQUENCE_COLOR_DURATION: u8 = 0xF5;
/// Fade duration between sequence colors, milliseconds LE u32.
pub const CMD_SEQUENCE_FADE_DURATION: u8 = 0xF6;
/// Wall-clock time. Data: 7 bytes.
pub const CMD_TIME: u8 = 0xE4;
/// Alarms. Data: 10 bytes.
pub const CMD_ALARMS: u8 = 0xE5;
/// Request current device status. Data: one byte, 0x10.
pub const CMD_STATUS_REQUEST: u8 = 0xDA;
/// Reply to a status request.
pub const CMD_STATUS_REPLY: u8 = 0xDB;
/// Unsolicited state notification.
pub const CMD_NOTIFICATION: u8 = 0xDC;
