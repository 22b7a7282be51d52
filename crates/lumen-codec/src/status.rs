use lumen_core::{MeshId, StatusFrame, StatusKind};

use crate::command::{CMD_NOTIFICATION, CMD_STATUS_REPLY};
use crate::packet::PACKET_LEN;

/// Parses a decrypted device frame into a [`StatusFrame`].
///
/// The opcode at byte 7 selects one of two fixed layouts; 0xDB replies and
/// 0xDC notifications place the mesh id and the mode/brightness/color block
/// at different offsets. Frames with any other opcode yield `None`.
pub fn parse_status(decoded: &[u8; PACKET_LEN]) -> Option<StatusFrame> {
    match decoded[7] {
        CMD_STATUS_REPLY => {
            let mode = decoded[10];
            Some(StatusFrame {
                kind: StatusKind::Response,
                mesh_id: MeshId((u16::from(decoded[4]) << 8) | u16::from(decoded[3])),
                on: mode & 1 == 1,
                color_mode: (mode >> 1) & 1 == 1,
                transition_mode: (mode >> 2) & 1 == 1,
                white_brightness: decoded[11],
                white_temperature: decoded[12],
                color_brightness: decoded[13],
                red: decoded[14],
                green: decoded[15],
                blue: decoded[16],
            })
        }
        CMD_NOTIFICATION => {
            let mode = decoded[12];
            Some(StatusFrame {
                kind: StatusKind::Notification,
                mesh_id: MeshId((u16::from(decoded[19]) << 8) | u16::from(decoded[10])),
                on: mode & 1 == 1,
                color_mode: (mode >> 1) & 1 == 1,
                transition_mode: (mode >> 2) & 1 == 1,
                white_brightness: decoded[13],
                white_temperature: decoded[14],
                color_brightness: decoded[15],
                red: decoded[16],
                green: decoded[17],
                blue: decoded[18],
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_status;
    use lumen_core::{MeshId, StatusKind};

    #[test]
    fn parses_status_reply_layout() {
        let mut decoded = [0_u8; 20];
        decoded[3] = 0x07; // mesh id low
        decoded[4] = 0x01; // mesh id high
        decoded[7] = 0xDB;
        decoded[10] = 0b0000_0011; // on + color mode
        decoded[11] = 0x45; // white brightness
        decoded[12] = 0x33; // white temperature
        decoded[13] = 0x40; // color brightness
        decoded[14] = 0x10;
        decoded[15] = 0x20;
        decoded[16] = 0x30;

        let frame = parse_status(&decoded).expect("reply should parse");
        assert_eq!(frame.kind, StatusKind::Response);
        assert_eq!(frame.mesh_id, MeshId(0x0107));
        assert!(frame.on);
        assert!(frame.color_mode);
        assert!(!frame.transition_mode);
        assert_eq!(frame.white_brightness, 0x45);
        assert_eq!(frame.white_temperature, 0x33);
        assert_eq!(frame.color_brightness, 0x40);
        assert_eq!((frame.red, frame.green, frame.blue), (0x10, 0x20, 0x30));
    }

    #[test]
    fn parses_notification_layout_with_split_mesh_id() {
        let mut decoded = [0_u8; 20];
        decoded[7] = 0xDC;
        decoded[10] = 0x07; // mesh id low
        decoded[12] = 0b0000_0101; // on + transition mode
        decoded[13] = 0x50;
        decoded[14] = 0x22;
        decoded[15] = 0x4B;
        decoded[16] = 0x99;
        decoded[17] = 0x88;
        decoded[18] = 0x77;
        decoded[19] = 0x01; // mesh id high

        let frame = parse_status(&decoded).expect("notification should parse");
        assert_eq!(frame.kind, StatusKind::Notification);
        assert_eq!(frame.mesh_id, MeshId(0x0107));
        assert!(frame.on);
        assert!(!frame.color_mode);
        assert!(frame.transition_mode);
        assert_eq!(frame.white_brightness, 0x50);
        assert_eq!(frame.white_temperature, 0x22);
        assert_eq!(frame.color_brightness, 0x4B);
        assert_eq!((frame.red, frame.green, frame.blue), (0x99, 0x88, 0x77));
    }

    #[test]
    fn unknown_opcodes_yield_no_frame() {
        let mut decoded = [0_u8; 20];
        decoded[7] = 0xDA;
        assert!(parse_status(&decoded).is_none());
        decoded[7] = 0x00;
        assert!(parse_status(&decoded).is_none());
    }
}
