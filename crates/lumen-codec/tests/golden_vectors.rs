//! Golden wire vectors pinned against the reference implementation.
//!
//! The fixtures under `tests/vectors/` were generated once from the peer
//! firmware's reference codec; they guard the byte-reversal conventions and
//! both packet directions against regressions.

use lumen_codec::command::CMD_POWER;
use lumen_codec::{
    build_pair_packet, command_packet_with_sequence, decrypt_status_packet, derive_session_key,
    parse_status,
};
use lumen_core::{MacAddress, MeshId, StatusKind};

const MESH_NAME: &[u8] = b"Test";
const MESH_PASSWORD: &[u8] = b"Test";
const SESSION_RANDOM: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
const RESPONSE_RANDOM: [u8; 8] = [0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18];

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn from_hex(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("vector must be valid hex"))
        .collect()
}

fn read_vector(name: &str) -> String {
    let path = format!("{}/tests/vectors/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path)
        .expect("vector file must exist")
        .trim()
        .to_string()
}

fn gateway_mac() -> MacAddress {
    "A4:C1:38:12:34:56".parse().expect("mac should parse")
}

fn session_key() -> [u8; 16] {
    derive_session_key(MESH_NAME, MESH_PASSWORD, &SESSION_RANDOM, &RESPONSE_RANDOM)
        .expect("key should derive")
}

#[test]
fn golden_session_key_matches() {
    let key = session_key();
    let hex = to_hex(&key);
    let expected = read_vector("session_key.hex");
    assert_eq!(hex, expected, "update tests/vectors/session_key.hex to: {hex}");
}

#[test]
fn golden_pair_packet_matches() {
    let packet = build_pair_packet(MESH_NAME, MESH_PASSWORD, &SESSION_RANDOM)
        .expect("pair packet should build");
    let hex = to_hex(&packet);
    let expected = read_vector("pair_packet.hex");
    assert_eq!(hex, expected, "update tests/vectors/pair_packet.hex to: {hex}");
}

#[test]
fn golden_command_packet_matches() {
    let packet = command_packet_with_sequence(
        &session_key(),
        gateway_mac(),
        MeshId(0x0007),
        CMD_POWER,
        &[0x01],
        [0xAA, 0xBB, 0xCC],
    )
    .expect("command packet should build");
    let hex = to_hex(&packet);
    let expected = read_vector("command_packet.hex");
    assert_eq!(
        hex, expected,
        "update tests/vectors/command_packet.hex to: {hex}"
    );
}

#[test]
fn golden_status_reply_decrypts_and_parses() {
    let packet = from_hex(&read_vector("status_reply_packet.hex"));
    let decoded = decrypt_status_packet(&session_key(), gateway_mac(), &packet)
        .expect("vector should decrypt");
    let frame = parse_status(&decoded).expect("vector should parse");

    assert_eq!(frame.kind, StatusKind::Response);
    assert_eq!(frame.mesh_id, MeshId(0x0007));
    assert!(frame.on);
    assert!(frame.color_mode);
    assert!(!frame.transition_mode);
    assert_eq!(frame.white_brightness, 0x45);
    assert_eq!(frame.white_temperature, 0x33);
    assert_eq!(frame.color_brightness, 0x40);
    assert_eq!((frame.red, frame.green, frame.blue), (0x10, 0x20, 0x30));
}

#[test]
fn golden_notification_decrypts_and_parses() {
    let packet = from_hex(&read_vector("notification_packet.hex"));
    let decoded = decrypt_status_packet(&session_key(), gateway_mac(), &packet)
        .expect("vector should decrypt");
    let frame = parse_status(&decoded).expect("vector should parse");

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
fn tampered_golden_packet_is_rejected() {
    let mut packet = from_hex(&read_vector("status_reply_packet.hex"));
    packet[9] ^= 0x01;
    assert!(decrypt_status_packet(&session_key(), gateway_mac(), &packet).is_err());
}
