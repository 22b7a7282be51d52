#![no_main]

use libfuzzer_sys::fuzz_target;
use lumen_codec::{decrypt_command_packet, decrypt_status_packet, parse_pair_reply, parse_status};
use lumen_core::MacAddress;

fuzz_target!(|data: &[u8]| {
    let key = [0x11_u8; 16];
    let mac = MacAddress([0xA4, 0xC1, 0x38, 0x12, 0x34, 0x56]);

    let _ = parse_pair_reply(data);
    let _ = decrypt_command_packet(&key, mac, data);
    if let Ok(decoded) = decrypt_status_packet(&key, mac, data) {
        let _ = parse_status(&decoded);
    }
});
