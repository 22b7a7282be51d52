use rand::RngCore;

use lumen_core::{MacAddress, MeshId};

use crate::crypto::{checksum, crypt_payload, encrypt_block, BLOCK_LEN, NONCE_LEN};
use crate::error::CodecError;

/// Fixed length of every command/status packet on the wire.
pub const PACKET_LEN: usize = 20;
/// Random per-packet sequence length on the command direction.
pub const SEQUENCE_LEN: usize = 3;
/// Cleartext payload length of a command packet.
pub const COMMAND_PAYLOAD_LEN: usize = 15;
/// Maximum command data once the destination/opcode/marker prefix is framed.
pub const COMMAND_DATA_MAX: usize = COMMAND_PAYLOAD_LEN - 5;
/// Header length of a device-originated status packet (sequence + mesh id).
pub const STATUS_HEADER_LEN: usize = 5;
/// Cleartext payload length of a device-originated status packet.
pub const STATUS_PAYLOAD_LEN: usize = PACKET_LEN - STATUS_HEADER_LEN - 2;
/// Pairing request/reply lengths.
pub const PAIR_PACKET_LEN: usize = 17;
pub const PAIR_REPLY_LEN: usize = 9;

/// First byte of a pairing request.
pub const PAIR_REQUEST: u8 = 0x0C;
/// First byte of an accepting pairing reply.
pub const PAIR_ACCEPTED: u8 = 0x0D;
/// First byte of a rejecting pairing reply (wrong name/password).
pub const PAIR_REJECTED: u8 = 0x0E;

/// Credential-update tags written to the pairing characteristic.
pub const CREDENTIAL_TAG_NAME: u8 = 0x04;
pub const CREDENTIAL_TAG_PASSWORD: u8 = 0x05;
pub const CREDENTIAL_TAG_LONG_TERM_KEY: u8 = 0x06;
/// First byte of the reply confirming a credential update.
pub const CREDENTIAL_ACCEPTED: u8 = 0x07;

/// Outcome of parsing a pairing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairReply {
    /// Device accepted the proof and returned its handshake random.
    Accepted { response_random: [u8; NONCE_LEN] },
    /// Device rejected the mesh name/password proof.
    Rejected,
    /// Reply carried an opcode outside the handshake protocol.
    Unexpected(u8),
}

/// Decoded host-direction command packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedCommand {
    pub sequence: [u8; SEQUENCE_LEN],
    pub destination: MeshId,
    pub opcode: u8,
    /// Command data, zero-padded to the fixed frame size.
    pub data: [u8; COMMAND_DATA_MAX],
}

fn command_nonce(mac: MacAddress, sequence: &[u8; SEQUENCE_LEN]) -> [u8; NONCE_LEN] {
    let reversed = mac.reversed();
    let mut nonce = [0_u8; NONCE_LEN];
    nonce[..4].copy_from_slice(&reversed[..4]);
    nonce[4] = 0x01;
    nonce[5..].copy_from_slice(sequence);
    nonce
}

fn status_nonce(mac: MacAddress, header: &[u8; STATUS_HEADER_LEN]) -> [u8; NONCE_LEN] {
    let reversed = mac.reversed();
    let mut nonce = [0_u8; NONCE_LEN];
    nonce[..3].copy_from_slice(&reversed[..3]);
    nonce[3..].copy_from_slice(header);
    nonce
}

/// Builds the 17-byte pairing request: opcode, the 8-byte session random, and
/// the first half of `enc(name ^ password)` under the padded session random.
pub fn build_pair_packet(
    name: &[u8],
    password: &[u8],
    session_random: &[u8; NONCE_LEN],
) -> Result<[u8; PAIR_PACKET_LEN], CodecError> {
    let name_pass = crate::crypto::name_password_xor(name, password)?;
    let mut proof_key = [0_u8; BLOCK_LEN];
    proof_key[..NONCE_LEN].copy_from_slice(session_random);
    let proof = encrypt_block(&proof_key, &name_pass)?;

    let mut packet = [0_u8; PAIR_PACKET_LEN];
    packet[0] = PAIR_REQUEST;
    packet[1..9].copy_from_slice(session_random);
    packet[9..].copy_from_slice(&proof[..8]);
    Ok(packet)
}

/// Classifies the pairing reply read back from the pairing characteristic.
pub fn parse_pair_reply(reply: &[u8]) -> Result<PairReply, CodecError> {
    let first = *reply.first().ok_or(CodecError::PacketLength {
        expected: PAIR_REPLY_LEN,
        got: 0,
    })?;
    match first {
        PAIR_ACCEPTED => {
            if reply.len() < PAIR_REPLY_LEN {
                return Err(CodecError::PacketLength {
                    expected: PAIR_REPLY_LEN,
                    got: reply.len(),
                });
            }
            let mut response_random = [0_u8; NONCE_LEN];
            response_random.copy_from_slice(&reply[1..PAIR_REPLY_LEN]);
            Ok(PairReply::Accepted { response_random })
        }
        PAIR_REJECTED => Ok(PairReply::Rejected),
        other => Ok(PairReply::Unexpected(other)),
    }
}

/// Builds a command packet with a fresh random 3-byte sequence.
pub fn build_command_packet(
    key: &[u8; BLOCK_LEN],
    mac: MacAddress,
    destination: MeshId,
    opcode: u8,
    data: &[u8],
) -> Result<[u8; PACKET_LEN], CodecError> {
    let mut sequence = [0_u8; SEQUENCE_LEN];
    rand::thread_rng().fill_bytes(&mut sequence);
    command_packet_with_sequence(key, mac, destination, opcode, data, sequence)
}

/// Deterministic command-packet construction with an explicit sequence.
pub fn command_packet_with_sequence(
    key: &[u8; BLOCK_LEN],
    mac: MacAddress,
    destination: MeshId,
    opcode: u8,
    data: &[u8],
    sequence: [u8; SEQUENCE_LEN],
) -> Result<[u8; PACKET_LEN], CodecError> {
    if data.len() > COMMAND_DATA_MAX {
        return Err(CodecError::InvalidInput("command data exceeds 10 bytes"));
    }
    let nonce = command_nonce(mac, &sequence);

    let mut payload = [0_u8; COMMAND_PAYLOAD_LEN];
    payload[..2].copy_from_slice(&destination.0.to_le_bytes());
    payload[2] = opcode;
    payload[3] = 0x60;
    payload[4] = 0x01;
    payload[5..5 + data.len()].copy_from_slice(data);

    let check = checksum(key, &nonce, &payload)?;
    let encrypted = crypt_payload(key, &nonce, &payload)?;

    let mut packet = [0_u8; PACKET_LEN];
    packet[..SEQUENCE_LEN].copy_from_slice(&sequence);
    packet[SEQUENCE_LEN..5].copy_from_slice(&check[..2]);
    packet[5..].copy_from_slice(&encrypted);
    Ok(packet)
}

/// Decrypts a host-direction command packet (the inverse of
/// [`command_packet_with_sequence`]); used by tests and simulated devices.
pub fn decrypt_command_packet(
    key: &[u8; BLOCK_LEN],
    mac: MacAddress,
    packet: &[u8],
) -> Result<DecodedCommand, CodecError> {
    if packet.len() != PACKET_LEN {
        return Err(CodecError::PacketLength {
            expected: PACKET_LEN,
            got: packet.len(),
        });
    }
    let mut sequence = [0_u8; SEQUENCE_LEN];
    sequence.copy_from_slice(&packet[..SEQUENCE_LEN]);
    let nonce = command_nonce(mac, &sequence);

    let payload = crypt_payload(key, &nonce, &packet[5..])?;
    let check = checksum(key, &nonce, &payload)?;
    if check[..2] != packet[SEQUENCE_LEN..5] {
        return Err(CodecError::ChecksumMismatch);
    }
    if payload[3..5] != [0x60, 0x01] {
        return Err(CodecError::InvalidInput("missing command marker bytes"));
    }

    let mut data = [0_u8; COMMAND_DATA_MAX];
    data.copy_from_slice(&payload[5..]);
    Ok(DecodedCommand {
        sequence,
        destination: MeshId(u16::from_le_bytes([payload[0], payload[1]])),
        opcode: payload[2],
        data,
    })
}

/// Decrypts and verifies a device-originated packet (status characteristic
/// reads and notifications). Returns the full 20-byte frame with the payload
/// part in the clear, ready for [`crate::status::parse_status`].
pub fn decrypt_status_packet(
    key: &[u8; BLOCK_LEN],
    mac: MacAddress,
    packet: &[u8],
) -> Result<[u8; PACKET_LEN], CodecError> {
    if packet.len() != PACKET_LEN {
        return Err(CodecError::PacketLength {
            expected: PACKET_LEN,
            got: packet.len(),
        });
    }
    let mut header = [0_u8; STATUS_HEADER_LEN];
    header.copy_from_slice(&packet[..STATUS_HEADER_LEN]);
    let nonce = status_nonce(mac, &header);

    let payload = crypt_payload(key, &nonce, &packet[7..])?;
    let check = checksum(key, &nonce, &payload)?;
    if check[..2] != packet[STATUS_HEADER_LEN..7] {
        return Err(CodecError::ChecksumMismatch);
    }

    let mut decoded = [0_u8; PACKET_LEN];
    decoded[..7].copy_from_slice(&packet[..7]);
    decoded[7..].copy_from_slice(&payload);
    Ok(decoded)
}

/// Builds a device-originated packet (the inverse of
/// [`decrypt_status_packet`]); used by tests and simulated devices.
pub fn build_status_packet(
    key: &[u8; BLOCK_LEN],
    mac: MacAddress,
    header: &[u8; STATUS_HEADER_LEN],
    payload: &[u8; STATUS_PAYLOAD_LEN],
) -> Result<[u8; PACKET_LEN], CodecError> {
    let nonce = status_nonce(mac, header);
    let check = checksum(key, &nonce, payload)?;
    let encrypted = crypt_payload(key, &nonce, payload)?;

    let mut packet = [0_u8; PACKET_LEN];
    packet[..STATUS_HEADER_LEN].copy_from_slice(header);
    packet[STATUS_HEADER_LEN..7].copy_from_slice(&check[..2]);
    packet[7..].copy_from_slice(&encrypted);
    Ok(packet)
}

/// Builds one tagged credential-update packet for the pairing characteristic.
pub fn build_credential_packet(
    session_key: &[u8; BLOCK_LEN],
    tag: u8,
    value: &[u8],
) -> Result<[u8; PAIR_PACKET_LEN], CodecError> {
    if value.len() > BLOCK_LEN {
        return Err(CodecError::InvalidInput("credential exceeds 16 bytes"));
    }
    let encrypted = encrypt_block(session_key, value)?;
    let mut packet = [0_u8; PAIR_PACKET_LEN];
    packet[0] = tag;
    packet[1..].copy_from_slice(&encrypted);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::{
        build_command_packet, build_pair_packet, build_status_packet,
        command_packet_with_sequence, decrypt_command_packet, decrypt_status_packet,
        parse_pair_reply, PairReply, PACKET_LEN, PAIR_ACCEPTED, PAIR_REJECTED,
    };
    use crate::error::CodecError;
    use lumen_core::{MacAddress, MeshId};

    fn sample_mac() -> MacAddress {
        "A4:C1:38:12:34:56".parse().expect("mac should parse")
    }

    #[test]
    fn command_packet_round_trips_through_its_inverse() {
        let key = [0x5A_u8; 16];
        let mac = sample_mac();
        let packet = command_packet_with_sequence(
            &key,
            mac,
            MeshId(0x1234),
            0xD0,
            &[0x01],
            [0xAA, 0xBB, 0xCC],
        )
        .expect("packet should build");

        let decoded = decrypt_command_packet(&key, mac, &packet).expect("packet should decode");
        assert_eq!(decoded.destination, MeshId(0x1234));
        assert_eq!(decoded.opcode, 0xD0);
        assert_eq!(decoded.sequence, [0xAA, 0xBB, 0xCC]);
        assert_eq!(decoded.data[0], 0x01);
        assert_eq!(&decoded.data[1..], &[0_u8; 9]);
    }

    #[test]
    fn command_packets_round_trip_for_all_data_lengths() {
        let key = [0x07_u8; 16];
        let mac = sample_mac();
        for len in 0..=10 {
            let data: Vec<u8> = (1..=len as u8).collect();
            let packet = build_command_packet(&key, mac, MeshId(9), 0xE2, &data)
                .expect("packet should build");
            let decoded =
                decrypt_command_packet(&key, mac, &packet).expect("packet should decode");
            assert_eq!(&decoded.data[..len], data.as_slice());
        }
    }

    #[test]
    fn command_data_over_ten_bytes_is_rejected() {
        let key = [0_u8; 16];
        let err = build_command_packet(&key, sample_mac(), MeshId(1), 0xD0, &[0_u8; 11])
            .expect_err("oversized data should fail");
        assert_eq!(
            err,
            CodecError::InvalidInput("command data exceeds 10 bytes")
        );
    }

    #[test]
    fn flipping_any_packet_bit_fails_the_checksum() {
        let key = [0x33_u8; 16];
        let mac = sample_mac();
        let header = [0x11, 0x22, 0x33, 0x07, 0x00];
        let payload = [0xDB_u8; 13];
        let packet =
            build_status_packet(&key, mac, &header, &payload).expect("packet should build");

        for byte in 0..PACKET_LEN {
            for bit in 0..8 {
                let mut tampered = packet;
                tampered[byte] ^= 1 << bit;
                assert!(
                    decrypt_status_packet(&key, mac, &tampered).is_err(),
                    "bit {bit} of byte {byte} went undetected"
                );
            }
        }
    }

    #[test]
    fn status_packet_round_trips_through_its_inverse() {
        let key = [0x99_u8; 16];
        let mac = sample_mac();
        let header = [0x01, 0x02, 0x03, 0x08, 0x00];
        let mut payload = [0_u8; 13];
        payload[0] = 0xDB;
        payload[3] = 0x05;

        let packet =
            build_status_packet(&key, mac, &header, &payload).expect("packet should build");
        let decoded = decrypt_status_packet(&key, mac, &packet).expect("packet should decode");
        assert_eq!(&decoded[..5], &header);
        assert_eq!(&decoded[7..], &payload);
    }

    #[test]
    fn status_decrypt_rejects_wrong_length() {
        let key = [0_u8; 16];
        let err = decrypt_status_packet(&key, sample_mac(), &[0_u8; 19])
            .expect_err("short packet should fail");
        assert_eq!(
            err,
            CodecError::PacketLength {
                expected: 20,
                got: 19
            }
        );
    }

    #[test]
    fn status_decrypt_rejects_wrong_mac() {
        let key = [0x21_u8; 16];
        let mac = sample_mac();
        let other: MacAddress = "A4:C1:38:12:34:57".parse().expect("mac should parse");
        let packet = build_status_packet(&key, mac, &[1, 2, 3, 4, 5], &[6_u8; 13])
            .expect("packet should build");

        assert_eq!(
            decrypt_status_packet(&key, other, &packet),
            Err(CodecError::ChecksumMismatch)
        );
    }

    #[test]
    fn pair_packet_embeds_opcode_and_session_random() {
        let srand = [1, 2, 3, 4, 5, 6, 7, 8];
        let packet = build_pair_packet(b"Test", b"Test", &srand).expect("packet should build");
        assert_eq!(packet[0], 0x0C);
        assert_eq!(&packet[1..9], &srand);
    }

    #[test]
    fn pair_reply_variants_parse() {
        let mut accepted = [0_u8; 9];
        accepted[0] = PAIR_ACCEPTED;
        accepted[1..].copy_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]);
        assert_eq!(
            parse_pair_reply(&accepted).expect("reply should parse"),
            PairReply::Accepted {
                response_random: [9, 8, 7, 6, 5, 4, 3, 2]
            }
        );

        assert_eq!(
            parse_pair_reply(&[PAIR_REJECTED]).expect("reply should parse"),
            PairReply::Rejected
        );
        assert_eq!(
            parse_pair_reply(&[0x42]).expect("reply should parse"),
            PairReply::Unexpected(0x42)
        );
        assert!(parse_pair_reply(&[]).is_err());
        assert!(parse_pair_reply(&[PAIR_ACCEPTED, 1, 2]).is_err());
    }
}
