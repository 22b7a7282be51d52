//! Pure wire codec for the lumen mesh lighting protocol.
//!
//! Every function here is stateless and I/O-free: the AES-ECB keyed
//! permutation with the protocol's byte-reversal convention, session-key
//! derivation, the pairing handshake packets, command/status packet framing,
//! and the CRC16 used by firmware-transfer framing.
//!
//! The construction is a fixed legacy format shared with uncontrolled peer
//! firmware; it must not be swapped for a standard AEAD.

pub mod command;
pub mod crc;
pub mod crypto;
pub mod error;
pub mod packet;
pub mod status;

pub use crypto::{checksum, crypt_payload, derive_session_key, encrypt_block};
pub use error::CodecError;
pub use packet::{
    build_command_packet, build_credential_packet, build_pair_packet, build_status_packet,
    command_packet_with_sequence, decrypt_command_packet, decrypt_status_packet,
    parse_pair_reply, DecodedCommand, PairReply,
};
pub use status::parse_status;
