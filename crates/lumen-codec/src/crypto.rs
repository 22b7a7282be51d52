use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::CodecError;

/// AES block and key size used throughout the protocol.
pub const BLOCK_LEN: usize = 16;

/// Session nonce length (command and status directions both use 8 bytes).
pub const NONCE_LEN: usize = 8;

/// The protocol's keyed 16-byte permutation.
///
/// AES-128-ECB over a single block, with the key bytes reversed, the
/// zero-padded input reversed, and the ciphertext reversed again. The triple
/// reversal is part of the wire format and must be reproduced exactly.
pub fn encrypt_block(key: &[u8; BLOCK_LEN], value: &[u8]) -> Result<[u8; BLOCK_LEN], CodecError> {
    if value.len() > BLOCK_LEN {
        return Err(CodecError::InvalidInput("block value exceeds 16 bytes"));
    }
    let mut k = *key;
    k.reverse();

    let mut v = [0_u8; BLOCK_LEN];
    v[..value.len()].copy_from_slice(value);
    v.reverse();

    let cipher = Aes128::new(GenericArray::from_slice(&k));
    let mut block = GenericArray::clone_from_slice(&v);
    cipher.encrypt_block(&mut block);

    let mut out = [0_u8; BLOCK_LEN];
    out.copy_from_slice(&block);
    out.reverse();
    Ok(out)
}

/// XOR of name and password, each zero-padded to 16 bytes.
///
/// This value acts as the key-encrypting key during session-key derivation
/// and as the pairing proof plaintext.
pub fn name_password_xor(
    name: &[u8],
    password: &[u8],
) -> Result<[u8; BLOCK_LEN], CodecError> {
    if name.len() > BLOCK_LEN || password.len() > BLOCK_LEN {
        return Err(CodecError::InvalidInput(
            "mesh name and password are at most 16 bytes",
        ));
    }
    let mut out = [0_u8; BLOCK_LEN];
    for (i, byte) in name.iter().enumerate() {
        out[i] = *byte;
    }
    for (i, byte) in password.iter().enumerate() {
        out[i] ^= *byte;
    }
    Ok(out)
}

/// Derives the 16-byte session key from mesh credentials and the handshake
/// random exchange.
pub fn derive_session_key(
    name: &[u8],
    password: &[u8],
    session_random: &[u8; NONCE_LEN],
    response_random: &[u8; NONCE_LEN],
) -> Result<[u8; BLOCK_LEN], CodecError> {
    let key = name_password_xor(name, password)?;
    let mut randoms = [0_u8; BLOCK_LEN];
    randoms[..NONCE_LEN].copy_from_slice(session_random);
    randoms[NONCE_LEN..].copy_from_slice(response_random);
    encrypt_block(&key, &randoms)
}

/// CBC-MAC-like packet checksum.
///
/// Encrypts `nonce ‖ payload-length` zero-padded to a block, then folds each
/// 16-byte payload block in with XOR-then-encrypt.
pub fn checksum(
    key: &[u8; BLOCK_LEN],
    nonce: &[u8; NONCE_LEN],
    payload: &[u8],
) -> Result<[u8; BLOCK_LEN], CodecError> {
    let mut base = [0_u8; BLOCK_LEN];
    base[..NONCE_LEN].copy_from_slice(nonce);
    base[NONCE_LEN] = payload.len() as u8;
    let mut check = encrypt_block(key, &base)?;

    for chunk in payload.chunks(BLOCK_LEN) {
        for (i, byte) in chunk.iter().enumerate() {
            check[i] ^= *byte;
        }
        check = encrypt_block(key, &check)?;
    }
    Ok(check)
}

/// CTR-like keystream XOR, used for both encryption and decryption.
///
/// The counter block is `0x00 ‖ nonce` zero-padded, with the first byte
/// incremented per 16-byte payload block.
pub fn crypt_payload(
    key: &[u8; BLOCK_LEN],
    nonce: &[u8; NONCE_LEN],
    payload: &[u8],
) -> Result<Vec<u8>, CodecError> {
    let mut base = [0_u8; BLOCK_LEN];
    base[1..=NONCE_LEN].copy_from_slice(nonce);

    let mut out = Vec::with_capacity(payload.len());
    for chunk in payload.chunks(BLOCK_LEN) {
        let keystream = encrypt_block(key, &base)?;
        for (i, byte) in chunk.iter().enumerate() {
            out.push(byte ^ keystream[i]);
        }
        base[0] = base[0].wrapping_add(1);
    }
    Ok(out)
}
