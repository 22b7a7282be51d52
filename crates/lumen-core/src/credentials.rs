use serde::{Deserialize, Serialize};

use crate::error::LumenError;

/// Maximum length of each mesh credential value on the wire.
pub const CREDENTIAL_MAX_LEN: usize = 16;

/// Mesh network credentials: name, password, and the long-term key.
///
/// Name and password drive pairing and session-key derivation. The long-term
/// key is only used when re-provisioning a device into another mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshCredentials {
    name: Vec<u8>,
    password: Vec<u8>,
    long_term_key: Vec<u8>,
}

impl MeshCredentials {
    /// Validates lengths and builds a credential set.
    pub fn new(
        name: impl Into<Vec<u8>>,
        password: impl Into<Vec<u8>>,
        long_term_key: impl Into<Vec<u8>>,
    ) -> Result<Self, LumenError> {
        let name = name.into();
        let password = password.into();
        let long_term_key = long_term_key.into();
        if name.is_empty() || name.len() > CREDENTIAL_MAX_LEN {
            return Err(LumenError::InvalidInput("mesh name must be 1..=16 bytes"));
        }
        if password.is_empty() || password.len() > CREDENTIAL_MAX_LEN {
            return Err(LumenError::InvalidInput(
                "mesh password must be 1..=16 bytes",
            ));
        }
        if long_term_key.len() > CREDENTIAL_MAX_LEN {
            return Err(LumenError::InvalidInput(
                "long-term key must be at most 16 bytes",
            ));
        }
        Ok(Self {
            name,
            password,
            long_term_key,
        })
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }

    pub fn long_term_key(&self) -> &[u8] {
        &self.long_term_key
    }
}

#[cfg(test)]
mod tests {
    use super::MeshCredentials;

    #[test]
    fn accepts_values_up_to_sixteen_bytes() {
        let creds = MeshCredentials::new("sixteen-byte-nam", "p", "")
            .expect("credentials should validate");
        assert_eq!(creds.name(), b"sixteen-byte-nam");
        assert_eq!(creds.password(), b"p");
        assert!(creds.long_term_key().is_empty());
    }

    #[test]
    fn rejects_oversized_or_empty_values() {
        assert!(MeshCredentials::new("seventeen-byte-nm!", "pw", "").is_err());
        assert!(MeshCredentials::new("", "pw", "").is_err());
        assert!(MeshCredentials::new("name", "", "").is_err());
        assert!(MeshCredentials::new("name", "pw", "seventeen-byte-ltk").is_err());
    }
}
