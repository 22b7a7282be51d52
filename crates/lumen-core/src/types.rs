use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LumenError;

/// 16-bit logical address of a node within the mesh.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MeshId(pub u16);

impl MeshId {
    /// Wildcard destination addressing every mesh member at once.
    pub const BROADCAST: MeshId = MeshId(0xFFFF);

    /// Whether this id is the broadcast destination.
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 48-bit Bluetooth device address, stored in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Address bytes in reversed (wire) order, as the packet nonces use them.
    pub fn reversed(self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }
}

impl FromStr for MacAddress {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0_u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or(LumenError::Parse("mac too short"))?;
            if part.len() != 2 {
                return Err(LumenError::Parse("mac octet must be two hex digits"));
            }
            *byte =
                u8::from_str_radix(part, 16).map_err(|_| LumenError::Parse("bad mac octet"))?;
        }
        if parts.next().is_some() {
            return Err(LumenError::Parse("mac too long"));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}
