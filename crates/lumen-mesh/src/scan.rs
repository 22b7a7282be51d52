use async_trait::async_trait;
use thiserror::Error;

use lumen_core::MacAddress;

/// One scanned device with its current signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RssiReading {
    pub mac: MacAddress,
    /// More negative means weaker.
    pub rssi: i32,
}

/// Signal-strength scan failure; scans are best-effort, so callers log and
/// keep the previous readings.
#[derive(Debug, Error)]
#[error("rssi scan failed: {0}")]
pub struct ScanError(pub String);

/// External collaborator producing candidate signal strengths.
///
/// The scheduler calls this at most once per configured interval, or
/// immediately after a connection attempt exhausted every candidate.
#[async_trait]
pub trait RssiScanner: Send + Sync {
    async fn scan(&self) -> Result<Vec<RssiReading>, ScanError>;
}

/// Fixed readings, for installations without a scanner and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRssiScanner {
    readings: Vec<RssiReading>,
}

impl StaticRssiScanner {
    pub fn new(readings: Vec<RssiReading>) -> Self {
        Self { readings }
    }
}

#[async_trait]
impl RssiScanner for StaticRssiScanner {
    async fn scan(&self) -> Result<Vec<RssiReading>, ScanError> {
        Ok(self.readings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{RssiReading, RssiScanner, StaticRssiScanner};
    use lumen_core::MacAddress;

    #[tokio::test]
    async fn static_scanner_returns_its_readings() {
        let reading = RssiReading {
            mac: MacAddress([1, 2, 3, 4, 5, 6]),
            rssi: -42,
        };
        let scanner = StaticRssiScanner::new(vec![reading]);
        let readings = scanner.scan().await.expect("scan should succeed");
        assert_eq!(readings, vec![reading]);
    }
}
