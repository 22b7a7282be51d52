use std::time::Duration;

/// Scheduler policy knobs.
///
/// Field defaults pin the recommended windows; hosts override what they
/// need. All windows interact: `freshness_window` triggers directed
/// re-polls, `staleness_window` synthesizes unavailable events, and the
/// offline sweep short-circuits per-device staleness during an extended
/// outage.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// How often the poll cycle runs.
    pub poll_interval: Duration,
    /// Devices quiet for longer than this get a directed status request.
    pub freshness_window: Duration,
    /// Devices quiet for longer than this are reported unavailable.
    pub staleness_window: Duration,
    /// Per-candidate budget for connect plus pairing.
    pub connect_timeout: Duration,
    /// Attempts per must-succeed command before reporting failure.
    pub command_attempts: u32,
    /// Minimum spacing between signal-strength refreshes.
    pub rssi_scan_interval: Duration,
    /// Candidates at or below this signal strength are never attempted.
    pub rssi_floor: i32,
    /// Sessions older than this are proactively reconnected at the next
    /// poll cycle; long-lived links are known to go stale at the transport
    /// level.
    pub session_max_age: Duration,
    /// Bound on the request queue shared by submitters and poll traffic.
    pub request_queue_capacity: usize,
    /// Consecutive gateway-less poll cycles before the whole directory is
    /// marked unavailable.
    pub offline_sweep_after_cycles: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            freshness_window: Duration::from_secs(60),
            staleness_window: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            command_attempts: 3,
            rssi_scan_interval: Duration::from_secs(24 * 60 * 60),
            rssi_floor: -95,
            session_max_age: Duration::from_secs(2 * 60 * 60),
            request_queue_capacity: 64,
            offline_sweep_after_cycles: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::MeshConfig;

    #[test]
    fn defaults_pin_the_recommended_policy() {
        let config = MeshConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.freshness_window, Duration::from_secs(60));
        assert_eq!(config.staleness_window, Duration::from_secs(90));
        assert_eq!(config.command_attempts, 3);
        assert_eq!(config.offline_sweep_after_cycles, 2);
        assert!(config.freshness_window < config.staleness_window);
    }
}
