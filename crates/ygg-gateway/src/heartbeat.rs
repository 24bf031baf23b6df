use std::time::Duration;

use tokio::time::Instant;

/// Per-connection heartbeat configuration (spec.md §4.6: "server pings every
/// ~10 s; a missed pong for ~30 s marks the user disconnected").
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub ping_interval: Duration,
    pub disconnect_after: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            disconnect_after: Duration::from_secs(30),
        }
    }
}

/// Tracks one connection's liveness deadline.
///
/// Grounded directly on the teacher's `Timer` (`crates/gameroom/src/timer.rs`),
/// generalized from a single poker decision deadline to a per-connection
/// liveness deadline: `touch` is called on every inbound frame (including
/// `pong`), and `expired` drives the Gateway's `LEAVE` emission.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    deadline: Instant,
}

impl Heartbeat {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            deadline: Instant::now() + config.disconnect_after,
        }
    }
    pub fn with_defaults() -> Self {
        Self::new(HeartbeatConfig::default())
    }
    /// Resets the disconnect deadline — call on any inbound frame.
    pub fn touch(&mut self) {
        self.deadline = Instant::now() + self.config.disconnect_after;
    }
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
    pub fn ping_interval(&self) -> Duration {
        self.config.ping_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_heartbeat_is_not_expired() {
        let heartbeat = Heartbeat::with_defaults();
        assert!(!heartbeat.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_disconnect_threshold_with_no_touch() {
        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(10),
            disconnect_after: Duration::from_millis(30),
        };
        let heartbeat = Heartbeat::new(config);
        tokio::time::advance(Duration::from_millis(40)).await;
        assert!(heartbeat.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn touch_resets_the_deadline() {
        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(10),
            disconnect_after: Duration::from_millis(30),
        };
        let mut heartbeat = Heartbeat::new(config);
        tokio::time::advance(Duration::from_millis(20)).await;
        heartbeat.touch();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(!heartbeat.expired());
    }
}
