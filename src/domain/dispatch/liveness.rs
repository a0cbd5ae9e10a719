//! Cooperative liveness tracking.
//!
//! Clients send `ping` after every [`DEFAULT_HEARTBEAT_INTERVAL`] of idle
//! time and the hub answers with `pong` straight away. The hub only records
//! when it last heard from a peer; it never evicts silent connections. A
//! dead peer is detected by the transport closing, not by missed pongs.

use std::time::Duration;

use crate::domain::foundation::Timestamp;

/// Interval between client heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Per-connection record of inbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    last_seen_at: Timestamp,
    frames_seen: u64,
    pings_seen: u64,
}

impl Liveness {
    /// Starts tracking at `now` (the handshake moment).
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_seen_at: now,
            frames_seen: 0,
            pings_seen: 0,
        }
    }

    /// Records any inbound frame.
    pub fn record_frame(&mut self, now: Timestamp) {
        if self.last_seen_at.is_before(&now) {
            self.last_seen_at = now;
        }
        self.frames_seen += 1;
    }

    /// Records an inbound `ping`. Pings count as frames too.
    pub fn record_ping(&mut self, now: Timestamp) {
        self.record_frame(now);
        self.pings_seen += 1;
    }

    pub fn last_seen_at(&self) -> Timestamp {
        self.last_seen_at
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn pings_seen(&self) -> u64 {
        self.pings_seen
    }

    /// Time since the last inbound frame, clamped at zero.
    pub fn idle_for(&self, now: Timestamp) -> Duration {
        now.duration_since(&self.last_seen_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// True when the peer has been silent longer than `heartbeat` allows.
    ///
    /// Informational only: used for logging when a connection closes.
    pub fn missed_heartbeat(&self, now: Timestamp, heartbeat: Duration) -> bool {
        self.idle_for(now) > heartbeat
    }
}
