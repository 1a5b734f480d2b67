//! Point-in-time status of a connection pool

/// Status snapshot of a connection pool
///
/// # Examples
///
/// ```
/// use esox_connectionpool::PoolStatus;
///
/// let status = PoolStatus::new(2, 1, 4, false);
/// assert!(!status.is_healthy());
/// assert_eq!(status.missing_connections(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStatus {
    /// Connections currently pooled
    pub connections: usize,

    /// Connections exclusively checked out and not yet returned
    pub checked_out: usize,

    /// Connections the pool tries to keep open
    pub target_connections: usize,

    /// Whether the pool has been closed
    pub is_closed: bool,

    /// Pooled connections relative to the target (0.0 to 1.0)
    pub fill_ratio: f64,
}

impl PoolStatus {
    pub fn new(connections: usize, checked_out: usize, target: usize, is_closed: bool) -> Self {
        let fill_ratio = if target > 0 {
            (connections as f64 / target as f64).min(1.0)
        } else {
            0.0
        };

        Self {
            connections,
            checked_out,
            target_connections: target,
            is_closed,
            fill_ratio,
        }
    }

    /// Open, with at least the target number of connections pooled.
    ///
    /// Returned checkouts can leave the pool above its target for a while.
    pub fn is_healthy(&self) -> bool {
        !self.is_closed && self.missing_connections() == 0
    }

    /// Connections the next probe will try to open
    pub fn missing_connections(&self) -> usize {
        self.target_connections.saturating_sub(self.connections)
    }
}
