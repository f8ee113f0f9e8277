use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub physical: u64,  // Milliseconds since epoch
    pub logical: u64,   // Tie-breaker within one millisecond
}

impl Timestamp {
    /// Next reading of the process-wide hybrid logical clock. Strictly
    /// increasing across calls, even if the wall clock steps backwards.
    pub fn now() -> Self {
        HLC.now()
    }

    pub fn from_millis(millis: u64) -> Self {
        Timestamp {
            physical: millis,
            logical: 0,
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.physical
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.physical as i64)
            .single()
            .unwrap_or_default()
    }
}

impl std::ops::Sub for Timestamp {
    type Output = std::time::Duration;

    fn sub(self, other: Timestamp) -> std::time::Duration {
        std::time::Duration::from_millis(self.physical.saturating_sub(other.physical))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S%.3f UTC"))
    }
}

pub struct HybridLogicalClock {
    last: Mutex<Timestamp>,
}

impl HybridLogicalClock {
    pub fn new() -> Self {
        HybridLogicalClock {
            last: Mutex::new(Timestamp::from_millis(0)),
        }
    }

    pub fn now(&self) -> Timestamp {
        let wall_clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        // A poisoned lock still holds a valid last reading
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let next = if wall_clock > last.physical {
            Timestamp::from_millis(wall_clock)
        } else {
            // Wall clock same or went backward, increment logical
            Timestamp {
                physical: last.physical,
                logical: last.logical + 1,
            }
        };

        *last = next;
        next
    }
}

impl Default for HybridLogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    static ref HLC: HybridLogicalClock = HybridLogicalClock::new();
}
