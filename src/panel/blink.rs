//! Per-indicator blink deduplication.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use super::Indicator;

/// Tracks which indicators are currently mid-pulse.
///
/// A blink for an indicator that is already pulsing is dropped, not
/// queued.
#[derive(Debug, Clone, Default)]
pub struct BlinkTracker {
    in_flight: Arc<Mutex<HashSet<Indicator>>>,
}

impl BlinkTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `indicator` for a pulse sequence.
    ///
    /// Returns `None` if it is already pulsing. The claim is released when
    /// the returned guard is dropped.
    #[must_use]
    pub fn try_begin(&self, indicator: Indicator) -> Option<BlinkGuard> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(indicator);

        inserted.then(|| BlinkGuard {
            in_flight: Arc::clone(&self.in_flight),
            indicator,
        })
    }
}

/// Claim on an indicator's pulse sequence.
#[derive(Debug)]
pub struct BlinkGuard {
    in_flight: Arc<Mutex<HashSet<Indicator>>>,
    indicator: Indicator,
}

impl Drop for BlinkGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.indicator);
    }
}
