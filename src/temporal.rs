// ⏰ History Ledger - per-object location timeline
//
// "Identity persists, values accumulate": an object's whereabouts are a
// monotonically growing audit trail. Samples are only ever prepended, never
// removed or reordered, and the head is always the newest sighting.

use crate::location::LocationSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// LOCATION HISTORY
// ============================================================================

/// Newest-first ledger of location samples
///
/// Samples are shared (`Arc`) so the object's last location is the very same
/// value as the head of the ledger, not a copy of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationHistory {
    samples: VecDeque<Arc<LocationSample>>,
}

impl LocationHistory {
    pub fn new() -> Self {
        LocationHistory {
            samples: VecDeque::new(),
        }
    }

    /// Prepend a reading; returns the stored sample
    ///
    /// Never refused. A reading stamped before the current head (wall clock
    /// stepped back) is re-stamped with the head's timestamp, keeping its
    /// coordinates and address, so the ledger stays newest-first. Equal
    /// timestamps are kept as-is.
    pub fn prepend(&mut self, sample: LocationSample) -> Arc<LocationSample> {
        let sample = match self.samples.front() {
            Some(head) if sample.timestamp() < head.timestamp() => {
                tracing::warn!(
                    sample = %sample.timestamp(),
                    latest = %head.timestamp(),
                    "Clock behind latest sighting; clamping sample timestamp"
                );
                sample.not_before(head.timestamp())
            }
            _ => sample,
        };

        let sample = Arc::new(sample);
        self.samples.push_front(Arc::clone(&sample));
        sample
    }

    /// Newest sample (the object's last known location)
    pub fn latest(&self) -> Option<&Arc<LocationSample>> {
        self.samples.front()
    }

    /// Sample at `index`, 0 being the newest
    pub fn get(&self, index: usize) -> Option<&Arc<LocationSample>> {
        self.samples.get(index)
    }

    /// Newest-first iteration
    pub fn iter(&self) -> impl Iterator<Item = &Arc<LocationSample>> {
        self.samples.iter()
    }

    /// Where was the object as of `time`? (newest sample not after `time`)
    pub fn location_at(&self, time: DateTime<Utc>) -> Option<&Arc<LocationSample>> {
        self.samples.iter().find(|s| s.timestamp() <= time)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Owned newest-first copy (shares the samples)
    pub fn to_vec(&self) -> Vec<Arc<LocationSample>> {
        self.samples.iter().cloned().collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
