// 📍 Location Sample Factory
//
// Turns a raw position reading into an immutable, addressed sample.
// Pure with respect to its inputs: no reverse geocoding happens here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// RAW POSITION
// ============================================================================

/// Coordinates as delivered by a geolocation provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl RawPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        RawPosition { latitude, longitude }
    }

    /// Fallback human-readable address: coordinates at 4 decimal places
    pub fn fallback_address(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

// ============================================================================
// LOCATION SAMPLE
// ============================================================================

/// A single time-stamped position reading. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl LocationSample {
    /// Build a sample from a reading captured at `captured_at`
    ///
    /// The address is always populated with the coordinate fallback.
    pub fn from_reading(reading: RawPosition, captured_at: DateTime<Utc>) -> Self {
        LocationSample {
            latitude: reading.latitude,
            longitude: reading.longitude,
            timestamp: captured_at,
            address: Some(reading.fallback_address()),
        }
    }

    /// Same reading, re-stamped no earlier than `floor`
    pub(crate) fn not_before(mut self, floor: DateTime<Utc>) -> Self {
        if self.timestamp < floor {
            self.timestamp = floor;
        }
        self
    }

    /// Replace the fallback address with a richer one (e.g. "São Paulo, SP")
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn position(&self) -> RawPosition {
        RawPosition::new(self.latitude, self.longitude)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

/// Relative description of how long ago `then` was, as shown next to a sighting
///
/// Under an hour: "a few minutes ago"; under a day: "N hours ago";
/// otherwise "N days ago".
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - then).num_hours();

    if hours < 1 {
        return "a few minutes ago".to_string();
    }
    if hours < 24 {
        return format!("{} hours ago", hours);
    }
    format!("{} days ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_sample_from_reading() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let sample = LocationSample::from_reading(RawPosition::new(-23.5505, -46.6333), t);

        assert_eq!(sample.latitude(), -23.5505);
        assert_eq!(sample.longitude(), -46.6333);
        assert_eq!(sample.timestamp(), t);
        assert_eq!(sample.address(), Some("-23.5505, -46.6333"));
    }

    #[test]
    fn test_fallback_address_rounds_to_four_places() {
        let reading = RawPosition::new(-22.906847, -43.172897);
        assert_eq!(reading.fallback_address(), "-22.9068, -43.1729");
    }

    #[test]
    fn test_with_address_overrides_fallback() {
        let sample = LocationSample::from_reading(RawPosition::new(1.0, 2.0), Utc::now())
            .with_address("Avenida Paulista, SP");
        assert_eq!(sample.address(), Some("Avenida Paulista, SP"));
        assert_eq!(sample.position(), RawPosition::new(1.0, 2.0));
    }

    #[test]
    fn test_format_time_ago() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now - Duration::minutes(20), now), "a few minutes ago");
        assert_eq!(format_time_ago(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(format_time_ago(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(format_time_ago(now - Duration::days(7), now), "7 days ago");
    }
}
