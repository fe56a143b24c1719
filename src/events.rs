// 📜 Audit events - "Every change is an event"
//
// The registry appends one event per mutation. Events are never edited or
// removed; they live as long as the registry does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new object was registered
    ObjectRegistered,
    /// A scan committed a location sample to an object's history
    LocationRecorded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ObjectRegistered => "object_registered",
            EventType::LocationRecorded => "location_recorded",
        }
    }
}

/// Event for audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Object id (UUID) the event is about
    pub object_id: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: EventType, object_id: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            object_id: object_id.to_string(),
            data,
        }
    }
}
