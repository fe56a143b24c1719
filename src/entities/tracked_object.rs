// 📦 Tracked Object Entity + Object Registry
//
// "Identity persists, values accumulate"
//
// - id (UUID) and identity token are fixed at registration
// - the location history only ever grows at the front
// - the last location IS the head of the history (same Arc), never a copy
//
// The registry is the single owner of every object. Objects leave it only as
// snapshots; the sole mutation after registration is `record_location`, the
// commit step of a scan.

use crate::error::{Result, TrackerError};
use crate::events::{Event, EventType};
use crate::identity::IdentityCodec;
use crate::location::{LocationSample, RawPosition};
use crate::temporal::LocationHistory;
use chrono::{DateTime, Duration, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// TRACKED OBJECT
// ============================================================================

#[derive(Debug, Clone)]
pub struct TrackedObject {
    // ========================================================================
    // IDENTITY (never changes)
    // ========================================================================
    id: String,
    identity_token: String,
    created_at: DateTime<Utc>,

    // ========================================================================
    // VALUES
    // ========================================================================
    name: String,

    /// Newest-first ledger; its head doubles as the last location
    history: LocationHistory,
}

impl TrackedObject {
    fn new(name: String, identity_token: String) -> Self {
        TrackedObject {
            id: uuid::Uuid::new_v4().to_string(),
            identity_token,
            created_at: Utc::now(),
            name,
            history: LocationHistory::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque token encoded into the object's QR code
    pub fn identity_token(&self) -> &str {
        &self.identity_token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last known location (head of the history, if any)
    pub fn last_location(&self) -> Option<&Arc<LocationSample>> {
        self.history.latest()
    }

    pub fn location_history(&self) -> &LocationHistory {
        &self.history
    }

    /// Has this object been scanned at least once?
    pub fn is_located(&self) -> bool {
        !self.history.is_empty()
    }

    fn record(&mut self, sample: LocationSample) -> Arc<LocationSample> {
        self.history.prepend(sample)
    }
}

impl Serialize for TrackedObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TrackedObject", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("identity_token", &self.identity_token)?;
        state.serialize_field("last_location", &self.last_location())?;
        state.serialize_field("location_history", &self.history)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.end()
    }
}

// ============================================================================
// OBJECT REGISTRY
// ============================================================================

#[derive(Default)]
struct RegistryState {
    /// Insertion order
    objects: Vec<TrackedObject>,

    /// identity token → index into `objects`
    by_token: HashMap<String, usize>,

    /// Audit trail (append-only)
    events: Vec<Event>,
}

/// In-memory registry of tracked objects, keyed by identity token
///
/// Cloning is cheap and yields a handle to the same registry, so the scan
/// workflow and the API server share one instance. Writers serialize on the
/// inner lock.
#[derive(Clone)]
pub struct ObjectRegistry {
    state: Arc<RwLock<RegistryState>>,
    codec: Arc<IdentityCodec>,
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ObjectRegistry {
            state: Arc::new(RwLock::new(RegistryState::default())),
            codec: Arc::new(IdentityCodec::new()),
        }
    }

    // Readers never observe a half-applied write, so a poisoned lock still
    // guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new object under a freshly generated identity token
    ///
    /// The name is trimmed; a blank name is rejected before any token is
    /// generated and the registry is left untouched.
    pub fn register(&self, name: &str) -> Result<TrackedObject> {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!("Rejected registration with blank name");
            return Err(TrackerError::Validation(
                "object name must not be empty".to_string(),
            ));
        }

        let mut state = self.write();

        let mut token = self.codec.generate(name);
        while state.by_token.contains_key(&token) {
            token = self.codec.generate(name);
        }

        let object = TrackedObject::new(name.to_string(), token);
        let snapshot = object.clone();
        Self::insert(&mut state, object);
        state.events.push(Event::new(
            EventType::ObjectRegistered,
            &snapshot.id,
            serde_json::json!({
                "name": snapshot.name,
                "identity_token": snapshot.identity_token,
            }),
        ));

        tracing::info!(
            object_id = %snapshot.id,
            token = %snapshot.identity_token,
            "Registered object {:?}",
            snapshot.name
        );
        Ok(snapshot)
    }

    fn insert(state: &mut RegistryState, object: TrackedObject) {
        state
            .by_token
            .insert(object.identity_token.clone(), state.objects.len());
        state.objects.push(object);
    }

    /// Snapshot of all objects in insertion order
    pub fn list(&self) -> Vec<TrackedObject> {
        self.read().objects.clone()
    }

    /// Exact-match lookup by identity token
    pub fn find_by_token(&self, token: &str) -> Option<TrackedObject> {
        let state = self.read();
        state
            .by_token
            .get(token)
            .map(|&index| state.objects[index].clone())
    }

    /// Lookup by object id (UUID)
    pub fn find_by_id(&self, id: &str) -> Option<TrackedObject> {
        self.read().objects.iter().find(|o| o.id == id).cloned()
    }

    /// Objects with at least one recorded location, insertion order
    pub fn located(&self) -> Vec<TrackedObject> {
        self.read()
            .objects
            .iter()
            .filter(|o| o.is_located())
            .cloned()
            .collect()
    }

    /// Location history of the object behind `token`
    pub fn history(&self, token: &str) -> Option<LocationHistory> {
        let state = self.read();
        state
            .by_token
            .get(token)
            .map(|&index| state.objects[index].history.clone())
    }

    pub fn count(&self) -> usize {
        self.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Commit a scanned sample to the object behind `token`
    ///
    /// Token resolution and the prepend happen under one write lock, so no
    /// reader can see the last location and the history disagree. Returns
    /// the updated object together with the sample as stored (its timestamp
    /// is clamped to the previous sighting if the clock went backwards).
    pub fn record_location(
        &self,
        token: &str,
        sample: LocationSample,
    ) -> Result<(TrackedObject, Arc<LocationSample>)> {
        let mut state = self.write();

        let index = *state.by_token.get(token).ok_or_else(|| TrackerError::NoMatch {
            token: token.to_string(),
        })?;

        let object = &mut state.objects[index];
        let sample = object.record(sample);
        let snapshot = object.clone();

        state.events.push(Event::new(
            EventType::LocationRecorded,
            &snapshot.id,
            serde_json::json!({
                "latitude": sample.latitude(),
                "longitude": sample.longitude(),
                "timestamp": sample.timestamp(),
                "address": sample.address(),
                "history_len": snapshot.history.len(),
            }),
        ));

        tracing::info!(
            object_id = %snapshot.id,
            token = %token,
            latitude = sample.latitude(),
            longitude = sample.longitude(),
            "Recorded location"
        );
        Ok((snapshot, sample))
    }

    /// Full audit trail, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.read().events.clone()
    }

    pub fn events_for_object(&self, object_id: &str) -> Vec<Event> {
        self.read()
            .events
            .iter()
            .filter(|e| e.object_id == object_id)
            .cloned()
            .collect()
    }

    /// Load the two demonstration objects with backdated sightings
    ///
    /// Tokens are fixed ("QR_NOTEBOOK_001", "QR_CAMERA_002") so a demo scan can
    /// target them. Already-present tokens are skipped.
    pub fn seed_demo_objects(&self, now: DateTime<Utc>) -> Vec<TrackedObject> {
        let seeds = [
            (
                "Notebook Dell",
                "QR_NOTEBOOK_001",
                now - Duration::days(7),
                vec![
                    (-23.5489, -46.6388, now - Duration::hours(24), "Avenida Paulista, SP"),
                    (-23.5505, -46.6333, now - Duration::hours(2), "São Paulo, SP"),
                ],
            ),
            (
                "Câmera Canon",
                "QR_CAMERA_002",
                now - Duration::days(3),
                vec![(-22.9068, -43.1729, now - Duration::hours(5), "Rio de Janeiro, RJ")],
            ),
        ];

        let mut state = self.write();
        let mut seeded = Vec::new();

        for (name, token, created_at, sightings) in seeds {
            if state.by_token.contains_key(token) {
                continue;
            }

            let mut object = TrackedObject::new(name.to_string(), token.to_string());
            object.created_at = created_at;
            // Oldest first, so every prepend keeps the ledger ordered
            for (lat, lon, at, address) in sightings {
                let sample = LocationSample::from_reading(RawPosition::new(lat, lon), at)
                    .with_address(address);
                object.record(sample);
            }

            seeded.push(object.clone());
            Self::insert(&mut state, object);
        }

        tracing::debug!("Seeded {} demo objects", seeded.len());
        seeded
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample(lat: f64, lon: f64, at: DateTime<Utc>) -> LocationSample {
        LocationSample::from_reading(RawPosition::new(lat, lon), at)
    }

    #[test]
    fn test_register_creates_unlocated_object() {
        let registry = ObjectRegistry::new();
        let object = registry.register("Notebook Dell").unwrap();

        assert!(!object.id().is_empty());
        assert_eq!(object.name(), "Notebook Dell");
        assert!(object.identity_token().starts_with("QR_NOTEBOOK_DELL_"));
        assert!(object.last_location().is_none());
        assert!(object.location_history().is_empty());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_register_trims_name() {
        let registry = ObjectRegistry::new();
        let object = registry.register("   Tablet  ").unwrap();
        assert_eq!(object.name(), "Tablet");
    }

    #[test]
    fn test_register_blank_name_rejected() {
        let registry = ObjectRegistry::new();

        for name in ["", "   ", "\t\n"] {
            let err = registry.register(name).unwrap_err();
            assert!(matches!(err, TrackerError::Validation(_)));
        }

        assert!(registry.is_empty());
        assert!(registry.events().is_empty());
    }

    #[test]
    fn test_identical_names_get_unique_tokens_and_ids() {
        let registry = ObjectRegistry::new();
        let objects: Vec<TrackedObject> =
            (0..50).map(|_| registry.register("Camera").unwrap()).collect();

        let tokens: HashSet<&str> = objects.iter().map(|o| o.identity_token()).collect();
        let ids: HashSet<&str> = objects.iter().map(|o| o.id()).collect();
        assert_eq!(tokens.len(), 50);
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let registry = ObjectRegistry::new();
        registry.register("First").unwrap();
        registry.register("Second").unwrap();
        registry.register("Third").unwrap();

        let names: Vec<String> = registry.list().iter().map(|o| o.name().to_string()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_find_by_token_and_id() {
        let registry = ObjectRegistry::new();
        let object = registry.register("Camera").unwrap();

        let by_token = registry.find_by_token(object.identity_token()).unwrap();
        assert_eq!(by_token.id(), object.id());

        let by_id = registry.find_by_id(object.id()).unwrap();
        assert_eq!(by_id.identity_token(), object.identity_token());

        assert!(registry.find_by_token("QR_UNKNOWN_0").is_none());
        // Exact match only
        assert!(registry.find_by_token(&object.identity_token().to_lowercase()).is_none());
    }

    #[test]
    fn test_record_location_sets_last_location_and_prepends() {
        let registry = ObjectRegistry::new();
        let object = registry.register("Notebook Dell").unwrap();
        let t = Utc::now();

        let (updated, stored_sample) = registry
            .record_location(object.identity_token(), sample(-23.5505, -46.6333, t))
            .unwrap();

        let last = updated.last_location().unwrap();
        assert!(Arc::ptr_eq(last, &stored_sample));
        assert_eq!(last.latitude(), -23.5505);
        assert_eq!(last.longitude(), -46.6333);
        assert_eq!(last.timestamp(), t);
        assert_eq!(updated.location_history().len(), 1);
        assert!(Arc::ptr_eq(last, updated.location_history().get(0).unwrap()));

        // Stored object agrees with the returned snapshot
        let stored = registry.find_by_token(object.identity_token()).unwrap();
        assert!(Arc::ptr_eq(
            stored.last_location().unwrap(),
            stored.location_history().get(0).unwrap()
        ));
        // created_at never moves
        assert_eq!(stored.created_at(), object.created_at());
    }

    #[test]
    fn test_record_location_unknown_token_changes_nothing() {
        let registry = ObjectRegistry::new();
        let object = registry.register("Camera").unwrap();

        let err = registry
            .record_location("QR_GHOST_1", sample(1.0, 1.0, Utc::now()))
            .unwrap_err();
        assert_eq!(
            err,
            TrackerError::NoMatch {
                token: "QR_GHOST_1".to_string()
            }
        );

        let stored = registry.find_by_token(object.identity_token()).unwrap();
        assert!(stored.last_location().is_none());
        assert_eq!(registry.events().len(), 1);
    }

    #[test]
    fn test_record_location_clamps_clock_stepping_back() {
        let registry = ObjectRegistry::new();
        let object = registry.register("Camera").unwrap();
        let t = Utc::now();

        registry
            .record_location(object.identity_token(), sample(1.0, 1.0, t))
            .unwrap();
        let (updated, stored_sample) = registry
            .record_location(object.identity_token(), sample(2.0, 2.0, t - Duration::minutes(1)))
            .unwrap();

        // Accepted, re-stamped to the previous head, still newest-first
        assert_eq!(stored_sample.timestamp(), t);
        assert_eq!(stored_sample.latitude(), 2.0);
        let history = updated.location_history();
        assert_eq!(history.len(), 2);
        assert!(Arc::ptr_eq(history.get(0).unwrap(), &stored_sample));
        assert_eq!(history.get(1).unwrap().latitude(), 1.0);

        let events = registry.events_for_object(object.id());
        assert_eq!(events.last().unwrap().data["history_len"], 2);
    }

    #[test]
    fn test_located_filters_unscanned_objects() {
        let registry = ObjectRegistry::new();
        let a = registry.register("A").unwrap();
        registry.register("B").unwrap();

        registry
            .record_location(a.identity_token(), sample(1.0, 1.0, Utc::now()))
            .unwrap();

        let located = registry.located();
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].name(), "A");
    }

    #[test]
    fn test_events_audit_trail() {
        let registry = ObjectRegistry::new();
        let a = registry.register("A").unwrap();
        let b = registry.register("B").unwrap();
        registry
            .record_location(a.identity_token(), sample(1.0, 1.0, Utc::now()))
            .unwrap();

        assert_eq!(registry.events().len(), 3);

        let a_events = registry.events_for_object(a.id());
        assert_eq!(a_events.len(), 2);
        assert_eq!(a_events[0].event_type, EventType::ObjectRegistered);
        assert_eq!(a_events[1].event_type, EventType::LocationRecorded);
        assert_eq!(a_events[1].data["history_len"], 1);

        assert_eq!(registry.events_for_object(b.id()).len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ObjectRegistry::new();
        let handle = registry.clone();
        handle.register("Shared").unwrap();
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_seed_demo_objects() {
        let registry = ObjectRegistry::new();
        let now = Utc::now();
        let seeded = registry.seed_demo_objects(now);

        assert_eq!(seeded.len(), 2);
        let notebook = registry.find_by_token("QR_NOTEBOOK_001").unwrap();
        assert_eq!(notebook.name(), "Notebook Dell");
        assert_eq!(notebook.location_history().len(), 2);
        assert_eq!(notebook.last_location().unwrap().address(), Some("São Paulo, SP"));
        assert_eq!(notebook.created_at(), now - Duration::days(7));

        let camera = registry.find_by_token("QR_CAMERA_002").unwrap();
        assert_eq!(camera.location_history().len(), 1);

        // Idempotent
        assert!(registry.seed_demo_objects(now).is_empty());
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_serialized_object_exposes_last_location() {
        let registry = ObjectRegistry::new();
        let object = registry.register("Camera").unwrap();
        let json = serde_json::to_value(&object).unwrap();
        assert!(json["last_location"].is_null());
        assert_eq!(json["location_history"], serde_json::json!([]));

        let (updated, _) = registry
            .record_location(object.identity_token(), sample(1.5, 2.5, Utc::now()))
            .unwrap();
        let json = serde_json::to_value(&updated).unwrap();
        assert_eq!(json["last_location"]["latitude"], 1.5);
        assert_eq!(json["location_history"][0]["longitude"], 2.5);
        assert_eq!(json["identity_token"], updated.identity_token());
    }
}
