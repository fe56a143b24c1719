// Entity Models
// Following Rich Hickey's philosophy: "Identity persists, values change"
//
// A tracked object has:
// - Stable identity (UUID + identity token) that NEVER changes
// - A timeline of immutable location samples (see temporal)
// - A registry for lookups by identity token

pub mod tracked_object;

pub use tracked_object::{ObjectRegistry, TrackedObject};
