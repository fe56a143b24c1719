// 🏷️ Identity Codec - derives the token printed into an object's QR code
//
// Token layout: QR_<NORMALIZED NAME>_<unix millis>
//
// The millisecond stamp is forced strictly monotonic per codec, so two objects
// registered with the same name in the same millisecond still get distinct
// tokens. The token is opaque: nothing ever parses the name back out of it.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Prefix shared by every generated token
pub const TOKEN_PREFIX: &str = "QR";

/// Uppercase the trimmed name and collapse every whitespace run into `_`
///
/// Example: "  Notebook   Dell " → "NOTEBOOK_DELL"
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub struct IdentityCodec {
    /// Last stamp handed out (unix millis)
    last_stamp: AtomicI64,
}

impl IdentityCodec {
    pub fn new() -> Self {
        IdentityCodec {
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Generate a fresh token for `name`
    ///
    /// Callers validate the name first; a blank name still yields a token
    /// (`QR__<stamp>`) but the registry never lets one through.
    pub fn generate(&self, name: &str) -> String {
        let stamp = self.next_stamp(Utc::now().timestamp_millis());
        format!("{}_{}_{}", TOKEN_PREFIX, normalize_name(name), stamp)
    }

    /// max(now, last + 1), committed with a CAS loop
    fn next_stamp(&self, now_millis: i64) -> i64 {
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let candidate = if now_millis > last { now_millis } else { last + 1 };
            match self.last_stamp.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }
}

impl Default for IdentityCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Notebook Dell"), "NOTEBOOK_DELL");
        assert_eq!(normalize_name("  camera \t canon  "), "CAMERA_CANON");
        assert_eq!(normalize_name("Câmera"), "CÂMERA");
        assert_eq!(normalize_name("single"), "SINGLE");
    }

    #[test]
    fn test_token_layout() {
        let codec = IdentityCodec::new();
        let token = codec.generate("Notebook Dell");

        assert!(token.starts_with("QR_NOTEBOOK_DELL_"));
        let stamp = token.rsplit('_').next().unwrap();
        assert!(stamp.parse::<i64>().is_ok());
    }

    #[test]
    fn test_identical_names_get_distinct_tokens() {
        let codec = IdentityCodec::new();
        let tokens: HashSet<String> = (0..1000).map(|_| codec.generate("Camera")).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_stamp_is_monotonic_when_clock_stalls() {
        let codec = IdentityCodec::new();
        assert_eq!(codec.next_stamp(100), 100);
        assert_eq!(codec.next_stamp(100), 101);
        // Clock went backwards
        assert_eq!(codec.next_stamp(50), 102);
        assert_eq!(codec.next_stamp(500), 500);
    }
}
