// 🛰️ Geolocation provider contract
//
// The scan workflow never talks to a device directly. It asks a provider for
// the current position with a bounded wait and a cache tolerance, and gets
// back either coordinates or one of four failure reasons.

use crate::location::RawPosition;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

// ============================================================================
// OPTIONS + ERRORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOptions {
    pub high_accuracy: bool,

    /// Longest the caller will wait for a reading
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// Oldest cached reading the caller will accept
    #[serde(with = "millis")]
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        PositionOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(60),
        }
    }
}

/// Durations as integer milliseconds in config files
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationError {
    #[error("geolocation is not supported")]
    Unsupported,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("timed out waiting for a position")]
    Timeout,

    #[error("position unavailable")]
    PositionUnavailable,
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

pub trait GeolocationProvider: Send + Sync {
    fn get_current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<RawPosition, GeolocationError>> + Send;
}

impl<P: GeolocationProvider> GeolocationProvider for &P {
    fn get_current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<RawPosition, GeolocationError>> + Send {
        (**self).get_current_position(options)
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// Always answers with the same coordinates
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub RawPosition);

impl GeolocationProvider for FixedPosition {
    async fn get_current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<RawPosition, GeolocationError> {
        Ok(self.0)
    }
}

/// No geolocation capability on this host
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl GeolocationProvider for Unsupported {
    async fn get_current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<RawPosition, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Replays a queue of scripted results, one per request
///
/// Once the script runs out every request fails with `PositionUnavailable`.
#[derive(Debug, Default)]
pub struct ScriptedGeolocation {
    script: Mutex<VecDeque<Result<RawPosition, GeolocationError>>>,
}

impl ScriptedGeolocation {
    pub fn new(script: impl IntoIterator<Item = Result<RawPosition, GeolocationError>>) -> Self {
        ScriptedGeolocation {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    pub fn push(&self, result: Result<RawPosition, GeolocationError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl GeolocationProvider for ScriptedGeolocation {
    async fn get_current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<RawPosition, GeolocationError> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Err(GeolocationError::PositionUnavailable))
    }
}

/// Serves the last good reading while it is younger than `maximum_age`
pub struct CachedGeolocation<P> {
    inner: P,
    cache: Mutex<Option<(RawPosition, Instant)>>,
}

impl<P: GeolocationProvider> CachedGeolocation<P> {
    pub fn new(inner: P) -> Self {
        CachedGeolocation {
            inner,
            cache: Mutex::new(None),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<RawPosition> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        match *cache {
            Some((position, taken)) if taken.elapsed() <= maximum_age => Some(position),
            _ => None,
        }
    }
}

impl<P: GeolocationProvider> GeolocationProvider for CachedGeolocation<P> {
    async fn get_current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<RawPosition, GeolocationError> {
        if let Some(position) = self.cached(options.maximum_age) {
            tracing::debug!("Serving cached position");
            return Ok(position);
        }

        let position = self.inner.get_current_position(options).await?;
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some((position, Instant::now()));
        Ok(position)
    }
}
