// 🔄 Scan Workflow - scan → position → match → commit
//
// States:
//
//   Idle ──trigger──▶ Acquiring ──▶ { Matched | Unmatched | AcquisitionFailed } ──▶ Idle
//
// Only one scan may be Acquiring at a time. A trigger that arrives while a
// scan is in flight is refused on the spot (ScanInProgress) and has no other
// effect: nothing is queued, nothing is mutated.
//
// The only suspension point is the wait for the geolocation provider. The
// commit that follows is a single registry write.

use crate::decoder::{ScanFrame, TokenDecoder};
use crate::entities::{ObjectRegistry, TrackedObject};
use crate::error::{Result, TrackerError};
use crate::geolocation::{GeolocationError, GeolocationProvider, PositionOptions};
use crate::location::{LocationSample, RawPosition};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

// ============================================================================
// STATE + OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No scan in progress
    Idle,
    /// Waiting on decode + position for the current scan
    Acquiring,
}

/// How a finished scan ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Token resolved and the sample was committed
    Matched {
        object_id: String,
        token: String,
        sample: LocationSample,
    },

    /// Token decoded but no object carries it
    Unmatched { token: String },

    /// Nothing decodable in the frame
    Unreadable,

    /// The provider failed (unsupported, denied, timeout, unavailable)
    AcquisitionFailed { reason: GeolocationError },

    /// Any other failure
    Rejected { reason: String },
}

impl ScanOutcome {
    fn from_result(result: &Result<ScanReport>) -> Self {
        match result {
            Ok(report) => ScanOutcome::Matched {
                object_id: report.object.id().to_string(),
                token: report.token.clone(),
                sample: (*report.sample).clone(),
            },
            Err(TrackerError::NoMatch { token }) => ScanOutcome::Unmatched {
                token: token.clone(),
            },
            Err(TrackerError::Unreadable) => ScanOutcome::Unreadable,
            Err(TrackerError::Acquisition(reason)) => ScanOutcome::AcquisitionFailed { reason: *reason },
            Err(other) => ScanOutcome::Rejected {
                reason: other.to_string(),
            },
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, ScanOutcome::Matched { .. })
    }
}

/// Observable workflow status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStatus {
    pub state: ScanState,
    pub last_outcome: Option<ScanOutcome>,
    /// Scans that ran to an outcome (refused triggers not counted)
    pub finished_scans: u64,
}

impl Default for ScanStatus {
    fn default() -> Self {
        ScanStatus {
            state: ScanState::Idle,
            last_outcome: None,
            finished_scans: 0,
        }
    }
}

/// Successful scan: the committed sample and the updated object
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub token: String,
    pub sample: Arc<LocationSample>,
    pub object: TrackedObject,
}

// ============================================================================
// SCAN GATE (mutual exclusion + status channel)
// ============================================================================

/// Owns the Idle/Acquiring state shared by every workflow built on it
///
/// Workflows that share a gate (e.g. one per HTTP request) still exclude each
/// other.
#[derive(Clone)]
pub struct ScanGate {
    status: Arc<watch::Sender<ScanStatus>>,
}

impl ScanGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ScanStatus::default());
        ScanGate { status: Arc::new(tx) }
    }

    pub fn state(&self) -> ScanState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ScanStatus {
        self.status.borrow().clone()
    }

    /// Receiver that sees every state change and outcome
    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }

    /// Idle → Acquiring, atomically. `None` if a scan is already in flight.
    fn try_begin(&self) -> Option<AcquiringGuard<'_>> {
        let mut began = false;
        self.status.send_if_modified(|status| {
            if status.state == ScanState::Idle {
                status.state = ScanState::Acquiring;
                began = true;
            }
            began
        });

        began.then(|| AcquiringGuard {
            gate: self,
            outcome: None,
        })
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the gate to Idle when dropped, on every path (including a
/// dropped future)
struct AcquiringGuard<'a> {
    gate: &'a ScanGate,
    outcome: Option<ScanOutcome>,
}

impl Drop for AcquiringGuard<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take();
        self.gate.status.send_modify(|status| {
            status.state = ScanState::Idle;
            if let Some(outcome) = outcome {
                status.last_outcome = Some(outcome);
                status.finished_scans += 1;
            }
        });
    }
}

// ============================================================================
// SCAN WORKFLOW
// ============================================================================

pub struct ScanWorkflow<D, G> {
    registry: ObjectRegistry,
    decoder: D,
    provider: G,
    options: PositionOptions,
    gate: ScanGate,
}

impl<D: TokenDecoder, G: GeolocationProvider> ScanWorkflow<D, G> {
    pub fn new(registry: ObjectRegistry, decoder: D, provider: G) -> Self {
        ScanWorkflow {
            registry,
            decoder,
            provider,
            options: PositionOptions::default(),
            gate: ScanGate::new(),
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    /// Share mutual exclusion with other workflows on the same gate
    pub fn with_gate(mut self, gate: ScanGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn state(&self) -> ScanState {
        self.gate.state()
    }

    pub fn status(&self) -> ScanStatus {
        self.gate.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.gate.subscribe()
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Run one scan of `frame`
    ///
    /// Returns `ScanInProgress` without side effects if another scan holds
    /// the gate. Every other error leaves the registry unchanged, and the
    /// workflow is back to Idle by the time this returns.
    pub async fn trigger(&self, frame: ScanFrame) -> Result<ScanReport> {
        let Some(mut guard) = self.gate.try_begin() else {
            tracing::debug!("Scan trigger ignored: already acquiring");
            return Err(TrackerError::ScanInProgress);
        };

        tracing::info!("Scan started");
        let result = self.run(&frame).await;
        let outcome = ScanOutcome::from_result(&result);

        match &outcome {
            ScanOutcome::Matched { token, .. } => tracing::info!(token = %token, "Scan matched"),
            ScanOutcome::Unmatched { token } => tracing::warn!(token = %token, "Scan matched no object"),
            ScanOutcome::Unreadable => tracing::warn!("Scan frame had no readable token"),
            ScanOutcome::AcquisitionFailed { reason } => {
                tracing::warn!(%reason, "Scan could not acquire a position")
            }
            ScanOutcome::Rejected { reason } => tracing::warn!(%reason, "Scan commit rejected"),
        }

        guard.outcome = Some(outcome);
        result
    }

    async fn run(&self, frame: &ScanFrame) -> Result<ScanReport> {
        let token = self.decoder.decode(frame).ok_or(TrackerError::Unreadable)?;
        let reading = self.acquire().await?;

        let sample = LocationSample::from_reading(reading, Utc::now());
        let (object, sample) = self.registry.record_location(&token, sample)?;

        Ok(ScanReport {
            token,
            sample,
            object,
        })
    }

    /// Ask the provider for a position, bounded by the configured timeout
    async fn acquire(&self) -> std::result::Result<RawPosition, GeolocationError> {
        match tokio::time::timeout(
            self.options.timeout,
            self.provider.get_current_position(&self.options),
        )
        .await
        {
            Ok(reading) => reading,
            Err(_elapsed) => Err(GeolocationError::Timeout),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
