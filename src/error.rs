// ⚠️ Error taxonomy for the tracker core
//
// Every error is recoverable: it is returned to the immediate caller and
// leaves the registry exactly as it was before the call.

use crate::geolocation::GeolocationError;
use crate::render::RenderError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// Registration input rejected before any mutation (e.g. blank name)
    #[error("validation failed: {0}")]
    Validation(String),

    /// The geolocation provider could not deliver a reading
    #[error("location acquisition failed: {0}")]
    Acquisition(GeolocationError),

    /// The scanned token does not belong to any registered object
    #[error("no registered object for token {token}")]
    NoMatch { token: String },

    /// The decoder found no identity token in the captured frame
    #[error("no identity token could be decoded from the captured frame")]
    Unreadable,

    /// A scan is already acquiring; the trigger was ignored
    #[error("a scan is already in progress")]
    ScanInProgress,

    #[error("QR rendering failed: {0}")]
    Render(RenderError),

    #[error("export failed: {0}")]
    Export(String),
}

impl From<GeolocationError> for TrackerError {
    fn from(err: GeolocationError) -> Self {
        TrackerError::Acquisition(err)
    }
}

impl From<RenderError> for TrackerError {
    fn from(err: RenderError) -> Self {
        TrackerError::Render(err)
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
