// QR Tracker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod identity;       // Identity Codec - token generation
pub mod location;       // Location Sample Factory
pub mod temporal;       // History Ledger - newest-first location timeline
pub mod events;         // Audit trail
pub mod entities;       // Tracked objects + Object Registry
pub mod geolocation;    // Geolocation provider contract
pub mod decoder;        // Token decoding seam
pub mod workflow;       // Scan Workflow state machine
pub mod render;         // QR image rendering
pub mod export;         // Download / print / CSV sinks
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{Result, TrackerError};
pub use identity::{normalize_name, IdentityCodec};
pub use location::{format_time_ago, LocationSample, RawPosition};
pub use temporal::LocationHistory;
pub use events::{Event, EventType};
pub use entities::{ObjectRegistry, TrackedObject};
pub use geolocation::{
    CachedGeolocation, FixedPosition, GeolocationError, GeolocationProvider, PositionOptions,
    ScriptedGeolocation, Unsupported,
};
pub use decoder::{FixedTokenDecoder, ScanFrame, TextPayloadDecoder, TokenDecoder};
pub use workflow::{ScanGate, ScanOutcome, ScanReport, ScanState, ScanStatus, ScanWorkflow};
pub use render::{render_or_blank, QrRenderer, RenderError, RenderOptions, RenderedImage, SvgQrRenderer};
pub use export::{download_filename, history_csv, DownloadSink, PrintSheet};
pub use config::{ServerConfig, TrackerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
