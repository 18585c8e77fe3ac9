//! Domain model (ids, styles, rate window, records, outcomes, errors).

pub mod artifact;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod rate_window;
pub mod request;
pub mod state;
pub mod style;

pub use artifact::ArtifactRecord;
pub use errors::{
    DownloadError, ErrorKind, GenerationError, ProviderError, StateError, StoreError,
};
pub use ids::{ArtifactId, InvalidArtifactId};
pub use outcome::{GenerationOutcome, Warning};
pub use rate_window::RateWindow;
pub use request::{Cost, GenerationRequest, ImageQuality, ImageSettings, ImageSize};
pub use state::GenerationStage;
pub use style::{DEFAULT_STYLE_KEY, STYLE_PRESETS, StyleAttributes, StylePreset};
