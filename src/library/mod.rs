mod import;
mod models;

pub use import::{import_library, verify_library_audio_features, LibraryError};
pub use models::{ClassificationError, Participant, Track, TrackClassification, TrackMetadata};
