//! ReelFluent - clip-based transcription practice for language learners
//!
//! This library splits media from YouTube, direct URLs, or local files into
//! time-boxed clips, transcribes and translates them using AWS services, and
//! keeps a bounded persistent session of user-curated clips.

pub mod cli;
pub mod clips;
pub mod compare;
pub mod config;
pub mod extractors;
pub mod output;
pub mod prefs;
pub mod session;
pub mod transcribe;
pub mod translate;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use clips::{generate_clips, Clip, FlowOutcome};
pub use config::Config;
pub use extractors::{MediaExtractor, MediaProbe};
pub use session::{MediaSource, SessionClip, SessionStore};
pub use transcribe::{TranscriptionPipeline, TranscriptionResult};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to reelfluent
#[derive(thiserror::Error, Debug)]
pub enum ReelFluentError {
    #[error("Unsupported URL format: {0}")]
    UnsupportedUrl(String),

    #[error("Invalid clip range: {0}")]
    InvalidClipRange(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtractionFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Media is too long: {actual_seconds:.0}s exceeds the {limit_seconds}s limit")]
    MediaTooLong {
        actual_seconds: f64,
        limit_seconds: u32,
    },

    #[error("Session limit reached: {0}")]
    SessionLimit(String),

    #[error("Clip is already being transcribed")]
    AlreadyPending,

    #[error("No media is loaded")]
    NoMediaLoaded,

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("AWS configuration error: {0}")]
    AwsConfigError(String),

    #[error("File operation failed: {0}")]
    FileError(String),
}
