//! Transcript Resolver - turn a video's caption tracks into one clean transcript
//!
//! Given a video id and an ordered list of preferred languages, the resolver asks a
//! [`CaptionSource`] for the available caption tracks, picks the best one, flattens it
//! into plain text and classifies every failure into a small, stable [`FailureKind`]
//! vocabulary.

pub mod batch;
pub mod captions;
pub mod cli;
pub mod config;
pub mod output;
pub mod resolve;
pub mod utils;

pub use captions::{CaptionSegment, CaptionSource, CaptionTrack, SourceError, VideoId};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use output::{HealthResponse, TranscriptRequest, TranscriptResponse};
pub use resolve::{
    Failure, FailureKind, LanguagePreference, Outcome, ResolutionService, ResolvedTranscript,
};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
