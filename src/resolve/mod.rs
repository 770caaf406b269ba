use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod language;
pub mod normalizer;
pub mod selector;

pub use language::{LanguageError, LanguagePreference};
pub use selector::{Selection, SelectionError};

use crate::captions::video_id::VideoIdError;
use crate::captions::{CaptionSource, CaptionTrack, SourceError, VideoId};
use crate::config::Config;
use crate::utils::{format_duration, truncate_chars};

const MAX_MESSAGE_CHARS: usize = 300;

/// Closed vocabulary of ways a resolution can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    InvalidInput,
    VideoUnavailable,
    CaptionsDisabled,
    NoCaptionsAvailable,
    UpstreamBlocked,
    UpstreamUnexpected,
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "InvalidInput",
            FailureKind::VideoUnavailable => "VideoUnavailable",
            FailureKind::CaptionsDisabled => "CaptionsDisabled",
            FailureKind::NoCaptionsAvailable => "NoCaptionsAvailable",
            FailureKind::UpstreamBlocked => "UpstreamBlocked",
            FailureKind::UpstreamUnexpected => "UpstreamUnexpected",
            FailureKind::Timeout => "Timeout",
        }
    }

    /// HTTP status a transport layer should answer with
    pub fn status_code(&self) -> reqwest::StatusCode {
        use reqwest::StatusCode;

        match self {
            FailureKind::InvalidInput => StatusCode::BAD_REQUEST,
            FailureKind::VideoUnavailable
            | FailureKind::CaptionsDisabled
            | FailureKind::NoCaptionsAvailable => StatusCode::NOT_FOUND,
            FailureKind::UpstreamBlocked => StatusCode::SERVICE_UNAVAILABLE,
            FailureKind::UpstreamUnexpected => StatusCode::BAD_GATEWAY,
            FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transcript text ready to hand back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTranscript {
    pub text: String,
    pub language_code: String,
    pub is_auto_generated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one resolution: a transcript or a classified failure, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(ResolvedTranscript),
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure.kind),
        }
    }
}

/// Everything that can go wrong inside a resolution
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidVideoId(#[from] VideoIdError),

    #[error(transparent)]
    InvalidLanguages(#[from] LanguageError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("The {0} transcript contains no text")]
    EmptyTranscript(String),

    #[error("Timed out after {} waiting for the caption source", format_duration(*.0))]
    Timeout(Duration),

    #[error("Resolution was cancelled before the caption source answered")]
    Cancelled,
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::InvalidVideoId(_) | ResolveError::InvalidLanguages(_) => FailureKind::InvalidInput,
            ResolveError::Source(SourceError::NotFound(_)) => FailureKind::VideoUnavailable,
            ResolveError::Source(SourceError::Disabled) => FailureKind::CaptionsDisabled,
            ResolveError::Source(SourceError::Blocked(_)) => FailureKind::UpstreamBlocked,
            ResolveError::Source(SourceError::Transport(_)) => FailureKind::UpstreamUnexpected,
            ResolveError::Selection(_) | ResolveError::EmptyTranscript(_) => FailureKind::NoCaptionsAvailable,
            ResolveError::Timeout(_) => FailureKind::Timeout,
            ResolveError::Cancelled => FailureKind::UpstreamUnexpected,
        }
    }

    /// Message shown to the caller
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::Source(SourceError::NotFound(reason)) => format!(
                "This video is unavailable (private, deleted, or region-locked): {}",
                truncate_chars(reason, MAX_MESSAGE_CHARS)
            ),
            ResolveError::Source(SourceError::Disabled) => {
                "Transcripts are disabled for this video by the uploader.".to_string()
            }
            ResolveError::Source(SourceError::Blocked(_)) => {
                "The video platform refused the request (rate limit or bot check). Try again later.".to_string()
            }
            ResolveError::Source(SourceError::Transport(reason)) => format!(
                "Failed to fetch transcript: {}",
                truncate_chars(reason, MAX_MESSAGE_CHARS)
            ),
            other => other.to_string(),
        }
    }
}

impl From<ResolveError> for Failure {
    fn from(err: ResolveError) -> Self {
        Failure {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// Orchestrates caption listing, track selection and text normalization.
///
/// Holds no per-request state; one instance serves any number of concurrent
/// resolutions.
#[derive(Clone)]
pub struct ResolutionService {
    source: Arc<dyn CaptionSource>,
    timeout: Option<Duration>,
    default_preferences: LanguagePreference,
}

impl ResolutionService {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self {
            source,
            timeout: None,
            default_preferences: LanguagePreference::any(),
        }
    }

    /// Build a service with the deadline and default languages from config
    pub fn from_config(source: Arc<dyn CaptionSource>, config: &Config) -> crate::Result<Self> {
        let defaults = LanguagePreference::parse(config.service.default_languages.clone())?;

        Ok(Self::new(source)
            .with_timeout(config.resolve_timeout())
            .with_default_preferences(defaults))
    }

    /// Deadline applied to the caption source call
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Preferences used when a request brings none
    pub fn with_default_preferences(mut self, preferences: LanguagePreference) -> Self {
        self.default_preferences = preferences;
        self
    }

    /// Resolve a transcript for a video
    pub async fn resolve(&self, video_id: &str, preferences: &[String]) -> Outcome {
        self.resolve_until(video_id, preferences, std::future::pending::<()>()).await
    }

    /// Resolve a transcript, giving up as soon as `cancel` completes
    pub async fn resolve_until<F>(&self, video_id: &str, preferences: &[String], cancel: F) -> Outcome
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();

        match self.try_resolve(video_id, preferences, cancel).await {
            Ok(transcript) => {
                tracing::debug!(
                    chars = transcript.text.len(),
                    "Resolved transcript in {}",
                    format_duration(started.elapsed())
                );
                Outcome::Success(transcript)
            }
            Err(err) => {
                let kind = err.kind();
                match kind {
                    FailureKind::UpstreamUnexpected => {
                        tracing::error!(kind = %kind, "Unexpected error for {}: {}", video_id.trim(), err)
                    }
                    _ => tracing::warn!(kind = %kind, "Resolution failed for {}: {}", video_id.trim(), err),
                }
                Outcome::Failure(err.into())
            }
        }
    }

    async fn try_resolve<F>(
        &self,
        video_id: &str,
        preferences: &[String],
        cancel: F,
    ) -> Result<ResolvedTranscript, ResolveError>
    where
        F: Future<Output = ()>,
    {
        let video_id = VideoId::parse(video_id)?;
        let preferences = if preferences.is_empty() {
            self.default_preferences.clone()
        } else {
            LanguagePreference::parse(preferences.iter().cloned())?
        };

        tracing::info!("Fetching transcript for video: {}", video_id);

        let tracks = self.list_tracks(&video_id, cancel).await?;
        let selection = selector::select(&tracks, &preferences)?;
        let track = selection.track;

        if selection.matched_preference {
            tracing::info!("Found {} transcript in {}", kind_label(track), track.language_code);
        } else {
            tracing::info!(
                "Using fallback transcript in {} (auto={})",
                track.language_code,
                track.is_auto_generated
            );
        }

        let text = normalizer::normalize(track);
        if text.is_empty() {
            return Err(ResolveError::EmptyTranscript(track.label()));
        }

        Ok(ResolvedTranscript {
            text,
            language_code: track.language_code.clone(),
            is_auto_generated: track.is_auto_generated,
        })
    }

    /// Ask the source for tracks, bounded by the deadline and the cancel signal
    async fn list_tracks<F>(&self, video_id: &VideoId, cancel: F) -> Result<Vec<CaptionTrack>, ResolveError>
    where
        F: Future<Output = ()>,
    {
        let fetch = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, self.source.list_tracks(video_id)).await {
                    Ok(result) => result.map_err(ResolveError::from),
                    Err(_) => Err(ResolveError::Timeout(limit)),
                },
                None => self.source.list_tracks(video_id).await.map_err(ResolveError::from),
            }
        };

        tokio::select! {
            result = fetch => result,
            _ = cancel => Err(ResolveError::Cancelled),
        }
    }
}

fn kind_label(track: &CaptionTrack) -> &'static str {
    if track.is_auto_generated {
        "auto-generated"
    } else {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionSegment, MockCaptionSource};
    use async_trait::async_trait;

    fn seg(text: &str, start_secs: u64) -> CaptionSegment {
        CaptionSegment::new(text, Duration::from_secs(start_secs), Duration::from_secs(1))
    }

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn service_returning(result: Result<Vec<CaptionTrack>, SourceError>) -> ResolutionService {
        let mut source = MockCaptionSource::new();
        source
            .expect_list_tracks()
            .times(1)
            .returning(move |_| result.clone());
        ResolutionService::new(Arc::new(source))
    }

    struct SlowSource;

    #[async_trait]
    impl CaptionSource for SlowSource {
        async fn list_tracks(&self, _video_id: &VideoId) -> Result<Vec<CaptionTrack>, SourceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![CaptionTrack::new("en", false, vec![seg("late", 0)])])
        }

        fn source_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_auto_generated_english_scenario() {
        let service = service_returning(Ok(vec![CaptionTrack::new(
            "en",
            true,
            vec![seg("Hello ", 0), seg(" world", 1)],
        )]));

        let outcome = service.resolve("abc123", &langs(&["en"])).await;

        assert_eq!(
            outcome,
            Outcome::Success(ResolvedTranscript {
                text: "Hello world".to_string(),
                language_code: "en".to_string(),
                is_auto_generated: true,
            })
        );
    }

    #[tokio::test]
    async fn test_empty_video_id_makes_no_source_call() {
        let mut source = MockCaptionSource::new();
        source.expect_list_tracks().times(0);
        let service = ResolutionService::new(Arc::new(source));

        for input in ["", "   "] {
            let outcome = service.resolve(input, &langs(&["en"])).await;
            assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidInput));
        }
    }

    #[tokio::test]
    async fn test_malformed_preferences_make_no_source_call() {
        let mut source = MockCaptionSource::new();
        source.expect_list_tracks().times(0);
        let service = ResolutionService::new(Arc::new(source));

        let outcome = service.resolve("abc123", &langs(&["en", ""])).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_url_input_reaches_source_as_bare_id() {
        let mut source = MockCaptionSource::new();
        source
            .expect_list_tracks()
            .withf(|id: &VideoId| id.as_str() == "dQw4w9WgXcQ")
            .times(1)
            .returning(|_| Ok(vec![CaptionTrack::new("en", false, vec![seg("hi", 0)])]));
        let service = ResolutionService::new(Arc::new(source));

        let outcome = service
            .resolve("https://youtu.be/dQw4w9WgXcQ", &[])
            .await;

        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_source_errors_map_to_failure_kinds() {
        let cases = vec![
            (SourceError::NotFound("gone".to_string()), FailureKind::VideoUnavailable),
            (SourceError::Disabled, FailureKind::CaptionsDisabled),
            (SourceError::Blocked("429".to_string()), FailureKind::UpstreamBlocked),
            (SourceError::Transport("reset".to_string()), FailureKind::UpstreamUnexpected),
        ];

        for (error, expected) in cases {
            let outcome = service_returning(Err(error)).resolve("abc123", &[]).await;
            assert_eq!(outcome.failure_kind(), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_empty_track_list_is_no_captions() {
        let outcome = service_returning(Ok(vec![])).resolve("abc123", &langs(&["en"])).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NoCaptionsAvailable));
    }

    #[tokio::test]
    async fn test_whitespace_only_track_is_no_captions() {
        let service = service_returning(Ok(vec![CaptionTrack::new(
            "en",
            false,
            vec![seg("  ", 0), seg("\n", 1)],
        )]));

        let outcome = service.resolve("abc123", &langs(&["en"])).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::NoCaptionsAvailable));
    }

    #[tokio::test]
    async fn test_default_preferences_apply_when_request_has_none() {
        let mut source = MockCaptionSource::new();
        source.expect_list_tracks().returning(|_| {
            Ok(vec![
                CaptionTrack::new("en", false, vec![seg("english", 0)]),
                CaptionTrack::new("de", false, vec![seg("deutsch", 0)]),
            ])
        });
        let service = ResolutionService::new(Arc::new(source))
            .with_default_preferences(LanguagePreference::parse(["de"]).unwrap());

        match service.resolve("abc123", &[]).await {
            Outcome::Success(transcript) => assert_eq!(transcript.language_code, "de"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        match service.resolve("abc123", &langs(&["en"])).await {
            Outcome::Success(transcript) => assert_eq!(transcript.language_code, "en"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let service = ResolutionService::new(Arc::new(SlowSource))
            .with_timeout(Some(Duration::from_millis(20)));

        let outcome = service.resolve("abc123", &[]).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_source_call() {
        let service = ResolutionService::new(Arc::new(SlowSource));

        let outcome = service
            .resolve_until("abc123", &[], tokio::time::sleep(Duration::from_millis(10)))
            .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::UpstreamUnexpected));
    }

    #[test]
    fn test_status_codes() {
        use reqwest::StatusCode;

        assert_eq!(FailureKind::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(FailureKind::CaptionsDisabled.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(FailureKind::NoCaptionsAvailable.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(FailureKind::VideoUnavailable.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(FailureKind::UpstreamBlocked.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(FailureKind::UpstreamUnexpected.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(FailureKind::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_failure_messages() {
        let failure: Failure = ResolveError::Source(SourceError::Disabled).into();
        assert_eq!(failure.kind, FailureKind::CaptionsDisabled);
        assert_eq!(failure.message, "Transcripts are disabled for this video by the uploader.");

        let failure: Failure = ResolveError::Selection(SelectionError::NoCaptionsAvailable).into();
        assert_eq!(failure.message, "No transcript tracks available for this video");

        let failure: Failure = ResolveError::Timeout(Duration::from_millis(1500)).into();
        assert_eq!(failure.message, "Timed out after 1.5s waiting for the caption source");
    }
}
