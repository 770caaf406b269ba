use async_trait::async_trait;
use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub mod json3;
pub mod video_id;
pub mod youtube;
pub mod ytdlp;

pub use video_id::VideoId;

use crate::config::{SourceBackend, SourceConfig};

/// One timed fragment of caption text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionSegment {
    /// Cue text as delivered by the upstream (entities already decoded)
    pub text: String,

    /// Offset of the cue from the start of the video
    pub start_offset: Duration,

    /// How long the cue stays on screen
    pub duration: Duration,
}

impl CaptionSegment {
    pub fn new(text: impl Into<String>, start_offset: Duration, duration: Duration) -> Self {
        Self {
            text: text.into(),
            start_offset,
            duration,
        }
    }
}

/// A single language/version of timed text for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    /// Language code exactly as reported upstream ("en", "en-US", ...)
    pub language_code: String,

    /// Machine speech-recognition captions rather than human-authored ones
    pub is_auto_generated: bool,

    /// Cues in chronological order
    pub segments: Vec<CaptionSegment>,
}

impl CaptionTrack {
    pub fn new(
        language_code: impl Into<String>,
        is_auto_generated: bool,
        segments: Vec<CaptionSegment>,
    ) -> Self {
        Self {
            language_code: language_code.into(),
            is_auto_generated,
            segments,
        }
    }

    /// Short label used in log lines
    pub fn label(&self) -> String {
        if self.is_auto_generated {
            format!("{} (auto-generated)", self.language_code)
        } else {
            self.language_code.clone()
        }
    }
}

/// Ways a caption source can fail
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Captions are disabled for this video")]
    Disabled,

    #[error("Upstream blocked the request: {0}")]
    Blocked(String),

    #[error("Upstream transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            SourceError::Blocked(err.to_string())
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

/// Trait for listing the caption tracks of a video on some upstream platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List every caption track available for the video, segments included
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, SourceError>;

    /// Get the name of this source
    fn source_name(&self) -> &'static str;
}

/// Build the caption source selected in the configuration
pub async fn build_source(config: &SourceConfig) -> crate::Result<Arc<dyn CaptionSource>> {
    let source: Arc<dyn CaptionSource> = match config.backend {
        SourceBackend::Youtube => Arc::new(youtube::YoutubeCaptionSource::new(config)?),
        SourceBackend::YtDlp => Arc::new(ytdlp::YtDlpCaptionSource::new(config).await?),
    };

    tracing::debug!("Using caption source: {}", source.source_name());

    Ok(source)
}

/// Map an HTTP status from the video's page onto a source error
pub(crate) fn classify_status(status: reqwest::StatusCode, context: &str) -> SourceError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS | reqwest::StatusCode::FORBIDDEN => {
            SourceError::Blocked(format!("{}: HTTP {}", context, status))
        }
        reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::GONE => {
            SourceError::NotFound(format!("{}: HTTP {}", context, status))
        }
        _ => SourceError::Transport(format!("{}: HTTP {}", context, status)),
    }
}

/// Map an HTTP status from a caption file download onto a source error.
///
/// The video is already known to exist at this point, so a missing file is
/// an upstream fault rather than an unavailable video.
pub(crate) fn classify_track_status(status: reqwest::StatusCode, context: &str) -> SourceError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS | reqwest::StatusCode::FORBIDDEN => {
            SourceError::Blocked(format!("{}: HTTP {}", context, status))
        }
        _ => SourceError::Transport(format!("{}: HTTP {}", context, status)),
    }
}

/// Download every listed track, skipping the ones that fail.
///
/// A failed track only fails the listing when nothing else could be fetched;
/// the first error is returned in that case.
pub(crate) async fn fetch_all<I, Fut>(downloads: I) -> Result<Vec<CaptionTrack>, SourceError>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<CaptionTrack, SourceError>>,
{
    keep_fetched(join_all(downloads).await)
}

fn keep_fetched(results: Vec<Result<CaptionTrack, SourceError>>) -> Result<Vec<CaptionTrack>, SourceError> {
    let mut tracks = Vec::with_capacity(results.len());
    let mut first_error = None;

    for result in results {
        match result {
            Ok(track) => tracks.push(track),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping caption track that could not be downloaded");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if tracks.is_empty() => Err(e),
        _ => Ok(tracks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_label() {
        assert_eq!(CaptionTrack::new("en", false, vec![]).label(), "en");
        assert_eq!(
            CaptionTrack::new("de", true, vec![]).label(),
            "de (auto-generated)"
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "watch page"),
            SourceError::Blocked(_)
        ));
        assert!(matches!(
            classify_status(reqwest::StatusCode::NOT_FOUND, "watch page"),
            SourceError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "watch page"),
            SourceError::Transport(_)
        ));
    }

    #[test]
    fn test_missing_caption_file_is_not_a_missing_video() {
        for status in [reqwest::StatusCode::NOT_FOUND, reqwest::StatusCode::GONE] {
            assert!(matches!(
                classify_track_status(status, "caption track"),
                SourceError::Transport(_)
            ));
        }
        assert!(matches!(
            classify_track_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "caption track"),
            SourceError::Blocked(_)
        ));
        assert!(matches!(
            classify_track_status(reqwest::StatusCode::FORBIDDEN, "caption track"),
            SourceError::Blocked(_)
        ));
    }

    #[test]
    fn test_failed_track_is_skipped_when_others_succeed() {
        let tracks = keep_fetched(vec![
            Err(SourceError::Transport("caption track: HTTP 500".to_string())),
            Ok(CaptionTrack::new("en", false, vec![])),
        ])
        .unwrap();

        assert_eq!(tracks, vec![CaptionTrack::new("en", false, vec![])]);
    }

    #[test]
    fn test_all_tracks_failing_returns_first_error() {
        let result = keep_fetched(vec![
            Err(SourceError::Blocked("caption track: HTTP 429".to_string())),
            Err(SourceError::Transport("caption track: HTTP 500".to_string())),
        ]);

        assert_eq!(
            result.unwrap_err(),
            SourceError::Blocked("caption track: HTTP 429".to_string())
        );
    }

    #[test]
    fn test_no_listings_is_an_empty_list() {
        let downloads: Vec<std::future::Ready<Result<CaptionTrack, SourceError>>> = Vec::new();
        let tracks = tokio_test::block_on(fetch_all(downloads)).unwrap();

        assert!(tracks.is_empty());
    }
}
