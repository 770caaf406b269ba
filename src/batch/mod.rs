//! JSON-lines batch mode.
//!
//! One [`TranscriptRequest`] per input line, one [`TranscriptResponse`] per
//! output line, in input order. Requests run concurrently up to a limit; each
//! resolution is independent of the others.

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::output::{TranscriptRequest, TranscriptResponse};
use crate::resolve::{FailureKind, ResolutionService};

/// Counts reported once a batch finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Resolve every request read from `input` and write the responses to `output`
pub async fn run_batch<R, W>(
    service: &ResolutionService,
    input: R,
    mut output: W,
    concurrency: usize,
    show_progress: bool,
) -> Result<BatchSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut requests = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read batch input")? {
        if !line.trim().is_empty() {
            requests.push(line);
        }
    }

    tracing::info!("Resolving {} request(s) with concurrency {}", requests.len(), concurrency);

    let progress = if show_progress {
        let bar = ProgressBar::new(requests.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap(),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut responses = stream::iter(requests)
        .map(|line| {
            let progress = progress.clone();
            let span = tracing::info_span!("request", id = %Uuid::new_v4());
            async move {
                let response = resolve_line(service, &line).await;
                progress.inc(1);
                response
            }
            .instrument(span)
        })
        .buffered(concurrency.max(1));

    let mut summary = BatchSummary::default();
    while let Some(response) = responses.next().await {
        summary.total += 1;
        if response.success {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        output
            .write_all(encoded.as_bytes())
            .await
            .context("Failed to write batch output")?;
    }

    output.flush().await?;
    progress.finish_with_message(format!("{} succeeded, {} failed", summary.succeeded, summary.failed));

    Ok(summary)
}

async fn resolve_line(service: &ResolutionService, line: &str) -> TranscriptResponse {
    match serde_json::from_str::<TranscriptRequest>(line) {
        Ok(request) => service
            .resolve(&request.video_id, request.languages())
            .await
            .into(),
        Err(e) => {
            tracing::warn!("Rejecting malformed batch line: {}", e);
            TranscriptResponse::failure(FailureKind::InvalidInput, format!("Malformed request: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionSegment, CaptionTrack, MockCaptionSource, SourceError, VideoId};
    use std::sync::Arc;
    use std::time::Duration;

    fn service() -> ResolutionService {
        let mut source = MockCaptionSource::new();
        source.expect_list_tracks().returning(|id: &VideoId| match id.as_str() {
            "private" => Err(SourceError::NotFound("private video".to_string())),
            other => Ok(vec![CaptionTrack::new(
                "en",
                false,
                vec![CaptionSegment::new(
                    format!("text for {}", other),
                    Duration::ZERO,
                    Duration::from_secs(1),
                )],
            )]),
        });
        ResolutionService::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let input = concat!(
            r#"{"video_id": "one"}"#, "\n",
            "\n",
            r#"{"video_id": "private", "preferred_languages": ["en"]}"#, "\n",
            "not json\n",
            r#"{"video_id": "two"}"#, "\n",
        );
        let mut output = Vec::new();

        let summary = run_batch(&service(), input.as_bytes(), &mut output, 3, false)
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                total: 4,
                succeeded: 2,
                failed: 2,
            }
        );

        let responses: Vec<TranscriptResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0].text.as_deref(), Some("text for one"));
        assert_eq!(responses[1].error_kind, Some(FailureKind::VideoUnavailable));
        assert_eq!(responses[2].error_kind, Some(FailureKind::InvalidInput));
        assert_eq!(responses[3].text.as_deref(), Some("text for two"));
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let mut output = Vec::new();

        let summary = run_batch(&service(), "".as_bytes(), &mut output, 1, false)
            .await
            .unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(output.is_empty());
    }
}
