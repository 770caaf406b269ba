//! Parser for YouTube's `json3` timed-text format.
//!
//! Both caption sources download tracks in this format, so the conversion into
//! [`CaptionSegment`]s lives here.

use serde::Deserialize;
use std::time::Duration;

use super::{CaptionSegment, SourceError};

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<u64>,
    d_duration_ms: Option<u64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Convert a `json3` body into caption segments.
///
/// Events without text runs (window/style definitions) are skipped. HTML
/// entities inside the text are decoded.
pub fn parse_segments(body: &str) -> Result<Vec<CaptionSegment>, SourceError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: Json3Document = serde_json::from_str(body)
        .map_err(|e| SourceError::Transport(format!("Failed to parse json3 captions: {}", e)))?;

    let segments = document
        .events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let raw: String = segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = html_escape::decode_html_entities(&raw).into_owned();

            Some(CaptionSegment {
                text,
                start_offset: Duration::from_millis(event.t_start_ms.unwrap_or(0)),
                duration: Duration::from_millis(event.d_duration_ms.unwrap_or(0)),
            })
        })
        .collect();

    Ok(segments)
}
