use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use url::Url;

use super::{
    classify_status, classify_track_status, fetch_all, json3, CaptionSource, CaptionTrack, SourceError, VideoId,
};
use crate::config::SourceConfig;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const CONSENT_COOKIE: &str = "CONSENT=YES+cb";

/// Caption source that reads tracks straight from YouTube's watch page
pub struct YoutubeCaptionSource {
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    #[serde(default)]
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<TrackListing>>,
}

/// A caption track advertised by the player, before its body is downloaded
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackListing {
    base_url: String,
    language_code: String,
    kind: Option<String>,
}

impl TrackListing {
    fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

fn player_response_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").expect("player response pattern is valid")
    })
}

/// Locate and deserialize `ytInitialPlayerResponse` inside the watch page
fn extract_player_response(html: &str) -> Result<PlayerResponse, SourceError> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(SourceError::Blocked("watch page answered with a CAPTCHA".to_string()));
    }

    if html.contains("action=\"https://consent.youtube.com/s\"") {
        return Err(SourceError::Blocked("watch page is behind a consent wall".to_string()));
    }

    let marker = player_response_marker()
        .find(html)
        .ok_or_else(|| SourceError::Transport("ytInitialPlayerResponse not found in watch page".to_string()))?;

    // The JSON object starts at the brace the pattern ends on; anything after it is script
    let json_start = marker.end() - 1;
    serde_json::Deserializer::from_str(&html[json_start..])
        .into_iter::<PlayerResponse>()
        .next()
        .ok_or_else(|| SourceError::Transport("empty player response".to_string()))?
        .map_err(|e| SourceError::Transport(format!("Failed to parse player response: {}", e)))
}

/// Reject videos the player refuses to play
fn check_playability(status: Option<&PlayabilityStatus>) -> Result<(), SourceError> {
    let Some(status) = status else {
        return Ok(());
    };

    let reason = status
        .reason
        .clone()
        .unwrap_or_else(|| format!("playability status {}", status.status));

    match status.status.as_str() {
        "" | "OK" => Ok(()),
        "LOGIN_REQUIRED" if reason.to_lowercase().contains("bot") => Err(SourceError::Blocked(reason)),
        "ERROR" | "LOGIN_REQUIRED" | "UNPLAYABLE" | "AGE_CHECK_REQUIRED" | "LIVE_STREAM_OFFLINE" => {
            Err(SourceError::NotFound(reason))
        }
        other => Err(SourceError::Transport(format!(
            "unexpected playability status {}: {}",
            other, reason
        ))),
    }
}

/// Turn a parsed player response into the list of advertised tracks
fn track_listings(player: PlayerResponse) -> Result<Vec<TrackListing>, SourceError> {
    check_playability(player.playability_status.as_ref())?;

    player
        .captions
        .and_then(|captions| captions.renderer)
        .and_then(|renderer| renderer.caption_tracks)
        .ok_or(SourceError::Disabled)
}

/// Rewrite a track base URL so the body comes back as json3
fn json3_url(base_url: &str) -> Result<String, SourceError> {
    let mut url = Url::parse(base_url)
        .or_else(|_| Url::parse(&format!("https://www.youtube.com{}", base_url)))
        .map_err(|e| SourceError::Transport(format!("Invalid caption track URL: {}", e)))?;

    if url.query_pairs().any(|(key, value)| key == "exp" && value == "xpe") {
        return Err(SourceError::Blocked(
            "caption track requires a proof-of-origin token".to_string(),
        ));
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Ok(url.to_string())
}

impl YoutubeCaptionSource {
    pub fn new(config: &SourceConfig) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid accept_language header")?,
        );
        headers.insert(COOKIE, HeaderValue::from_static(CONSENT_COOKIE));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch_watch_page(&self, video_id: &VideoId) -> Result<String, SourceError> {
        let url = format!("{}?v={}", WATCH_URL, urlencoding::encode(video_id.as_str()));
        tracing::debug!("Fetching watch page: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(classify_status(response.status(), "watch page"));
        }

        Ok(response.text().await?)
    }

    async fn fetch_track(&self, listing: &TrackListing) -> Result<CaptionTrack, SourceError> {
        let url = json3_url(&listing.base_url)?;
        tracing::debug!(language = %listing.language_code, "Downloading caption track");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(classify_track_status(response.status(), "caption track"));
        }

        let body = response.text().await?;
        let segments = json3::parse_segments(&body)?;

        Ok(CaptionTrack::new(
            listing.language_code.clone(),
            listing.is_auto_generated(),
            segments,
        ))
    }
}

#[async_trait]
impl CaptionSource for YoutubeCaptionSource {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, SourceError> {
        let html = self.fetch_watch_page(video_id).await?;
        let listings = track_listings(extract_player_response(&html)?)?;

        tracing::debug!("Video {} advertises {} caption track(s)", video_id, listings.len());

        fetch_all(listings.iter().map(|listing| self.fetch_track(listing))).await
    }

    fn source_name(&self) -> &'static str {
        "YouTube"
    }
}
