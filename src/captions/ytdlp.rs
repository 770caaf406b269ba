use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::Command;

use super::{classify_track_status, fetch_all, json3, CaptionSource, CaptionTrack, SourceError, VideoId};
use crate::config::SourceConfig;
use crate::utils;

/// Caption source that lets yt-dlp discover the tracks
pub struct YtDlpCaptionSource {
    yt_dlp_path: String,
    client: Client,
}

/// The part of `yt-dlp --dump-json` output this source reads
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    language: Option<String>,
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<SubtitleFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<SubtitleFormat>>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubtitleFormat {
    ext: String,
    url: String,
}

/// A track to download, as picked out of the yt-dlp metadata
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackListing {
    language_code: String,
    is_auto_generated: bool,
    url: String,
}

fn json3_format(formats: &[SubtitleFormat]) -> Option<&SubtitleFormat> {
    formats.iter().find(|f| f.ext == "json3")
}

/// Manual tracks first, then the original-language automatic captions.
///
/// yt-dlp also lists every machine translation of the automatic track; only
/// the `-orig` entries (or the video's own language) are real ASR output.
fn track_listings(info: &VideoInfo) -> Vec<TrackListing> {
    let mut listings: Vec<TrackListing> = info
        .subtitles
        .iter()
        .filter(|(language, _)| language.as_str() != "live_chat")
        .filter_map(|(language, formats)| {
            json3_format(formats).map(|format| TrackListing {
                language_code: language.clone(),
                is_auto_generated: false,
                url: format.url.clone(),
            })
        })
        .collect();

    let originals: Vec<(&String, &Vec<SubtitleFormat>)> = info
        .automatic_captions
        .iter()
        .filter(|(language, _)| language.ends_with("-orig"))
        .collect();

    let automatic: Vec<(String, &Vec<SubtitleFormat>)> = if originals.is_empty() {
        info.language
            .as_ref()
            .and_then(|language| {
                info.automatic_captions
                    .get(language)
                    .map(|formats| (language.clone(), formats))
            })
            .into_iter()
            .collect()
    } else {
        originals
            .into_iter()
            .map(|(language, formats)| (language.trim_end_matches("-orig").to_string(), formats))
            .collect()
    };

    listings.extend(automatic.into_iter().filter_map(|(language, formats)| {
        json3_format(formats).map(|format| TrackListing {
            language_code: language,
            is_auto_generated: true,
            url: format.url.clone(),
        })
    }));

    listings
}

/// Map yt-dlp's error output onto a source error
fn classify_stderr(stderr: &str) -> SourceError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .trim()
        .to_string();
    let lower = message.to_lowercase();

    if lower.contains("not a bot")
        || lower.contains("http error 429")
        || lower.contains("too many requests")
        || lower.contains("http error 403")
    {
        SourceError::Blocked(message)
    } else if lower.contains("private video")
        || lower.contains("video unavailable")
        || lower.contains("has been removed")
        || lower.contains("does not exist")
        || lower.contains("is not a valid url")
        || lower.contains("incomplete youtube id")
    {
        SourceError::NotFound(message)
    } else {
        SourceError::Transport(format!("yt-dlp failed: {}", message))
    }
}

impl YtDlpCaptionSource {
    /// Build the source, making sure yt-dlp can be run at all
    pub async fn new(config: &SourceConfig) -> crate::Result<Self> {
        if !utils::check_command_available(&config.yt_dlp_path).await {
            anyhow::bail!(
                "{} is not available. Please install it: https://github.com/yt-dlp/yt-dlp",
                config.yt_dlp_path
            );
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            client,
        })
    }

    /// Get video metadata using yt-dlp
    async fn get_video_info(&self, video_id: &VideoId) -> Result<VideoInfo, SourceError> {
        let url = format!("https://www.youtube.com/watch?v={}", urlencoding::encode(video_id.as_str()));
        tracing::debug!("Extracting caption metadata for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", url.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SourceError::Transport(format!("Failed to run {}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            return Err(classify_stderr(&String::from_utf8_lossy(&output.stderr)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| SourceError::Transport(format!("Failed to parse yt-dlp output: {}", e)))
    }

    async fn fetch_track(&self, listing: &TrackListing) -> Result<CaptionTrack, SourceError> {
        tracing::debug!(language = %listing.language_code, "Downloading caption track");

        let response = self.client.get(&listing.url).send().await?;
        if !response.status().is_success() {
            return Err(classify_track_status(response.status(), "caption track"));
        }

        let body = response.text().await?;

        Ok(CaptionTrack::new(
            listing.language_code.clone(),
            listing.is_auto_generated,
            json3::parse_segments(&body)?,
        ))
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, SourceError> {
        let info = self.get_video_info(video_id).await?;
        let listings = track_listings(&info);

        tracing::debug!("yt-dlp reported {} usable caption track(s) for {}", listings.len(), video_id);

        fetch_all(listings.iter().map(|listing| self.fetch_track(listing))).await
    }

    fn source_name(&self) -> &'static str {
        "yt-dlp"
    }
}
