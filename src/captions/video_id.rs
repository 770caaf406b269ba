use std::fmt;
use url::Url;

/// Opaque identifier of a video on the upstream platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VideoIdError {
    #[error("video_id must not be empty")]
    Empty,

    #[error("video_id contains whitespace or control characters: {0:?}")]
    Malformed(String),
}

impl VideoId {
    /// Parse user input, which may be a bare id or a YouTube URL
    pub fn parse(input: &str) -> Result<Self, VideoIdError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VideoIdError::Empty);
        }

        let id = extract_from_url(trimmed).unwrap_or_else(|| trimmed.to_string());

        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(VideoIdError::Malformed(id));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com" || host == "youtu.be" || host.ends_with(".youtube.com")
}

/// Pull the video id out of the usual YouTube URL shapes
fn extract_from_url(input: &str) -> Option<String> {
    let lower = input.to_ascii_lowercase();
    if !lower.contains("youtube.com") && !lower.contains("youtu.be") {
        return None;
    }

    let parsed = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("https://{}", input)).ok()?
    };

    let host = parsed.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next();

    let id = if host.eq_ignore_ascii_case("youtu.be") {
        first.map(str::to_string)
    } else {
        match first {
            Some("watch") => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("v") | Some("shorts") | Some("live") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    };

    id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> String {
        VideoId::parse(input).unwrap().as_str().to_string()
    }

    #[test]
    fn test_bare_id_is_opaque() {
        assert_eq!(parsed("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(parsed("  abc  "), "abc");
        assert_eq!(parsed("not-eleven-chars-long"), "not-eleven-chars-long");
    }

    #[test]
    fn test_watch_urls() {
        assert_eq!(parsed("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(parsed("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"), "dQw4w9WgXcQ");
        assert_eq!(parsed("youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(parsed("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_and_embed_urls() {
        assert_eq!(parsed("https://youtu.be/dQw4w9WgXcQ?si=xyz"), "dQw4w9WgXcQ");
        assert_eq!(parsed("https://www.youtube.com/embed/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(parsed("https://www.youtube.com/v/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(parsed("https://youtube.com/shorts/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_unrecognized_youtube_url_is_kept_verbatim() {
        assert_eq!(
            parsed("https://www.youtube.com/channel/UC123"),
            "https://www.youtube.com/channel/UC123"
        );
    }

    #[test]
    fn test_invalid_ids() {
        assert_eq!(VideoId::parse(""), Err(VideoIdError::Empty));
        assert_eq!(VideoId::parse("   \n"), Err(VideoIdError::Empty));
        assert!(matches!(
            VideoId::parse("two words"),
            Err(VideoIdError::Malformed(_))
        ));
    }
}
