use anyhow::Result;
use console::style;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;
use crate::resolve::{FailureKind, Outcome};

/// Inbound request shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRequest {
    /// Bare video id or a YouTube URL
    pub video_id: String,

    /// Ordered language codes; missing or null means "accept any"
    #[serde(default)]
    pub preferred_languages: Option<Vec<String>>,
}

impl TranscriptRequest {
    pub fn languages(&self) -> &[String] {
        self.preferred_languages.as_deref().unwrap_or_default()
    }
}

/// Outbound response shape, flat so callers can branch on `success` and `error_kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_generated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TranscriptResponse {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            text: None,
            language: None,
            is_auto_generated: None,
            error_kind: Some(kind),
            message: Some(message.into()),
        }
    }

    /// HTTP status a transport layer should answer with
    pub fn status_code(&self) -> reqwest::StatusCode {
        match self.error_kind {
            Some(kind) => kind.status_code(),
            None => reqwest::StatusCode::OK,
        }
    }
}

impl From<Outcome> for TranscriptResponse {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(transcript) => Self {
                success: true,
                text: Some(transcript.text),
                language: Some(transcript.language_code),
                is_auto_generated: Some(transcript.is_auto_generated),
                error_kind: None,
                message: None,
            },
            Outcome::Failure(failure) => Self::failure(failure.kind, failure.message),
        }
    }
}

/// Liveness probe payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Render a response for the console
pub fn render(response: &TranscriptResponse, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string(response)?,
        OutputFormat::Text => render_text(response),
    };

    Ok(content)
}

fn render_text(response: &TranscriptResponse) -> String {
    if response.success {
        let language = response.language.as_deref().unwrap_or("unknown");
        let origin = if response.is_auto_generated.unwrap_or(false) {
            "auto-generated"
        } else {
            "manual"
        };

        format!(
            "{} {}\n\n{}",
            style("Language:").bold(),
            style(format!("{} ({})", language, origin)).cyan(),
            response.text.as_deref().unwrap_or_default()
        )
    } else {
        let kind = response
            .error_kind
            .map(|kind| kind.as_str())
            .unwrap_or("UpstreamUnexpected");

        format!(
            "{} {} [{}]\n{}",
            style("Error:").red().bold(),
            style(kind).red(),
            response.status_code(),
            response.message.as_deref().unwrap_or_default()
        )
    }
}

/// Print a response to the console
pub fn print_to_console(response: &TranscriptResponse, format: &OutputFormat) -> Result<()> {
    println!("{}", render(response, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Failure, ResolvedTranscript};

    #[test]
    fn test_success_response_shape() {
        let response = TranscriptResponse::from(Outcome::Success(ResolvedTranscript {
            text: "Hello world".to_string(),
            language_code: "en".to_string(),
            is_auto_generated: true,
        }));

        let json: serde_json::Value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "text": "Hello world",
                "language": "en",
                "is_auto_generated": true
            })
        );
        assert_eq!(response.status_code(), reqwest::StatusCode::OK);
    }

    #[test]
    fn test_failure_response_shape() {
        let response = TranscriptResponse::from(Outcome::Failure(Failure {
            kind: FailureKind::UpstreamBlocked,
            message: "slow down".to_string(),
        }));

        let json: serde_json::Value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error_kind": "UpstreamBlocked",
                "message": "slow down"
            })
        );
        assert_eq!(response.status_code(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_request_languages_default_to_empty() {
        let request: TranscriptRequest = serde_json::from_str(r#"{"video_id": "abc"}"#).unwrap();
        assert!(request.languages().is_empty());

        let request: TranscriptRequest =
            serde_json::from_str(r#"{"video_id": "abc", "preferred_languages": null}"#).unwrap();
        assert!(request.languages().is_empty());

        let request: TranscriptRequest =
            serde_json::from_str(r#"{"video_id": "abc", "preferred_languages": ["en", "fr"]}"#).unwrap();
        assert_eq!(request.languages(), ["en".to_string(), "fr".to_string()]);
    }

    #[test]
    fn test_render_text_failure_mentions_kind() {
        let response = TranscriptResponse::failure(FailureKind::CaptionsDisabled, "off");
        let text = render(&response, &OutputFormat::Text).unwrap();

        assert!(text.contains("CaptionsDisabled"));
        assert!(text.contains("404"));
        assert!(text.contains("off"));
    }

    #[test]
    fn test_health_payload() {
        assert_eq!(
            serde_json::to_string(&HealthResponse::ok()).unwrap(),
            r#"{"status":"ok"}"#
        );
    }
}
