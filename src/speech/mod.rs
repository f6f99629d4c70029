//! Transcription gateway.
//!
//! Sends a captured clip to the hosted speech-to-text service and
//! returns plain transcript text. No logic beyond format adaptation:
//! the clip goes out as a multipart form (`audio`, `customSections`,
//! `timezone`), the transcript comes back as JSON or plain text.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::capture::AudioClip;
use crate::domain::CustomSection;

/// Upper bound for one transcription call.
pub const TRANSCRIBE_TIMEOUT_SECS: u64 = 60;

/// Speech-to-text boundary.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a clip into plain text.
    async fn transcribe(
        &self,
        clip: &AudioClip,
        sections: &[CustomSection],
        timezone: &str,
    ) -> Result<String>;
}

/// Section context sent alongside the audio (name + keywords only).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionHint<'a> {
    name: &'a str,
    keywords: &'a [String],
}

/// Transcript body when the service replies with JSON.
#[derive(Debug, Deserialize)]
struct TranscriptBody {
    text: String,
}

/// HTTP transcription gateway.
pub struct HttpTranscriber {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranscriber {
    /// Create a gateway for a multipart transcription endpoint.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TRANSCRIBE_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        clip: &AudioClip,
        sections: &[CustomSection],
        timezone: &str,
    ) -> Result<String> {
        let hints: Vec<SectionHint<'_>> = sections
            .iter()
            .map(|s| SectionHint {
                name: &s.name,
                keywords: &s.keywords,
            })
            .collect();

        let audio_part = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime)
            .context("Invalid clip MIME type")?;

        let form = Form::new()
            .part("audio", audio_part)
            .text(
                "customSections",
                serde_json::to_string(&hints).context("Failed to encode section hints")?,
            )
            .text("timezone", timezone.to_string());

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        tracing::debug!("Uploading clip {} ({} bytes)", clip.id, clip.bytes.len());

        let response = builder
            .send()
            .await
            .context("Failed to reach transcription service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Transcription service error ({}): {}", status, body.trim());
        }

        let body = response
            .text()
            .await
            .context("Failed to read transcription response")?;

        // Either {"text": "..."} or a bare transcript body
        let transcript = match serde_json::from_str::<TranscriptBody>(&body) {
            Ok(parsed) => parsed.text,
            Err(_) => body,
        };

        Ok(transcript.trim().to_string())
    }
}
