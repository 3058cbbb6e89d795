//! Legacy upload-and-transcribe client.
//!
//! Before audio streamed live, whole recordings were posted as a
//! multipart form and transcribed in one round trip. The endpoint is
//! still served, so the client keeps this as an alternate path off the
//! streaming route.

use crate::error::{VoiceError, VoiceResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Response from the upload-and-transcribe endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(rename = "needHumanIntervention", default)]
    pub need_human_intervention: Option<bool>,
    #[serde(rename = "transcriptionReply", default)]
    pub transcription_reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the upload endpoint
pub struct UploadClient {
    base_url: String,
    client: reqwest::Client,
}

impl UploadClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Upload a whole mono recording for transcription.
    ///
    /// The samples are packaged as a WAV blob; the conversation
    /// identifier rides along as a form field.
    pub async fn upload_recording(
        &self,
        samples: &[i16],
        sample_rate: u32,
        conversation_uuid: Uuid,
    ) -> VoiceResult<UploadResponse> {
        if samples.is_empty() {
            return Err(VoiceError::Upload("recording is empty".to_string()));
        }

        let wav = wav_bytes(samples, sample_rate)?;
        info!(
            "uploading {:.1}s recording for conversation {}",
            samples.len() as f64 / sample_rate as f64,
            conversation_uuid
        );

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("uuid", conversation_uuid.to_string());

        let url = format!("{}/api/audio", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| VoiceError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VoiceError::Upload(format!(
                "server responded with status: {}",
                response.status()
            )));
        }

        response
            .json::<UploadResponse>()
            .await
            .map_err(|e| VoiceError::Upload(e.to_string()))
    }
}

/// Package mono 16-bit samples as an in-memory WAV blob
pub fn wav_bytes(samples: &[i16], sample_rate: u32) -> VoiceResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoiceError::Upload(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| VoiceError::Upload(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| VoiceError::Upload(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
