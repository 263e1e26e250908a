use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::media::EncodedImage;
use crate::llm::{ImageTransformer, TransformError};
use crate::styles::ProfessionalStyle;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

/// Image model used for every portrait. Not user-configurable.
pub const PORTRAIT_MODEL: &str = "gemini-2.5-flash-image";

/// MIME type the result is always labelled with.
const RESULT_MIME_TYPE: &str = "image/png";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

impl GeminiInlineData {
    fn is_image(&self) -> bool {
        self.mime_type.is_empty() || self.mime_type.starts_with("image/")
    }
}

fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using permissive defaults.",
                profile
            );
            "OFF"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        "" => "image/png".to_string(),
        _ => lowered,
    }
}

fn build_request_payload(
    image: &EncodedImage,
    style: ProfessionalStyle,
    safety_profile: &str,
) -> Value {
    let parts = vec![
        json!({
            "inlineData": {
                "mimeType": normalize_image_mime_type(image.mime_type()),
                "data": image.base64_payload()
            }
        }),
        json!({ "text": style.instruction() }),
    ];

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        "safetySettings": build_safety_settings(safety_profile),
    })
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .map(|part| {
                            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                                json!({ "text": truncate_for_log(text, 80) })
                            } else if let Some(inline_data) = part.get("inlineData") {
                                let data_len = inline_data
                                    .get("data")
                                    .and_then(|value| value.as_str())
                                    .map(|value| value.len())
                                    .unwrap_or(0);
                                json!({
                                    "inlineData": {
                                        "mimeType": inline_data.get("mimeType"),
                                        "dataLen": data_len
                                    }
                                })
                            } else {
                                json!({ "unknownPart": true })
                            }
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            summarized_contents.push(json!({ "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for part in candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .filter_map(|content| content.parts.as_ref())
        .flatten()
    {
        match part {
            GeminiPart::Text { text } => {
                text_parts += 1;
                if text_preview.is_none() && !text.trim().is_empty() {
                    text_preview = Some(truncate_for_log(text, 200));
                }
            }
            GeminiPart::InlineData { inline_data } if inline_data.is_image() => {
                image_parts += 1;
            }
            _ => {}
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

/// Takes the first image part of the first candidate; text commentary is
/// only logged.
fn extract_result_image(response: GeminiResponse) -> Result<EncodedImage, TransformError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);
    let Some(candidate) = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
    else {
        warn!(block_reason = ?block_reason, "Gemini returned no candidates");
        return Err(TransformError::NoImageProduced);
    };

    let finish_reason = candidate.finish_reason;
    let parts = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default();

    for part in parts {
        match part {
            GeminiPart::InlineData { inline_data } if inline_data.is_image() => {
                let bytes = general_purpose::STANDARD
                    .decode(inline_data.data.trim())
                    .map_err(|err| {
                        TransformError::UpstreamFailure(format!(
                            "malformed image payload from Gemini: {err}"
                        ))
                    })?;
                return Ok(EncodedImage::new(bytes, RESULT_MIME_TYPE));
            }
            GeminiPart::Text { text } if !text.trim().is_empty() => {
                info!("Gemini commentary: {}", truncate_for_log(&text, 500));
            }
            _ => {}
        }
    }

    warn!(
        finish_reason = ?finish_reason,
        block_reason = ?block_reason,
        "Gemini response contained no image part"
    );
    Err(TransformError::NoImageProduced)
}

/// Sends portraits to the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiTransformer {
    client: Client,
    api_key: String,
    base_url: String,
    safety_profile: String,
}

impl GeminiTransformer {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        safety_profile: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            safety_profile: safety_profile.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            get_http_client().clone(),
            config.gemini_api_key.clone(),
            config.gemini_api_base_url.clone(),
            config.gemini_safety_settings.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            PORTRAIT_MODEL
        )
    }

    async fn call_gemini_api(&self, payload: Value) -> Result<GeminiResponse, TransformError> {
        if self.api_key.trim().is_empty() {
            return Err(TransformError::UpstreamFailure(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(&payload);
            debug!(target: "llm.gemini", model = PORTRAIT_MODEL, payload = %payload_summary);
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err,
                    err.is_timeout(),
                    err.is_connect()
                );
                TransformError::UpstreamFailure(format!("Gemini request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(TransformError::UpstreamFailure(format!(
                "Gemini request failed with status {status}: {detail}"
            )));
        }

        let value = response.json::<GeminiResponse>().await.map_err(|err| {
            TransformError::UpstreamFailure(format!("Unreadable Gemini response: {err}"))
        })?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_gemini_response(&value);
            debug!(target: "llm.gemini", model = PORTRAIT_MODEL, response = %response_summary);
        }
        Ok(value)
    }
}

#[async_trait]
impl ImageTransformer for GeminiTransformer {
    async fn transform(
        &self,
        image: &EncodedImage,
        style: ProfessionalStyle,
    ) -> Result<EncodedImage, TransformError> {
        let payload = build_request_payload(image, style, &self.safety_profile);
        let metadata = json!({
            "style": style.as_str(),
            "inputMime": image.mime_type(),
            "inputBytes": image.len(),
        });

        log_llm_timing("gemini", PORTRAIT_MODEL, "transform_portrait", Some(metadata), || async {
            let response = self.call_gemini_api(payload).await?;
            extract_result_image(response)
        })
        .await
    }
}
