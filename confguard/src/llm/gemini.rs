//! Hosted Gemini-style backend client. Every call goes through one
//! `generateContent` POST wrapped in the configured timeout; responses are
//! reduced to the first candidate's concatenated text parts.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{GenError, TextGenerator};
use crate::settings::Settings;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Temperature used for all calls; the pipeline wants reproducible output,
/// not creativity.
const TEMPERATURE: f64 = 0.2;

/// Reqwest-backed implementation of [`TextGenerator`].
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Builds a client from settings. Fails when no API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, GenError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| GenError::Backend("GEMINI_API_KEY missing".to_owned()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base: API_BASE.to_owned(),
            api_key,
            model: settings.model.clone(),
            timeout: settings.llm_timeout,
        })
    }

    async fn generate(&self, body: Value) -> Result<String, GenError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base, self.model, self.api_key
        );

        // The deadline covers the full exchange, body read included; a
        // backend that returns headers and then stalls the body still
        // rejects on time.
        let exchange = async {
            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| GenError::Backend(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(GenError::Backend(format!(
                    "backend returned {status}: {detail}"
                )));
            }

            let payload: Value = response
                .json()
                .await
                .map_err(|e| GenError::Backend(e.to_string()))?;
            extract_text(&payload).ok_or_else(|| {
                GenError::Backend("response contained no text candidate".to_owned())
            })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| GenError::Timeout)?
    }

    fn body(&self, parts: Value, json_output: bool) -> Value {
        let mut generation_config = json!({ "temperature": TEMPERATURE });
        if json_output {
            generation_config["responseMimeType"] = json!("application/json");
        }
        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": generation_config,
        })
    }
}

/// Pulls the concatenated text parts of the first candidate.
fn extract_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_json(&self, prompt: &str) -> Result<String, GenError> {
        self.generate(self.body(json!([{ "text": prompt }]), true))
            .await
    }

    async fn generate_plain(&self, prompt: &str) -> Result<String, GenError> {
        self.generate(self.body(json!([{ "text": prompt }]), false))
            .await
    }

    async fn generate_from_image(
        &self,
        instruction: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, GenError> {
        let parts = json!([
            { "text": instruction },
            { "inlineData": { "mimeType": mime_type, "data": image_base64 } },
        ]);
        self.generate(self.body(parts, false)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_reads_first_candidate() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hello " }, { "text": "world" }] }
            }]
        });
        assert_eq!(extract_text(&payload).as_deref(), Some("hello world"));
    }

    #[test]
    fn extract_text_handles_empty_payloads() {
        assert!(extract_text(&json!({})).is_none());
        assert!(extract_text(&json!({ "candidates": [] })).is_none());
    }

    #[test]
    fn from_settings_requires_an_api_key() {
        let settings = Settings::default();
        assert!(GeminiClient::from_settings(&settings).is_err());
    }

    #[tokio::test]
    async fn stalled_response_body_still_times_out() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // Headers promise a body that never arrives.
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n",
                )
                .await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = GeminiClient {
            http: reqwest::Client::new(),
            base: format!("http://{addr}"),
            api_key: "test-key".to_owned(),
            model: "test-model".to_owned(),
            timeout: Duration::from_millis(200),
        };

        let err = client.generate_json("audit this").await.unwrap_err();
        assert_eq!(err, GenError::Timeout);
    }
}
