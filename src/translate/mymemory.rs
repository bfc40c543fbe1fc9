//! MyMemory translation API client
//!
//! MyMemory is a free translation memory with a public `get` endpoint.
//! API Documentation: https://mymemory.translated.net/doc/

use super::TranslateError;
use serde::Deserialize;

/// MyMemory API response
#[derive(Debug, Deserialize, Clone)]
pub struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    pub response_data: Option<ResponseData>,
    /// Usually a number, sometimes a numeric string.
    #[serde(rename = "responseStatus", default)]
    pub response_status: serde_json::Value,
    #[serde(rename = "responseDetails", default)]
    pub response_details: serde_json::Value,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResponseData {
    #[serde(rename = "translatedText", default)]
    pub translated_text: Option<String>,
}

impl MyMemoryResponse {
    fn status(&self) -> Option<u16> {
        match &self.response_status {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the payload as a translation or a per-line failure.
    pub fn into_translation(self) -> Result<String, TranslateError> {
        let status = self.status().unwrap_or(200);
        let text = self
            .response_data
            .and_then(|d| d.translated_text)
            .unwrap_or_default()
            .trim()
            .to_string();

        // Over quota, MyMemory echoes a warning as the "translation".
        if status == 429 || text.to_ascii_uppercase().starts_with("MYMEMORY WARNING") {
            return Err(TranslateError::RateLimited);
        }
        if status != 200 {
            let details = match self.response_details {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(TranslateError::Api { status, details });
        }
        if text.is_empty() {
            return Err(TranslateError::Empty);
        }
        Ok(text)
    }
}

/// MyMemory API client
#[derive(Debug, Clone)]
pub struct MyMemoryClient {
    client: reqwest::Client,
    base_url: String,
    langpair: String,
    email: Option<String>,
}

impl MyMemoryClient {
    const USER_AGENT: &'static str = concat!("lyricsync/", env!("CARGO_PKG_VERSION"));

    pub fn new(
        base_url: impl Into<String>,
        langpair: impl Into<String>,
        email: Option<String>,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            langpair: langpair.into(),
            email,
        })
    }

    pub fn langpair(&self) -> &str {
        &self.langpair
    }

    pub fn request_url(&self, text: &str) -> String {
        let mut url = format!(
            "{}?q={}&langpair={}",
            self.base_url,
            urlencoding::encode(text),
            urlencoding::encode(&self.langpair)
        );
        if let Some(email) = &self.email {
            url.push_str(&format!("&de={}", urlencoding::encode(email)));
        }
        url
    }

    /// Translate one line of text
    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let response = self.client.get(self.request_url(text)).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TranslateError::RateLimited);
        }
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: MyMemoryResponse = serde_json::from_str(&body)?;
        parsed.into_translation()
    }
}
