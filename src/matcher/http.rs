//! OpenAI互換チャット補完APIによる照合
//!
//! Groq / OpenAI の `/chat/completions` にプロンプトを送り、
//! 応答テキストを候補フィールド名としてパースする。
//! 429（レート制限）のみ待機して再試行する。

use super::FieldMatcher;
use crate::error::{FillerError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use template_filler_common::{build_match_prompt, parse_match_response, FieldTable, SYSTEM_PROMPT};

/// 照合APIの接続設定
#[derive(Debug, Clone)]
pub struct HttpMatcherSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    /// 429時の再試行回数（初回を含まない）
    pub max_retries: u32,
    /// 再試行ごとの待機単位（n回目は backoff * n）
    pub backoff: Duration,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpMatcher {
    client: reqwest::Client,
    settings: HttpMatcherSettings,
}

impl HttpMatcher {
    pub fn new(settings: HttpMatcherSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| FillerError::MatcherUnavailable(format!("HTTPクライアント生成エラー: {}", e)))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &HttpMatcherSettings {
        &self.settings
    }

    /// プロンプトを送信し、応答テキストを返す
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
        };

        for attempt in 0..=self.settings.max_retries {
            let response = self
                .client
                .post(&self.settings.endpoint)
                .bearer_auth(&self.settings.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| FillerError::MatcherUnavailable(e.to_string()))?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == self.settings.max_retries {
                    break;
                }
                let wait = self.settings.backoff * (attempt + 1);
                log::warn!("レート制限に達しました。{:?} 待機して再試行します", wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(FillerError::MatcherUnavailable(format!(
                    "HTTP {}: {}",
                    status,
                    text.trim()
                )));
            }

            let text = response
                .text()
                .await
                .map_err(|e| FillerError::MatcherUnavailable(e.to_string()))?;
            return extract_content(&text);
        }

        Err(FillerError::MatcherUnavailable(format!(
            "レート制限: {}回再試行しても応答がありません",
            self.settings.max_retries
        )))
    }
}

impl FieldMatcher for HttpMatcher {
    async fn match_field(&self, label: &str, fields: &FieldTable) -> Result<Option<String>> {
        let prompt = build_match_prompt(label, fields);
        let reply = self.complete(&prompt).await?;
        log::debug!("'{}' → 応答: {}", label, reply);

        let names = fields.names();
        let field = parse_match_response(&reply, &names)
            .map_err(|e| FillerError::ApiParse(e.to_string()))?;
        Ok(field.map(str::to_string))
    }
}

/// チャット補完レスポンスから最初の応答テキストを取り出す
fn extract_content(body: &str) -> Result<String> {
    let payload: ChatResponse =
        serde_json::from_str(body).map_err(|e| FillerError::ApiParse(e.to_string()))?;

    payload
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| FillerError::ApiParse("choices[0].message.content がありません".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Nursing Hours\n"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Nursing Hours");
    }

    #[test]
    fn test_extract_content_missing_choices() {
        let err = extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, FillerError::ApiParse(_)));

        let err = extract_content("not json").unwrap_err();
        assert!(matches!(err, FillerError::ApiParse(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "llama3-8b-8192",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3-8b-8192");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }
}
