//! Anthropic Messages API judge
//!
//! Rate limited client side with a token bucket. HTTP failures are sorted into
//! transient (stop the batch) and permanent (skip the record).

use std::num::NonZeroU32;
use std::time::Duration;

use aerie_common::config::ClassifierConfig;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::judge::{Judge, JudgeError, JudgeRequest, Verdict};
use crate::verdict::parse_verdict;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Returned by the API when it is overloaded
const STATUS_OVERLOADED: u16 = 529;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Judge backed by the Anthropic Messages API
pub struct AnthropicJudge {
    client: Client,
    api_key: String,
    api_base: String,
    max_tokens: u32,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl AnthropicJudge {
    pub fn new(api_key: String, config: &ClassifierConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aerie-classifier/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }
}

/// Sort an HTTP failure status into transient or permanent
///
/// Authentication failures stop the batch: every later record would fail the
/// same way.
pub fn classify_status(status: StatusCode, body: &str) -> JudgeError {
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
    let transient = status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || status.as_u16() == STATUS_OVERLOADED
        || status.is_server_error();

    if transient {
        JudgeError::Transient(message)
    } else {
        JudgeError::Permanent(message)
    }
}

#[async_trait]
impl Judge for AnthropicJudge {
    async fn judge(&self, request: JudgeRequest<'_>) -> Result<Verdict, JudgeError> {
        self.rate_limiter.until_ready().await;

        let body = MessagesRequest {
            model: request.model,
            max_tokens: self.max_tokens,
            system: request.prompt,
            messages: [Message {
                role: "user",
                content: format!("Classify this tweet:\n\n{}", request.text),
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    JudgeError::Permanent(format!("Invalid request: {}", e))
                } else {
                    JudgeError::Transient(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::Permanent(format!("Unreadable response: {}", e)))?;

        let text = parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| JudgeError::Permanent("Response has no text content".to_string()))?;

        debug!(model = request.model, reply = %text.trim(), "Judge replied");

        Ok(parse_verdict(&text))
    }
}
