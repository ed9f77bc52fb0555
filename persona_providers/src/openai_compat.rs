//! One chat-completion exchange with an OpenAI-compatible endpoint.

use persona_core::{ChatMessage, ErrorCode, LlmError};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Longest slice of an upstream error body carried into our error message.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Whether a failed attempt is worth repeating with another credential.
#[derive(Debug)]
pub enum AttemptError {
    /// Rate limit, auth rejection, timeout or transport failure.
    NextKey(LlmError),
    /// The request itself is at fault; other keys would fail the same way.
    Abort(LlmError),
}

#[derive(Default)]
pub struct ChatCompletions {
    client: Client,
}

impl ChatCompletions {
    pub async fn send(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
        timeout: Duration,
    ) -> Result<String, AttemptError> {
        let request = json!({
            "model": model,
            "messages": messages,
        });
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        let exchange = async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(transport_error)?;
            if !(200..300).contains(&status) {
                return Err(classify_status(status, &body));
            }
            extract_content(&body)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AttemptError::NextKey(LlmError::new(
                ErrorCode::LlmApiTimeout,
                format!("no response within {}s", timeout.as_secs_f32()),
            ))),
        }
    }
}

fn transport_error(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::NextKey(LlmError::new(ErrorCode::LlmApiTimeout, e.to_string()))
    } else {
        AttemptError::NextKey(LlmError::new(
            ErrorCode::LlmApiError,
            format!("transport failure: {e}"),
        ))
    }
}

pub fn classify_status(status: u16, body: &str) -> AttemptError {
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
    let error = LlmError::new(
        ErrorCode::LlmApiError,
        format!("upstream returned HTTP {status}: {preview}"),
    )
    .with_status(status);
    match status {
        401 | 403 | 429 => AttemptError::NextKey(error),
        _ => AttemptError::Abort(error),
    }
}

/// Pull the reply text out of a successful response body.
pub fn extract_content(body: &str) -> Result<String, AttemptError> {
    let malformed = |detail: &str| {
        AttemptError::Abort(LlmError::new(
            ErrorCode::LlmApiError,
            format!("malformed response: {detail}"),
        ))
    };

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| malformed(&e.to_string()))?;
    let content = value["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| malformed("missing choices[0].message.content"))?
        .trim();
    if content.is_empty() {
        return Err(malformed("empty content"));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_next_key(outcome: &AttemptError) -> bool {
        matches!(outcome, AttemptError::NextKey(_))
    }

    #[test]
    fn auth_and_rate_limits_move_to_next_key() {
        for status in [401, 403, 429] {
            assert!(is_next_key(&classify_status(status, "")), "status {status}");
        }
    }

    #[test]
    fn request_and_server_errors_abort() {
        for status in [400, 404, 500, 502, 503] {
            assert!(!is_next_key(&classify_status(status, "")), "status {status}");
        }
    }

    #[test]
    fn status_is_carried_on_the_error() {
        let AttemptError::Abort(error) = classify_status(400, r#"{"error":"bad model"}"#) else {
            panic!("400 should abort");
        };
        assert_eq!(error.status, Some(400));
        assert!(error.message.contains("bad model"));
    }

    #[test]
    fn extracts_and_trims_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  hi \n"}}]}"#;
        assert_eq!(extract_content(body).ok().as_deref(), Some("hi"));
    }

    #[test]
    fn malformed_bodies_abort() {
        for body in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":42}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            assert!(
                matches!(extract_content(body), Err(AttemptError::Abort(_))),
                "body {body}"
            );
        }
    }
}
