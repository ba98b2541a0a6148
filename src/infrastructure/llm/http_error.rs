use std::time::Duration;

use reqwest::StatusCode;

use crate::application::ports::LlmClientError;

pub(super) fn from_status(status: StatusCode, body: &str) -> LlmClientError {
    let detail = format!("HTTP {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmClientError::AuthenticationFailed(detail)
        }
        StatusCode::TOO_MANY_REQUESTS => LlmClientError::RateLimited,
        StatusCode::REQUEST_TIMEOUT => LlmClientError::ProviderUnavailable(detail),
        s if s.is_server_error() => LlmClientError::ProviderUnavailable(detail),
        _ => LlmClientError::ApiRequestFailed(detail),
    }
}

pub(super) fn from_transport(error: reqwest::Error, timeout: Duration) -> LlmClientError {
    if error.is_timeout() {
        LlmClientError::Timeout(timeout)
    } else if error.is_connect() || error.is_request() {
        LlmClientError::ConnectionFailed(error.to_string())
    } else {
        LlmClientError::ApiRequestFailed(error.to_string())
    }
}

pub(super) fn missing_api_key(provider: &str) -> LlmClientError {
    LlmClientError::AuthenticationFailed(format!("no api key configured for {}", provider))
}
