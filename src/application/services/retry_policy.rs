use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::application::ports::{InvocationOptions, LlmClientError, LlmGateway};
use crate::domain::{Failure, Message, ModelId};

/// Bounded local retries for transient gateway failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_transient_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_transient_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub text: String,
    pub transient_retries: u32,
}

#[derive(Debug, Clone)]
pub struct InvocationFailure {
    pub error: LlmClientError,
    pub transient_retries: u32,
}

impl InvocationFailure {
    pub fn to_failure(&self) -> Failure {
        Failure::new(self.error.kind(), self.error.to_string())
    }
}

impl RetryPolicy {
    pub fn without_backoff(max_transient_retries: u32) -> Self {
        Self {
            max_transient_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Capped at `max_backoff`; a delay too large to represent is treated as the cap.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Invokes `model`, retrying transient failures only. Auth and model errors return at once.
    pub async fn invoke(
        &self,
        gateway: &dyn LlmGateway,
        model: &ModelId,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<Invocation, InvocationFailure> {
        let mut transient_retries = 0;

        loop {
            match gateway.invoke(model, messages, options).await {
                Ok(text) => {
                    return Ok(Invocation {
                        text,
                        transient_retries,
                    });
                }
                Err(error)
                    if error.kind().is_retryable()
                        && transient_retries < self.max_transient_retries =>
                {
                    let delay = self.backoff_for(transient_retries);
                    transient_retries += 1;
                    warn!(
                        model = %model,
                        error = %error,
                        retry = transient_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transient model failure, retrying"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
                Err(error) => {
                    debug!(model = %model, error = %error, kind = %error.kind(), "Model invocation failed");
                    return Err(InvocationFailure {
                        error,
                        transient_retries,
                    });
                }
            }
        }
    }
}
