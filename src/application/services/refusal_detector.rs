use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::application::ports::{InvocationOptions, LlmGateway};
use crate::domain::{Failure, Message, MessageRole, ModelId, RefusalSettings, Verdict};

use super::RetryPolicy;

pub const DEFAULT_CORRECTION_INSTRUCTION: &str = "The previous response was refused. Continue the adventure from the player's action without violating content policy. Respond only with the next story turn.";

/// The storyteller invocation a refusal may need to repeat.
#[derive(Debug, Clone, Copy)]
pub struct StorytellerCall<'a> {
    pub model: &'a ModelId,
    pub messages: &'a [Message],
    pub options: &'a InvocationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefusalOutcome {
    pub final_turn: String,
    pub was_refusal: bool,
    pub classifier_response: String,
    pub was_corrected: bool,
    pub classifier_error: Option<Failure>,
    pub correction_error: Option<Failure>,
}

impl RefusalOutcome {
    fn accepted(turn: String, classifier_response: String) -> Self {
        Self {
            final_turn: turn,
            was_refusal: false,
            classifier_response,
            was_corrected: false,
            classifier_error: None,
            correction_error: None,
        }
    }
}

pub struct RefusalDetector {
    gateway: Arc<dyn LlmGateway>,
    retry_policy: RetryPolicy,
}

impl RefusalDetector {
    pub fn new(gateway: Arc<dyn LlmGateway>, retry_policy: RetryPolicy) -> Self {
        Self {
            gateway,
            retry_policy,
        }
    }

    /// Classifies `turn` and, on a refusal, regenerates it exactly once.
    #[instrument(skip_all, fields(storyteller = %storyteller.model))]
    pub async fn review(
        &self,
        settings: Option<&RefusalSettings>,
        storyteller: StorytellerCall<'_>,
        turn: String,
    ) -> RefusalOutcome {
        let Some(settings) = settings else {
            return RefusalOutcome::accepted(turn, String::new());
        };

        let classifier_messages = vec![
            Message::system(settings.classifier_prompt.clone()),
            Message::user(format!("{}\n\n{}", settings.question, turn)),
        ];
        let options = InvocationOptions::with_timeout(settings.timeout).without_thinking();

        let classification = self
            .retry_policy
            .invoke(
                self.gateway.as_ref(),
                &settings.classifier_model,
                &classifier_messages,
                &options,
            )
            .await;

        let response = match classification {
            Ok(invocation) => invocation.text,
            Err(failure) => {
                warn!(error = %failure.error, "Refusal classifier failed, accepting turn");
                let mut outcome =
                    RefusalOutcome::accepted(turn, format!("Error: {}", failure.error));
                outcome.classifier_error = Some(failure.to_failure());
                return outcome;
            }
        };

        if !Verdict::parse(&response).is_yes_or(false) {
            return RefusalOutcome::accepted(turn, response);
        }

        info!(
            classifier_response = %response.trim(),
            "Refusal detected, regenerating turn once"
        );

        let corrective_messages =
            with_corrective_instruction(storyteller.messages, &settings.correction_instruction);

        match self
            .retry_policy
            .invoke(
                self.gateway.as_ref(),
                storyteller.model,
                &corrective_messages,
                storyteller.options,
            )
            .await
        {
            Ok(invocation) => RefusalOutcome {
                final_turn: invocation.text,
                was_refusal: true,
                classifier_response: response,
                was_corrected: true,
                classifier_error: None,
                correction_error: None,
            },
            Err(failure) => {
                warn!(error = %failure.error, "Refusal correction failed, keeping original turn");
                RefusalOutcome {
                    final_turn: turn,
                    was_refusal: true,
                    classifier_response: response,
                    was_corrected: false,
                    classifier_error: None,
                    correction_error: Some(failure.to_failure()),
                }
            }
        }
    }
}

/// Appends `instruction` to the leading system prompt, or adds one.
pub fn with_corrective_instruction(messages: &[Message], instruction: &str) -> Vec<Message> {
    let mut corrected = messages.to_vec();
    match corrected.first_mut() {
        Some(first) if first.role == MessageRole::System => {
            first.content = format!("{}\n\n{}", first.content, instruction);
        }
        _ => corrected.insert(0, Message::system(instruction)),
    }
    corrected
}
