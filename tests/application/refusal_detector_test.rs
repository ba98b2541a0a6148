use std::sync::Arc;
use std::time::Duration;

use cyoa_server::application::ports::{InvocationOptions, LlmClientError};
use cyoa_server::application::services::{
    RefusalDetector, RefusalOutcome, RetryPolicy, StorytellerCall, with_corrective_instruction,
};
use cyoa_server::domain::{FailureKind, Message, MessageRole, ModelId, RefusalSettings};

use crate::helpers::{CLASSIFIER, STORYTELLER, ScriptedGateway};

const REFUSAL: &str = "I'm sorry, but I can't continue this story.";

fn settings() -> RefusalSettings {
    RefusalSettings {
        classifier_model: ModelId::new(CLASSIFIER),
        classifier_prompt: "You detect refusals.".to_string(),
        question: "Is this a refusal?".to_string(),
        correction_instruction: "Stay in the story.".to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn storyteller_messages() -> Vec<Message> {
    vec![
        Message::system("You are the storyteller."),
        Message::user("I attack the troll"),
    ]
}

async fn review(
    gateway: &Arc<ScriptedGateway>,
    settings: Option<&RefusalSettings>,
    turn: &str,
) -> RefusalOutcome {
    let detector = RefusalDetector::new(gateway.clone(), RetryPolicy::without_backoff(0));
    let model = ModelId::new(STORYTELLER);
    let messages = storyteller_messages();
    let options = InvocationOptions::with_timeout(Duration::from_secs(5));
    detector
        .review(
            settings,
            StorytellerCall {
                model: &model,
                messages: &messages,
                options: &options,
            },
            turn.to_string(),
        )
        .await
}

#[tokio::test]
async fn given_no_refusal_settings_when_reviewing_then_turn_accepted_without_calls() {
    let gateway = Arc::new(ScriptedGateway::new());

    let outcome = review(&gateway, None, "The troll roars.").await;

    assert_eq!(outcome.final_turn, "The troll roars.");
    assert!(!outcome.was_refusal);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn given_story_turn_when_classifier_says_no_then_turn_accepted() {
    let gateway = Arc::new(ScriptedGateway::new().reply(CLASSIFIER, "NO"));

    let outcome = review(&gateway, Some(&settings()), "The troll roars.").await;

    assert_eq!(outcome.final_turn, "The troll roars.");
    assert!(!outcome.was_refusal);
    assert_eq!(outcome.classifier_response, "NO");

    let call = &gateway.calls_to(CLASSIFIER)[0];
    assert!(call.options.disable_thinking);
    assert_eq!(
        call.messages[1].content,
        "Is this a refusal?\n\nThe troll roars."
    );
}

#[tokio::test]
async fn given_refusal_when_correction_succeeds_then_regenerated_exactly_once() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(CLASSIFIER, "YES")
            .reply(STORYTELLER, "You duck under the troll's club."),
    );

    let outcome = review(&gateway, Some(&settings()), REFUSAL).await;

    assert_eq!(outcome.final_turn, "You duck under the troll's club.");
    assert!(outcome.was_refusal);
    assert!(outcome.was_corrected);
    assert_eq!(gateway.calls_to(CLASSIFIER).len(), 1);

    let correction = gateway.calls_to(STORYTELLER);
    assert_eq!(correction.len(), 1);
    assert_eq!(
        correction[0].messages[0].content,
        "You are the storyteller.\n\nStay in the story."
    );
}

#[tokio::test]
async fn given_refusal_when_correction_fails_then_original_kept_and_failure_recorded() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(CLASSIFIER, "YES")
            .fail(STORYTELLER, LlmClientError::ProviderUnavailable("down".into())),
    );

    let outcome = review(&gateway, Some(&settings()), REFUSAL).await;

    assert_eq!(outcome.final_turn, REFUSAL);
    assert!(outcome.was_refusal);
    assert!(!outcome.was_corrected);
    assert_eq!(
        outcome.correction_error.map(|f| f.kind),
        Some(FailureKind::Transient)
    );
}

#[tokio::test]
async fn given_unreadable_classifier_answer_when_reviewing_then_turn_accepted() {
    let gateway = Arc::new(ScriptedGateway::new().reply(CLASSIFIER, "It is hard to tell."));

    let outcome = review(&gateway, Some(&settings()), REFUSAL).await;

    assert_eq!(outcome.final_turn, REFUSAL);
    assert!(!outcome.was_refusal);
    assert!(!outcome.was_corrected);
    assert_eq!(outcome.classifier_response, "It is hard to tell.");
    assert!(outcome.classifier_error.is_none());
    assert!(gateway.calls_to(STORYTELLER).is_empty());
}

#[tokio::test]
async fn given_classifier_failure_when_reviewing_then_fails_open() {
    let gateway = Arc::new(
        ScriptedGateway::new().fail(CLASSIFIER, LlmClientError::InvalidResponse("garbled".into())),
    );

    let outcome = review(&gateway, Some(&settings()), REFUSAL).await;

    assert_eq!(outcome.final_turn, REFUSAL);
    assert!(!outcome.was_refusal);
    assert!(outcome.classifier_response.starts_with("Error:"));
    assert_eq!(
        outcome.classifier_error.map(|f| f.kind),
        Some(FailureKind::Model)
    );
}

#[test]
fn given_messages_without_system_prompt_when_correcting_then_instruction_prepended() {
    let corrected = with_corrective_instruction(&[Message::user("go")], "Stay in the story.");

    assert_eq!(corrected.len(), 2);
    assert_eq!(corrected[0].role, MessageRole::System);
    assert_eq!(corrected[0].content, "Stay in the story.");
}
