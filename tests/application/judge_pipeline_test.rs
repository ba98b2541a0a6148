use std::sync::Arc;

use cyoa_server::application::ports::LlmClientError;
use cyoa_server::application::services::{JudgePipeline, RetryPolicy};
use cyoa_server::domain::{FailureKind, JudgeStepKind, Message, MessageRole};

use crate::helpers::{CLASSIFIER, JUDGE, ScriptedGateway, judge_step};

const TURN: &str = "The goblin offers you a deal.";

fn pipeline(gateway: &Arc<ScriptedGateway>) -> JudgePipeline {
    JudgePipeline::new(gateway.clone(), RetryPolicy::without_backoff(1), 2)
}

#[tokio::test]
async fn given_clean_turn_when_classifier_says_no_then_rewriter_skipped() {
    let gateway = Arc::new(ScriptedGateway::new().reply(CLASSIFIER, "NO"));
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, TURN);
    assert!(!outcome.was_modified);
    assert!(outcome.aborted_at.is_none());
    assert_eq!(outcome.steps[0].violation, Some(false));
    assert!(outcome.steps[1].skipped);
    assert!(gateway.calls_to(JUDGE).is_empty());
}

#[tokio::test]
async fn given_flagged_turn_when_rewrite_passes_recheck_then_rewrite_kept() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(CLASSIFIER, "YES")
            .reply(JUDGE, "The goblin eyes you warily.")
            .reply(CLASSIFIER, "NO"),
    );
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, "The goblin eyes you warily.");
    assert!(outcome.was_modified);
    let rewrite = &outcome.steps[1];
    assert_eq!(rewrite.attempts, 1);
    assert_eq!(rewrite.violation, Some(false));
    assert!(rewrite.modified);

    let judge_calls = gateway.calls_to(JUDGE);
    let fix_prompt = &judge_calls[0].messages.last().unwrap().content;
    assert_eq!(fix_prompt, &format!("fix instruction\n\nTURN TO FIX:\n{}", TURN));
}

#[tokio::test]
async fn given_rewrites_that_stay_flagged_when_bound_reached_then_last_rewrite_accepted() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(CLASSIFIER, "YES")
            .reply(JUDGE, "first")
            .reply(CLASSIFIER, "YES")
            .reply(JUDGE, "second")
            .reply(CLASSIFIER, "YES")
            .reply(JUDGE, "third")
            .reply(CLASSIFIER, "YES"),
    );
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, "third");
    let rewrite = &outcome.steps[1];
    assert_eq!(rewrite.attempts, 3);
    assert_eq!(rewrite.retry_count, 2);
    assert_eq!(rewrite.violation, Some(true));
    assert_eq!(gateway.calls_to(JUDGE).len(), 3);
    assert_eq!(gateway.calls_to(CLASSIFIER).len(), 4);
}

#[tokio::test]
async fn given_rewriter_without_classifier_when_running_then_rewrites_once() {
    let gateway = Arc::new(ScriptedGateway::new().reply(JUDGE, "polished turn"));
    let steps = vec![judge_step("judge", JudgeStepKind::Rewriter, JUDGE)];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, "polished turn");
    assert_eq!(outcome.steps[0].attempts, 1);
    assert_eq!(outcome.steps[0].violation, None);
}

#[tokio::test]
async fn given_comparator_rejects_rewrite_when_running_then_original_restored() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(JUDGE, "worse turn")
            .reply(CLASSIFIER, "NO, the original was better"),
    );
    let steps = vec![
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
        judge_step("sanity", JudgeStepKind::Comparator, CLASSIFIER),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, TURN);
    assert!(!outcome.was_modified);
    let comparison = &outcome.steps[1];
    assert_eq!(comparison.input, "worse turn");
    assert_eq!(comparison.output, TURN);
    assert!(comparison.modified);

    let comparator_calls = gateway.calls_to(CLASSIFIER);
    let prompt = &comparator_calls[0].messages.last().unwrap().content;
    assert!(prompt.contains(&format!("ORIGINAL:\n{}", TURN)));
    assert!(prompt.contains("CORRECTED:\nworse turn"));
}

#[tokio::test]
async fn given_comparator_accepts_rewrite_when_running_then_rewrite_kept() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(JUDGE, "better turn")
            .reply(CLASSIFIER, "YES"),
    );
    let steps = vec![
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
        judge_step("sanity", JudgeStepKind::Comparator, CLASSIFIER),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, "better turn");
    assert!(outcome.was_modified);
    assert!(!outcome.steps[1].modified);
}

#[tokio::test]
async fn given_comparator_without_prior_rewrite_when_running_then_skipped() {
    let gateway = Arc::new(ScriptedGateway::new());
    let steps = vec![judge_step("sanity", JudgeStepKind::Comparator, CLASSIFIER)];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert!(outcome.steps[0].skipped);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn given_auth_failure_in_rewriter_when_running_then_aborts_with_last_good_text() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(CLASSIFIER, "YES")
            .fail(JUDGE, LlmClientError::AuthenticationFailed("revoked".into())),
    );
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
        judge_step("sanity", JudgeStepKind::Comparator, CLASSIFIER),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, TURN);
    assert!(!outcome.was_modified);
    assert_eq!(outcome.aborted_at.as_deref(), Some("fix"));
    assert_eq!(outcome.steps.len(), 2);
    let error = outcome.steps[1].error.as_ref().unwrap();
    assert_eq!(error.kind, FailureKind::Auth);
    assert_eq!(gateway.calls_to(JUDGE).len(), 1);
}

#[tokio::test]
async fn given_transient_failure_when_retry_succeeds_then_step_records_retry() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .fail(CLASSIFIER, LlmClientError::RateLimited)
            .reply(CLASSIFIER, "NO"),
    );
    let steps = vec![judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER)];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert!(outcome.aborted_at.is_none());
    assert_eq!(outcome.steps[0].transient_retries, 1);
    assert_eq!(outcome.steps[0].response.as_deref(), Some("NO"));
}

#[tokio::test]
async fn given_disabled_step_when_running_then_not_invoked() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut step = judge_step("fix", JudgeStepKind::Rewriter, JUDGE);
    step.enabled = false;

    let outcome = pipeline(&gateway).run(&[step], &[], TURN).await;

    assert!(outcome.steps.is_empty());
    assert_eq!(outcome.final_turn, TURN);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn given_full_context_step_when_invoking_then_conversation_included() {
    let gateway = Arc::new(ScriptedGateway::new().reply(CLASSIFIER, "NO"));
    let mut step = judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER);
    step.use_full_context = true;
    let context = vec![Message::user("I wake up"), Message::assistant("Trees."), Message::user("I run")];

    pipeline(&gateway).run(&[step], &context, TURN).await;

    let call = &gateway.calls_to(CLASSIFIER)[0];
    assert_eq!(call.messages.len(), 5);
    assert_eq!(call.messages[0].role, MessageRole::System);
    assert_eq!(call.messages[1], Message::user("I wake up"));
    assert!(call.options.disable_thinking);
}

#[tokio::test]
async fn given_auth_failure_in_classifier_when_running_then_aborts_before_rewriting() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .fail(CLASSIFIER, LlmClientError::AuthenticationFailed("expired key".into())),
    );
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, TURN);
    assert!(!outcome.was_modified);
    assert_eq!(outcome.aborted_at.as_deref(), Some("violations"));
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].error.as_ref().map(|e| e.kind), Some(FailureKind::Auth));
    assert!(gateway.calls_to(JUDGE).is_empty());
}

#[tokio::test]
async fn given_unreadable_classifier_answer_when_running_then_no_violation_assumed() {
    let gateway = Arc::new(
        ScriptedGateway::new().reply(CLASSIFIER, "Hmm, the turn seems ambiguous."),
    );
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, TURN);
    assert!(outcome.aborted_at.is_none());
    assert_eq!(outcome.steps[0].violation, Some(false));
    assert!(outcome.steps[1].skipped);
    assert!(gateway.calls_to(JUDGE).is_empty());
}

#[tokio::test]
async fn given_transient_failures_beyond_bound_when_running_then_step_aborts_as_transient() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .fail(CLASSIFIER, LlmClientError::RateLimited)
            .fail(CLASSIFIER, LlmClientError::RateLimited)
            .reply(CLASSIFIER, "NO"),
    );
    let steps = vec![
        judge_step("violations", JudgeStepKind::Classifier, CLASSIFIER),
        judge_step("fix", JudgeStepKind::Rewriter, JUDGE),
    ];

    let outcome = pipeline(&gateway).run(&steps, &[], TURN).await;

    assert_eq!(outcome.final_turn, TURN);
    assert_eq!(outcome.aborted_at.as_deref(), Some("violations"));
    let record = &outcome.steps[0];
    assert_eq!(record.error.as_ref().map(|e| e.kind), Some(FailureKind::Transient));
    assert_eq!(record.transient_retries, 1);
    assert_eq!(gateway.calls_to(CLASSIFIER).len(), 2);
    assert!(gateway.calls_to(JUDGE).is_empty());
}
