use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::application::ports::{InvocationOptions, LlmGateway};
use crate::domain::{JudgeStepConfig, JudgeStepKind, JudgeStepRecord, Message, Verdict};

use super::{Invocation, InvocationFailure, RetryPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub final_turn: String,
    pub was_modified: bool,
    pub steps: Vec<JudgeStepRecord>,
    /// Name of the step whose failure stopped the pipeline.
    pub aborted_at: Option<String>,
}

struct ClassifierVerdict<'a> {
    step: &'a JudgeStepConfig,
    flagged: bool,
}

/// Runs configured classify / rewrite / compare steps in order over one turn.
pub struct JudgePipeline {
    gateway: Arc<dyn LlmGateway>,
    retry_policy: RetryPolicy,
    rewrite_retries: u32,
}

impl JudgePipeline {
    pub fn new(gateway: Arc<dyn LlmGateway>, retry_policy: RetryPolicy, rewrite_retries: u32) -> Self {
        Self {
            gateway,
            retry_policy,
            rewrite_retries,
        }
    }

    /// `context` is the conversation so far, used by steps configured for full context.
    #[instrument(skip_all, fields(steps = steps.len()))]
    pub async fn run(&self, steps: &[JudgeStepConfig], context: &[Message], turn: &str) -> JudgeOutcome {
        let mut current = turn.to_string();
        let mut verdict: Option<ClassifierVerdict<'_>> = None;
        let mut before_rewrite: Option<String> = None;
        let mut records = Vec::new();

        for step in steps.iter().filter(|step| step.enabled) {
            let started = Instant::now();
            let mut record = match step.kind {
                JudgeStepKind::Classifier => self.classify(step, context, &current).await,
                JudgeStepKind::Rewriter => {
                    self.rewrite(step, verdict.as_ref(), context, &current).await
                }
                JudgeStepKind::Comparator => {
                    self.compare(step, before_rewrite.as_deref(), context, &current)
                        .await
                }
            };
            record.elapsed_ms = started.elapsed().as_millis() as u64;

            if let Some(error) = &record.error {
                warn!(
                    step = %step.name,
                    kind = %step.kind,
                    error_kind = %error.kind,
                    error = %error.message,
                    "Judge step failed, keeping last good text"
                );
                records.push(record);
                return JudgeOutcome {
                    was_modified: current != turn,
                    final_turn: current,
                    steps: records,
                    aborted_at: Some(step.name.clone()),
                };
            }

            match step.kind {
                JudgeStepKind::Classifier => {
                    verdict = Some(ClassifierVerdict {
                        step,
                        flagged: record.violation == Some(true),
                    });
                }
                JudgeStepKind::Rewriter => {
                    if record.modified && before_rewrite.is_none() {
                        before_rewrite = Some(record.input.clone());
                    }
                    if let (Some(verdict), Some(still_flagged)) = (verdict.as_mut(), record.violation) {
                        verdict.flagged = still_flagged;
                    }
                }
                JudgeStepKind::Comparator => before_rewrite = None,
            }

            debug!(
                step = %step.name,
                kind = %step.kind,
                modified = record.modified,
                skipped = record.skipped,
                violation = ?record.violation,
                "Judge step completed"
            );
            current = record.output.clone();
            records.push(record);
        }

        let was_modified = current != turn;
        info!(steps = records.len(), was_modified, "Judge pipeline completed");

        JudgeOutcome {
            final_turn: current,
            was_modified,
            steps: records,
            aborted_at: None,
        }
    }

    async fn classify(&self, step: &JudgeStepConfig, context: &[Message], text: &str) -> JudgeStepRecord {
        let mut record = JudgeStepRecord::started(step, text);
        record.attempts = 1;

        match self.check(step, context, text).await {
            Ok((flagged, invocation)) => {
                record.transient_retries = invocation.transient_retries;
                record.retry_count = invocation.transient_retries;
                record.violation = Some(flagged);
                record.response = Some(invocation.text);
            }
            Err(failure) => fail(&mut record, failure),
        }
        record
    }

    async fn rewrite(
        &self,
        step: &JudgeStepConfig,
        verdict: Option<&ClassifierVerdict<'_>>,
        context: &[Message],
        text: &str,
    ) -> JudgeStepRecord {
        let mut record = JudgeStepRecord::started(step, text);

        if verdict.is_some_and(|verdict| !verdict.flagged) {
            record.skipped = true;
            record.violation = Some(false);
            return record;
        }

        let max_attempts = 1 + self.rewrite_retries;
        let mut candidate = text.to_string();
        let mut still_flagged = verdict.is_some();

        while record.attempts < max_attempts {
            record.attempts += 1;
            record.retry_count = record.attempts - 1;

            let prompt = format!("{}\n\nTURN TO FIX:\n{}", step.instruction, text);
            let options = InvocationOptions::with_timeout(step.timeout);
            match self.ask(step, context, prompt, &options).await {
                Ok(invocation) => {
                    record.transient_retries += invocation.transient_retries;
                    candidate = invocation.text;
                }
                Err(failure) => {
                    fail(&mut record, failure);
                    return record;
                }
            }

            let Some(verdict) = verdict else {
                still_flagged = false;
                break;
            };

            match self.check(verdict.step, context, &candidate).await {
                Ok((flagged, invocation)) => {
                    record.transient_retries += invocation.transient_retries;
                    record.response = Some(invocation.text);
                    still_flagged = flagged;
                    if !flagged {
                        break;
                    }
                    debug!(
                        step = %step.name,
                        attempt = record.attempts,
                        max_attempts,
                        "Rewrite still flagged"
                    );
                }
                Err(failure) => {
                    fail(&mut record, failure);
                    return record;
                }
            }
        }

        if still_flagged {
            warn!(
                step = %step.name,
                attempts = record.attempts,
                "Rewrite bound reached with violation remaining, accepting last rewrite"
            );
        }

        record.violation = verdict.map(|_| still_flagged);
        record.modified = candidate != text;
        record.output = candidate;
        record
    }

    async fn compare(
        &self,
        step: &JudgeStepConfig,
        original: Option<&str>,
        context: &[Message],
        candidate: &str,
    ) -> JudgeStepRecord {
        let mut record = JudgeStepRecord::started(step, candidate);

        let Some(original) = original.filter(|original| *original != candidate) else {
            record.skipped = true;
            return record;
        };

        record.attempts = 1;
        let prompt = format!(
            "{}\n\nORIGINAL:\n{}\n\nCORRECTED:\n{}",
            step.instruction, original, candidate
        );
        let options = InvocationOptions::with_timeout(step.timeout).without_thinking();

        match self.ask(step, context, prompt, &options).await {
            Ok(invocation) => {
                record.transient_retries = invocation.transient_retries;
                record.retry_count = invocation.transient_retries;
                let keep_rewrite = Verdict::parse(&invocation.text).is_yes_or(false);
                record.response = Some(invocation.text);
                if !keep_rewrite {
                    record.output = original.to_string();
                    record.modified = true;
                }
            }
            Err(failure) => fail(&mut record, failure),
        }
        record
    }

    /// Asks a classifier step about `text`; unclear answers count as no violation.
    async fn check(
        &self,
        step: &JudgeStepConfig,
        context: &[Message],
        text: &str,
    ) -> Result<(bool, Invocation), InvocationFailure> {
        let prompt = format!("{}\n\n{}", step.instruction, text);
        let options = InvocationOptions::with_timeout(step.timeout).without_thinking();
        let invocation = self.ask(step, context, prompt, &options).await?;
        let flagged = Verdict::parse(&invocation.text).is_yes_or(false);
        Ok((flagged, invocation))
    }

    async fn ask(
        &self,
        step: &JudgeStepConfig,
        context: &[Message],
        prompt: String,
        options: &InvocationOptions,
    ) -> Result<Invocation, InvocationFailure> {
        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(Message::system(step.system_prompt.clone()));
        if step.use_full_context {
            messages.extend(context.iter().cloned());
        }
        messages.push(Message::user(prompt));

        self.retry_policy
            .invoke(self.gateway.as_ref(), &step.model, &messages, options)
            .await
    }
}

fn fail(record: &mut JudgeStepRecord, failure: InvocationFailure) {
    record.transient_retries += failure.transient_retries;
    if record.kind != JudgeStepKind::Rewriter {
        record.retry_count = record.transient_retries;
    }
    record.output = record.input.clone();
    record.modified = false;
    record.error = Some(failure.to_failure());
}
