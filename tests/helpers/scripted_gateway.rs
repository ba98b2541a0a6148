use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use cyoa_server::application::ports::{InvocationOptions, LlmClientError, LlmGateway};
use cyoa_server::domain::{Message, ModelId};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: InvocationOptions,
}

/// Gateway answering from per-model queues; an empty queue is a model error.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, LlmClientError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, model: &str, text: &str) -> Self {
        self.respond(model, Ok(text.to_string()))
    }

    pub fn fail(self, model: &str, error: LlmClientError) -> Self {
        self.respond(model, Err(error))
    }

    pub fn respond(self, model: &str, response: Result<String, LlmClientError>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, model: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.model == model)
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmGateway for ScriptedGateway {
    async fn invoke(
        &self,
        model: &ModelId,
        messages: &[Message],
        options: &InvocationOptions,
    ) -> Result<String, LlmClientError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            options: options.clone(),
        });

        self.scripts
            .lock()
            .unwrap()
            .get_mut(model.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(LlmClientError::InvalidResponse(format!(
                    "no scripted response for {}",
                    model
                )))
            })
    }
}
