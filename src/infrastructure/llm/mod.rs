mod anthropic_client;
mod http_error;
mod model_router;
mod ollama_client;
mod openai_compatible_client;

pub use anthropic_client::AnthropicClient;
pub use model_router::ModelRouter;
pub use ollama_client::OllamaClient;
pub use openai_compatible_client::OpenAiCompatibleClient;
