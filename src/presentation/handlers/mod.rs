mod audit;
mod chat;
mod configuration;
mod health;
mod models;
pub mod openai_types;
pub mod stt;

pub use audit::{audit_entry_handler, recent_audit_handler};
pub use chat::{AUDIT_ID_HEADER, chat_completions_handler};
pub use configuration::{activate_configuration_handler, active_configuration_handler};
pub use health::health_handler;
pub use models::models_handler;
pub use stt::{discard_handler, recording_status_handler, transcribe_handler, upload_handler};
