mod whisper_api_engine;

pub use whisper_api_engine::WhisperApiEngine;
