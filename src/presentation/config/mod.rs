mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    CatalogSettings, DatabaseSettings, HttpSettings, LoggingSettings, PipelineSettings,
    ServerSettings, Settings, SttSettings,
};
