use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::application::ports::{ConfigurationError, ConfigurationStore};
use crate::application::services::DEFAULT_CORRECTION_INSTRUCTION;
use crate::domain::{
    ApiProvider, ConfigurationId, DifficultyProfile, GameConfiguration, JudgeStepConfig,
    JudgeStepKind, LlmModel, ModelId, Pacing, PacingDictionary, Prompt, PromptKind,
    ProviderKind, RefusalSettings, ValidationError,
};

pub const DEFAULT_REFUSAL_CLASSIFIER_PROMPT: &str = "You check whether a storyteller declined to continue a story. Answer with a single word: YES or NO.";
pub const DEFAULT_REFUSAL_QUESTION: &str = "Is the following text a refusal to continue the story (an apology, a content-policy statement or a request to change the topic) rather than a story turn?";
pub const DEFAULT_JUDGE_INSTRUCTION: &str = "Rewrite the turn so it follows every rule of the game design. Keep the story, voice and length. Return only the corrected turn.";

const DEFAULT_STORYTELLER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_JUDGE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    active_configuration: String,
    #[serde(default)]
    providers: Vec<ProviderRecord>,
    #[serde(default)]
    models: Vec<ModelRecord>,
    #[serde(default)]
    prompts: Vec<PromptRecord>,
    #[serde(default)]
    difficulty_profiles: Vec<DifficultyRecord>,
    #[serde(default)]
    configurations: Vec<ConfigurationRecord>,
}

#[derive(Debug, Deserialize)]
struct ProviderRecord {
    name: String,
    kind: ProviderKind,
    base_url: Option<String>,
    api_key: Option<String>,
    /// Name of an environment variable holding the key; wins over `api_key`.
    api_key_env: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelRecord {
    id: String,
    model_identifier: String,
    provider: String,
    #[serde(default = "enabled")]
    available: bool,
}

#[derive(Debug, Deserialize)]
struct PromptRecord {
    kind: PromptKind,
    name: String,
    version: u32,
    text: String,
    #[serde(default)]
    active: bool,
}

#[derive(Debug, Deserialize)]
struct DifficultyRecord {
    name: String,
    curve: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigurationRecord {
    id: String,
    name: Option<String>,
    adventure_prompt: String,
    judge_prompt: String,
    ending_prompt: Option<String>,
    storyteller_model: String,
    storyteller_timeout_secs: Option<u64>,
    judge_model: String,
    judge_timeout_secs: Option<u64>,
    total_turns: u32,
    phase_turns: Option<[u32; 4]>,
    difficulty: Option<String>,
    refusal: Option<RefusalRecord>,
    #[serde(default)]
    judge_steps: Vec<JudgeStepRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct RefusalRecord {
    #[serde(default = "enabled")]
    enabled: bool,
    classifier_model: Option<String>,
    classifier_prompt: Option<String>,
    question: Option<String>,
    correction_instruction: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct JudgeStepRecord {
    name: String,
    kind: JudgeStepKind,
    #[serde(default = "enabled")]
    enabled: bool,
    model: Option<String>,
    /// Judge prompt name; the configuration's judge prompt when absent.
    system_prompt: Option<String>,
    instruction: String,
    #[serde(default)]
    use_full_context: bool,
    timeout_secs: Option<u64>,
}

fn enabled() -> bool {
    true
}

fn or_default(value: Option<&String>, default: &str) -> String {
    value.cloned().unwrap_or_else(|| default.to_string())
}

/// Validated contents of a catalog file.
#[derive(Debug)]
pub struct Catalog {
    active: ConfigurationId,
    models: Vec<LlmModel>,
    prompts: Vec<Prompt>,
    difficulties: HashMap<String, DifficultyProfile>,
    configurations: HashMap<ConfigurationId, ConfigurationRecord>,
}

impl Catalog {
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let file = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize::<CatalogFile>())
            .map_err(|e| ConfigurationError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        Ok(Self::validate(file)?)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigurationError> {
        let file = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize::<CatalogFile>())
            .map_err(|e| ConfigurationError::LoadFailed(e.to_string()))?;
        Ok(Self::validate(file)?)
    }

    pub fn active_id(&self) -> &ConfigurationId {
        &self.active
    }

    pub fn models(&self) -> &[LlmModel] {
        &self.models
    }

    fn validate(file: CatalogFile) -> Result<Self, ValidationError> {
        let mut providers = HashMap::new();
        for record in file.providers {
            let api_key = record
                .api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .or(record.api_key);
            let provider = ApiProvider {
                name: record.name.clone(),
                kind: record.kind,
                base_url: record.base_url,
                api_key,
            };
            if providers.insert(record.name.clone(), provider).is_some() {
                return Err(ValidationError::Duplicate(record.name));
            }
        }

        let mut models = Vec::with_capacity(file.models.len());
        let mut model_ids = HashSet::new();
        for record in file.models {
            let provider = providers
                .get(&record.provider)
                .cloned()
                .ok_or_else(|| ValidationError::UnknownProvider(record.provider.clone()))?;
            if !model_ids.insert(record.id.clone()) {
                return Err(ValidationError::Duplicate(record.id));
            }
            models.push(LlmModel {
                id: ModelId::new(record.id),
                model_identifier: record.model_identifier,
                provider,
                available: record.available,
            });
        }

        let mut prompts = Vec::with_capacity(file.prompts.len());
        let mut versions = HashSet::new();
        for record in file.prompts {
            if record.text.trim().is_empty() {
                return Err(ValidationError::InvalidPrompt {
                    name: record.name,
                    reason: "empty text".to_string(),
                });
            }
            if !versions.insert((record.kind, record.name.clone(), record.version)) {
                return Err(ValidationError::Duplicate(format!(
                    "{} prompt {} v{}",
                    record.kind, record.name, record.version
                )));
            }
            let prompt = Prompt::new(record.kind, record.name, record.version, record.text);
            prompts.push(if record.active { prompt.activated() } else { prompt });
        }

        let mut difficulties = HashMap::new();
        for record in file.difficulty_profiles {
            let profile = DifficultyProfile::new(record.name.clone(), &record.curve)?;
            if difficulties.insert(record.name.clone(), profile).is_some() {
                return Err(ValidationError::Duplicate(record.name));
            }
        }

        let mut configurations = HashMap::new();
        for record in file.configurations {
            let id = ConfigurationId::new(record.id.clone());
            if configurations.insert(id, record.clone()).is_some() {
                return Err(ValidationError::Duplicate(record.id));
            }
        }

        let catalog = Self {
            active: ConfigurationId::new(file.active_configuration),
            models,
            prompts,
            difficulties,
            configurations,
        };

        // Every configuration must be activatable, not only the current one.
        for id in catalog.configurations.keys() {
            catalog.resolve(id)?;
        }
        if !catalog.configurations.contains_key(&catalog.active) {
            return Err(ValidationError::UnknownConfiguration(
                catalog.active.to_string(),
            ));
        }
        Ok(catalog)
    }

    fn active_prompt(&self, kind: PromptKind, name: &str) -> Result<Prompt, ValidationError> {
        let mut family = self
            .prompts
            .iter()
            .filter(|p| p.kind == kind && p.name == name)
            .peekable();
        if family.peek().is_none() {
            return Err(ValidationError::UnknownPrompt(format!("{} {}", kind, name)));
        }
        let active: Vec<&Prompt> = family.filter(|p| p.is_active).collect();
        match active.as_slice() {
            [prompt] => Ok((*prompt).clone()),
            _ => Err(ValidationError::ActiveVersionCount(format!("{} {}", kind, name))),
        }
    }

    fn model(&self, id: &str) -> Result<ModelId, ValidationError> {
        let model = self
            .models
            .iter()
            .find(|m| m.id.as_str() == id)
            .ok_or_else(|| ValidationError::UnknownModel(id.to_string()))?;
        if !model.available {
            return Err(ValidationError::UnavailableModel(id.to_string()));
        }
        Ok(model.id.clone())
    }

    /// Builds the immutable snapshot for one configuration.
    pub fn resolve(&self, id: &ConfigurationId) -> Result<GameConfiguration, ValidationError> {
        let record = self
            .configurations
            .get(id)
            .ok_or_else(|| ValidationError::UnknownConfiguration(id.to_string()))?;

        let pacing = match record.phase_turns {
            Some(phases) => Pacing::new(record.total_turns, phases)?,
            None => Pacing::default_for(record.total_turns)?,
        };
        let dictionary = pacing.dictionary();

        let adventure_prompt = self.active_prompt(PromptKind::Adventure, &record.adventure_prompt)?;
        let judge_prompt = self.active_prompt(PromptKind::Judge, &record.judge_prompt)?;
        let ending_prompt = record
            .ending_prompt
            .as_deref()
            .map(|name| self.active_prompt(PromptKind::Ending, name))
            .transpose()?;

        let storyteller_model = self.model(&record.storyteller_model)?;
        let judge_model = self.model(&record.judge_model)?;
        let judge_timeout =
            Duration::from_secs(record.judge_timeout_secs.unwrap_or(DEFAULT_JUDGE_TIMEOUT_SECS));

        let difficulty = record
            .difficulty
            .as_deref()
            .map(|name| {
                self.difficulties
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ValidationError::UnknownDifficulty(name.to_string()))
            })
            .transpose()?;

        let refusal = self.refusal_settings(record.refusal.as_ref(), &judge_model)?;

        let mut judge_steps = Vec::with_capacity(record.judge_steps.len());
        for step in &record.judge_steps {
            judge_steps.push(self.judge_step(
                step,
                &judge_prompt,
                &judge_model,
                judge_timeout,
                &dictionary,
            )?);
        }
        if judge_steps.is_empty() {
            judge_steps.push(JudgeStepConfig {
                name: "judge".to_string(),
                kind: JudgeStepKind::Rewriter,
                enabled: true,
                model: judge_model.clone(),
                system_prompt: dictionary.apply(&judge_prompt.text),
                instruction: DEFAULT_JUDGE_INSTRUCTION.to_string(),
                use_full_context: true,
                timeout: judge_timeout,
            });
        }

        Ok(GameConfiguration {
            id: id.clone(),
            name: record.name.clone().unwrap_or_else(|| record.id.clone()),
            adventure_prompt,
            judge_prompt,
            ending_prompt,
            storyteller_model,
            storyteller_timeout: Duration::from_secs(
                record
                    .storyteller_timeout_secs
                    .unwrap_or(DEFAULT_STORYTELLER_TIMEOUT_SECS),
            ),
            judge_model,
            judge_timeout,
            pacing,
            refusal,
            judge_steps,
            difficulty,
        })
    }

    fn refusal_settings(
        &self,
        record: Option<&RefusalRecord>,
        judge_model: &ModelId,
    ) -> Result<Option<RefusalSettings>, ValidationError> {
        if record.is_some_and(|r| !r.enabled) {
            return Ok(None);
        }
        let classifier_model = match record.and_then(|r| r.classifier_model.as_deref()) {
            Some(id) => self.model(id)?,
            None => judge_model.clone(),
        };
        Ok(Some(RefusalSettings {
            classifier_model,
            classifier_prompt: or_default(
                record.and_then(|r| r.classifier_prompt.as_ref()),
                DEFAULT_REFUSAL_CLASSIFIER_PROMPT,
            ),
            question: or_default(
                record.and_then(|r| r.question.as_ref()),
                DEFAULT_REFUSAL_QUESTION,
            ),
            correction_instruction: or_default(
                record.and_then(|r| r.correction_instruction.as_ref()),
                DEFAULT_CORRECTION_INSTRUCTION,
            ),
            timeout: Duration::from_secs(
                record
                    .and_then(|r| r.timeout_secs)
                    .unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT_SECS),
            ),
        }))
    }

    fn judge_step(
        &self,
        record: &JudgeStepRecord,
        judge_prompt: &Prompt,
        judge_model: &ModelId,
        judge_timeout: Duration,
        dictionary: &PacingDictionary,
    ) -> Result<JudgeStepConfig, ValidationError> {
        let system_prompt = match record.system_prompt.as_deref() {
            Some(name) => self.active_prompt(PromptKind::Judge, name)?,
            None => judge_prompt.clone(),
        };
        let model = match record.model.as_deref() {
            Some(id) => self.model(id)?,
            None => judge_model.clone(),
        };
        Ok(JudgeStepConfig {
            name: record.name.clone(),
            kind: record.kind,
            enabled: record.enabled,
            model,
            system_prompt: dictionary.apply(&system_prompt.text),
            instruction: dictionary.apply(&record.instruction),
            use_full_context: record.use_full_context,
            timeout: record
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(judge_timeout),
        })
    }
}

/// Serves snapshots of the active catalog configuration; activation swaps the snapshot.
pub struct CatalogConfigurationStore {
    catalog: Catalog,
    active: RwLock<Arc<GameConfiguration>>,
}

impl CatalogConfigurationStore {
    pub fn new(catalog: Catalog) -> Result<Self, ConfigurationError> {
        let snapshot = catalog.resolve(catalog.active_id())?;
        info!(
            configuration = %snapshot.id,
            total_turns = snapshot.pacing.total_turns(),
            judge_steps = snapshot.judge_steps.len(),
            "Active configuration loaded"
        );
        Ok(Self {
            catalog,
            active: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        Self::new(Catalog::from_path(path)?)
    }
}

#[async_trait]
impl ConfigurationStore for CatalogConfigurationStore {
    async fn active_snapshot(&self) -> Result<Arc<GameConfiguration>, ConfigurationError> {
        Ok(Arc::clone(&*self.active.read().await))
    }

    #[instrument(skip(self), fields(configuration = %id))]
    async fn activate(&self, id: &ConfigurationId) -> Result<(), ConfigurationError> {
        let snapshot = Arc::new(self.catalog.resolve(id)?);
        *self.active.write().await = snapshot;
        info!("Configuration activated");
        Ok(())
    }

    async fn registered_models(&self) -> Result<Vec<LlmModel>, ConfigurationError> {
        Ok(self.catalog.models().to_vec())
    }
}
