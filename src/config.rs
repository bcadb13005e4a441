//! TOML configuration file and its merge with CLI flags.
//!
//! Precedence is CLI flag > config file > built-in default.
//!
//! ```toml
//! endpoint = "http://localhost:3000/api/chat"
//! auto_delay_ms = 1000
//! mode = "manual"
//! topic = "the ethics of time travel"
//!
//! [participant1]
//! model = "openai/gpt-4o-mini"
//! color = "#3b82f6"
//! personality = "curious"
//!
//! [[models]]
//! id = "openai/gpt-4o-mini"
//! name = "GPT-4o mini"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{ModelCatalog, ModelEntry};
use crate::cli::Args;
use crate::error::ChatError;
use crate::participant::{
    parse_hex_color, Participant, Participants, Personality, DEFAULT_COLOR_ONE, DEFAULT_COLOR_TWO,
};
use crate::render::ViewMode;
use crate::session::Mode;
use crate::stream::StreamingClientConfig;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    pub model: Option<String>,
    pub color: Option<String>,
    pub personality: Option<Personality>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub auto_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub mode: Mode,
    pub view: ViewMode,
    pub topic: Option<String>,
    /// Path to a `models.json` catalog.
    pub catalog: Option<PathBuf>,
    pub participant1: ParticipantConfig,
    pub participant2: ParticipantConfig,
    pub models: Vec<ModelEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            auto_delay_ms: 1000,
            connect_timeout_secs: 10,
            mode: Mode::Auto,
            view: ViewMode::Split,
            topic: None,
            catalog: None,
            participant1: ParticipantConfig::default(),
            participant2: ParticipantConfig::default(),
            models: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ChatError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, otherwise start from defaults, then apply flags.
    pub fn resolve(args: &Args) -> Result<Self, ChatError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(endpoint) = &args.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(ms) = args.auto_delay_ms {
            self.auto_delay_ms = ms;
        }
        if let Some(mode) = args.mode {
            self.mode = mode;
        }
        if let Some(view) = args.view {
            self.view = view;
        }
        if args.topic.is_some() {
            self.topic = args.topic.clone();
        }
        if args.catalog.is_some() {
            self.catalog = args.catalog.clone();
        }
        merge_participant(&mut self.participant1, &args.model1, &args.color1, args.personality1);
        merge_participant(&mut self.participant2, &args.model2, &args.color2, args.personality2);
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.endpoint.trim().is_empty() {
            return Err(ChatError::Config("endpoint must not be empty".to_string()));
        }
        for (label, p) in [("participant1", &self.participant1), ("participant2", &self.participant2)] {
            if let Some(color) = &p.color {
                if parse_hex_color(color).is_none() {
                    return Err(ChatError::Config(format!(
                        "{}: color must look like #rrggbb, got {}",
                        label, color
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn auto_delay(&self) -> Duration {
        Duration::from_millis(self.auto_delay_ms)
    }

    pub fn client_config(&self) -> StreamingClientConfig {
        StreamingClientConfig {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Catalog from the JSON file if configured, else `[[models]]`, else
    /// the built-in list.
    pub fn catalog(&self) -> Result<ModelCatalog, ChatError> {
        match &self.catalog {
            Some(path) => ModelCatalog::load(path),
            None => Ok(ModelCatalog::from_entries(self.models.clone())),
        }
    }

    /// Participant 1 defaults to the first catalog entry, participant 2 to
    /// the third.
    pub fn participants(&self, catalog: &ModelCatalog) -> Participants {
        Participants::new(
            build_participant(&self.participant1, catalog.default_model(0), DEFAULT_COLOR_ONE),
            build_participant(&self.participant2, catalog.default_model(2), DEFAULT_COLOR_TWO),
        )
    }
}

fn merge_participant(
    target: &mut ParticipantConfig,
    model: &Option<String>,
    color: &Option<String>,
    personality: Option<Personality>,
) {
    if model.is_some() {
        target.model = model.clone();
    }
    if color.is_some() {
        target.color = color.clone();
    }
    if personality.is_some() {
        target.personality = personality;
    }
}

fn build_participant(config: &ParticipantConfig, default_model: &str, default_color: &str) -> Participant {
    Participant::new(
        config.model.clone().unwrap_or_else(|| default_model.to_string()),
        config.color.clone().unwrap_or_else(|| default_color.to_string()),
    )
    .with_personality(config.personality.unwrap_or_default())
}
