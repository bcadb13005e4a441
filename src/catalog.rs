//! Model catalog: model id → display name.
//!
//! The catalog is only consulted for labels. Unknown ids are allowed and are
//! displayed as-is.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ChatError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
}

impl ModelEntry {
    fn new(id: &str, name: &str) -> Self {
        ModelEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

static BUILTIN_MODELS: Lazy<Vec<ModelEntry>> = Lazy::new(|| {
    vec![
        ModelEntry::new("openai/gpt-4o-mini", "GPT-4o mini"),
        ModelEntry::new("openai/gpt-4o", "GPT-4o"),
        ModelEntry::new("anthropic/claude-3.5-haiku", "Claude 3.5 Haiku"),
        ModelEntry::new("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet"),
        ModelEntry::new("google/gemini-2.0-flash-001", "Gemini 2.0 Flash"),
        ModelEntry::new("meta-llama/llama-3.3-70b-instruct", "Llama 3.3 70B"),
        ModelEntry::new("mistralai/mistral-small-24b-instruct-2501", "Mistral Small 3"),
        ModelEntry::new("deepseek/deepseek-chat", "DeepSeek V3"),
    ]
});

/// Shape of a `models.json` file: `{"models": [{"id": .., "name": ..}]}`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelEntry>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        ModelCatalog {
            models: BUILTIN_MODELS.clone(),
        }
    }

    /// An empty list falls back to the built-in catalog.
    pub fn from_entries(models: Vec<ModelEntry>) -> Self {
        if models.is_empty() {
            Self::builtin()
        } else {
            ModelCatalog { models }
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChatError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.models.is_empty() {
            return Err(ChatError::Config("model catalog is empty".to_string()));
        }
        Ok(ModelCatalog {
            models: file.models,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    /// Display name for `id`, or the id itself when it is not listed.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.models
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.as_str())
            .unwrap_or(id)
    }

    /// Model id at `index`, clamped to the last entry.
    pub fn default_model(&self, index: usize) -> &str {
        let last = self.models.len().saturating_sub(1);
        self.models
            .get(index.min(last))
            .map(|m| m.id.as_str())
            .unwrap_or_default()
    }
}
