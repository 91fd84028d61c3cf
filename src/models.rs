//! Model alias table and resolution.
//!
//! Clients send OpenAI-style model names (`gpt-4`, `gpt-3.5-turbo`, ...).
//! NIM expects namespaced identifiers such as `meta/llama-3.1-70b-instruct`.
//! The alias table bridges the two and is fixed once the server starts.

use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Separator that marks a model name as already upstream-native.
pub const NAMESPACE_SEPARATOR: char = '/';

/// Alias whose mapping is used for absent or unknown model names.
pub const DEFAULT_ALIAS: &str = "gpt-3.5-turbo";

const DEFAULT_UPSTREAM_MODEL: &str = "meta/llama-3.1-8b-instruct";

const OWNER: &str = "nvidia-nim";

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    (DEFAULT_ALIAS, DEFAULT_UPSTREAM_MODEL),
    ("gpt-4", "meta/llama-3.1-70b-instruct"),
    ("gpt-4-turbo", "meta/llama-3.1-405b-instruct"),
    ("gpt-4o", "meta/llama-3.1-405b-instruct"),
    ("gpt-4o-mini", "meta/llama-3.1-8b-instruct"),
    ("claude-3-opus", "meta/llama-3.1-405b-instruct"),
    ("claude-3-sonnet", "meta/llama-3.1-70b-instruct"),
    ("claude-3-haiku", "meta/llama-3.1-8b-instruct"),
    ("gemini-pro", "google/gemma-2-27b-it"),
];

/// Immutable alias → upstream identifier mapping, shared across requests.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Arc<BTreeMap<String, String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AliasTable {
    /// The built-in aliases only.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN_ALIASES
            .iter()
            .map(|(alias, target)| ((*alias).to_string(), (*target).to_string()))
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Built-in aliases extended (or overridden) by configured entries.
    ///
    /// # Errors
    /// Returns `ProxyError::Config` if an alias is empty or a target is not a
    /// namespaced upstream identifier.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut entries: BTreeMap<String, String> = BUILTIN_ALIASES
            .iter()
            .map(|(alias, target)| ((*alias).to_string(), (*target).to_string()))
            .collect();

        for (alias, target) in overrides {
            if alias.trim().is_empty() {
                return Err(ProxyError::config("Model alias must not be empty"));
            }
            if !is_upstream_native(target) {
                return Err(ProxyError::config(format!(
                    "Model alias '{alias}' maps to '{target}', which is not a namespaced \
                     upstream identifier (expected e.g. 'meta/llama-3.1-8b-instruct')"
                )));
            }
            entries.insert(alias.clone(), target.clone());
        }

        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    /// Map a client model name onto an upstream identifier.
    ///
    /// Namespaced names pass through untouched; known aliases are mapped;
    /// anything else (including no name at all) gets the default model.
    #[must_use]
    pub fn resolve(&self, input: Option<&str>) -> String {
        match input {
            Some(name) if is_upstream_native(name) => name.to_string(),
            Some(name) if !name.is_empty() => self
                .get(name)
                .map_or_else(|| self.default_model().to_string(), str::to_string),
            _ => self.default_model().to_string(),
        }
    }

    #[must_use]
    pub fn default_model(&self) -> &str {
        self.get(DEFAULT_ALIAS).unwrap_or(DEFAULT_UPSTREAM_MODEL)
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synthesize the `/v1/models` listing, one entry per alias.
    #[must_use]
    pub fn model_list(&self, created: i64) -> ModelList {
        ModelList {
            object: "list".to_string(),
            data: self
                .aliases()
                .map(|alias| ModelObject {
                    id: alias.to_string(),
                    object: "model".to_string(),
                    created,
                    owned_by: OWNER.to_string(),
                })
                .collect(),
        }
    }
}

fn is_upstream_native(name: &str) -> bool {
    name.contains(NAMESPACE_SEPARATOR)
}

/// An OpenAI-compatible model descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// The body of a `/v1/models` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelObject>,
}
