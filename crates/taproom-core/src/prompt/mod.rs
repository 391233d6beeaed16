//! Prompt provider
//!
//! Each persona has a system prompt. Builtin prompts are compiled in;
//! a TOML file can override any of them:
//!
//! ```toml
//! [bart]
//! system_prompt = """
//! You are Bart, the bartender...
//! """
//! ```
//!
//! The standard override location is `~/.taproom/prompts.toml`. The
//! router treats prompts as opaque text; any environmental enrichment
//! (weather, tides, bar knowledge) happens upstream.

mod builtin;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::agent::AgentName;
use crate::error::PromptError;

pub use builtin::builtin_prompts;

/// Source of a persona's system prompt.
pub trait PromptProvider {
    fn system_prompt(&self, agent: AgentName) -> Result<String, PromptError>;
}

/// In-memory prompt table with builtin defaults and TOML overrides.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<AgentName, String>,
}

#[derive(Debug, Deserialize)]
struct PromptEntry {
    system_prompt: String,
}

impl PromptLibrary {
    /// Library with only the builtin prompts.
    pub fn with_builtins() -> Self {
        Self {
            prompts: builtin_prompts(),
        }
    }

    /// Builtins plus overrides from the standard per-user location, if
    /// the file exists.
    pub fn load_standard() -> Result<Self, PromptError> {
        let mut library = Self::with_builtins();
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".taproom").join("prompts.toml");
            if path.exists() {
                library.load_overrides(&path)?;
            }
        }
        Ok(library)
    }

    /// Builtins plus overrides from a specific TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, PromptError> {
        let mut library = Self::with_builtins();
        library.load_overrides(path)?;
        Ok(library)
    }

    fn load_overrides(&mut self, path: &Path) -> Result<(), PromptError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PromptError::Io(e.to_string()))?;
        let entries: HashMap<String, PromptEntry> =
            toml::from_str(&content).map_err(|e| PromptError::Parse(e.to_string()))?;

        for (name, entry) in entries {
            // Unknown section names are ignored rather than fatal, so a
            // prompts file can carry sections for other tools.
            if let Ok(agent) = name.parse::<AgentName>() {
                self.prompts.insert(agent, entry.system_prompt);
            }
        }
        Ok(())
    }

    /// Replace one persona's prompt programmatically.
    pub fn set(&mut self, agent: AgentName, prompt: impl Into<String>) {
        self.prompts.insert(agent, prompt.into());
    }
}

impl PromptProvider for PromptLibrary {
    fn system_prompt(&self, agent: AgentName) -> Result<String, PromptError> {
        self.prompts
            .get(&agent)
            .cloned()
            .ok_or_else(|| PromptError::Missing(agent.as_str().to_string()))
    }
}
