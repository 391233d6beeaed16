//! Persona enumeration and turn attribution
//!
//! The bar staffs a fixed roster of five personas. Routing decisions,
//! mute policy, and turn attribution are all keyed on [`AgentName`];
//! [`Speaker`] extends the roster with the user side of a turn and the
//! `system` pseudo-agent used for policy acknowledgements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of personas.
///
/// `Blanca` and `Hermes` are protected: they can never be muted and the
/// mute substitution rule never applies to them. `Bart` is the default
/// and the substitute for muted personas, so he cannot be muted either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentName {
    /// The bartender - default persona and mute substitute.
    Bart,
    /// The house therapist. Mutable.
    Bernie,
    /// The regular at the end of the bar. Mutable.
    Jb,
    /// The moderator - handles rule violations.
    Blanca,
    /// Crisis support - always reachable.
    Hermes,
}

impl AgentName {
    /// All personas, in roster order.
    pub fn all() -> [AgentName; 5] {
        [
            AgentName::Bart,
            AgentName::Bernie,
            AgentName::Jb,
            AgentName::Blanca,
            AgentName::Hermes,
        ]
    }

    /// Lowercase wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Bart => "bart",
            AgentName::Bernie => "bernie",
            AgentName::Jb => "jb",
            AgentName::Blanca => "blanca",
            AgentName::Hermes => "hermes",
        }
    }

    /// Human-readable display name, used when rendering context lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentName::Bart => "Bart",
            AgentName::Bernie => "Bernie",
            AgentName::Jb => "JB",
            AgentName::Blanca => "Blanca",
            AgentName::Hermes => "Hermes",
        }
    }

    /// Essential personas cannot be muted at all.
    pub fn is_essential(&self) -> bool {
        matches!(self, AgentName::Bart | AgentName::Blanca | AgentName::Hermes)
    }

    /// Protected personas are exempt from the mute substitution rule.
    pub fn is_protected(&self) -> bool {
        matches!(self, AgentName::Blanca | AgentName::Hermes)
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bart" => Ok(AgentName::Bart),
            "bernie" => Ok(AgentName::Bernie),
            "jb" => Ok(AgentName::Jb),
            "blanca" => Ok(AgentName::Blanca),
            "hermes" => Ok(AgentName::Hermes),
            _ => Err(UnknownAgent(s.trim().to_string())),
        }
    }
}

/// Returned when a name does not match any persona.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown agent: {0}")]
pub struct UnknownAgent(pub String);

/// Who produced one side of a recorded turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The human user.
    User,
    /// Policy replies (mute/unmute acknowledgements).
    System,
    /// One of the personas.
    Agent(AgentName),
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::System => "system",
            Speaker::Agent(a) => a.as_str(),
        }
    }

    /// Display name for context rendering ("User" for the user side).
    pub fn display_name(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::System => "System",
            Speaker::Agent(a) => a.display_name(),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Speaker::User)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Speaker {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Speaker::User),
            "system" => Ok(Speaker::System),
            other => other.parse::<AgentName>().map(Speaker::Agent),
        }
    }
}

/// Recognize an explicit persona selection at the start of the text.
///
/// Returns the selected persona and the text with the prefix stripped.
/// If nothing but the prefix was supplied, the original text is kept so
/// the persona still has something to respond to.
pub fn parse_selection(text: &str) -> Option<(AgentName, String)> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    for agent in AgentName::all() {
        let name = agent.as_str();
        if !lower.starts_with(name) {
            continue;
        }
        // Require a delimiter (or end of text) after the name so that
        // e.g. "bernard" does not select bernie.
        let rest = &trimmed[name.len()..];
        if !rest.is_empty() && !rest.starts_with([':', ',', ' ']) {
            continue;
        }
        let stripped = rest.trim_start_matches([':', ',', ' ']).to_string();
        if stripped.is_empty() {
            return Some((agent, trimmed.to_string()));
        }
        return Some((agent, stripped));
    }

    None
}
