//! Mute registry
//!
//! Scoped to one router instance. Essential personas (Bart, Blanca,
//! Hermes) are rejected with a user-visible message rather than an
//! error; unknown names likewise. The registry can therefore never
//! contain a protected persona.

use std::collections::HashSet;

use crate::agent::AgentName;

/// Per-router set of suppressed personas.
#[derive(Debug, Default, Clone)]
pub struct MuteRegistry {
    muted: HashSet<AgentName>,
}

impl MuteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute a persona by name. Returns the user-visible result line.
    pub fn mute(&mut self, name: &str) -> String {
        match name.parse::<AgentName>() {
            Ok(agent) if agent.is_essential() => format!(
                "{} can't be muted - essential to the bar.",
                agent.display_name()
            ),
            Ok(agent) => {
                self.muted.insert(agent);
                format!("{} muted.", agent.display_name())
            }
            Err(unknown) => unknown.to_string(),
        }
    }

    /// Unmute a persona by name. Removing an absent entry is a no-op.
    pub fn unmute(&mut self, name: &str) -> String {
        match name.parse::<AgentName>() {
            Ok(agent) => {
                self.muted.remove(&agent);
                format!("{} unmuted.", agent.display_name())
            }
            Err(unknown) => unknown.to_string(),
        }
    }

    pub fn is_muted(&self, agent: AgentName) -> bool {
        self.muted.contains(&agent)
    }

    /// Currently muted personas, in roster order.
    pub fn muted(&self) -> Vec<AgentName> {
        AgentName::all()
            .into_iter()
            .filter(|a| self.muted.contains(a))
            .collect()
    }

    /// Apply the substitution rule: a muted, unprotected persona is
    /// replaced by Bart.
    pub fn substitute(&self, agent: AgentName) -> AgentName {
        if self.is_muted(agent) && !agent.is_protected() {
            AgentName::Bart
        } else {
            agent
        }
    }
}
