//! Taproom Core - Multi-persona conversation routing for the bar
//!
//! This crate provides the routing core for a bar staffed by five personas:
//!
//! - **Agent**: The fixed persona roster (Bart, Bernie, JB, Blanca, Hermes) and turn attribution
//! - **Policy**: Pre-routing gates (house-rule violations, crisis language) and the mute registry
//! - **Session**: Conversation sessions with message counters, sticky persona, and pending handoffs
//! - **Memory**: Two-tier context assembly (hot turn log + cold archive slices) under a token budget
//! - **Handoff**: Detection of persona-to-persona handoff requests in replies
//! - **Prompt**: Builtin system prompts with TOML overrides
//! - **Invoke**: The injected seam to the language-model backend
//! - **Persistence**: SQLite storage for sessions, turns, and archive slices
//! - **Router**: The turn router that resolves each message to one attributed reply
//! - **Config**: Session limits, memory budgets, and reply settings
//!
//! # Architecture
//!
//! Every user message passes through [`TurnRouter::handle`], which runs a
//! fixed priority order: session gate, message limits, bar commands,
//! house rules, crisis, explicit selection, pending handoff, classifier,
//! stickiness. The first stage that claims the turn produces the reply.
//! Turns are immutable once recorded; finished sessions leave a bounded
//! excerpt behind that seeds future conversations with the same user.

pub mod agent;
pub mod config;
pub mod error;
pub mod handoff;
pub mod invoke;
pub mod memory;
pub mod persistence;
pub mod policy;
pub mod prompt;
pub mod router;
pub mod session;

pub use agent::{parse_selection, AgentName, Speaker};
pub use config::{ConfigError, LimitsConfig, MemoryConfig, TaproomConfig};
pub use error::{InvocationError, PersistenceError, PromptError, Result, TaproomError};
pub use handoff::{detect, strip_stage_directions, Handoff};
pub use invoke::{NullClassifier, PersonaInvoker, TurnClassifier};
pub use memory::{ArchivePosition, ContextRecord, MemoryAssembler};
pub use persistence::{Repository, Schema};
pub use policy::{is_crisis, scan, MuteRegistry, Violation};
pub use prompt::{PromptLibrary, PromptProvider};
pub use router::{TurnOutcome, TurnRequest, TurnRouter};
pub use session::{Session, SessionStatus, Turn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_route_and_substitution() {
        let mut mutes = MuteRegistry::new();
        mutes.mute("jb");

        // A muted regular is served by the bartender instead.
        assert_eq!(mutes.substitute(AgentName::Jb), AgentName::Bart);
        // Crisis support is never substituted away.
        assert_eq!(mutes.substitute(AgentName::Hermes), AgentName::Hermes);
    }

    #[test]
    fn test_policy_gates_compose() {
        // The violation gate fires before anything reads intent.
        assert!(scan("   ").is_some());
        // Crisis language in mixed case still matches.
        assert!(is_crisis("I Want To End My Life"));
    }
}
