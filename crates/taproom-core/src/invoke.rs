//! External model seam
//!
//! The router never talks to a language model directly. It goes through
//! [`PersonaInvoker`], an opaque, fallible call whose failures are
//! recovered locally (fallback reply), and optionally through
//! [`TurnClassifier`] for the stickiness auto-routing step.

use crate::agent::AgentName;
use crate::error::InvocationError;

/// Opaque delegate call to the language-model backend.
///
/// Implementations are expected to apply their own bounded timeout and
/// report it as [`InvocationError::Timeout`]; the router treats a
/// timeout identically to any other backend failure.
pub trait PersonaInvoker {
    fn invoke(
        &self,
        agent: AgentName,
        system_prompt: &str,
        user_text: &str,
        max_tokens: u32,
    ) -> Result<String, InvocationError>;
}

/// Lightweight secondary classification for the stickiness step.
///
/// Consulted only when no policy, handoff, or explicit selection has
/// already picked a persona. Returning `None` keeps the conversation
/// with the previously active persona.
pub trait TurnClassifier {
    fn classify(&self, text: &str) -> Option<AgentName>;
}

/// Classifier that never reroutes: the previous persona always keeps
/// the turn.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClassifier;

impl TurnClassifier for NullClassifier {
    fn classify(&self, _text: &str) -> Option<AgentName> {
        None
    }
}
