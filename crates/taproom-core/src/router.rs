//! Turn router
//!
//! One entry point, [`TurnRouter::handle`], takes a user message and
//! resolves it to exactly one attributed reply. Checks run in a fixed
//! priority order: session gate, limits, house rules, bar commands,
//! crisis, explicit selection, pending handoff, classifier, stickiness.
//! The first stage that claims the turn produces the reply; everything
//! after it is skipped.

use tracing::{debug, info, warn};

use crate::agent::{parse_selection, AgentName, Speaker};
use crate::config::TaproomConfig;
use crate::error::{Result, TaproomError};
use crate::handoff;
use crate::invoke::{NullClassifier, PersonaInvoker, TurnClassifier};
use crate::memory::MemoryAssembler;
use crate::persistence::Repository;
use crate::policy::{is_crisis, scan, MuteRegistry};
use crate::prompt::PromptProvider;
use crate::session::{Session, SessionStatus, Turn};

/// Reply used when a persona invocation or context assembly fails.
const FALLBACK_REPLY: &str = "Something broke. Cleaner needs the room.";

/// Prepended to the reply that lands on the last-call threshold.
const LAST_CALL: &str = "Last call! Five messages remaining.";

/// One incoming user message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub session_id: String,
    pub text: String,
    /// Structured persona selection; takes precedence over a name
    /// prefix in the text.
    pub selected_agent: Option<AgentName>,
}

impl TurnRequest {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            text: text.into(),
            selected_agent: None,
        }
    }

    pub fn with_selection(mut self, agent: AgentName) -> Self {
        self.selected_agent = Some(agent);
        self
    }
}

/// The resolved result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Who the reply is attributed to.
    pub speaker: Speaker,
    pub reply: String,
    pub session_status: SessionStatus,
    pub message_count: u32,
}

/// Why a persona was picked, for the routing log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteReason {
    Crisis,
    Selected,
    Handoff,
    Classified,
    Sticky,
    Default,
}

/// Routes turns for one deployment of the bar.
///
/// Owns the repository and the mute registry; the prompt source, the
/// model backend, and the optional classifier are injected.
pub struct TurnRouter {
    repo: Repository,
    prompts: Box<dyn PromptProvider>,
    invoker: Box<dyn PersonaInvoker>,
    classifier: Box<dyn TurnClassifier>,
    mutes: MuteRegistry,
    assembler: MemoryAssembler,
    config: TaproomConfig,
}

impl TurnRouter {
    pub fn new(
        repo: Repository,
        prompts: Box<dyn PromptProvider>,
        invoker: Box<dyn PersonaInvoker>,
        config: TaproomConfig,
    ) -> Self {
        let assembler = MemoryAssembler::new(
            config.memory.max_cold_sessions,
            config.memory.context_max_tokens,
        );
        Self {
            repo,
            prompts,
            invoker,
            classifier: Box::new(NullClassifier),
            mutes: MuteRegistry::new(),
            assembler,
            config,
        }
    }

    /// Install a secondary classifier for the stickiness step.
    pub fn with_classifier(mut self, classifier: Box<dyn TurnClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Open a new session for a user.
    pub fn start_session(&self, user_id: &str, weather_snapshot: Option<String>) -> Result<Session> {
        let session = self.repo.create_session(user_id, weather_snapshot)?;
        info!(session_id = %session.id, user_id, "session started");
        Ok(session)
    }

    /// Close a session normally, archiving its excerpt.
    pub fn end_session(&mut self, session_id: &str) -> Result<()> {
        info!(session_id, "session completed");
        self.repo.close_session(session_id, SessionStatus::Completed)
    }

    /// Look up a session by ID.
    pub fn session(&self, session_id: &str) -> Result<Option<Session>> {
        self.repo.get_session(session_id)
    }

    /// Mute a persona. Returns the user-visible result line.
    pub fn mute(&mut self, name: &str) -> String {
        self.mutes.mute(name)
    }

    /// Unmute a persona. Returns the user-visible result line.
    pub fn unmute(&mut self, name: &str) -> String {
        self.mutes.unmute(name)
    }

    /// Currently muted personas.
    pub fn muted_agents(&self) -> Vec<AgentName> {
        self.mutes.muted()
    }

    /// Route one user message to one attributed reply.
    pub fn handle(&mut self, request: TurnRequest) -> Result<TurnOutcome> {
        let mut session = self
            .repo
            .get_session(&request.session_id)?
            .ok_or_else(|| TaproomError::SessionNotFound(request.session_id.clone()))?;

        if session.status.is_terminal() {
            return Err(TaproomError::SessionClosed {
                status: session.status,
            });
        }

        if session.message_count >= self.config.limits.message_limit {
            info!(session_id = %session.id, "message limit reached, ending session");
            self.repo.close_session(&session.id, SessionStatus::Ended)?;
            return Err(TaproomError::LimitReached);
        }

        // House rules short-circuit routing; the warning comes from the
        // moderator and no persona is invoked. A shouted command is
        // still shouting.
        if let Some(violation) = scan(&request.text) {
            debug!(session_id = %session.id, ?violation, "house rule violation");
            return self.record_reply(
                &mut session,
                &request.text,
                Speaker::Agent(AgentName::Blanca),
                violation.warning().to_string(),
            );
        }

        // Bar commands are acknowledged by the house, not a persona.
        if let Some(reply) = self.try_command(&request.text) {
            return self.record_reply(&mut session, &request.text, Speaker::System, reply);
        }

        // Crisis overrides every routing preference, including mutes
        // and explicit selection. A pending handoff survives for later.
        if is_crisis(&request.text) {
            debug!(session_id = %session.id, "crisis detected, routing to hermes");
            return self.invoke_and_record(
                &mut session,
                AgentName::Hermes,
                RouteReason::Crisis,
                &request.text,
                &request.text,
            );
        }

        let (agent, reason, invoke_text) = self.resolve_route(&mut session, &request);
        self.invoke_and_record(&mut session, agent, reason, &invoke_text, &request.text)
    }

    /// Pick the persona for a non-policy turn. Clears any pending
    /// handoff: either it is honored now or an explicit selection
    /// overrode it.
    fn resolve_route(
        &self,
        session: &mut Session,
        request: &TurnRequest,
    ) -> (AgentName, RouteReason, String) {
        let pending = session.pending_handoff.take();

        if let Some(selected) = request.selected_agent {
            return (
                self.mutes.substitute(selected),
                RouteReason::Selected,
                request.text.clone(),
            );
        }

        if let Some((selected, stripped)) = parse_selection(&request.text) {
            return (self.mutes.substitute(selected), RouteReason::Selected, stripped);
        }

        if let Some(target) = pending {
            return (
                self.mutes.substitute(target),
                RouteReason::Handoff,
                request.text.clone(),
            );
        }

        if let Some(classified) = self.classifier.classify(&request.text) {
            return (
                self.mutes.substitute(classified),
                RouteReason::Classified,
                request.text.clone(),
            );
        }

        match session.current_agent {
            Some(current) => (self.mutes.substitute(current), RouteReason::Sticky, request.text.clone()),
            None => (AgentName::Bart, RouteReason::Default, request.text.clone()),
        }
    }

    /// Invoke a persona with assembled context and record the outcome.
    ///
    /// Invocation and context-assembly failures degrade to the fallback
    /// reply; only a failure to record the turn is a hard error.
    fn invoke_and_record(
        &mut self,
        session: &mut Session,
        agent: AgentName,
        reason: RouteReason,
        invoke_text: &str,
        raw_text: &str,
    ) -> Result<TurnOutcome> {
        debug!(session_id = %session.id, agent = %agent, ?reason, "routing turn");

        let context = match self
            .assembler
            .assemble(&self.repo, &session.user_id, &session.id)
        {
            Ok(context) => context,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "context assembly failed");
                return self.record_fallback(session, raw_text);
            }
        };

        let prompt = match self.prompts.system_prompt(agent) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(session_id = %session.id, agent = %agent, error = %e, "no system prompt");
                return self.record_fallback(session, raw_text);
            }
        };

        let full_prompt = if context.is_empty() {
            prompt
        } else {
            format!("{context}\n\n{prompt}")
        };

        let raw_reply = match self.invoker.invoke(
            agent,
            &full_prompt,
            invoke_text,
            self.config.reply_max_tokens,
        ) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %session.id, agent = %agent, error = %e, "invocation failed");
                return self.record_fallback(session, raw_text);
            }
        };

        // Detection runs on the raw reply; the visible text has stage
        // directions stripped. A handoff to a muted persona is dropped
        // rather than silently redirected.
        let detected = handoff::detect(&raw_reply);
        if let Some(target) = detected.target() {
            if self.mutes.is_muted(target) {
                debug!(session_id = %session.id, target = %target, "handoff to muted persona dropped");
            } else {
                debug!(session_id = %session.id, target = %target, "handoff pending");
                session.pending_handoff = Some(target);
            }
        }

        let visible = handoff::strip_stage_directions(&raw_reply);
        session.current_agent = Some(agent);
        self.record_reply(session, raw_text, Speaker::Agent(agent), visible)
    }

    /// Attribute the standard fallback line to the moderator. The
    /// sticky persona is left untouched so the conversation resumes
    /// where it was.
    fn record_fallback(&mut self, session: &mut Session, raw_text: &str) -> Result<TurnOutcome> {
        self.record_reply(
            session,
            raw_text,
            Speaker::Agent(AgentName::Blanca),
            FALLBACK_REPLY.to_string(),
        )
    }

    /// Count the turn, apply the last-call threshold, and persist the
    /// turn together with the session mutation.
    fn record_reply(
        &mut self,
        session: &mut Session,
        user_text: &str,
        speaker: Speaker,
        mut reply: String,
    ) -> Result<TurnOutcome> {
        session.message_count += 1;

        // The Warning status doubles as the delivered-once flag: if the
        // threshold turn itself was a system acknowledgement, the
        // warning is deferred to the next persona turn instead of lost.
        if !matches!(speaker, Speaker::System)
            && session.message_count >= self.config.limits.last_call_at
            && session.status != SessionStatus::Warning
        {
            info!(session_id = %session.id, "last call threshold reached");
            reply = format!("{LAST_CALL}\n\n{reply}");
            session.status = SessionStatus::Warning;
        }

        let turn = Turn::new(&session.id, &session.user_id, speaker, user_text, &reply);
        self.repo.record_turn(&turn, session)?;

        Ok(TurnOutcome {
            speaker,
            reply,
            session_status: session.status,
            message_count: session.message_count,
        })
    }

    /// Recognize mute commands: `mute <name>` and `unmute <name>`.
    fn try_command(&mut self, text: &str) -> Option<String> {
        let lower = text.trim().to_lowercase();
        if let Some(name) = lower.strip_prefix("unmute ") {
            return Some(self.mutes.unmute(name.trim()));
        }
        if let Some(name) = lower.strip_prefix("mute ") {
            return Some(self.mutes.mute(name.trim()));
        }
        None
    }
}
