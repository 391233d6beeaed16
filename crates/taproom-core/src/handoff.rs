//! Handoff detection
//!
//! A persona's reply may request that a different persona serve the
//! next turn, either through a stage-direction marker (`**Bernie**:`)
//! or through a recognized trigger phrase. Detection runs over the raw
//! reply; markers are routing signals and are stripped from the text
//! shown to the user.

use lazy_static::lazy_static;
use regex::Regex;

use crate::agent::AgentName;

lazy_static! {
    /// Marker anywhere in the (lowercased) reply, e.g. `**bernie**`.
    static ref MARKER: Regex = Regex::new(r"\*\*([a-z]+)\*\*").unwrap();
    /// Visible stage directions: `**Bernie**:` with optional trailing
    /// whitespace. Only capitalized single names, not emphasis.
    static ref STAGE_DIRECTION: Regex = Regex::new(r"\*\*([A-Z][a-zA-Z]*)\*\*:\s*").unwrap();
}

/// Result of handoff detection, tagged with the strategy that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// No handoff requested.
    None,
    /// A stage-direction marker named the persona.
    ExplicitMarker(AgentName),
    /// A trigger phrase matched.
    PhraseMatch(AgentName),
}

impl Handoff {
    /// The requested persona, if any.
    pub fn target(&self) -> Option<AgentName> {
        match self {
            Handoff::None => None,
            Handoff::ExplicitMarker(a) | Handoff::PhraseMatch(a) => Some(*a),
        }
    }
}

/// Trigger phrases per persona. Checked by substring containment
/// against the lowercased reply; sets are disjoint by persona name.
fn trigger_phrases(agent: AgentName) -> &'static [&'static str] {
    match agent {
        AgentName::Bernie => &[
            "let me get bernie",
            "i'll get bernie",
            "bernie should",
            "talk to bernie",
            "bernie can help",
            "bernie has a",
            "bernie?",
            "bernie's better",
            "asking for you",
        ],
        AgentName::Jb => &[
            "let me get jb",
            "i'll get jb",
            "jb should",
            "talk to jb",
            "jb can help",
            "jb?",
            "jb's better",
        ],
        AgentName::Hermes => &[
            "let me get hermes",
            "i'll get hermes",
            "hermes should",
            "talk to hermes",
            "hermes can help",
            "hermes?",
        ],
        AgentName::Blanca => &[
            "let me get blanca",
            "i'll get blanca",
            "blanca should",
            "talk to blanca",
            "blanca?",
        ],
        // Bart is the default route; personas never hand off to him
        // explicitly.
        AgentName::Bart => &[],
    }
}

/// Order in which phrase tables are consulted.
const PHRASE_ORDER: [AgentName; 4] = [
    AgentName::Bernie,
    AgentName::Jb,
    AgentName::Hermes,
    AgentName::Blanca,
];

/// Inspect a persona's raw reply for a handoff request.
///
/// The stage-direction strategy is checked first, then the phrase
/// tables in fixed order.
pub fn detect(reply: &str) -> Handoff {
    let lower = reply.to_lowercase();

    if let Some(caps) = MARKER.captures(&lower) {
        if let Ok(agent) = caps[1].parse::<AgentName>() {
            if agent != AgentName::Bart {
                return Handoff::ExplicitMarker(agent);
            }
        }
    }

    for agent in PHRASE_ORDER {
        if trigger_phrases(agent).iter().any(|p| lower.contains(p)) {
            return Handoff::PhraseMatch(agent);
        }
    }

    Handoff::None
}

/// Remove stage-direction markers from the reply shown to the user.
///
/// Deliberately narrower than detection: a bare `**name**` marker
/// routes but stays visible; only the `**Name**:` form is removed.
pub fn strip_stage_directions(text: &str) -> String {
    STAGE_DIRECTION.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detection() {
        assert_eq!(
            detect("**Bernie**: someone here is asking about their father."),
            Handoff::ExplicitMarker(AgentName::Bernie)
        );
        assert_eq!(
            detect("quiet night. **JB** might disagree."),
            Handoff::ExplicitMarker(AgentName::Jb)
        );
    }

    #[test]
    fn test_phrase_detection() {
        assert_eq!(
            detect("That's above my pay grade. Let me get Bernie."),
            Handoff::PhraseMatch(AgentName::Bernie)
        );
        assert_eq!(
            detect("Hermes can help with that."),
            Handoff::PhraseMatch(AgentName::Hermes)
        );
        assert_eq!(
            detect("You should talk to Blanca about the rules."),
            Handoff::PhraseMatch(AgentName::Blanca)
        );
    }

    #[test]
    fn test_marker_beats_phrase() {
        // Both strategies would match; the marker wins and is tagged
        // accordingly.
        assert_eq!(
            detect("**JB**: talk to bernie later"),
            Handoff::ExplicitMarker(AgentName::Jb)
        );
    }

    #[test]
    fn test_question_form() {
        assert_eq!(detect("Bernie? Got a minute?"), Handoff::PhraseMatch(AgentName::Bernie));
    }

    #[test]
    fn test_no_handoff() {
        assert_eq!(detect("Alright. I heard you."), Handoff::None);
        assert!(detect("Alright. I heard you.").target().is_none());
    }

    #[test]
    fn test_unknown_marker_ignored() {
        assert_eq!(detect("**Narrator**: nothing happened"), Handoff::None);
    }

    #[test]
    fn test_strip_stage_directions() {
        assert_eq!(
            strip_stage_directions("**Bernie**: pull up a chair."),
            "pull up a chair."
        );
        // Emphasis without the trailing colon is conversational
        // content, not a marker.
        assert_eq!(
            strip_stage_directions("that was **really** something"),
            "that was **really** something"
        );
    }
}
