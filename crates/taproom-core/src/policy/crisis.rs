//! Crisis-language detection
//!
//! A positive match always routes to Hermes, overriding explicit
//! selection, stickiness, and mute state.

/// Phrases that indicate self-harm or harm-to-others language.
const CRISIS_PATTERNS: &[&str] = &[
    "kill myself",
    "kill my",
    "end it all",
    "suicide",
    "want to die",
    "end my life",
    "hurt myself",
    "self harm",
    "cut myself",
    "hurting someone",
    "kill someone",
    "hurt someone",
    "hurt my",
    "hurting my",
    "hurting them",
    "hurt them",
    "murder",
    "going to hurt",
];

/// Exact phrases that suppress a match even though a general keyword
/// would otherwise fire.
const FALSE_POSITIVE_PHRASES: &[&str] = &["suicide mission"];

/// Check raw user text for crisis language.
pub fn is_crisis(text: &str) -> bool {
    let clean = text.to_lowercase();

    if FALSE_POSITIVE_PHRASES.iter().any(|p| clean.contains(p)) {
        return false;
    }

    CRISIS_PATTERNS.iter().any(|p| clean.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_harm_language() {
        assert!(is_crisis("I want to kill myself"));
        assert!(is_crisis("i just want to die"));
        assert!(is_crisis("thinking about self harm again"));
    }

    #[test]
    fn test_harm_to_others_language() {
        assert!(is_crisis("I'm going to hurt someone tonight"));
        assert!(is_crisis("I could murder him"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_crisis("I WANT TO END MY LIFE"));
    }

    #[test]
    fn test_suicide_mission_carve_out() {
        assert!(!is_crisis("it was a suicide mission"));
        assert!(!is_crisis("That whole project felt like a SUICIDE MISSION."));
    }

    #[test]
    fn test_carve_out_does_not_leak() {
        // "suicide" alone still matches.
        assert!(is_crisis("she mentioned suicide yesterday"));
    }

    #[test]
    fn test_ordinary_text() {
        assert!(!is_crisis("rough day at work, pour me one"));
        assert!(!is_crisis("my feet are killing me"));
    }
}
