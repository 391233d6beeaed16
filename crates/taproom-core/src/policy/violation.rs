//! House-rule violation scanner
//!
//! Pure pre-routing gate over raw user text. A violation short-circuits
//! routing entirely: the warning is attributed to Blanca and no persona
//! is invoked.

/// Fraction of uppercase letters (among alphabetic characters) above
/// which a message counts as shouting.
const SHOUTING_RATIO: f64 = 0.70;

/// Messages at or below this length are never flagged as shouting.
const SHOUTING_MIN_LEN: usize = 10;

/// A detected house-rule violation, carrying its warning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Excessive caps.
    Shouting,
    /// Empty or whitespace-only input.
    Empty,
}

impl Violation {
    /// The warning returned to the user, in Blanca's voice.
    pub fn warning(&self) -> &'static str {
        match self {
            Violation::Shouting => "Lower your voice. This is a bar, not a stadium.",
            Violation::Empty => "Speak or pass. Don't waste the table's time.",
        }
    }
}

/// Scan raw user text for violations. First match wins.
pub fn scan(text: &str) -> Option<Violation> {
    if text.len() > SHOUTING_MIN_LEN {
        let total_letters = text.chars().filter(|c| c.is_alphabetic()).count();
        let caps = text.chars().filter(|c| c.is_uppercase()).count();
        if total_letters > 0 && caps as f64 / total_letters as f64 > SHOUTING_RATIO {
            return Some(Violation::Shouting);
        }
    }

    if text.trim().is_empty() {
        return Some(Violation::Empty);
    }

    None
}
