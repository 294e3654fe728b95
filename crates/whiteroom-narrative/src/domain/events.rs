//! Narrative events: atomic happenings recorded on a timeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base reality impact of any input.
const BASE_REALITY_IMPACT: f64 = 0.1;

/// Additional impact per system effect produced by the input.
const IMPACT_PER_EFFECT: f64 = 0.2;

/// Additional impact when the input talks about reality itself.
const REALITY_WORD_IMPACT: f64 = 0.3;

/// Words that mark an input as reality-altering.
const REALITY_WORDS: [&str; 3] = ["reality", "world", "existence"];

/// Multiplier applied to the impact of an event whose past is rewritten.
pub const REWRITE_IMPACT_DAMPING: f64 = 0.8;

/// Kind of narrative event, derived from the raw player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Something a character does.
    Action,
    /// Something a character says.
    Dialogue,
    /// An instruction aimed at the game system.
    System,
    /// An attempt to reach through the fourth wall.
    Meta,
}

impl EventType {
    /// Classifies raw input. The first matching rule wins:
    ///
    /// 1. contains `/>`, `sudo` or `meta:` → [`EventType::Meta`]
    /// 2. wrapped in double quotes → [`EventType::Dialogue`]
    /// 3. contains `system:` or `>>` → [`EventType::System`]
    /// 4. otherwise → [`EventType::Action`]
    #[must_use]
    pub fn classify(input: &str) -> Self {
        if input.contains("/>") || input.contains("sudo") || input.contains("meta:") {
            Self::Meta
        } else if input.len() >= 2 && input.starts_with('"') && input.ends_with('"') {
            Self::Dialogue
        } else if input.contains("system:") || input.contains(">>") {
            Self::System
        } else {
            Self::Action
        }
    }

    /// The lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Dialogue => "dialogue",
            Self::System => "system",
            Self::Meta => "meta",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores how much an input changed the fictional world, in `[0.1, 1.0]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reality_impact(input: &str, effect_count: usize) -> f64 {
    let mut impact = BASE_REALITY_IMPACT + IMPACT_PER_EFFECT * effect_count as f64;
    if REALITY_WORDS.iter().any(|word| input.contains(word)) {
        impact += REALITY_WORD_IMPACT;
    }
    impact.min(1.0)
}

/// One atomic happening in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    /// Event identifier.
    pub id: String,
    /// Classified kind.
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Who caused the event.
    pub actor_id: String,
    /// What happened, as text.
    pub content: String,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// How much the event changed the world, in `[0, 1]`.
    pub reality_impact: f64,
}

impl NarrativeEvent {
    /// The `"{type}: {content}"` line kept in the recent-history cache.
    #[must_use]
    pub fn history_entry(&self) -> String {
        format!("{}: {}", self.kind, self.content)
    }

    /// Replaces the content of this event and dampens its impact.
    pub fn rewrite(&mut self, new_content: String) {
        self.content = new_content;
        self.reality_impact *= REWRITE_IMPACT_DAMPING;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classify_follows_priority_order() {
        assert_eq!(EventType::classify("\"hello\""), EventType::Dialogue);
        assert_eq!(EventType::classify("meta: test"), EventType::Meta);
        assert_eq!(EventType::classify("system: x"), EventType::System);
        assert_eq!(EventType::classify("I walk"), EventType::Action);
        assert_eq!(EventType::classify("<door />"), EventType::Meta);
        assert_eq!(EventType::classify("sudo open the door"), EventType::Meta);
        assert_eq!(EventType::classify("look >> north"), EventType::System);
    }

    #[test]
    fn test_classify_meta_outranks_dialogue_and_system() {
        assert_eq!(EventType::classify("\"sudo make me a sandwich\""), EventType::Meta);
        assert_eq!(EventType::classify("system: meta: both"), EventType::Meta);
        assert_eq!(EventType::classify("\"system: hi\""), EventType::Dialogue);
    }

    #[test]
    fn test_classify_single_quote_char_is_not_dialogue() {
        assert_eq!(EventType::classify("\""), EventType::Action);
        assert_eq!(EventType::classify("\"unfinished"), EventType::Action);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_reality_impact_base_is_exactly_one_tenth() {
        assert!((reality_impact("I walk forward", 0) - 0.1).abs() < f64::EPSILON);
        assert_eq!(reality_impact("I walk forward", 0), 0.1);
    }

    #[test]
    fn test_reality_impact_adds_effects_and_reality_words() {
        assert!((reality_impact("I walk", 1) - 0.3).abs() < 1e-9);
        assert!((reality_impact("the world shifts", 0) - 0.4).abs() < 1e-9);
        assert!((reality_impact("existence wavers", 2) - 0.8).abs() < 1e-9);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_reality_impact_is_clamped_to_one() {
        assert_eq!(reality_impact("reality", 10), 1.0);
        for effects in 0..8 {
            let impact = reality_impact("rewrite reality and existence", effects);
            assert!((0.1..=1.0).contains(&impact));
        }
    }

    #[test]
    fn test_rewrite_dampens_impact_and_history_entry_uses_type() {
        let mut event = NarrativeEvent {
            id: "event_1".to_owned(),
            kind: EventType::Dialogue,
            actor_id: "player-1".to_owned(),
            content: "\"Hello\"".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            reality_impact: 0.5,
        };
        assert_eq!(event.history_entry(), "dialogue: \"Hello\"");

        event.rewrite("\"Goodbye\"".to_owned());

        assert_eq!(event.content, "\"Goodbye\"");
        assert!((event.reality_impact - 0.4).abs() < 1e-12);
    }
}
