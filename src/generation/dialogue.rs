//! Sliding dialogue window and bounded self-play

use rand::Rng;

use crate::intent::RollingHistory;

/// Recent `(speaker, text)` turns used to condition the next generation
#[derive(Debug, Clone)]
pub struct DialogueWindow {
    turns: RollingHistory<(String, String)>,
    separator: String,
}

impl DialogueWindow {
    /// Create a window holding at most `capacity` turns, joined by `separator`
    #[must_use]
    pub fn new(capacity: usize, separator: impl Into<String>) -> Self {
        Self {
            turns: RollingHistory::new(capacity),
            separator: separator.into(),
        }
    }

    /// Append a turn, evicting the oldest when full
    pub fn push(&mut self, speaker: impl Into<String>, text: impl Into<String>) {
        self.turns.push((speaker.into(), text.into()));
    }

    /// Turns from oldest to newest
    pub fn turns(&self) -> impl Iterator<Item = &(String, String)> {
        self.turns.iter()
    }

    /// Number of turns held
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if no turns are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Conditioning text prompting `next_speaker` to talk
    ///
    /// `"A hi | B hello | A "` for separator `" | "` and next speaker `A`.
    #[must_use]
    pub fn conditioning(&self, next_speaker: &str) -> String {
        let lines: Vec<String> = self
            .turns
            .iter()
            .map(|(speaker, text)| format!("{speaker} {text}"))
            .collect();
        format!(
            "{}{}{next_speaker} ",
            lines.join(&self.separator),
            self.separator
        )
    }
}

/// Probabilistic continuation of a conversation between two personas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfPlay {
    /// Chance of producing each additional turn
    pub continuation_probability: f64,

    /// Hard cap on additional turns
    pub max_turns: usize,
}

impl SelfPlay {
    /// Whether to produce another turn after `turns_so_far` extra turns
    ///
    /// A NaN probability never continues.
    pub fn continues<R: Rng + ?Sized>(&self, turns_so_far: usize, rng: &mut R) -> bool {
        if turns_so_far >= self.max_turns || self.continuation_probability.is_nan() {
            return false;
        }
        rng.gen_bool(self.continuation_probability.clamp(0.0, 1.0))
    }
}

/// Keep at most the last `max_chars` characters of `text`
#[must_use]
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    text.char_indices()
        .nth(skip)
        .map_or("", |(idx, _)| &text[idx..])
}
