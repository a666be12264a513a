use serde::{Deserialize, Serialize};

use crate::error::MalformedInputError;
use crate::transcript::{CharacterStream, WordCue};

/// Combined length (trimmed buffer plus merged characters) up to which a
/// space is kept inside the current cue instead of ending it.
pub const DEFAULT_MERGE_THRESHOLD: usize = 8;

const WORD_SEPARATOR: &str = " ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorConfig {
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

fn default_merge_threshold() -> usize {
    DEFAULT_MERGE_THRESHOLD
}

/// Groups a per-character transcript into word-level caption cues.
///
/// Short tokens are merged into one cue until the running length passes
/// `merge_threshold`, so captions do not flash one tiny word at a time.
/// Each cue is stamped with the timestamp found at the middle index of the
/// timestamps collected for it. The first character of every cue contributes
/// its timestamp twice (once as the start anchor, once as a character), which
/// pulls the middle index one slot towards the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordAggregator {
    config: AggregatorConfig,
}

impl WordAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Aggregates raw, unvalidated sequences. Fails without partial output when
    /// the two sequences have different lengths.
    pub fn aggregate<S: AsRef<str>>(
        &self,
        characters: &[S],
        timestamps: &[f64],
    ) -> Result<Vec<WordCue>, MalformedInputError> {
        if characters.len() != timestamps.len() {
            return Err(MalformedInputError::length_mismatch(
                characters.len(),
                timestamps.len(),
            ));
        }
        Ok(self.aggregate_aligned(characters, timestamps))
    }

    pub fn aggregate_stream(&self, stream: &CharacterStream) -> Vec<WordCue> {
        self.aggregate_aligned(stream.characters(), stream.timestamps())
    }

    fn aggregate_aligned<S: AsRef<str>>(
        &self,
        characters: &[S],
        timestamps: &[f64],
    ) -> Vec<WordCue> {
        let mut cues = Vec::new();
        let mut word = PendingWord::default();

        for (character, &timestamp) in characters.iter().zip(timestamps) {
            let character = character.as_ref();
            if character != WORD_SEPARATOR {
                word.push(character, timestamp);
                continue;
            }

            if word.is_empty() {
                continue;
            }

            if word.trimmed_len() + word.merged_len <= self.config.merge_threshold {
                word.text.push(' ');
            } else {
                cues.extend(word.close());
            }
        }

        cues.extend(word.close());
        cues
    }
}

/// Aggregates with the default configuration.
pub fn aggregate<S: AsRef<str>>(
    characters: &[S],
    timestamps: &[f64],
) -> Result<Vec<WordCue>, MalformedInputError> {
    WordAggregator::default().aggregate(characters, timestamps)
}

#[derive(Debug, Default)]
struct PendingWord {
    text: String,
    timestamps: Vec<f64>,
    // Non-space characters merged since the last close; not reset by internal spaces.
    merged_len: usize,
}

impl PendingWord {
    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    fn push(&mut self, character: &str, timestamp: f64) {
        if self.text.is_empty() {
            self.timestamps.push(timestamp);
        }
        self.text.push_str(character);
        self.timestamps.push(timestamp);
        self.merged_len += 1;
    }

    /// Emits the pending cue and resets the buffer.
    fn close(&mut self) -> Option<WordCue> {
        let word = std::mem::take(self);
        let text = word.text.trim();
        if text.is_empty() {
            return None;
        }
        let start_in_seconds = word.timestamps.get(word.timestamps.len() / 2).copied()?;
        Some(WordCue {
            text: text.to_owned(),
            start_in_seconds,
        })
    }
}
