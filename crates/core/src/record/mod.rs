use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Entries kept on the board.
pub const MAX_ENTRIES: usize = 6;
const NAME_LEN: usize = 3;

/// One line of the high-score board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

impl ScoreEntry {
    pub fn new(name: &str, score: u32) -> Self {
        Self {
            name: normalize_name(name),
            score,
        }
    }
}

/// Fixed-capacity board, always sorted from best to worst.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreTable {
    entries: Vec<ScoreEntry>,
}

impl Default for HighScoreTable {
    fn default() -> Self {
        Self {
            entries: vec![ScoreEntry::new("AAA", 0); MAX_ENTRIES],
        }
    }
}

impl HighScoreTable {
    /// Loads a board from disk, starting a fresh one when the file is missing.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(?path, "no score table yet, starting fresh");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut table: Self = serde_json::from_str(&raw)?;
        table.normalize();
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn get_high_scores(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// Inserts a score and trims the board. Returns the 0-based rank it
    /// landed at, or `None` if it did not make the cut.
    pub fn add_score(&mut self, name: &str, score: u32) -> Option<usize> {
        let entry = ScoreEntry::new(name, score);
        // Ties keep the older entry ahead.
        let rank = self.entries.partition_point(|existing| existing.score >= score);
        if rank >= MAX_ENTRIES {
            return None;
        }
        self.entries.insert(rank, entry);
        self.entries.truncate(MAX_ENTRIES);
        Some(rank)
    }

    /// Whether `score` would make it onto the board.
    pub fn qualifies(&self, score: u32) -> bool {
        self.entries.len() < MAX_ENTRIES
            || self.entries.last().map_or(true, |last| score > last.score)
    }

    fn normalize(&mut self) {
        for entry in &mut self.entries {
            entry.name = normalize_name(&entry.name);
        }
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_ENTRIES);
    }
}

/// Three uppercase ASCII letters, padded with `A`.
fn normalize_name(name: &str) -> String {
    let mut normalized: String = name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(NAME_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while normalized.len() < NAME_LEN {
        normalized.push('A');
    }
    normalized
}
