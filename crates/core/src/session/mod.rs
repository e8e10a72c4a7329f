//! Multi-level play: the running total carried between rounds and the choices
//! offered on the result screen.

use serde::Serialize;

use crate::{
    engine::{RoundOutcome, RoundSummary},
    Result, RhythmError,
};

/// What the player can pick after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionChoice {
    Retry,
    NextLevel,
    SaveAndQuit,
}

impl SessionChoice {
    pub fn label(self) -> &'static str {
        match self {
            SessionChoice::Retry => "Retry Level",
            SessionChoice::NextLevel => "Next Level",
            SessionChoice::SaveAndQuit => "Save & Quit",
        }
    }
}

/// Score banked across the levels of one sitting.
///
/// A round's score only joins the total when the player moves on or quits.
/// Retrying a level throws the last attempt away.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    level: usize,
    level_count: usize,
    total: u32,
    last_round: Option<RoundSummary>,
}

impl Session {
    /// Starts at `first_level` (1-based) of a library holding `level_count` songs.
    pub fn new(first_level: usize, level_count: usize) -> Result<Self> {
        if first_level == 0 || first_level > level_count {
            return Err(RhythmError::UnknownLevel(first_level));
        }
        Ok(Self {
            level: first_level,
            level_count,
            total: 0,
            last_round: None,
        })
    }

    /// 1-based level currently being played.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Score already banked, excluding the last round.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Total shown on the result screen: banked score plus the last round.
    pub fn running_total(&self) -> u32 {
        self.total + self.last_score()
    }

    pub fn last_round(&self) -> Option<&RoundSummary> {
        self.last_round.as_ref()
    }

    /// Records the result of the round just played on the current level.
    pub fn record(&mut self, summary: RoundSummary) {
        tracing::info!(
            level = self.level,
            score = summary.score,
            total = self.total + summary.score,
            outcome = ?summary.outcome,
            "level result"
        );
        self.last_round = Some(summary);
    }

    /// Next level is only offered after a win, and never past the last level.
    pub fn can_advance(&self) -> bool {
        let won = self
            .last_round
            .as_ref()
            .is_some_and(|round| round.outcome == RoundOutcome::Won);
        won && self.level < self.level_count
    }

    /// Menu entries for the result screen, in display order.
    pub fn choices(&self) -> Vec<SessionChoice> {
        let mut choices = vec![SessionChoice::Retry];
        if self.can_advance() {
            choices.push(SessionChoice::NextLevel);
        }
        choices.push(SessionChoice::SaveAndQuit);
        choices
    }

    /// Drops the last round without banking it. Returns the level to replay.
    pub fn retry(&mut self) -> usize {
        self.last_round = None;
        self.level
    }

    /// Banks the last round and moves on. Returns the new level.
    pub fn next_level(&mut self) -> Result<usize> {
        if !self.can_advance() {
            return Err(RhythmError::msg(format!(
                "level {} was not cleared or is the last one",
                self.level
            )));
        }
        self.bank();
        self.level += 1;
        Ok(self.level)
    }

    /// Banks the last round and ends the session. Returns the score to record.
    pub fn finish(mut self) -> u32 {
        self.bank();
        tracing::info!(total = self.total, "session finished");
        self.total
    }

    fn last_score(&self) -> u32 {
        self.last_round.as_ref().map_or(0, |round| round.score)
    }

    fn bank(&mut self) {
        self.total += self.last_score();
        self.last_round = None;
    }
}
