//! Matching player input against the active node and scoring the result.

use serde::Serialize;

use crate::{
    chart::Action,
    config::{DifficultyProfile, EngineConfig},
    engine::RunState,
    timeline::{HitStatus, Timeline},
};

/// Quality of a matched move. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Judgment {
    Perfect,
    Good,
}

impl Judgment {
    pub fn label(self) -> &'static str {
        match self {
            Judgment::Perfect => "PERFECT",
            Judgment::Good => "GOOD",
        }
    }
}

/// Events produced by a tick, for the display collaborator to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Feedback {
    /// A node was fully resolved.
    Hit {
        node: usize,
        judgment: Judgment,
        combo: u32,
        points: f64,
    },
    /// One member of a chord was matched; `remaining` moves are still due.
    ChordProgress { node: usize, remaining: usize },
    Miss { node: usize },
    Won,
    Failed,
}

/// What the judge did with one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Nothing to match against, or the press fell outside the window.
    Ignored,
    /// The action is not one of the active node's outstanding moves.
    WrongMove,
    Partial,
    Completed(Judgment),
}

/// Scoring rules for one round.
#[derive(Debug, Clone, Copy)]
pub struct Judge {
    good_window: f64,
    perfect_window: f64,
    perfect_points: f64,
    good_points: f64,
    combo_bonus: f64,
    combo_bonus_threshold: u32,
    score_multiplier: f64,
}

impl Judge {
    pub fn new(config: &EngineConfig, profile: &DifficultyProfile) -> Self {
        Self {
            good_window: profile.good_window(),
            perfect_window: profile.perfect_window(),
            perfect_points: config.perfect_points,
            good_points: config.good_points,
            combo_bonus: config.combo_bonus,
            combo_bonus_threshold: config.combo_bonus_threshold,
            score_multiplier: profile.score_multiplier,
        }
    }

    /// Grades an absolute timing error, `None` when it is outside the Good window.
    pub fn classify(&self, diff: f64) -> Option<Judgment> {
        if diff <= self.perfect_window {
            Some(Judgment::Perfect)
        } else if diff <= self.good_window {
            Some(Judgment::Good)
        } else {
            None
        }
    }

    pub fn points_for(&self, judgment: Judgment) -> f64 {
        let base = match judgment {
            Judgment::Perfect => self.perfect_points,
            Judgment::Good => self.good_points,
        };
        base * self.score_multiplier
    }

    /// Applies `action` to the node at `state.active_index`.
    ///
    /// Only that node is ever considered. Points for a chord are banked on the
    /// node and credited when its last move lands.
    pub fn judge(
        &self,
        timeline: &mut Timeline,
        state: &mut RunState,
        song_time: f64,
        action: Action,
        feedback: &mut Vec<Feedback>,
    ) -> InputOutcome {
        let index = state.active_index;
        let Some(node) = timeline.get_mut(index) else {
            return InputOutcome::Ignored;
        };
        if !node.is_pending() || node.required_moves.is_empty() {
            return InputOutcome::Ignored;
        }
        if !node.required_moves.contains(&action) {
            tracing::trace!(index, ?action, "action not required by active node");
            return InputOutcome::WrongMove;
        }

        // A node can still be active a tick past its window.
        let diff = (song_time - node.target_time).abs();
        let Some(judgment) = self.classify(diff) else {
            tracing::trace!(index, ?action, diff, "press outside judgment window");
            return InputOutcome::Ignored;
        };

        node.required_moves.remove(&action);
        node.pending_points += self.points_for(judgment);
        let worst = node.judgment.map_or(judgment, |prev| prev.max(judgment));
        node.judgment = Some(worst);

        if !node.required_moves.is_empty() {
            let remaining = node.required_moves.len();
            tracing::debug!(index, ?action, remaining, "chord progress");
            feedback.push(Feedback::ChordProgress {
                node: index,
                remaining,
            });
            return InputOutcome::Partial;
        }

        node.hit_status = HitStatus::Hit;
        let mut points = node.pending_points;
        state.combo += 1;
        state.max_combo = state.max_combo.max(state.combo);
        if state.combo > self.combo_bonus_threshold {
            points += self.combo_bonus * self.score_multiplier;
        }
        state.score += points;
        match worst {
            Judgment::Perfect => state.perfect += 1,
            Judgment::Good => state.good += 1,
        }

        tracing::debug!(
            index,
            judgment = worst.label(),
            combo = state.combo,
            score = state.score,
            "hit"
        );
        feedback.push(Feedback::Hit {
            node: index,
            judgment: worst,
            combo: state.combo,
            points,
        });
        InputOutcome::Completed(worst)
    }
}
