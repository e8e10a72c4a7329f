use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
    chart::{pitch_frequency, Action, Chart},
    config::DifficultyProfile,
    engine::RunState,
    judge::{Feedback, Judgment},
};

/// Judgment state of a single node. Leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HitStatus {
    #[default]
    Pending,
    Hit,
    Miss,
}

/// One chart step with its timing resolved for the current round.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineNode {
    pub note: String,
    pub frequency: u32,
    pub target_time: f64,
    pub duration: f64,
    pub window_start: f64,
    pub window_end: f64,
    /// Moves still outstanding. Only ever shrinks.
    pub required_moves: BTreeSet<Action>,
    pub total_moves_count: usize,
    pub hit_status: HitStatus,
    /// Points earned by chord members so far, paid out when the chord completes.
    pub pending_points: f64,
    /// Worst judgment among the moves matched so far.
    pub judgment: Option<Judgment>,
}

impl TimelineNode {
    pub fn is_pending(&self) -> bool {
        self.hit_status == HitStatus::Pending
    }

    /// Background notes carry no moves and are never judged.
    pub fn is_background(&self) -> bool {
        self.total_moves_count == 0
    }

    /// First outstanding move, in [`Action`] order.
    pub fn primary_move(&self) -> Option<Action> {
        self.required_moves.first().copied()
    }

    fn mark_miss(&mut self) -> bool {
        if !self.is_pending() || self.required_moves.is_empty() {
            return false;
        }
        self.hit_status = HitStatus::Miss;
        true
    }
}

/// Ordered, timed view of a chart for one round.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    nodes: Vec<TimelineNode>,
    total_duration: f64,
    good_window: f64,
    perfect_window: f64,
}

impl Timeline {
    /// Resolves every step of `chart` against `profile`.
    pub fn build(chart: &Chart, profile: &DifficultyProfile) -> Self {
        let good_window = profile.good_window();
        let perfect_window = profile.perfect_window();

        let mut nodes = Vec::with_capacity(chart.steps.len());
        let mut target_time = 0.0;
        for step in &chart.steps {
            // Negative lengths would move notes backwards in time.
            let duration = (step.duration_units * profile.duration_scale).max(0.0);
            let required_moves = step.moves.to_set();
            nodes.push(TimelineNode {
                note: step.note.clone(),
                frequency: pitch_frequency(&step.note),
                target_time,
                duration,
                window_start: target_time - good_window,
                window_end: target_time + good_window,
                total_moves_count: required_moves.len(),
                required_moves,
                hit_status: HitStatus::Pending,
                pending_points: 0.0,
                judgment: None,
            });
            target_time += duration;
        }

        Self {
            nodes,
            total_duration: target_time,
            good_window,
            perfect_window,
        }
    }

    pub fn nodes(&self) -> &[TimelineNode] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&TimelineNode> {
        self.nodes.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TimelineNode> {
        self.nodes.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn good_window(&self) -> f64 {
        self.good_window
    }

    pub fn perfect_window(&self) -> f64 {
        self.perfect_window
    }
}

/// Moves the active pointer past nodes whose judgment window has closed.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    end_buffer: f64,
}

impl Scheduler {
    pub fn new(end_buffer: f64) -> Self {
        Self { end_buffer }
    }

    /// True once the whole chart plus the end buffer has played out.
    pub fn is_over(&self, timeline: &Timeline, song_time: f64) -> bool {
        song_time > timeline.total_duration() + self.end_buffer
    }

    /// Retires every node closed at `song_time` and returns how many were missed.
    ///
    /// Running it twice with the same `song_time` changes nothing.
    pub fn retire(
        &self,
        timeline: &mut Timeline,
        state: &mut RunState,
        song_time: f64,
        feedback: &mut Vec<Feedback>,
    ) -> usize {
        let mut missed = 0;
        while let Some(node) = timeline.get_mut(state.active_index) {
            if song_time <= node.window_end {
                break;
            }
            if node.mark_miss() {
                tracing::debug!(index = state.active_index, note = %node.note, "miss");
                state.combo = 0;
                state.miss += 1;
                missed += 1;
                feedback.push(Feedback::Miss {
                    node: state.active_index,
                });
            }
            state.active_index += 1;
        }
        missed
    }

    /// Retires everything left, used when the round times out.
    pub fn retire_all(
        &self,
        timeline: &mut Timeline,
        state: &mut RunState,
        feedback: &mut Vec<Feedback>,
    ) -> usize {
        self.retire(timeline, state, f64::INFINITY, feedback)
    }
}
