use serde::Serialize;

use crate::{
    chart::Action,
    config::{DifficultyProfile, EngineConfig},
    timeline::{HitStatus, Timeline},
};

/// Logical draw instruction: show `action` at `position` along its lane.
///
/// Position 0 is where cues spawn, the last position is the hit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaneCue {
    pub node: usize,
    pub action: Action,
    pub position: u8,
}

/// Projects upcoming nodes onto lane positions.
#[derive(Debug, Clone)]
pub struct LaneProjector {
    look_ahead: f64,
    lane_positions: u8,
    depth: usize,
    cues: Vec<LaneCue>,
}

impl LaneProjector {
    pub fn new(config: &EngineConfig, profile: &DifficultyProfile) -> Self {
        Self {
            look_ahead: f64::from(config.look_ahead_ticks) * profile.tick_duration,
            lane_positions: config.lane_positions.max(1),
            depth: config.projection_depth,
            cues: Vec::with_capacity(config.projection_depth),
        }
    }

    /// Seconds before its target time that a cue first appears.
    pub fn look_ahead(&self) -> f64 {
        self.look_ahead
    }

    pub fn cues(&self) -> &[LaneCue] {
        &self.cues
    }

    /// Rebuilds the cue list for `song_time`. Chords show their first
    /// outstanding move only.
    pub fn project(&mut self, timeline: &Timeline, active_index: usize, song_time: f64) -> &[LaneCue] {
        self.cues.clear();
        let end = active_index.saturating_add(self.depth).min(timeline.len());
        for index in active_index..end {
            let Some(node) = timeline.get(index) else {
                break;
            };
            if node.hit_status == HitStatus::Hit || node.is_background() {
                continue;
            }
            let Some(action) = node.primary_move() else {
                continue;
            };

            let time_until_hit = node.target_time - song_time;
            if !(0.0..=self.look_ahead).contains(&time_until_hit) {
                continue;
            }
            self.cues.push(LaneCue {
                node: index,
                action,
                position: self.position_for(time_until_hit),
            });
        }
        &self.cues
    }

    fn position_for(&self, time_until_hit: f64) -> u8 {
        let ratio = 1.0 - time_until_hit / self.look_ahead;
        let last = f64::from(self.lane_positions - 1);
        (ratio * f64::from(self.lane_positions)).floor().clamp(0.0, last) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chart::{Chart, ChartStep},
        judge::{Feedback, Judge},
        engine::RunState,
    };

    fn profile() -> DifficultyProfile {
        DifficultyProfile {
            duration_scale: 0.5,
            base_judgment_unit: 0.5,
            score_multiplier: 1.0,
            tick_duration: 0.1,
        }
    }

    fn timeline() -> Timeline {
        Timeline::build(
            &Chart::new(
                "lanes",
                vec![
                    ChartStep::rest("C4", 1.0),
                    ChartStep::new("D4", 1.0, Action::Touch3),
                    ChartStep::new("E4", 1.0, [Action::Touch4, Action::Touch2]),
                    ChartStep::new("F4", 1.0, Action::TiltLeft),
                ],
            ),
            &profile(),
        )
    }

    #[test]
    fn cues_travel_towards_the_hit_line() {
        let timeline = timeline();
        let mut projector = LaneProjector::new(&EngineConfig::default(), &profile());
        assert!((projector.look_ahead() - 0.7).abs() < 1e-9);

        // D4 lands at 0.5s: 0.45s away is early in the lane.
        let cues = projector.project(&timeline, 0, 0.05).to_vec();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].action, Action::Touch3);
        assert_eq!(cues[0].position, 2);

        let cues = projector.project(&timeline, 0, 0.5).to_vec();
        assert_eq!(cues[0].node, 1);
        assert_eq!(cues[0].position, 6);
    }

    #[test]
    fn skips_background_and_out_of_horizon_nodes() {
        let timeline = timeline();
        let mut projector = LaneProjector::new(&EngineConfig::default(), &profile());

        let cues = projector.project(&timeline, 0, 0.45);
        let nodes: Vec<usize> = cues.iter().map(|cue| cue.node).collect();
        assert_eq!(nodes, vec![1, 2]);
    }

    #[test]
    fn chords_show_their_first_outstanding_move() {
        let mut timeline = timeline();
        let mut projector = LaneProjector::new(&EngineConfig::default(), &profile());

        let cues = projector.project(&timeline, 2, 0.9).to_vec();
        assert_eq!(cues[0].action, Action::Touch2);

        let judge = Judge::new(&EngineConfig::default(), &profile());
        let mut state = RunState {
            active_index: 2,
            ..RunState::default()
        };
        let mut feedback: Vec<Feedback> = Vec::new();
        judge.judge(&mut timeline, &mut state, 1.0, Action::Touch2, &mut feedback);

        let cues = projector.project(&timeline, 2, 0.95).to_vec();
        assert_eq!(cues[0].action, Action::Touch4);

        judge.judge(&mut timeline, &mut state, 1.0, Action::Touch4, &mut feedback);
        let cues = projector.project(&timeline, 2, 0.95);
        assert!(cues.iter().all(|cue| cue.node != 2));
    }

    #[test]
    fn depth_limits_the_scan() {
        let timeline = timeline();
        let config = EngineConfig {
            projection_depth: 2,
            ..EngineConfig::default()
        };
        let mut projector = LaneProjector::new(&config, &profile());

        let cues = projector.project(&timeline, 0, 0.9);
        assert!(cues.iter().all(|cue| cue.node < 2));
    }
}
