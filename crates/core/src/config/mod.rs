use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, RhythmError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub difficulties: DifficultyTable,
}

impl AppConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        for difficulty in Difficulty::ALL {
            self.difficulties.profile(difficulty).validate()?;
        }
        Ok(())
    }
}

/// What happens to a round when the player slips up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    /// Misses break the combo and nothing else. Wrong actions are ignored.
    #[default]
    Lenient,
    /// The first miss or wrong action fails the round.
    Strict,
}

/// Tunables shared by every round regardless of difficulty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds past the end of the chart before the round counts as won.
    pub end_buffer: f64,
    /// Longest a single cue may hold the buzzer, in seconds.
    pub sustain_cap: f64,
    /// Fraction of a note's duration the cue sounds for.
    pub sustain_ratio: f64,
    /// Look-ahead horizon expressed in difficulty ticks.
    pub look_ahead_ticks: u32,
    /// Discrete positions along one lane, hit line included.
    pub lane_positions: u8,
    /// How many nodes past the active one the projector inspects.
    pub projection_depth: usize,
    pub perfect_points: f64,
    pub good_points: f64,
    pub combo_bonus: f64,
    /// Bonus is paid once the combo is strictly above this value.
    pub combo_bonus_threshold: u32,
    pub fail_policy: FailPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            end_buffer: 1.0,
            sustain_cap: 0.5,
            sustain_ratio: 0.9,
            look_ahead_ticks: 7,
            lane_positions: 7,
            projection_depth: 10,
            perfect_points: 20.0,
            good_points: 10.0,
            combo_bonus: 5.0,
            combo_bonus_threshold: 2,
            fail_policy: FailPolicy::Lenient,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.end_buffer >= 0.0) {
            return Err(RhythmError::InvalidConfig("end_buffer must be non-negative"));
        }
        if !(self.sustain_cap > 0.0) {
            return Err(RhythmError::InvalidConfig("sustain_cap must be positive"));
        }
        if !(self.sustain_ratio > 0.0 && self.sustain_ratio <= 1.0) {
            return Err(RhythmError::InvalidConfig("sustain_ratio must be in (0, 1]"));
        }
        if self.look_ahead_ticks == 0 {
            return Err(RhythmError::InvalidConfig("look_ahead_ticks must be at least 1"));
        }
        if self.lane_positions == 0 {
            return Err(RhythmError::InvalidConfig("lane_positions must be at least 1"));
        }
        if self.perfect_points < self.good_points {
            return Err(RhythmError::InvalidConfig(
                "perfect_points must not be lower than good_points",
            ));
        }
        Ok(())
    }
}

/// Difficulty levels offered by the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Normal => "NORMAL",
            Difficulty::Hard => "HARD",
        }
    }
}

/// Per-difficulty timing and scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// Seconds per chart duration unit (one beat).
    pub duration_scale: f64,
    /// Reference quarter-note length the judgment windows derive from.
    pub base_judgment_unit: f64,
    pub score_multiplier: f64,
    /// Seconds per LED step; sets how fast cues travel down a lane.
    pub tick_duration: f64,
}

impl DifficultyProfile {
    /// Width of the Good window on either side of the target time.
    pub fn good_window(&self) -> f64 {
        self.base_judgment_unit / 2.5
    }

    pub fn perfect_window(&self) -> f64 {
        self.good_window() / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.duration_scale > 0.0) {
            return Err(RhythmError::InvalidConfig("duration_scale must be positive"));
        }
        if !(self.base_judgment_unit > 0.0) {
            return Err(RhythmError::InvalidConfig("base_judgment_unit must be positive"));
        }
        if !(self.score_multiplier >= 0.0) {
            return Err(RhythmError::InvalidConfig("score_multiplier must be non-negative"));
        }
        if !(self.tick_duration > 0.0) {
            return Err(RhythmError::InvalidConfig("tick_duration must be positive"));
        }
        Ok(())
    }
}

/// Profiles for each [`Difficulty`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyTable {
    pub easy: DifficultyProfile,
    pub normal: DifficultyProfile,
    pub hard: DifficultyProfile,
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            easy: DifficultyProfile {
                duration_scale: 0.5,
                base_judgment_unit: 0.5,
                score_multiplier: 1.0,
                tick_duration: 0.12,
            },
            normal: DifficultyProfile {
                duration_scale: 0.4,
                base_judgment_unit: 0.4,
                score_multiplier: 1.5,
                tick_duration: 0.1,
            },
            hard: DifficultyProfile {
                duration_scale: 0.3,
                base_judgment_unit: 0.3,
                score_multiplier: 2.0,
                tick_duration: 0.07,
            },
        }
    }
}

impl DifficultyTable {
    pub fn profile(&self, difficulty: Difficulty) -> DifficultyProfile {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }
}
