use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Everything the player can do with the controller.
///
/// Ordering matters: when a chord has several moves left, the lowest one is
/// the move shown on the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Touch1,
    Touch2,
    Touch3,
    Touch4,
    TiltLeft,
    TiltRight,
    DoubleTap,
}

impl Action {
    pub const TOUCH_PADS: [Action; 4] = [Action::Touch1, Action::Touch2, Action::Touch3, Action::Touch4];

    pub fn label(self) -> &'static str {
        match self {
            Action::Touch1 => "TOUCH1",
            Action::Touch2 => "TOUCH2",
            Action::Touch3 => "TOUCH3",
            Action::Touch4 => "TOUCH4",
            Action::TiltLeft => "LEFT",
            Action::TiltRight => "RIGHT",
            Action::DoubleTap => "DOUBLETAP",
        }
    }
}

/// Moves a chart step asks for.
///
/// In JSON this is `null`, a single action name, or a list of action names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Moves {
    /// Background note: it sounds but is never judged.
    #[default]
    None,
    One(Action),
    Chord(Vec<Action>),
}

impl Moves {
    /// Collapses the declared moves into a set, dropping duplicates.
    pub fn to_set(&self) -> BTreeSet<Action> {
        match self {
            Moves::None => BTreeSet::new(),
            Moves::One(action) => BTreeSet::from([*action]),
            Moves::Chord(actions) => actions.iter().copied().collect(),
        }
    }
}

impl From<Action> for Moves {
    fn from(value: Action) -> Self {
        Moves::One(value)
    }
}

impl<const N: usize> From<[Action; N]> for Moves {
    fn from(value: [Action; N]) -> Self {
        Moves::Chord(value.to_vec())
    }
}

impl From<Vec<Action>> for Moves {
    fn from(value: Vec<Action>) -> Self {
        Moves::Chord(value)
    }
}

/// One entry of a chart, before any timing is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStep {
    pub note: String,
    /// Length in beats; the difficulty profile turns this into seconds.
    pub duration_units: f64,
    #[serde(default)]
    pub moves: Moves,
}

impl ChartStep {
    pub fn new(note: impl Into<String>, duration_units: f64, moves: impl Into<Moves>) -> Self {
        Self {
            note: note.into(),
            duration_units,
            moves: moves.into(),
        }
    }

    /// A step that only plays music.
    pub fn rest(note: impl Into<String>, duration_units: f64) -> Self {
        Self::new(note, duration_units, Moves::None)
    }
}

/// A playable level: a title and its ordered steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub steps: Vec<ChartStep>,
}

impl Chart {
    pub fn new(title: impl Into<String>, steps: Vec<ChartStep>) -> Self {
        Self {
            title: title.into(),
            steps,
        }
    }

    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps that require at least one move.
    pub fn judged_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| !step.moves.to_set().is_empty())
            .count()
    }
}

/// Buzzer frequency for a pitch name. Unknown names and `REST` are silent.
pub fn pitch_frequency(note: &str) -> u32 {
    match note {
        "C4" => 262,
        "D4" => 294,
        "E4" => 330,
        "F4" => 349,
        "G4" => 392,
        "A4" => 440,
        "B4" => 494,
        "C5" => 523,
        _ => 0,
    }
}
