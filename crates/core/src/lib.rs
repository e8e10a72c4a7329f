//! Core library for the GIX Rhythm handheld.
//!
//! A round is driven by [`RhythmEngine`], which owns a preprocessed
//! [`Timeline`] and advances it once per main-loop tick against an injected
//! [`Clock`]. Hardware stays behind small traits ([`InputSource`],
//! [`ToneOutput`], [`LaneDisplay`]) so the same engine runs on the controller,
//! in the command line simulator and in tests.

pub mod assets;
pub mod audio;
pub mod chart;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod judge;
pub mod mapping;
pub mod record;
pub mod render;
pub mod session;
pub mod timeline;

pub use assets::SongLibrary;
pub use audio::{CueSequencer, RecordingTone, ToneEvent, ToneOutput};
pub use chart::{pitch_frequency, Action, Chart, ChartStep, Moves};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{AppConfig, Difficulty, DifficultyProfile, DifficultyTable, EngineConfig, FailPolicy};
pub use engine::{RhythmEngine, RoundOutcome, RoundSummary, RunState};
pub use error::{Result, RhythmError};
pub use input::{EdgeDetector, InputSource, SampledInput, ScriptedInput, SensorFrame};
pub use judge::{Feedback, InputOutcome, Judge, Judgment};
pub use mapping::{LaneCue, LaneProjector};
pub use record::{HighScoreTable, ScoreEntry};
pub use render::{FrameBuffer, LaneDisplay, LaneSegment, Rgb, StripLayout};
pub use session::{Session, SessionChoice};
pub use timeline::{HitStatus, Scheduler, Timeline, TimelineNode};
