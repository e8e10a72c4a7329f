//! One round of play: owns the timeline and its run state, and advances every
//! component once per [`RhythmEngine::update`].

use serde::Serialize;

use crate::{
    audio::{CueSequencer, ToneOutput},
    chart::{Action, Chart},
    clock::Clock,
    config::{AppConfig, Difficulty, DifficultyProfile, EngineConfig, FailPolicy},
    input::InputSource,
    judge::{Feedback, InputOutcome, Judge},
    mapping::LaneProjector,
    render::{LaneDisplay, StripLayout},
    timeline::{Scheduler, Timeline},
};

/// Mutable per-round state. Written only by the loop that owns the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunState {
    pub score: f64,
    pub combo: u32,
    pub max_combo: u32,
    pub active_index: usize,
    pub audio_index: usize,
    pub round_start_time: f64,
    pub is_won: bool,
    pub is_failed: bool,
    pub perfect: u32,
    pub good: u32,
    pub miss: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundOutcome {
    InProgress,
    Won,
    Failed,
}

/// Result screen data for a round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSummary {
    pub title: String,
    pub score: u32,
    pub max_combo: u32,
    pub perfect: u32,
    pub good: u32,
    pub miss: u32,
    pub outcome: RoundOutcome,
}

pub struct RhythmEngine<C> {
    clock: C,
    title: String,
    fail_policy: FailPolicy,
    timeline: Timeline,
    state: RunState,
    started: bool,
    scheduler: Scheduler,
    judge: Judge,
    audio: CueSequencer,
    projector: LaneProjector,
    layout: StripLayout,
    feedback: Vec<Feedback>,
}

impl<C: Clock> RhythmEngine<C> {
    pub fn new(chart: &Chart, profile: &DifficultyProfile, config: &EngineConfig, clock: C) -> Self {
        Self {
            clock,
            title: chart.title.clone(),
            fail_policy: config.fail_policy,
            timeline: Timeline::build(chart, profile),
            state: RunState::default(),
            started: false,
            scheduler: Scheduler::new(config.end_buffer),
            judge: Judge::new(config, profile),
            audio: CueSequencer::new(config),
            projector: LaneProjector::new(config, profile),
            layout: StripLayout::default(),
            feedback: Vec::new(),
        }
    }

    pub fn from_config(chart: &Chart, difficulty: Difficulty, config: &AppConfig, clock: C) -> Self {
        let profile = config.difficulties.profile(difficulty);
        Self::new(chart, &profile, &config.engine, clock)
    }

    /// Replaces the default serpentine strip layout.
    pub fn with_layout(mut self, layout: StripLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Starts the round at the current clock reading. A round starts once;
    /// later calls are ignored, so a retry needs a fresh engine.
    pub fn start(&mut self) {
        if self.started || self.is_finished() {
            tracing::debug!(title = %self.title, "round already started");
            return;
        }
        self.state = RunState {
            round_start_time: self.clock.now(),
            ..RunState::default()
        };
        self.started = true;
        tracing::info!(
            title = %self.title,
            notes = self.timeline.len(),
            duration = self.timeline.total_duration(),
            "round started"
        );
    }

    /// Reads the clock and input once and advances the round by one tick.
    /// Does nothing once the round has ended.
    pub fn update<I, T, D>(&mut self, input: &mut I, tone: &mut T, display: &mut D) -> &[Feedback]
    where
        I: InputSource + ?Sized,
        T: ToneOutput + ?Sized,
        D: LaneDisplay + ?Sized,
    {
        if self.is_finished() {
            self.feedback.clear();
            return &self.feedback;
        }
        let now = self.clock.now();
        let action = input.poll_input();
        self.tick(now, action, tone, display)
    }

    /// Advances the round to clock time `now` with at most one input event.
    ///
    /// Order within a tick: audio, scheduler, visuals, input. The first tick
    /// of an unstarted round starts it at the clock's current reading.
    pub fn tick<T, D>(&mut self, now: f64, action: Option<Action>, tone: &mut T, display: &mut D) -> &[Feedback]
    where
        T: ToneOutput + ?Sized,
        D: LaneDisplay + ?Sized,
    {
        self.feedback.clear();
        if self.is_finished() {
            return &self.feedback;
        }
        if !self.started {
            self.start();
        }

        let song_time = now - self.state.round_start_time;
        self.audio
            .tick(&self.timeline, &mut self.state.audio_index, song_time, tone);

        if self.scheduler.is_over(&self.timeline, song_time) {
            self.scheduler
                .retire_all(&mut self.timeline, &mut self.state, &mut self.feedback);
            self.finish(true, tone, display);
            return &self.feedback;
        }

        let missed = self.scheduler.retire(
            &mut self.timeline,
            &mut self.state,
            song_time,
            &mut self.feedback,
        );
        if missed > 0 && self.fail_policy == FailPolicy::Strict {
            self.finish(false, tone, display);
            return &self.feedback;
        }

        let cues = self
            .projector
            .project(&self.timeline, self.state.active_index, song_time);
        self.layout.draw(cues, display);

        if let Some(action) = action {
            let outcome = self.judge.judge(
                &mut self.timeline,
                &mut self.state,
                song_time,
                action,
                &mut self.feedback,
            );
            if outcome == InputOutcome::WrongMove && self.fail_policy == FailPolicy::Strict {
                self.finish(false, tone, display);
            }
        }
        &self.feedback
    }

    /// Ends the round early as a failure, e.g. when the player quits.
    pub fn abandon(&mut self) {
        if self.is_finished() {
            return;
        }
        tracing::info!(title = %self.title, "round abandoned");
        self.state.is_failed = true;
    }

    fn finish<T, D>(&mut self, won: bool, tone: &mut T, display: &mut D)
    where
        T: ToneOutput + ?Sized,
        D: LaneDisplay + ?Sized,
    {
        self.audio.silence(tone);
        display.clear_all();
        display.flush();
        if won {
            self.state.is_won = true;
            self.feedback.push(Feedback::Won);
        } else {
            self.state.is_failed = true;
            self.feedback.push(Feedback::Failed);
        }
        tracing::info!(
            title = %self.title,
            won,
            score = self.state.score,
            max_combo = self.state.max_combo,
            "round finished"
        );
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_won || self.state.is_failed
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Seconds into the round according to the engine's clock.
    pub fn song_time(&self) -> f64 {
        self.clock.now() - self.state.round_start_time
    }

    pub fn summary(&self) -> RoundSummary {
        let outcome = if self.state.is_won {
            RoundOutcome::Won
        } else if self.state.is_failed {
            RoundOutcome::Failed
        } else {
            RoundOutcome::InProgress
        };
        RoundSummary {
            title: self.title.clone(),
            score: self.state.score.max(0.0).round() as u32,
            max_combo: self.state.max_combo,
            perfect: self.state.perfect,
            good: self.state.good,
            miss: self.state.miss,
            outcome,
        }
    }
}

impl<C> std::fmt::Debug for RhythmEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhythmEngine")
            .field("title", &self.title)
            .field("notes", &self.timeline.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{RecordingTone, ToneEvent},
        chart::{ChartStep, Moves},
        clock::ManualClock,
        judge::Judgment,
        render::FrameBuffer,
        timeline::HitStatus,
    };

    const TICK: f64 = 0.01;

    fn profile() -> DifficultyProfile {
        DifficultyProfile {
            duration_scale: 0.5,
            base_judgment_unit: 0.5,
            score_multiplier: 1.0,
            tick_duration: 0.1,
        }
    }

    fn two_note_chart() -> Chart {
        Chart::new(
            "scenario",
            vec![
                ChartStep::new("C4", 1.0, Action::Touch1),
                ChartStep::new("D4", 1.0, Moves::None),
            ],
        )
    }

    struct Rig {
        tone: RecordingTone,
        strip: FrameBuffer,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                tone: RecordingTone::new(),
                strip: FrameBuffer::new(28),
            }
        }
    }

    fn engine<'a>(chart: &Chart, clock: &'a ManualClock, config: &EngineConfig) -> RhythmEngine<&'a ManualClock> {
        let mut engine = RhythmEngine::new(chart, &profile(), config, clock);
        engine.start();
        engine
    }

    /// Ticks at a fixed rate up to `until`, pressing `press` at the first tick at or after its time.
    fn run(
        engine: &mut RhythmEngine<&ManualClock>,
        clock: &ManualClock,
        rig: &mut Rig,
        until: f64,
        mut presses: Vec<(f64, Action)>,
    ) -> Vec<Feedback> {
        let mut events = Vec::new();
        while clock.now() <= until {
            let now = clock.now();
            let action = match presses.first() {
                Some(&(at, action)) if at <= now + 1e-9 => {
                    presses.remove(0);
                    Some(action)
                }
                _ => None,
            };
            events.extend_from_slice(engine.tick(now, action, &mut rig.tone, &mut rig.strip));
            clock.advance(TICK);
        }
        events
    }

    #[test]
    fn perfect_press_shortly_after_target() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        let events = engine.tick(0.05, Some(Action::Touch1), &mut rig.tone, &mut rig.strip).to_vec();

        assert_eq!(
            events,
            vec![Feedback::Hit {
                node: 0,
                judgment: Judgment::Perfect,
                combo: 1,
                points: 20.0,
            }]
        );
        assert_eq!(engine.state().score, 20.0);
        assert_eq!(engine.state().combo, 1);
    }

    #[test]
    fn good_press_late_in_the_window() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        engine.tick(0.15, Some(Action::Touch1), &mut rig.tone, &mut rig.strip);

        assert_eq!(engine.state().score, 10.0);
        assert_eq!(engine.state().combo, 1);
        assert_eq!(engine.state().good, 1);
    }

    #[test]
    fn no_input_is_a_miss_once_the_window_closes() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        assert!(engine.tick(0.2, None, &mut rig.tone, &mut rig.strip).is_empty());
        assert_eq!(engine.timeline().get(0).unwrap().hit_status, HitStatus::Pending);

        let events = engine.tick(0.21, None, &mut rig.tone, &mut rig.strip).to_vec();
        assert_eq!(events, vec![Feedback::Miss { node: 0 }]);
        assert_eq!(engine.timeline().get(0).unwrap().hit_status, HitStatus::Miss);
        assert_eq!(engine.state().combo, 0);
        assert_eq!(engine.state().score, 0.0);
        assert!(!engine.is_finished());
    }

    #[test]
    fn late_press_after_miss_is_ignored() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        engine.tick(0.25, None, &mut rig.tone, &mut rig.strip);
        engine.tick(0.26, Some(Action::Touch1), &mut rig.tone, &mut rig.strip);

        assert_eq!(engine.timeline().get(0).unwrap().hit_status, HitStatus::Miss);
        assert_eq!(engine.state().score, 0.0);
    }

    #[test]
    fn chord_needs_both_moves() {
        let chart = Chart::new(
            "chord",
            vec![ChartStep::new("E4", 1.0, [Action::Touch1, Action::Touch2])],
        );
        let clock = ManualClock::new();
        let mut engine = engine(&chart, &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        let events = engine.tick(0.0, Some(Action::Touch1), &mut rig.tone, &mut rig.strip).to_vec();
        assert_eq!(events, vec![Feedback::ChordProgress { node: 0, remaining: 1 }]);
        let node = engine.timeline().get(0).unwrap();
        assert!(node.required_moves.contains(&Action::Touch2));
        assert_eq!(node.hit_status, HitStatus::Pending);
        assert_eq!(engine.state().score, 0.0);

        engine.tick(0.05, Some(Action::Touch2), &mut rig.tone, &mut rig.strip);
        assert_eq!(engine.timeline().get(0).unwrap().hit_status, HitStatus::Hit);
        assert_eq!(engine.state().score, 40.0);
        assert_eq!(engine.state().combo, 1);
    }

    #[test]
    fn round_is_won_after_the_end_buffer() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        engine.tick(0.0, Some(Action::Touch1), &mut rig.tone, &mut rig.strip);
        // Chart is 1.0s long, plus 1.0s of buffer.
        assert!(engine.tick(2.0, None, &mut rig.tone, &mut rig.strip).is_empty());
        let events = engine.tick(2.01, None, &mut rig.tone, &mut rig.strip).to_vec();

        assert_eq!(events, vec![Feedback::Won]);
        assert!(engine.state().is_won);
        assert_eq!(rig.tone.current(), None);

        let before = engine.state().clone();
        assert!(engine.tick(2.5, Some(Action::Touch1), &mut rig.tone, &mut rig.strip).is_empty());
        let mut press = Some(Action::Touch1);
        assert!(engine.update(&mut press, &mut rig.tone, &mut rig.strip).is_empty());
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.summary().outcome, RoundOutcome::Won);
    }

    #[test]
    fn empty_chart_is_won_immediately_after_the_buffer() {
        let clock = ManualClock::new();
        let mut engine = engine(&Chart::default(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        engine.tick(0.5, None, &mut rig.tone, &mut rig.strip);
        assert!(!engine.is_finished());
        engine.tick(1.01, None, &mut rig.tone, &mut rig.strip);
        assert!(engine.state().is_won);
    }

    #[test]
    fn future_notes_cannot_be_pre_hit() {
        let chart = Chart::new(
            "queue",
            vec![
                ChartStep::new("C4", 0.5, Action::Touch1),
                ChartStep::new("D4", 1.0, Action::Touch2),
            ],
        );
        let clock = ManualClock::new();
        let mut engine = engine(&chart, &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        // D4 lands at 0.25s and its window is open at 0.1s, but C4 is still active.
        let events = engine.tick(0.1, Some(Action::Touch2), &mut rig.tone, &mut rig.strip).to_vec();
        assert!(events.is_empty());
        assert_eq!(engine.state().active_index, 0);
        assert!(engine.timeline().get(1).unwrap().required_moves.contains(&Action::Touch2));
    }

    #[test]
    fn strict_policy_fails_on_wrong_move() {
        let config = EngineConfig {
            fail_policy: FailPolicy::Strict,
            ..EngineConfig::default()
        };
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &config);
        let mut rig = Rig::new();

        let events = engine.tick(0.0, Some(Action::Touch3), &mut rig.tone, &mut rig.strip).to_vec();
        assert_eq!(events, vec![Feedback::Failed]);
        assert!(engine.state().is_failed);
        assert_eq!(engine.summary().outcome, RoundOutcome::Failed);
    }

    #[test]
    fn strict_policy_fails_on_miss() {
        let config = EngineConfig {
            fail_policy: FailPolicy::Strict,
            ..EngineConfig::default()
        };
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &config);
        let mut rig = Rig::new();

        let events = engine.tick(0.3, None, &mut rig.tone, &mut rig.strip).to_vec();
        assert_eq!(events, vec![Feedback::Miss { node: 0 }, Feedback::Failed]);
        assert!(engine.state().is_failed);
    }

    #[test]
    fn lenient_policy_ignores_wrong_moves() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        engine.tick(0.0, Some(Action::Touch3), &mut rig.tone, &mut rig.strip);
        engine.tick(0.01, Some(Action::Touch1), &mut rig.tone, &mut rig.strip);

        assert!(!engine.is_finished());
        assert_eq!(engine.state().perfect, 1);
    }

    #[test]
    fn full_round_plays_music_and_draws_cues() {
        let chart = Chart::new(
            "full",
            vec![
                ChartStep::rest("C4", 2.0),
                ChartStep::new("G4", 1.0, Action::Touch2),
                ChartStep::new("A4", 1.0, Action::Touch3),
                ChartStep::new("G4", 1.0, Action::Touch4),
            ],
        );
        let clock = ManualClock::new();
        let mut engine = engine(&chart, &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        // G4 at 1.0s, A4 at 1.5s, G4 at 2.0s. Skip the last note.
        let events = run(
            &mut engine,
            &clock,
            &mut rig,
            4.0,
            vec![(1.0, Action::Touch2), (1.65, Action::Touch3)],
        );

        assert!(engine.state().is_won);
        assert_eq!(engine.state().perfect, 1);
        assert_eq!(engine.state().good, 1);
        assert_eq!(engine.state().miss, 1);
        assert_eq!(engine.state().max_combo, 2);
        assert_eq!(engine.state().combo, 0);
        assert_eq!(events.last(), Some(&Feedback::Won));

        let starts: Vec<u32> = rig
            .tone
            .events()
            .iter()
            .filter_map(|event| match event {
                ToneEvent::Start(hz) => Some(*hz),
                ToneEvent::Stop => None,
            })
            .collect();
        assert_eq!(starts, vec![262, 392, 440, 392]);
        assert_eq!(rig.strip.lit().count(), 0);
        assert!(rig.strip.frames() > 300);

        let summary = engine.summary();
        assert_eq!(summary.score, 30);
        assert_eq!(summary.outcome, RoundOutcome::Won);
    }

    #[test]
    fn update_reads_the_injected_clock() {
        let clock = ManualClock::new();
        let mut engine = RhythmEngine::new(&two_note_chart(), &profile(), &EngineConfig::default(), &clock);
        let mut rig = Rig::new();

        clock.advance(1.0);
        let mut press = Some(Action::Touch1);
        // The first update starts the round at t=1.0.
        engine.update(&mut press, &mut rig.tone, &mut rig.strip);
        assert_eq!(engine.state().round_start_time, 1.0);
        assert_eq!(engine.state().perfect, 1);

        clock.advance(0.3);
        assert!((engine.song_time() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn restarting_a_won_round_changes_nothing() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        let mut rig = Rig::new();

        engine.tick(0.0, Some(Action::Touch1), &mut rig.tone, &mut rig.strip);
        engine.tick(2.5, None, &mut rig.tone, &mut rig.strip);
        assert!(engine.state().is_won);
        let before = engine.state().clone();

        clock.set(10.0);
        engine.start();
        assert!(engine.tick(10.0, Some(Action::Touch1), &mut rig.tone, &mut rig.strip).is_empty());

        assert_eq!(engine.state(), &before);
        assert_eq!(engine.state().score, 20.0);
        assert_eq!(engine.summary().outcome, RoundOutcome::Won);
    }

    #[test]
    fn first_tick_starts_the_round_once() {
        let clock = ManualClock::at(3.0);
        let mut engine = RhythmEngine::new(&two_note_chart(), &profile(), &EngineConfig::default(), &clock);
        let mut rig = Rig::new();

        engine.tick(3.05, Some(Action::Touch1), &mut rig.tone, &mut rig.strip);
        assert_eq!(engine.state().round_start_time, 3.0);
        assert_eq!(engine.state().score, 20.0);

        clock.advance(0.5);
        engine.start();
        let mut press = None;
        engine.update(&mut press, &mut rig.tone, &mut rig.strip);
        assert_eq!(engine.state().round_start_time, 3.0);
        assert_eq!(engine.state().score, 20.0);
        assert_eq!(engine.timeline().get(0).unwrap().hit_status, HitStatus::Hit);
    }

    #[test]
    fn abandoned_round_cannot_be_started() {
        let clock = ManualClock::new();
        let mut engine = RhythmEngine::new(&two_note_chart(), &profile(), &EngineConfig::default(), &clock);
        engine.abandon();
        engine.start();
        assert!(engine.state().is_failed);
    }

    #[test]
    fn abandon_ends_the_round() {
        let clock = ManualClock::new();
        let mut engine = engine(&two_note_chart(), &clock, &EngineConfig::default());
        engine.abandon();
        assert!(engine.is_finished());
        assert_eq!(engine.summary().outcome, RoundOutcome::Failed);
    }
}
