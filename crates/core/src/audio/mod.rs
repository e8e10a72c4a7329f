use crate::{config::EngineConfig, timeline::Timeline};

/// Buzzer-style tone output. Both calls must be cheap and non-blocking.
pub trait ToneOutput {
    fn start_tone(&mut self, frequency_hz: u32);
    fn stop_tone(&mut self);
}

/// Plays the chart's melody as the clock crosses each note.
///
/// The sequencer keeps its own pointer into the timeline so background notes
/// and missed notes still sound.
#[derive(Debug, Clone)]
pub struct CueSequencer {
    sustain_ratio: f64,
    sustain_cap: f64,
    tone_off_at: Option<f64>,
}

impl CueSequencer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sustain_ratio: config.sustain_ratio,
            sustain_cap: config.sustain_cap,
            tone_off_at: None,
        }
    }

    /// Song time at which the sounding cue stops, if one is sounding.
    pub fn tone_off_at(&self) -> Option<f64> {
        self.tone_off_at
    }

    pub fn tick<T: ToneOutput + ?Sized>(
        &mut self,
        timeline: &Timeline,
        audio_index: &mut usize,
        song_time: f64,
        output: &mut T,
    ) {
        if let Some(off_at) = self.tone_off_at {
            if song_time >= off_at {
                output.stop_tone();
                self.tone_off_at = None;
            }
        }

        while let Some(node) = timeline.get(*audio_index) {
            if song_time < node.target_time {
                break;
            }
            if node.frequency > 0 {
                let sustain = (node.duration * self.sustain_ratio).min(self.sustain_cap);
                tracing::trace!(index = *audio_index, frequency = node.frequency, sustain, "cue");
                output.start_tone(node.frequency);
                self.tone_off_at = Some(song_time + sustain);
            }
            *audio_index += 1;
        }
    }

    /// Stops whatever is sounding, used when the round ends.
    pub fn silence<T: ToneOutput + ?Sized>(&mut self, output: &mut T) {
        self.tone_off_at = None;
        output.stop_tone();
    }
}

/// A single call made against a [`ToneOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneEvent {
    Start(u32),
    Stop,
}

/// Tone output that remembers every call instead of making noise.
#[derive(Debug, Default, Clone)]
pub struct RecordingTone {
    events: Vec<ToneEvent>,
    current: Option<u32>,
}

impl RecordingTone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ToneEvent] {
        &self.events
    }

    /// Frequency currently sounding, if any.
    pub fn current(&self) -> Option<u32> {
        self.current
    }

    pub fn cues_started(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ToneEvent::Start(_)))
            .count()
    }
}

impl ToneOutput for RecordingTone {
    fn start_tone(&mut self, frequency_hz: u32) {
        self.current = Some(frequency_hz);
        self.events.push(ToneEvent::Start(frequency_hz));
    }

    fn stop_tone(&mut self) {
        // Stopping twice is harmless on the buzzer, so only log real transitions.
        if self.current.take().is_some() {
            self.events.push(ToneEvent::Stop);
        }
    }
}
