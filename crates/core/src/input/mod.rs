use std::collections::VecDeque;

use crate::{chart::Action, clock::Clock};

/// Source of edge-triggered player actions. Each physical actuation is
/// reported once, not once per tick it is held.
pub trait InputSource {
    fn poll_input(&mut self) -> Option<Action>;
}

impl InputSource for Option<Action> {
    fn poll_input(&mut self) -> Option<Action> {
        self.take()
    }
}

/// Replays a fixed list of `(time, action)` presses against a clock.
#[derive(Debug)]
pub struct ScriptedInput<C> {
    clock: C,
    presses: VecDeque<(f64, Action)>,
}

impl<C: Clock> ScriptedInput<C> {
    pub fn new(clock: C, mut presses: Vec<(f64, Action)>) -> Self {
        presses.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            clock,
            presses: presses.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.presses.len()
    }
}

impl<C: Clock> InputSource for ScriptedInput<C> {
    fn poll_input(&mut self) -> Option<Action> {
        let now = self.clock.now();
        match self.presses.front() {
            Some(&(at, _)) if at <= now => self.presses.pop_front().map(|(_, action)| action),
            _ => None,
        }
    }
}

/// Raw sensor levels captured in one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorFrame {
    pub time: f64,
    pub pads: [bool; 4],
    /// Calibrated X acceleration; negative is a left tilt.
    pub tilt_x: f32,
    /// The accelerometer reported a single tap since the last sample.
    pub tap: bool,
}

/// Turns level-based sensor samples into single actions.
///
/// Priority per sample is double tap, then touch pads (lowest first), then
/// tilt. A pad that rises while another is reported stays unlatched and is
/// reported on the next sample.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    tilt_threshold: f32,
    tilt_cooldown: f64,
    double_tap_min: f64,
    double_tap_max: f64,
    pad_latched: [bool; 4],
    last_tap: Option<f64>,
    tilt_ready_at: f64,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(8.0, 1.5)
    }
}

impl EdgeDetector {
    pub fn new(tilt_threshold: f32, tilt_cooldown: f64) -> Self {
        Self {
            tilt_threshold,
            tilt_cooldown,
            double_tap_min: 0.1,
            double_tap_max: 0.5,
            pad_latched: [false; 4],
            last_tap: None,
            tilt_ready_at: 0.0,
        }
    }

    pub fn sample(&mut self, frame: &SensorFrame) -> Option<Action> {
        if frame.tap && self.register_tap(frame.time) {
            return Some(Action::DoubleTap);
        }

        let mut reported = None;
        for (pad, &pressed) in frame.pads.iter().enumerate() {
            if !pressed {
                self.pad_latched[pad] = false;
            } else if !self.pad_latched[pad] && reported.is_none() {
                self.pad_latched[pad] = true;
                reported = Some(Action::TOUCH_PADS[pad]);
            }
        }
        if reported.is_some() {
            return reported;
        }

        if frame.time < self.tilt_ready_at {
            return None;
        }
        let tilt = if frame.tilt_x > self.tilt_threshold {
            Action::TiltRight
        } else if frame.tilt_x < -self.tilt_threshold {
            Action::TiltLeft
        } else {
            return None;
        };
        tracing::trace!(?tilt, x = frame.tilt_x, "tilt");
        self.tilt_ready_at = frame.time + self.tilt_cooldown;
        Some(tilt)
    }

    fn register_tap(&mut self, time: f64) -> bool {
        match self.last_tap {
            Some(previous)
                if time - previous > self.double_tap_min && time - previous < self.double_tap_max =>
            {
                self.last_tap = None;
                true
            }
            _ => {
                self.last_tap = Some(time);
                false
            }
        }
    }
}

/// [`InputSource`] over a sensor sampling function.
pub struct SampledInput<F> {
    sampler: F,
    detector: EdgeDetector,
}

impl<F: FnMut() -> SensorFrame> SampledInput<F> {
    pub fn new(sampler: F, detector: EdgeDetector) -> Self {
        Self { sampler, detector }
    }
}

impl<F: FnMut() -> SensorFrame> InputSource for SampledInput<F> {
    fn poll_input(&mut self) -> Option<Action> {
        let frame = (self.sampler)();
        self.detector.sample(&frame)
    }
}

impl<F> std::fmt::Debug for SampledInput<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampledInput")
            .field("detector", &self.detector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn pads(time: f64, pads: [bool; 4]) -> SensorFrame {
        SensorFrame {
            time,
            pads,
            ..SensorFrame::default()
        }
    }

    #[test]
    fn scripted_presses_fire_once_in_order() {
        let clock = ManualClock::new();
        let mut input = ScriptedInput::new(
            &clock,
            vec![(0.2, Action::Touch2), (0.1, Action::Touch1)],
        );

        assert_eq!(input.poll_input(), None);
        clock.set(0.25);
        assert_eq!(input.poll_input(), Some(Action::Touch1));
        assert_eq!(input.poll_input(), Some(Action::Touch2));
        assert_eq!(input.poll_input(), None);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn held_pad_reports_once() {
        let mut detector = EdgeDetector::default();
        assert_eq!(detector.sample(&pads(0.0, [true, false, false, false])), Some(Action::Touch1));
        assert_eq!(detector.sample(&pads(0.01, [true, false, false, false])), None);
        assert_eq!(detector.sample(&pads(0.02, [false, false, false, false])), None);
        assert_eq!(detector.sample(&pads(0.03, [true, false, false, false])), Some(Action::Touch1));
    }

    #[test]
    fn simultaneous_pads_are_reported_on_consecutive_samples() {
        let mut detector = EdgeDetector::default();
        let both = [false, true, false, true];
        assert_eq!(detector.sample(&pads(0.0, both)), Some(Action::Touch2));
        assert_eq!(detector.sample(&pads(0.01, both)), Some(Action::Touch4));
        assert_eq!(detector.sample(&pads(0.02, both)), None);
    }

    #[test]
    fn tilt_respects_cooldown() {
        let mut detector = EdgeDetector::default();
        let tilt = |time, tilt_x| SensorFrame {
            time,
            tilt_x,
            ..SensorFrame::default()
        };

        assert_eq!(detector.sample(&tilt(0.0, 9.0)), Some(Action::TiltRight));
        assert_eq!(detector.sample(&tilt(1.0, -9.0)), None);
        assert_eq!(detector.sample(&tilt(1.6, -9.0)), Some(Action::TiltLeft));
        assert_eq!(detector.sample(&tilt(3.5, 2.0)), None);
    }

    #[test]
    fn double_tap_needs_two_taps_in_range() {
        let mut detector = EdgeDetector::default();
        let tap = |time| SensorFrame {
            time,
            tap: true,
            ..SensorFrame::default()
        };

        assert_eq!(detector.sample(&tap(0.0)), None);
        assert_eq!(detector.sample(&tap(0.05)), None);
        assert_eq!(detector.sample(&tap(0.3)), Some(Action::DoubleTap));
        assert_eq!(detector.sample(&tap(2.0)), None);
    }

    #[test]
    fn sampled_input_feeds_the_detector() {
        let mut frames = vec![pads(0.0, [false, false, true, false])].into_iter();
        let mut input = SampledInput::new(
            move || frames.next().unwrap_or_default(),
            EdgeDetector::default(),
        );
        assert_eq!(input.poll_input(), Some(Action::Touch3));
        assert_eq!(input.poll_input(), None);
    }
}
