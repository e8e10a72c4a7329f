use serde::{Deserialize, Serialize};

use crate::{chart::Action, mapping::LaneCue};

/// 8-bit RGB color as sent to the strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
}

/// LED strip collaborator. The engine decides what to show, the
/// implementation decides how it reaches the hardware.
pub trait LaneDisplay {
    fn set_lane_pixel(&mut self, index: usize, color: Rgb);
    fn clear_all(&mut self);
    fn flush(&mut self);
}

/// Physical run of pixels used by one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSegment {
    /// Pixel that shows position 0.
    pub start: usize,
    /// Whether increasing positions walk up or down the strip.
    pub reversed: bool,
    pub color: Rgb,
}

impl LaneSegment {
    pub fn pixel(&self, position: u8) -> Option<usize> {
        let offset = usize::from(position);
        if self.reversed {
            self.start.checked_sub(offset)
        } else {
            self.start.checked_add(offset)
        }
    }
}

/// Static lane table for a serpentine strip folded into four 7-pixel rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripLayout {
    pub pixel_count: usize,
    touch: [LaneSegment; 4],
    tilt_left: LaneSegment,
    tilt_right: LaneSegment,
    double_tap: LaneSegment,
}

impl Default for StripLayout {
    fn default() -> Self {
        let segment = |start, reversed, color| LaneSegment {
            start,
            reversed,
            color,
        };
        Self {
            pixel_count: 28,
            touch: [
                segment(0, false, Rgb(255, 0, 0)),
                segment(13, true, Rgb(0, 255, 0)),
                segment(14, false, Rgb(0, 0, 255)),
                segment(27, true, Rgb(255, 255, 0)),
            ],
            tilt_left: segment(27, true, Rgb(0, 255, 255)),
            tilt_right: segment(13, true, Rgb(255, 255, 255)),
            double_tap: segment(0, false, Rgb(255, 0, 255)),
        }
    }
}

impl StripLayout {
    pub fn segment(&self, action: Action) -> &LaneSegment {
        match action {
            Action::Touch1 => &self.touch[0],
            Action::Touch2 => &self.touch[1],
            Action::Touch3 => &self.touch[2],
            Action::Touch4 => &self.touch[3],
            Action::TiltLeft => &self.tilt_left,
            Action::TiltRight => &self.tilt_right,
            Action::DoubleTap => &self.double_tap,
        }
    }

    /// Pixel and color for a cue, `None` when it falls off the strip.
    pub fn locate(&self, cue: &LaneCue) -> Option<(usize, Rgb)> {
        let segment = self.segment(cue.action);
        segment
            .pixel(cue.position)
            .filter(|&pixel| pixel < self.pixel_count)
            .map(|pixel| (pixel, segment.color))
    }

    /// Redraws the whole strip from `cues` and pushes it out.
    pub fn draw<D: LaneDisplay + ?Sized>(&self, cues: &[LaneCue], display: &mut D) {
        display.clear_all();
        for cue in cues {
            if let Some((pixel, color)) = self.locate(cue) {
                display.set_lane_pixel(pixel, color);
            }
        }
        display.flush();
    }
}

/// In-memory strip, used by the simulator and in tests.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pixels: Vec<Rgb>,
    frames: usize,
}

impl FrameBuffer {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            pixels: vec![Rgb::OFF; pixel_count],
            frames: 0,
        }
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Number of flushes so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn lit(&self) -> impl Iterator<Item = (usize, Rgb)> + '_ {
        self.pixels
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, color)| *color != Rgb::OFF)
    }
}

impl LaneDisplay for FrameBuffer {
    fn set_lane_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    fn clear_all(&mut self) {
        self.pixels.fill(Rgb::OFF);
    }

    fn flush(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(action: Action, position: u8) -> LaneCue {
        LaneCue {
            node: 0,
            action,
            position,
        }
    }

    #[test]
    fn serpentine_rows_alternate_direction() {
        let layout = StripLayout::default();
        assert_eq!(layout.locate(&cue(Action::Touch1, 6)), Some((6, Rgb(255, 0, 0))));
        assert_eq!(layout.locate(&cue(Action::Touch2, 6)), Some((7, Rgb(0, 255, 0))));
        assert_eq!(layout.locate(&cue(Action::Touch3, 0)), Some((14, Rgb(0, 0, 255))));
        assert_eq!(layout.locate(&cue(Action::Touch4, 6)), Some((21, Rgb(255, 255, 0))));
    }

    #[test]
    fn drops_cues_that_fall_off_the_strip() {
        let layout = StripLayout::default();
        assert_eq!(layout.locate(&cue(Action::Touch4, 200)), None);
        assert_eq!(layout.locate(&cue(Action::Touch3, 20)), None);
    }

    #[test]
    fn draw_replaces_the_previous_frame() {
        let layout = StripLayout::default();
        let mut strip = FrameBuffer::new(layout.pixel_count);

        layout.draw(&[cue(Action::Touch1, 1), cue(Action::TiltLeft, 0)], &mut strip);
        let lit: Vec<_> = strip.lit().collect();
        assert_eq!(lit, vec![(1, Rgb(255, 0, 0)), (27, Rgb(0, 255, 255))]);

        layout.draw(&[], &mut strip);
        assert_eq!(strip.lit().count(), 0);
        assert_eq!(strip.frames(), 2);
    }
}
