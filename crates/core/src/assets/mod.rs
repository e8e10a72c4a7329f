use std::path::Path;

use crate::{
    chart::{Action, Chart, ChartStep},
    Result, RhythmError,
};

const QUARTER: f64 = 1.0;
const HALF: f64 = 2.0;

/// Registry of playable charts, addressed by 1-based level number.
#[derive(Debug, Default, Clone)]
pub struct SongLibrary {
    charts: Vec<Chart>,
}

impl SongLibrary {
    pub fn new() -> Self {
        Self { charts: Vec::new() }
    }

    /// Library with the songs that ship on the controller.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        library.register(twinkle_star());
        library
    }

    pub fn register(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    /// Reads a chart from a JSON file and appends it.
    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<&Chart> {
        let raw = std::fs::read_to_string(path)?;
        self.register(Chart::from_json(&raw)?);
        self.charts
            .last()
            .ok_or_else(|| RhythmError::msg("chart vanished after registration"))
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.charts.iter().map(|chart| chart.title.as_str())
    }

    /// Looks up a level. Numbers past the end wrap around, so level 3 of a
    /// two-song library is level 1 again.
    pub fn level(&self, level: usize) -> Result<&Chart> {
        if self.charts.is_empty() || level == 0 {
            return Err(RhythmError::UnknownLevel(level));
        }
        Ok(&self.charts[(level - 1) % self.charts.len()])
    }
}

fn twinkle_star() -> Chart {
    use Action::*;

    let step = |note: &str, units: f64, action: Action| ChartStep::new(note, units, action);
    let rest = |note: &str, units: f64| ChartStep::rest(note, units);

    Chart::new(
        "Twinkle Star",
        vec![
            step("C4", QUARTER, Touch1),
            rest("C4", QUARTER),
            step("G4", QUARTER, Touch2),
            rest("G4", QUARTER),
            step("A4", QUARTER, Touch3),
            rest("A4", QUARTER),
            step("G4", HALF, TiltRight),
            step("F4", QUARTER, Touch4),
            rest("F4", QUARTER),
            step("E4", QUARTER, Touch3),
            rest("E4", QUARTER),
            step("D4", QUARTER, Touch2),
            rest("D4", QUARTER),
            step("C4", HALF, TiltLeft),
        ],
    )
}
