use std::{cell::Cell, time::Instant};

/// Source of monotonic time in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-clock-immune clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to. Drives simulations and tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    time_seconds: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(seconds: f64) -> Self {
        Self {
            time_seconds: Cell::new(seconds),
        }
    }

    /// Starts a new timebase at zero. Engines started against the old
    /// timebase must not be ticked again.
    pub fn reset(&self) {
        self.time_seconds.set(0.0);
    }

    /// Moves the clock forward to `seconds`. Earlier readings are ignored.
    pub fn set(&self, seconds: f64) {
        self.time_seconds.set(seconds.max(self.time_seconds.get()));
    }

    pub fn advance(&self, delta: f64) {
        self.time_seconds
            .set((self.time_seconds.get() + delta.max(0.0)).max(0.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time_seconds.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}
