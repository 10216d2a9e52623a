//! Optional timing and counting hooks for the detection pipeline.
//!
//! The pipeline reports into an [`Instrument`]; [`NoopInstrument`] disables
//! measurement entirely and [`StageTimings`] accumulates per-stage totals.
//! Implementations must be `Sync` because parallel workers share one sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pipeline stage being timed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Decode,
    Filter,
    Suppress,
    Write,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Decode, Stage::Filter, Stage::Suppress, Stage::Write];

    fn index(self) -> usize {
        match self {
            Stage::Decode => 0,
            Stage::Filter => 1,
            Stage::Suppress => 2,
            Stage::Write => 3,
        }
    }
}

/// Quantities counted by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Anchors passing the confidence filter.
    Candidates,
    /// Detections written to the output.
    Kept,
}

impl Counter {
    fn index(self) -> usize {
        match self {
            Counter::Candidates => 0,
            Counter::Kept => 1,
        }
    }
}

/// Sink for pipeline measurements.
pub trait Instrument: Sync {
    /// When false the pipeline skips clock reads entirely.
    fn enabled(&self) -> bool {
        true
    }

    /// Records time spent in one invocation of `stage`.
    fn record(&self, stage: Stage, elapsed: Duration);

    /// Adds `n` to `counter`.
    fn count(&self, _counter: Counter, _n: usize) {}
}

/// Instrument that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInstrument;

impl Instrument for NoopInstrument {
    fn enabled(&self) -> bool {
        false
    }

    fn record(&self, _stage: Stage, _elapsed: Duration) {}
}

/// Thread-safe accumulator of per-stage wall time and counters.
#[derive(Debug, Default)]
pub struct StageTimings {
    nanos: [AtomicU64; 4],
    calls: [AtomicU64; 4],
    counters: [AtomicU64; 2],
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time accumulated for `stage`.
    pub fn total(&self, stage: Stage) -> Duration {
        Duration::from_nanos(self.nanos[stage.index()].load(Ordering::Relaxed))
    }

    /// Number of recorded invocations of `stage`.
    pub fn calls(&self, stage: Stage) -> u64 {
        self.calls[stage.index()].load(Ordering::Relaxed)
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Clears all totals.
    pub fn reset(&self) {
        for v in self.nanos.iter().chain(&self.calls).chain(&self.counters) {
            v.store(0, Ordering::Relaxed);
        }
    }
}

impl Instrument for StageTimings {
    fn record(&self, stage: Stage, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos[stage.index()].fetch_add(nanos, Ordering::Relaxed);
        self.calls[stage.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn count(&self, counter: Counter, n: usize) {
        self.counters[counter.index()].fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Runs `f`, reporting its duration to `inst` when enabled.
#[inline]
pub(crate) fn timed<I, T>(inst: &I, stage: Stage, f: impl FnOnce() -> T) -> T
where
    I: Instrument + ?Sized,
{
    if !inst.enabled() {
        return f();
    }
    let start = Instant::now();
    let out = f();
    inst.record(stage, start.elapsed());
    out
}
