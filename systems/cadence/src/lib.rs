#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic cadence system that converts elapsed time into step commands.
//!
//! Frame time arrives as [`Event::TimeAdvanced`] notifications at whatever
//! rate the driving adapter runs; this system accumulates it and emits one
//! [`Command::Step`] per elapsed simulation interval, decoupling infection
//! generations from render cadence.

use std::time::Duration;

use hex_outbreak_core::{Command, DetectionProfile, Event};

/// Steps emitted from a single batch before the remaining backlog is shed,
/// so one oversized tick cannot wedge the loop catching up.
const DEFAULT_MAX_STEPS_PER_BATCH: u32 = 30;

/// Configuration parameters required to construct the cadence system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    step_interval: Duration,
    max_steps_per_batch: u32,
}

impl Config {
    /// Creates a new configuration using the provided step interval.
    #[must_use]
    pub const fn new(step_interval: Duration) -> Self {
        Self {
            step_interval,
            max_steps_per_batch: DEFAULT_MAX_STEPS_PER_BATCH,
        }
    }

    /// Overrides the per-batch catch-up bound.
    #[must_use]
    pub const fn with_max_steps_per_batch(mut self, limit: u32) -> Self {
        self.max_steps_per_batch = limit;
        self
    }
}

/// Pure system that deterministically schedules infection generations.
#[derive(Debug)]
pub struct Cadence {
    step_interval: Duration,
    max_steps_per_batch: u32,
    accumulator: Duration,
}

impl Cadence {
    /// Creates a new cadence system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            step_interval: config.step_interval,
            max_steps_per_batch: config.max_steps_per_batch,
            accumulator: Duration::ZERO,
        }
    }

    /// Consumes events and emits one step command per elapsed interval.
    ///
    /// The detection profile is captured per batch, so every step scheduled
    /// from the same batch runs under the same conditions.
    pub fn handle(&mut self, events: &[Event], profile: DetectionProfile, out: &mut Vec<Command>) {
        if self.step_interval.is_zero() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        let steps = self.resolve_step_count();

        for _ in 0..steps {
            out.push(Command::Step { profile });
        }
    }

    fn resolve_step_count(&mut self) -> u32 {
        let mut steps = 0;
        while self.accumulator >= self.step_interval {
            if steps == self.max_steps_per_batch {
                self.accumulator = Duration::ZERO;
                break;
            }
            self.accumulator -= self.step_interval;
            steps += 1;
        }
        steps
    }
}
