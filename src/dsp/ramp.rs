//! # Parameter Ramp
//!
//! A ramp glides a control value from where it currently is to a new
//! target over a fixed time, so that moving a knob never produces a step
//! in the audio. Steps in a gain or a delay time are heard as clicks and
//! "zipper noise".
//!
//! The interpolation itself is nih-plug's [`Smoother`] in linear mode.
//! This wrapper adds the three things the feedback network needs on top:
//!
//! - it remembers the sample rate, so callers only pass values;
//! - it ignores repeated targets, so the plugin can push every parameter
//!   once per block without restarting a glide that is already running;
//! - it can apply the ramp straight onto a frame or a block of samples,
//!   either as a gain (multiply) or as an offset (add).
//!
//! ```text
//!   value
//!     ▲            target ─────────────────
//!     │                  /
//!     │                 /   linear, RAMP_TIME_MS long
//!     │                /
//!     │ ──────────────/
//!     └──────────────┬──────────────────────► samples
//!               set_target()
//! ```
//!
//! `Smoother` keeps its current value, target, and remaining step count in
//! atomics, so a target update is always seen whole by the next `next()`.

use nih_plug::prelude::{Smoother, SmoothingStyle};

/// Glide time used by every ramp in the network.
pub const RAMP_TIME_MS: f32 = 50.0;

/// A linear parameter ramp with a fixed glide duration.
pub struct Ramp {
    smoother: Smoother<f32>,

    /// Needed by `Smoother::set_target` to turn milliseconds into steps.
    sample_rate: f32,

    /// The last value passed to [`set_target()`](Self::set_target).
    target: f32,
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new()
    }
}

impl Ramp {
    /// A 50 ms linear ramp resting at 0.0.
    pub fn new() -> Self {
        Self {
            smoother: Smoother::new(SmoothingStyle::Linear(RAMP_TIME_MS)),
            sample_rate: 44100.0,
            target: 0.0,
        }
    }

    /// Configure the ramp for a sample rate.
    ///
    /// With `immediate` the ramp jumps straight to `initial_value`. This is
    /// what the network does after a sample-rate change, where gliding up
    /// from the old value would be an audible sweep. Without it the ramp
    /// glides from its current value.
    pub fn prepare(&mut self, sample_rate: f32, immediate: bool, initial_value: f32) {
        self.sample_rate = sample_rate;
        self.target = initial_value;

        if immediate {
            self.smoother.reset(initial_value);
        } else {
            self.smoother.set_target(sample_rate, initial_value);
        }
    }

    /// Move the ramp's destination.
    ///
    /// A target equal to the current one is ignored unless
    /// `force_immediate` is set, in which case the ramp jumps and the very
    /// next applied value is exactly `value`.
    pub fn set_target(&mut self, value: f32, force_immediate: bool) {
        if force_immediate {
            self.target = value;
            self.smoother.reset(value);
            return;
        }

        if value == self.target {
            return;
        }

        self.target = value;
        self.smoother.set_target(self.sample_rate, value);
    }

    /// The value the ramp is heading towards.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether a glide is still in progress.
    pub fn is_ramping(&self) -> bool {
        self.smoother.is_smoothing()
    }

    /// Advance one sample and return the value to apply for it.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.smoother.next()
    }

    /// Multiply every channel of one frame by the ramp, advancing one step.
    #[inline]
    pub fn apply_gain(&mut self, frame: &mut [f32]) {
        let gain = self.next();
        for sample in frame.iter_mut() {
            *sample *= gain;
        }
    }

    /// Add the ramp to every channel of one frame, advancing one step.
    #[inline]
    pub fn apply_sum(&mut self, frame: &mut [f32]) {
        let offset = self.next();
        for sample in frame.iter_mut() {
            *sample += offset;
        }
    }

    /// Multiply the first `num_samples` of every channel by the ramp,
    /// advancing one step per sample. All channels share the same step.
    pub fn apply_gain_block<C: AsMut<[f32]>>(&mut self, channels: &mut [C], num_samples: usize) {
        for n in 0..num_samples {
            let gain = self.next();
            for channel in channels.iter_mut() {
                if let Some(sample) = channel.as_mut().get_mut(n) {
                    *sample *= gain;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
