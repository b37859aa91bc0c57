//! # LFO Waveforms
//!
//! The low-frequency oscillator that sweeps the delay time. Phase is kept
//! in radians in `[0, 2π)` and every waveform maps it to the unit range
//! `[0, 1]`, which the network then scales by the modulation depth:
//!
//! ```text
//!   Sine      0.5 + 0.5·sin(φ)     ∿∿∿
//!   Triangle  |φ - π| / π          /\/\/
//!   Sawtooth  φ / 2π               /|/|/
//! ```
//!
//! Unipolar output matters: the delay line only ever reads further into
//! the past, never ahead of the base offset.

use std::f32::consts::{PI, TAU};

use nih_plug::prelude::Enum;

/// Shape of the delay-time modulation.
///
/// Switching type is a discrete change and is not ramped.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationType {
    #[id = "sine"]
    Sine,

    #[id = "tri"]
    Triangle,

    #[id = "saw"]
    Sawtooth,
}

impl Default for ModulationType {
    fn default() -> Self {
        ModulationType::Sine
    }
}

impl ModulationType {
    /// Evaluate this waveform at `phase` (radians, `[0, 2π)`).
    #[inline]
    pub fn shape(self, phase: f32) -> f32 {
        match self {
            ModulationType::Sine => 0.5 + 0.5 * phase.sin(),
            ModulationType::Triangle => (phase - PI).abs() / PI,
            ModulationType::Sawtooth => phase / TAU,
        }
    }
}

/// Per-sample phase step for an LFO running at `rate_hz`.
#[inline]
pub fn phase_increment(rate_hz: f32, sample_rate: f32) -> f32 {
    TAU * rate_hz / sample_rate
}

/// Advance `phase` by `increment` and wrap into `[0, 2π)`.
#[inline]
pub fn advance_phase(phase: f32, increment: f32) -> f32 {
    (phase + increment).rem_euclid(TAU)
}
