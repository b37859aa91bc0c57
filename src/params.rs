//! # Plugin Parameters
//!
//! The knobs the host shows and automates. Every value here is plain,
//! unsmoothed host data: smoothing happens inside the feedback network,
//! whose ramps take these values as targets once per block.
//!
//! Parameter IDs are what the host stores in presets and sessions, so
//! they never change once published.
//!
//! Ranges are collected as constants below so that the plugin can size
//! its delay buffers from the same numbers the knobs are limited by.

use nih_plug::prelude::*;

use crate::dsp::lfo::ModulationType;

/// Longest per-node delay offset.
pub const MAX_OFFSET_MS: f32 = 2000.0;
const MIN_OFFSET_MS: f32 = 1.0;

/// Largest LFO excursion on top of the offset.
pub const MAX_DEPTH_MS: f32 = 20.0;

const MIN_RATE_HZ: f32 = 0.01;
const MAX_RATE_HZ: f32 = 20.0;

/// All user-facing parameters.
#[derive(Params)]
pub struct FlangerParams {
    /// Fades the effect in and out over a ramp. When off, only the dry
    /// signal remains.
    #[id = "enabled"]
    pub enabled: BoolParam,

    /// **Offset A**: delay of node A before modulation.
    ///
    /// A few milliseconds gives flanging, 10–30 ms chorus, and anything
    /// longer turns the network into a pair of cross-feeding echoes.
    #[id = "offset_a"]
    pub offset_a: FloatParam,

    /// **Offset B**: delay of node B before modulation.
    #[id = "offset_b"]
    pub offset_b: FloatParam,

    /// **Depth**: how far the LFO pushes both delays, in milliseconds.
    #[id = "depth"]
    pub depth: FloatParam,

    /// **Feedback A**: how much of node A re-enters the shared input.
    /// Negative values invert the polarity of the recirculated signal.
    #[id = "feedback_a"]
    pub feedback_a: FloatParam,

    /// **Feedback B**: how much of node B re-enters the shared input.
    #[id = "feedback_b"]
    pub feedback_b: FloatParam,

    /// **Rate**: LFO speed.
    #[id = "rate"]
    pub rate: FloatParam,

    /// **Waveform**: LFO shape. Switches instantly.
    #[id = "mod_type"]
    pub mod_type: EnumParam<ModulationType>,
}

impl Default for FlangerParams {
    fn default() -> Self {
        Self {
            enabled: BoolParam::new("Enabled", true),

            offset_a: offset_param("Offset A", 5.0),
            offset_b: offset_param("Offset B", 8.0),

            depth: FloatParam::new(
                "Depth",
                2.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: MAX_DEPTH_MS,
                },
            )
            .with_unit(" ms")
            .with_step_size(0.01),

            feedback_a: feedback_param("Feedback A"),
            feedback_b: feedback_param("Feedback B"),

            rate: FloatParam::new(
                "Rate",
                0.5,
                FloatRange::Skewed {
                    min: MIN_RATE_HZ,
                    max: MAX_RATE_HZ,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(0.01),

            mod_type: EnumParam::new("Waveform", ModulationType::Sine),
        }
    }
}

fn offset_param(name: &'static str, default_ms: f32) -> FloatParam {
    FloatParam::new(
        name,
        default_ms,
        // Most of the knob travel goes to the short, flanger/chorus end.
        FloatRange::Skewed {
            min: MIN_OFFSET_MS,
            max: MAX_OFFSET_MS,
            factor: FloatRange::skew_factor(-2.0),
        },
    )
    .with_unit(" ms")
    .with_step_size(0.1)
}

fn feedback_param(name: &'static str) -> FloatParam {
    FloatParam::new(name, 0.2, FloatRange::Linear { min: -1.0, max: 1.0 })
        .with_unit("%")
        .with_value_to_string(formatters::v2s_f32_percentage(1))
        .with_string_to_value(formatters::s2v_f32_percentage())
}
