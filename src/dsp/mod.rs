//! # DSP Building Blocks
//!
//! - **`ramp`**: linear parameter glides, so no control change is heard
//!   as a step.
//! - **`delay_line`**: two ring buffers read at fractional, audio-rate
//!   modulated positions.
//! - **`lfo`**: the unipolar waveforms that sweep the delay time.
//! - **`network`**: the two-node recursive topology tying them together.

pub mod delay_line;
pub mod lfo;
pub mod network;
pub mod ramp;
