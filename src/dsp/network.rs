//! # Two-Node Recursive Feedback Network
//!
//! Two modulated delay taps that feed each other. Both feedback paths are
//! summed into one shared input before it enters the delay lines, which
//! is what makes this a recursive network and not two separate delays:
//!
//! ```text
//!                 ┌──────────── × gain A ◄──────────────┐
//!                 │                                     │
//!                 │   ┌──────── × gain B ◄──────────┐   │
//!                 ▼   ▼                             │   │
//!   input ──────►(  +  )──┬──► [delay A + mod A] ───┼───┴──► out 0
//!                         │                         │
//!                         └──► [delay B + mod B] ───┴──────► out 1
//!
//!   mod X = depth · lfo(phase X) + offset X
//! ```
//!
//! The two LFOs run at the same rate a quarter cycle apart, so the nodes
//! sweep out of step and a mono source comes out wide.
//!
//! ## Per-sample pipeline
//!
//! [`tick()`](FeedbackNetwork::tick) is the whole audio-rate algorithm:
//!
//! 1. evaluate both LFOs
//! 2. advance and wrap both phases
//! 3. scale by the depth ramp, add each node's offset ramp
//! 4. scale each node's previous output by its feedback-gain ramp
//! 5. sum input and both feedback contributions
//! 6. run the delay line, store its outputs as the new feedback state
//! 7. emit both node outputs
//!
//! Nothing else carries over between samples except the phases, the
//! feedback state, the ramps, and the delay line's write heads.
//!
//! ## Loop gain
//!
//! When both nodes sit at the same delay their outputs are equal, and the
//! loop gain is `gain A + gain B`. Keep the sum of magnitudes at or below
//! 1 for a loop that never grows.

use std::f32::consts::FRAC_PI_2;

use super::delay_line::{DelayLine, NUM_NODES};
use super::lfo::{advance_phase, phase_increment, ModulationType};
use super::ramp::Ramp;

/// Fixed delay reserved in the delay line under the modulated part.
/// Offsets are measured from zero, so this much is subtracted from them.
pub const BASE_DELAY_MS: f32 = 1.0;

/// Extra slots beyond the longest delay so the interpolation taps never
/// touch the write head.
const HEADROOM_SAMPLES: usize = 2;

/// Phase of node B relative to node A at reset: a quarter cycle.
const QUADRATURE: f32 = FRAC_PI_2;

/// Convert milliseconds to (fractional) samples.
#[inline]
fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Everything one feedback node owns.
struct Node {
    /// Modulation offset on top of the base delay, in samples.
    offset: Ramp,
    feedback_gain: Ramp,

    /// LFO phase in radians, `[0, 2π)`.
    phase: f32,

    /// This node's output from the previous sample.
    state: f32,

    /// Last values from the setters, kept so `prepare()` can rebuild the
    /// ramp targets for a new sample rate.
    offset_ms: f32,
    feedback_target: f32,
}

impl Node {
    fn new(phase: f32) -> Self {
        Self {
            offset: Ramp::new(),
            feedback_gain: Ramp::new(),
            phase,
            state: 0.0,
            offset_ms: 0.0,
            feedback_target: 0.0,
        }
    }
}

/// The modulated two-node feedback network.
pub struct FeedbackNetwork {
    sample_rate: f32,

    delay_line: DelayLine,

    /// Node A then node B.
    nodes: [Node; NUM_NODES],

    /// Modulation depth in samples, shared by both nodes.
    depth: Ramp,
    depth_ms: f32,

    modulation_rate_hz: f32,
    phase_increment: f32,
    modulation_type: ModulationType,

    /// Integer samples reserved by [`BASE_DELAY_MS`].
    base_delay: usize,
}

impl FeedbackNetwork {
    /// Build a network for a 48 kHz stream with room for `max_time_ms`.
    /// Call [`prepare()`](Self::prepare) once the real rate is known.
    pub fn new(max_time_ms: f32, num_channels: usize) -> Self {
        let sample_rate = 48000.0;
        let base_delay = Self::base_delay_for(sample_rate);

        let mut network = Self {
            sample_rate,
            delay_line: DelayLine::new(
                Self::buffer_len_for(sample_rate, max_time_ms, base_delay),
                num_channels,
            ),
            nodes: [Node::new(0.0), Node::new(QUADRATURE)],
            depth: Ramp::new(),
            depth_ms: 0.0,
            modulation_rate_hz: 0.0,
            phase_increment: 0.0,
            modulation_type: ModulationType::default(),
            base_delay,
        };
        network.delay_line.set_delay_samples(base_delay, base_delay);
        network
    }

    fn base_delay_for(sample_rate: f32) -> usize {
        (ms_to_samples(BASE_DELAY_MS, sample_rate).ceil() as usize).max(1)
    }

    fn buffer_len_for(sample_rate: f32, max_time_ms: f32, base_delay: usize) -> usize {
        let max_time = ms_to_samples(max_time_ms.max(0.0), sample_rate).ceil() as usize;
        max_time + base_delay + HEADROOM_SAMPLES
    }

    /// Resize for a new sample rate, maximum time, and channel count.
    ///
    /// Reallocates and clears the delay line, resets the LFOs to
    /// quadrature, clears the feedback state, and jumps every ramp to the
    /// last value its setter received. Not to be called while processing.
    pub fn prepare(&mut self, sample_rate: f32, max_time_ms: f32, num_channels: usize) {
        nih_plug::nih_debug_assert!(sample_rate > 0.0);

        self.sample_rate = sample_rate;
        self.base_delay = Self::base_delay_for(sample_rate);

        self.delay_line.prepare(
            Self::buffer_len_for(sample_rate, max_time_ms, self.base_delay),
            num_channels,
        );
        self.delay_line
            .set_delay_samples(self.base_delay, self.base_delay);

        let depth = self.depth_samples(self.depth_ms);
        self.depth.prepare(sample_rate, true, depth);

        for (i, node) in self.nodes.iter_mut().enumerate() {
            let offset = offset_samples(node.offset_ms, sample_rate, self.base_delay);
            node.offset.prepare(sample_rate, true, offset);
            node.feedback_gain
                .prepare(sample_rate, true, node.feedback_target);
            node.phase = i as f32 * QUADRATURE;
            node.state = 0.0;
        }

        self.phase_increment = phase_increment(self.modulation_rate_hz, sample_rate);
    }

    /// Silence the delay line and the feedback state. No reallocation.
    pub fn clear(&mut self) {
        self.delay_line.clear();
        for node in &mut self.nodes {
            node.state = 0.0;
        }
    }

    /// Process a block.
    ///
    /// `inputs` and `outputs` are per-channel views, valid for this call
    /// only. The network hears the mean of the first `num_channels` input
    /// channels. Node A goes to output 0 and node B to output 1; with a
    /// single output channel the two are averaged. Slices shorter than
    /// `num_samples` shorten the block.
    pub fn process<O, I>(
        &mut self,
        outputs: &mut [O],
        inputs: &[I],
        num_channels: usize,
        num_samples: usize,
    ) where
        O: AsMut<[f32]>,
        I: AsRef<[f32]>,
    {
        let num_inputs = num_channels.min(inputs.len());
        let num_outputs = num_channels.min(outputs.len());
        if num_inputs == 0 || num_outputs == 0 {
            return;
        }

        let num_samples = inputs[..num_inputs]
            .iter()
            .map(|channel| channel.as_ref().len())
            .chain(outputs[..num_outputs].iter_mut().map(|c| c.as_mut().len()))
            .fold(num_samples, usize::min);
        let input_scale = 1.0 / num_inputs as f32;

        for n in 0..num_samples {
            let input: f32 = inputs[..num_inputs]
                .iter()
                .map(|channel| channel.as_ref()[n])
                .sum::<f32>()
                * input_scale;

            let [a, b] = self.tick(input);

            if num_outputs == 1 {
                outputs[0].as_mut()[n] = 0.5 * (a + b);
            } else {
                outputs[0].as_mut()[n] = a;
                outputs[1].as_mut()[n] = b;
                for channel in outputs[NUM_NODES..num_outputs].iter_mut() {
                    channel.as_mut()[n] = 0.0;
                }
            }
        }
    }

    /// Run the network for one sample of mono input and return the
    /// outputs of node A and node B.
    #[inline]
    pub fn tick(&mut self, input: f32) -> [f32; NUM_NODES] {
        // 1. LFO values for both nodes
        let mut modulation = [0.0; NUM_NODES];
        for (m, node) in modulation.iter_mut().zip(&self.nodes) {
            *m = self.modulation_type.shape(node.phase);
        }

        // 2. Advance phases
        for node in &mut self.nodes {
            node.phase = advance_phase(node.phase, self.phase_increment);
        }

        // 3. Unit LFO → absolute samples on top of the base delay
        self.depth.apply_gain(&mut modulation);
        for (m, node) in modulation.iter_mut().zip(&mut self.nodes) {
            *m += node.offset.next();
        }

        // 4. and 5. Damped feedback from both nodes into one shared input
        let mut delay_input = input;
        for node in &mut self.nodes {
            delay_input += node.state * node.feedback_gain.next();
        }

        // 6. Delay line
        let mut delayed = [0.0; NUM_NODES];
        self.delay_line.process(
            &mut delayed,
            &[delay_input; NUM_NODES],
            &modulation,
            NUM_NODES,
        );
        for (node, &y) in self.nodes.iter_mut().zip(&delayed) {
            node.state = y;
        }

        // 7. Emit
        delayed
    }

    fn depth_samples(&self, depth_ms: f32) -> f32 {
        ms_to_samples(depth_ms, self.sample_rate)
    }

    /// Delay offset of both nodes, in milliseconds.
    pub fn set_offset(&mut self, offset_ms: f32) {
        self.set_offset_a(offset_ms);
        self.set_offset_b(offset_ms);
    }

    /// Delay offset of node A, in milliseconds.
    pub fn set_offset_a(&mut self, offset_ms: f32) {
        self.set_node_offset(0, offset_ms, false);
    }

    /// Delay offset of node B, in milliseconds.
    pub fn set_offset_b(&mut self, offset_ms: f32) {
        self.set_node_offset(1, offset_ms, false);
    }

    fn set_node_offset(&mut self, node: usize, offset_ms: f32, force: bool) {
        let offset = offset_samples(offset_ms, self.sample_rate, self.base_delay);
        let node = &mut self.nodes[node];
        node.offset_ms = offset_ms.max(0.0);
        node.offset.set_target(offset, force);
    }

    /// Modulation depth in milliseconds. Negative values become 0.
    pub fn set_depth(&mut self, depth_ms: f32) {
        self.depth_ms = depth_ms.max(0.0);
        let depth = self.depth_samples(self.depth_ms);
        self.depth.set_target(depth, false);
    }

    /// Feedback gain from node A into the shared input, clamped to `[-1, 1]`.
    pub fn set_feedback_gain_a(&mut self, gain: f32) {
        self.set_node_feedback(0, gain, false);
    }

    /// Feedback gain from node B into the shared input, clamped to `[-1, 1]`.
    pub fn set_feedback_gain_b(&mut self, gain: f32) {
        self.set_node_feedback(1, gain, false);
    }

    fn set_node_feedback(&mut self, node: usize, gain: f32, force: bool) {
        let node = &mut self.nodes[node];
        node.feedback_target = gain.clamp(-1.0, 1.0);
        node.feedback_gain.set_target(node.feedback_target, force);
    }

    /// LFO rate in Hz. Negative values become 0.
    pub fn set_modulation_rate(&mut self, rate_hz: f32) {
        self.modulation_rate_hz = rate_hz.max(0.0);
        self.phase_increment = phase_increment(self.modulation_rate_hz, self.sample_rate);
    }

    /// LFO waveform. Takes effect on the next sample, without ramping.
    pub fn set_modulation_type(&mut self, modulation_type: ModulationType) {
        self.modulation_type = modulation_type;
    }

    /// Jump every ramp to its current target so the next sample already
    /// uses the values last passed to the setters. Used once at start-up.
    pub fn snap_to_targets(&mut self) {
        let depth = self.depth.target();
        self.depth.set_target(depth, true);

        for i in 0..NUM_NODES {
            let offset_ms = self.nodes[i].offset_ms;
            let feedback = self.nodes[i].feedback_target;
            self.set_node_offset(i, offset_ms, true);
            self.set_node_feedback(i, feedback, true);
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn modulation_type(&self) -> ModulationType {
        self.modulation_type
    }

    /// LFO phases of node A and node B, in radians.
    pub fn phases(&self) -> [f32; NUM_NODES] {
        [self.nodes[0].phase, self.nodes[1].phase]
    }

    /// Outputs of node A and node B from the last processed sample.
    pub fn feedback_state(&self) -> [f32; NUM_NODES] {
        [self.nodes[0].state, self.nodes[1].state]
    }

    /// Target feedback gains of node A and node B after clamping.
    pub fn feedback_gains(&self) -> [f32; NUM_NODES] {
        [self.nodes[0].feedback_target, self.nodes[1].feedback_target]
    }

    /// Target total delay of each node in samples: base delay plus offset.
    pub fn delay_samples(&self) -> [f32; NUM_NODES] {
        let [base_a, base_b] = self.delay_line.delay_samples();
        [
            base_a as f32 + self.nodes[0].offset.target(),
            base_b as f32 + self.nodes[1].offset.target(),
        ]
    }

    /// Longest delay either node can reach at the current targets,
    /// including the full LFO excursion.
    pub fn max_delay_samples(&self) -> f32 {
        let [a, b] = self.delay_samples();
        a.max(b) + self.depth.target()
    }
}

/// Offset ramp target for `offset_ms`, with the base delay taken off.
fn offset_samples(offset_ms: f32, sample_rate: f32, base_delay: usize) -> f32 {
    (ms_to_samples(offset_ms, sample_rate) - base_delay as f32).max(0.0)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
