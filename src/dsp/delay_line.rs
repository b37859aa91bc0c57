//! # Modulated Delay Line (Ring Buffers)
//!
//! One circular buffer per feedback node. Each node has its own integer
//! delay offset and its own write head, and every sample it reads back at
//! a position pushed further into the past by a (fractional) modulation
//! amount coming from the LFO.
//!
//! ## Reading with modulation
//!
//! ```text
//!            read_base = write_pos - delay
//!                 │
//!   ... ─[ s1 ][ s0 ]─ ... ─[  ][  ][ ▼ write_pos ] ...
//!          ▲     ▲
//!          │     └── read_base - ⌊m⌋
//!          └──────── one sample earlier
//!
//!   output = s0 · (1 - f) + s1 · f        where f = m - ⌊m⌋
//! ```
//!
//! The total delay heard on a node is therefore `delay + m` samples. With
//! `m` integral the interpolation weight is zero and the read is exact.
//!
//! Modulation is clamped to `[0, len - delay - 2]` before use. Below zero
//! the index arithmetic would read ahead of the write head; above the
//! upper bound the two interpolation taps would wrap round past it and
//! pick up samples from a full buffer ago.
//!
//! All memory is allocated in [`prepare()`](DelayLine::prepare). Nothing
//! on the per-sample path allocates.

/// Number of feedback nodes, and so of independent read/write heads.
pub const NUM_NODES: usize = 2;

/// Smallest buffer we ever allocate. Offsets are clamped to
/// `[1, len - 1]`, which needs at least two slots, and modulation needs a
/// couple more to interpolate.
const MIN_LENGTH: usize = 4;

/// The per-node cursor into its ring buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Head {
    /// Integer delay offset in samples, always in `[1, len - 1]`.
    delay: usize,

    /// Where the next sample is written. Always in `[0, len)`.
    write_pos: usize,
}

/// A pair of modulated ring buffers, one per feedback node.
pub struct DelayLine {
    /// One buffer per channel, all `buffer_len` long.
    buffers: Vec<Vec<f32>>,

    heads: [Head; NUM_NODES],

    buffer_len: usize,
}

impl DelayLine {
    /// Allocate `num_channels` zeroed buffers of `max_length` samples.
    pub fn new(max_length: usize, num_channels: usize) -> Self {
        let mut delay_line = Self {
            buffers: Vec::new(),
            heads: [Head::default(); NUM_NODES],
            buffer_len: 0,
        };
        delay_line.prepare(max_length, num_channels);
        delay_line
    }

    /// Reallocate for a new length and channel count.
    ///
    /// Buffers are zero-filled and write heads go back to 0. Delay offsets
    /// are re-clamped into the new length. Must not run concurrently with
    /// [`process()`](Self::process).
    pub fn prepare(&mut self, max_length: usize, num_channels: usize) {
        self.buffer_len = max_length.max(MIN_LENGTH);
        self.buffers = (0..num_channels)
            .map(|_| vec![0.0; self.buffer_len])
            .collect();

        let [delay_a, delay_b] = self.delay_samples();
        for head in &mut self.heads {
            head.write_pos = 0;
        }
        self.set_delay_samples(delay_a, delay_b);
    }

    /// Fill every buffer with silence and rewind the write heads.
    /// Keeps the allocation.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        for head in &mut self.heads {
            head.write_pos = 0;
        }
    }

    /// Set the integer delay of node A and node B.
    ///
    /// Each value is saturated into `[1, len - 1]`.
    pub fn set_delay_samples(&mut self, samples_a: usize, samples_b: usize) {
        let max_delay = self.buffer_len - 1;
        self.heads[0].delay = samples_a.clamp(1, max_delay);
        self.heads[1].delay = samples_b.clamp(1, max_delay);
    }

    /// The current (clamped) delay offsets of node A and node B.
    pub fn delay_samples(&self) -> [usize; NUM_NODES] {
        [self.heads[0].delay, self.heads[1].delay]
    }

    /// Length of each ring buffer in samples.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Number of allocated channel buffers.
    pub fn num_channels(&self) -> usize {
        self.buffers.len()
    }

    /// Process one sample on every node.
    ///
    /// For node `i`: read the modulated, interpolated delayed sample into
    /// `output[i]`, write `input[i]` at the write head, then advance the
    /// head. `num_channels` is clamped to what is allocated and to the
    /// lengths of the three slices.
    pub fn process(
        &mut self,
        output: &mut [f32],
        input: &[f32],
        modulation: &[f32],
        num_channels: usize,
    ) {
        let num_channels = num_channels
            .min(self.buffers.len())
            .min(NUM_NODES)
            .min(output.len())
            .min(input.len())
            .min(modulation.len());

        let len = self.buffer_len;

        for ch in 0..num_channels {
            let head = &mut self.heads[ch];
            let buffer = &mut self.buffers[ch];

            // Step 1: read base, `delay` samples behind the write head.
            let read_base = head.write_pos + len - head.delay;

            // Step 2: split the modulation into whole and fractional parts.
            let max_modulation = len.saturating_sub(head.delay + 2) as f32;
            let m = modulation[ch].clamp(0.0, max_modulation);
            let m_int = m as usize;
            let frac = m - m_int as f32;

            // Step 3: interpolate between the tap and the one before it.
            let index_0 = (read_base - m_int) % len;
            let index_1 = (read_base - m_int - 1) % len;
            output[ch] = interpolate(buffer[index_0], buffer[index_1], frac);

            // Steps 4 and 5: write, then advance this node's head.
            buffer[head.write_pos] = input[ch];
            head.write_pos = (head.write_pos + 1) % len;
        }
    }
}

/// Linear interpolation between two adjacent buffer samples.
///
/// For `frac` in `[0, 1]` the result always lies between `s0` and `s1`.
#[inline]
pub fn interpolate(s0: f32, s1: f32, frac: f32) -> f32 {
    s0 * (1.0 - frac) + s1 * frac
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Run a single-channel sequence through node A with a constant
    /// modulation and collect the outputs.
    fn run_node_a(dl: &mut DelayLine, inputs: &[f32], modulation: f32) -> Vec<f32> {
        inputs
            .iter()
            .map(|&x| {
                let mut out = [0.0; NUM_NODES];
                dl.process(&mut out, &[x, 0.0], &[modulation, 0.0], NUM_NODES);
                out[0]
            })
            .collect()
    }

    /// Buffer length 8, offset 3, no modulation: an impulse at sample 0
    /// comes out at sample 3 and nowhere else.
    #[test]
    fn test_impulse_pure_integer_delay() {
        let mut dl = DelayLine::new(8, 2);
        dl.set_delay_samples(3, 3);

        let mut impulse = vec![0.0; 16];
        impulse[0] = 1.0;

        let output = run_node_a(&mut dl, &impulse, 0.0);
        for (n, &y) in output.iter().enumerate() {
            let expected = if n == 3 { 1.0 } else { 0.0 };
            assert!(
                (y - expected).abs() < 1e-6,
                "Sample {n}: expected {expected}, got {y}"
            );
        }
    }

    /// Whole-sample modulation adds directly to the delay.
    #[test]
    fn test_integer_modulation_extends_delay() {
        let mut dl = DelayLine::new(16, 2);
        dl.set_delay_samples(2, 2);

        let mut impulse = vec![0.0; 12];
        impulse[0] = 1.0;

        let output = run_node_a(&mut dl, &impulse, 3.0);
        assert!((output[5] - 1.0).abs() < 1e-6, "Expected impulse at 5: {output:?}");
        assert!(output.iter().enumerate().all(|(n, y)| n == 5 || y.abs() < 1e-6));
    }

    /// Half a sample of modulation splits the impulse over two outputs.
    #[test]
    fn test_fractional_modulation_interpolates() {
        let mut dl = DelayLine::new(16, 2);
        dl.set_delay_samples(2, 2);

        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;

        let output = run_node_a(&mut dl, &impulse, 0.5);
        assert!((output[2] - 0.5).abs() < 1e-6, "Got {output:?}");
        assert!((output[3] - 0.5).abs() < 1e-6, "Got {output:?}");
    }

    /// Negative modulation behaves like zero.
    #[test]
    fn test_negative_modulation_is_clamped() {
        let mut a = DelayLine::new(16, 2);
        let mut b = DelayLine::new(16, 2);
        a.set_delay_samples(4, 4);
        b.set_delay_samples(4, 4);

        let inputs: Vec<f32> = (0..20).map(|i| (i as f32 * 0.3).sin()).collect();
        assert_eq!(run_node_a(&mut a, &inputs, -2.5), run_node_a(&mut b, &inputs, 0.0));
    }

    /// The two nodes keep separate offsets and buffers.
    #[test]
    fn test_nodes_are_independent() {
        let mut dl = DelayLine::new(16, 2);
        dl.set_delay_samples(2, 5);

        let mut hits = [None, None];
        for n in 0..10 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let mut out = [0.0; NUM_NODES];
            dl.process(&mut out, &[x, x], &[0.0, 0.0], NUM_NODES);
            for node in 0..NUM_NODES {
                if out[node] > 0.5 {
                    hits[node] = Some(n);
                }
            }
        }

        assert_eq!(hits, [Some(2), Some(5)]);
    }

    #[test]
    fn test_set_delay_samples_saturates() {
        let mut dl = DelayLine::new(8, 2);

        dl.set_delay_samples(0, 100);
        assert_eq!(dl.delay_samples(), [1, 7]);
    }

    /// Clamping the same out-of-range value twice lands on the same value.
    #[test]
    fn test_clamp_is_idempotent() {
        let mut dl = DelayLine::new(8, 2);

        dl.set_delay_samples(1000, 0);
        let once = dl.delay_samples();
        dl.set_delay_samples(1000, 0);
        assert_eq!(dl.delay_samples(), once);
    }

    /// Asking for more channels than allocated only processes what exists.
    #[test]
    fn test_channel_count_is_clamped() {
        let mut dl = DelayLine::new(8, 1);
        dl.set_delay_samples(1, 1);

        let mut out = [9.0; NUM_NODES];
        dl.process(&mut out, &[1.0, 1.0], &[0.0, 0.0], 8);

        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 9.0).abs() < 1e-6, "Unallocated node must be untouched");
    }

    #[test]
    fn test_clear_silences_buffers() {
        let mut dl = DelayLine::new(8, 2);
        dl.set_delay_samples(1, 1);
        run_node_a(&mut dl, &[1.0, 1.0, 1.0], 0.0);

        dl.clear();

        let output = run_node_a(&mut dl, &[0.0; 8], 0.0);
        assert!(output.iter().all(|y| y.abs() < 1e-6), "Got {output:?}");
        assert_eq!(dl.buffer_len(), 8);
    }

    /// Reallocating keeps offsets valid for the new length.
    #[test]
    fn test_prepare_reclamps_offsets() {
        let mut dl = DelayLine::new(64, 2);
        dl.set_delay_samples(40, 10);

        dl.prepare(16, 2);
        assert_eq!(dl.delay_samples(), [15, 10]);
        assert_eq!(dl.num_channels(), 2);
    }

    /// Excess modulation saturates instead of wrapping past the write head.
    #[test]
    fn test_excess_modulation_saturates() {
        let mut dl = DelayLine::new(8, 2);
        dl.set_delay_samples(2, 2);

        // Maximum usable modulation is 8 - 2 - 2 = 4, so total delay 6.
        let mut impulse = vec![0.0; 12];
        impulse[0] = 1.0;
        let output = run_node_a(&mut dl, &impulse, 100.0);

        assert!((output[6] - 1.0).abs() < 1e-6, "Got {output:?}");
    }

    #[test]
    fn test_interpolation_stays_between_neighbours() {
        let pairs = [(0.0, 1.0), (-1.0, 0.5), (0.3, 0.3), (2.0, -2.0)];
        for (s0, s1) in pairs {
            let lo = f32::min(s0, s1);
            let hi = f32::max(s0, s1);
            for step in 0..=10 {
                let frac = step as f32 / 10.0;
                let y = interpolate(s0, s1, frac);
                assert!(
                    y >= lo - 1e-6 && y <= hi + 1e-6,
                    "interpolate({s0}, {s1}, {frac}) = {y} outside [{lo}, {hi}]"
                );
            }
        }
    }
}
