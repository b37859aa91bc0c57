//! # FDN Flanger: A Two-Node Recursive Modulated Delay
//!
//! A flanger/chorus built with [nih-plug](https://github.com/robbert-vdh/nih-plug),
//! exported as CLAP, VST3, and (through clap-wrapper) AUv2. Two
//! LFO-modulated delay taps feed back into one shared input, so each
//! node's echoes re-enter both nodes.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬──────────────────────────────────────────────────────────┐
//!         │                                                          │
//!         │   ┌──────────────── feedback network ───────────────┐    │
//!         │   │                                                  │    │
//!         └──►│ (+) ──► [delay A ~ LFO A] ──┬──────────► node A ─┼─┐  │
//!             │  ▲  ──► [delay B ~ LFO B] ──┼──┬───────► node B ─┼─┤  │
//!             │  │                          │  │                 │ │  │
//!             │  └──── × fb A ◄─────────────┘  │                 │ │  │
//!             │  └──── × fb B ◄────────────────┘                 │ │  │
//!             └──────────────────────────────────────────────────┘ │  │
//!                                                                  ▼  ▼
//!                                                  × enable ramp ──► (+) ──► Output
//! ```
//!
//! The wet network output is summed on top of the untouched dry signal.

pub mod dsp;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::delay_line::NUM_NODES;
use dsp::network::FeedbackNetwork;
use dsp::ramp::Ramp;
use nih_plug::prelude::*;
use params::{FlangerParams, MAX_DEPTH_MS, MAX_OFFSET_MS};

/// Longest delay the buffers must hold: full offset plus full depth.
const MAX_TIME_MS: f32 = MAX_OFFSET_MS + MAX_DEPTH_MS;

/// Loop gain below which the feedback tail is treated as silent.
const SILENT_LOOP_GAIN: f32 = 0.001;

/// Plugin state.
///
/// Parameters are shared with the host through the `Arc`. Everything else
/// belongs to the audio thread and is only touched from `initialize()`,
/// `reset()`, and `process()`.
struct FdnFlanger {
    params: Arc<FlangerParams>,

    network: FeedbackNetwork,

    /// Fades the wet signal when the `enabled` switch flips.
    enable: Ramp,

    /// Wet signal for the current block, one channel per host channel.
    /// Sized to the host's largest block in `initialize()`.
    fx_buffer: Vec<Vec<f32>>,
}

impl Default for FdnFlanger {
    fn default() -> Self {
        Self {
            params: Arc::new(FlangerParams::default()),
            network: FeedbackNetwork::new(MAX_TIME_MS, NUM_NODES),
            enable: Ramp::new(),
            fx_buffer: Vec::new(),
        }
    }
}

impl FdnFlanger {
    /// Push the current parameter values into the network and the enable
    /// ramp. With `force`, every ramp jumps to its new value instead of
    /// gliding; used once after `initialize()` so the first block does not
    /// sweep up from zero.
    fn update_parameters(&mut self, force: bool) {
        let params = &self.params;

        self.network.set_offset_a(params.offset_a.value());
        self.network.set_offset_b(params.offset_b.value());
        self.network.set_depth(params.depth.value());
        self.network.set_feedback_gain_a(params.feedback_a.value());
        self.network.set_feedback_gain_b(params.feedback_b.value());
        self.network.set_modulation_rate(params.rate.value());
        self.network.set_modulation_type(params.mod_type.value());

        let enabled = if params.enabled.value() { 1.0 } else { 0.0 };
        self.enable.set_target(enabled, force);

        if force {
            self.network.snap_to_targets();
        }
    }

    /// How long the host should keep calling `process()` after the input
    /// goes silent.
    ///
    /// Each pass round the loop scales the signal by at most the summed
    /// feedback magnitude `g`, so it takes `log(0.001) / log(g)` passes
    /// to fall by 60 dB. At `g >= 1` the loop never decays.
    fn tail(&self) -> ProcessStatus {
        let [gain_a, gain_b] = self.network.feedback_gains();
        let loop_gain = gain_a.abs() + gain_b.abs();
        // One extra sample per pass: feedback re-enters on the next sample.
        let pass_samples = self.network.max_delay_samples() + 1.0;

        if loop_gain >= 1.0 {
            ProcessStatus::KeepAlive
        } else if loop_gain > SILENT_LOOP_GAIN {
            let passes = -3.0 / loop_gain.log10();
            ProcessStatus::Tail((passes * pass_samples).ceil() as u32)
        } else {
            ProcessStatus::Tail(pass_samples.ceil() as u32)
        }
    }
}

impl Plugin for FdnFlanger {
    const NAME: &'static str = "FDN Flanger";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first: the two nodes map onto left and right. A mono track
    // still runs both nodes and hears their average.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Blocks are split at automation points, so the once-per-block
    // parameter push below lands on the right sample.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Size every buffer for the host's sample rate, channel count, and
    /// largest block. This is the only place the plugin allocates.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let Some(num_channels) = audio_io_layout.main_output_channels else {
            nih_log!("FDN Flanger needs a main output bus");
            return false;
        };
        let num_channels = num_channels.get() as usize;
        let sample_rate = buffer_config.sample_rate;
        let max_block = buffer_config.max_buffer_size as usize;

        // The network always runs both nodes, whatever the host layout.
        self.network.prepare(sample_rate, MAX_TIME_MS, NUM_NODES);
        self.enable.prepare(sample_rate, true, 0.0);
        self.fx_buffer = vec![vec![0.0; max_block]; num_channels];

        self.update_parameters(true);

        nih_log!(
            "FDN Flanger initialized: {sample_rate} Hz, {num_channels} channel(s), \
             blocks up to {max_block} samples"
        );

        true
    }

    /// Playback stopped: drop every echo still circulating.
    fn reset(&mut self) {
        self.network.clear();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.update_parameters(false);

        let num_samples = buffer.samples();
        let num_channels = buffer.channels().min(self.fx_buffer.len());
        nih_debug_assert!(self.fx_buffer.iter().all(|c| c.len() >= num_samples));

        // Wet signal into the scratch buffer, faded by the enable ramp...
        self.network.process(
            &mut self.fx_buffer,
            buffer.as_slice_immutable(),
            num_channels,
            num_samples,
        );
        self.enable.apply_gain_block(&mut self.fx_buffer, num_samples);

        // ...then summed onto the dry signal in place.
        for (channel, wet) in buffer.as_slice().iter_mut().zip(&self.fx_buffer) {
            for (sample, fx) in channel.iter_mut().zip(wet) {
                *sample += fx;
            }
        }

        self.tail()
    }
}

impl ClapPlugin for FdnFlanger {
    const CLAP_ID: &'static str = "com.loveless-audio.fdn-flanger";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A two-node recursive modulated delay for flanging and chorus");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Flanger,
        ClapFeature::Chorus,
    ];
}

impl Vst3Plugin for FdnFlanger {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssFdnFlngr001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Modulation];
}

nih_export_clap!(FdnFlanger);
nih_export_vst3!(FdnFlanger);

// AUv2 entry point for Logic Pro, wrapping the CLAP export.
clap_wrapper::export_auv2!();
