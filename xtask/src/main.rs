/// Bundles the plugin through nih_plug_xtask. Usage:
///
///   cargo xtask bundle fdn-flanger --release
///
/// The bundles land in `target/bundled/` (`FDN Flanger.vst3`, `.clap`).
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
