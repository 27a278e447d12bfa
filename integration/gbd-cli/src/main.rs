//! Command-line entry point: parses flags and the start-location argument,
//! wires up the file-backed RDRAM and the F3DEX2 decoder, and hands off to
//! `gbd_core::analyze`.

use std::io;
use std::process::ExitCode;

use clap::Parser;

use gbd_core::{analyze, Options, StartLocation};
use gbd_opcodes::f3dex2::F3dex2Decoder;
use gbd_opcodes::ucode::{UcodeRegistryEntry, UcodeTag};
use gbd_rdram::FileRdram;

/// Default pointer constant consulted when `<start>` is `AUTO`: the
/// conventional task-data-segment offset where the reference tooling
/// stores the root display-list pointer.
const DEFAULT_START_POINTER: u32 = 0x0000_0000;

#[derive(Parser)]
#[command(name = "gbd-cli")]
#[command(about = "Walk a display list against an RDRAM snapshot and report pipeline violations")]
struct Cli {
    /// RDRAM snapshot file.
    rdram: String,

    /// Start location: a hex literal `0xNNNNNNNN`, a pointer form
    /// `*0xNNNNNNNN`, or `AUTO` to use the default pointer constant.
    start: String,

    /// Text-segment address an `SPLoadUcode` call must target to be
    /// recognized as F3DEX2. May be repeated to register more than one
    /// candidate address for the same ucode image.
    #[arg(long = "ucode-text", value_parser = parse_hex_u32)]
    ucode_text: Vec<u32>,

    /// Suppress non-error diagnostics.
    #[arg(short, long)]
    quiet: bool,

    /// Dump decoded vertex records on each vertex load.
    #[arg(long)]
    print_vertices: bool,

    /// Render a terminal-pixel preview of each loaded texture.
    #[arg(long)]
    print_textures: bool,

    /// Dump the floating-point MVP matrix after each `SPMatrix`.
    #[arg(long)]
    print_matrices: bool,

    /// Dump decoded light structures.
    #[arg(long)]
    print_lights: bool,

    /// Also print sub-packets of compound macros.
    #[arg(long)]
    print_multi_packet: bool,

    /// Emit color arguments in hex rather than decimal.
    #[arg(long)]
    hex_color: bool,

    /// Emit fixed-point arguments wrapped in `qsXY(...)` macros.
    #[arg(long)]
    q_macros: bool,

    /// Terminate after executing the N-th command.
    #[arg(long)]
    to_num: Option<u64>,

    /// Disable cull-display-list culling.
    #[arg(long)]
    no_volume_cull: bool,

    /// Force branch-less-z to never take the branch.
    #[arg(long, conflicts_with = "all_depth_cull")]
    no_depth_cull: bool,

    /// Force branch-less-z to always take the branch.
    #[arg(long)]
    all_depth_cull: bool,

    /// Warn when a texture load command runs while `load_busy` is set.
    /// Over-reports in practice; off by default.
    #[arg(long)]
    warn_load_busy: bool,
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| e.to_string())
}

fn parse_start(s: &str) -> Result<StartLocation, String> {
    if s.eq_ignore_ascii_case("AUTO") {
        return Ok(StartLocation::PointerTo(DEFAULT_START_POINTER));
    }
    if let Some(rest) = s.strip_prefix('*') {
        return parse_hex_u32(rest).map(StartLocation::PointerTo);
    }
    parse_hex_u32(s).map(StartLocation::Literal)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let start = match parse_start(&cli.start) {
        Ok(start) => start,
        Err(err) => {
            log::error!("invalid start location {:?}: {err}", cli.start);
            return ExitCode::from(255);
        }
    };

    let options = Options {
        quiet: cli.quiet,
        print_vertices: cli.print_vertices,
        print_textures: cli.print_textures,
        print_matrices: cli.print_matrices,
        print_lights: cli.print_lights,
        print_multi_packet: cli.print_multi_packet,
        hex_color: cli.hex_color,
        q_macros: cli.q_macros,
        to_num: cli.to_num,
        no_volume_cull: cli.no_volume_cull,
        no_depth_cull: cli.no_depth_cull,
        all_depth_cull: cli.all_depth_cull,
        warn_load_busy: cli.warn_load_busy,
    };

    let registry: Vec<UcodeRegistryEntry> = cli
        .ucode_text
        .iter()
        .map(|&addr| UcodeRegistryEntry::new(addr, UcodeTag::F3dex2))
        .collect();

    let decoder = F3dex2Decoder::new();
    let mut rdram = FileRdram::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let code = analyze(&mut out, &mut rdram, &cli.rdram, &registry, &decoder, &options, start);

    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(255)
    }
}
