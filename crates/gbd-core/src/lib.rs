//! Display-list interpreter: bytecode walker, pipeline-state tracker, and
//! diagnostic emitter for RDP/RSP microcode graphics tasks.
//!
//! [`analyze`] is the single public entry point; everything else in this
//! crate exists to support it, but the component modules are public so a
//! caller can inspect interpreter state after a run (e.g. in tests).

pub mod address;
pub mod dlstack;
pub mod interpreter;
pub mod matrix;
pub mod options;
pub mod pipeline;
pub mod tile;
pub mod vertex;

mod diagnostics;
mod error;

pub use diagnostics::Diagnostics;
pub use error::AnalyzeError;
pub use interpreter::{DispEntry, Interpreter};
pub use options::{Options, StartLocation};

use std::io::Write;

use gbd_opcodes::decoder::Decoder;
use gbd_opcodes::ucode::{UcodeRegistryEntry, UcodeTag};
use gbd_rdram::RdramBackend;

/// Open `rdram_arg` on `rdram`, run the interpreter loop from `start`, and
/// close the backend on every return path, success or failure.
///
/// Returns `0` on any defined termination of the loop (clean completion or
/// a latched crash — both are "the debugger ran and produced a post-mortem")
/// and `-1` if the run never got far enough to enter the loop (the backend
/// failed to open, or the start pointer couldn't be read).
pub fn analyze(
    out: &mut dyn Write,
    rdram: &mut dyn RdramBackend,
    rdram_arg: &str,
    ucode_registry: &[UcodeRegistryEntry],
    decoder: &dyn Decoder,
    options: &Options,
    start: StartLocation,
) -> i32 {
    if let Err(err) = rdram.open(rdram_arg) {
        log::error!("{}", AnalyzeError::RdramOpenFailed(err));
        return -1;
    }

    let mut interp = Interpreter::new(options.clone(), UcodeTag::F3dex2);
    let result = interp.run(out, rdram, decoder, ucode_registry, start);

    rdram.close();
    result
}
