//! The RDRAM backend abstraction: a seven-operation contract the
//! Interpreter drives all memory reads through, modeled as a trait instead
//! of a C vtable of function pointers so the interpreter stays generic
//! over how the snapshot bytes are actually stored.

use std::io;

mod file;

pub use file::FileRdram;

/// Errors a [`RdramBackend`] can report. `Io` wraps the underlying
/// transport failure; the others are protocol-level misuse the Interpreter
/// should never trigger but a test double might.
#[derive(Debug, thiserror::Error)]
pub enum RdramError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("seek to 0x{addr:08X} is out of range (image is {size} bytes)")]
    SeekOutOfRange { addr: u64, size: u64 },

    #[error("backend was not open")]
    NotOpen,
}

/// The backend abstraction the Interpreter reads RDRAM through, so a
/// `gbd-core` handler never needs to know whether it's reading a real
/// snapshot file or a `Vec<u8>`-backed test fixture.
pub trait RdramBackend {
    /// Open the backend. `arg` is backend-specific (a path, for the file
    /// backend). Returns `Ok(())` on success.
    fn open(&mut self, arg: &str) -> Result<(), RdramError>;

    /// Release any held resources. Called on every return path from
    /// `analyze`, success or failure.
    fn close(&mut self);

    /// Current cursor position.
    fn pos(&self) -> u64;

    /// Whether `addr` falls within the backing image.
    fn addr_valid(&self, addr: u32) -> bool;

    /// Move the cursor to `addr`. Returns `false` (not an error, just a
    /// miss) if `addr` is out of range.
    fn seek(&mut self, addr: u32) -> bool;

    /// Read up to `buf.len()` bytes from the current cursor, advancing it.
    /// Returns the number of bytes actually read (a short read at EOF is
    /// not an error).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RdramError>;

    /// Combined seek + read: fill `buf` entirely from `addr`, or return
    /// `false` if the full range is not addressable.
    fn read_at(&mut self, addr: u32, buf: &mut [u8]) -> Result<bool, RdramError>;
}
