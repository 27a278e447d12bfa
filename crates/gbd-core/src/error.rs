//! Startup failures that keep [`crate::analyze`] from ever entering the
//! interpreter loop. These return `-1` without producing a post-mortem,
//! since the RDRAM image itself could not be read.

use gbd_rdram::RdramError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("failed to open RDRAM backend: {0}")]
    RdramOpenFailed(#[from] RdramError),
    #[error("start pointer could not be read from RDRAM")]
    StartPointerUnreadable,
}
