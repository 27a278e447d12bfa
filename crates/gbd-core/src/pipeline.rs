//! Coprocessor pipeline state the interpreter tracks in parallel with the
//! display-list walk: other-mode, combiner/blender config, image bindings,
//! scissor, and the busy-flag set the sync commands clear.

use gbd_opcodes::fields::{BlenderConfig, CombinerConfig, CycleType, ImageFormat, OtherMode};

bitflags::bitflags! {
    /// The subset of the F3DEX2 geometry-mode bits this debugger cares
    /// about — chiefly whether `G_ZBUFFER` is set, which the
    /// render-primitive validator requires before depth test/write.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct GeometryMode: u32 {
        const Z_BUFFER = 1 << 0;
        const SHADE = 1 << 1;
        const SHADING_SMOOTH = 1 << 2;
        const CULL_FRONT = 1 << 3;
        const CULL_BACK = 1 << 4;
        const TEXTURE_GEN = 1 << 5;
        const LIGHTING = 1 << 6;
    }
}

/// An image binding (`DPSetColorImage` / `DPSetDepthImage` /
/// `DPSetTextureImage`): format, pixel size, row width in texels, and
/// segmented address.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageBinding {
    pub fmt: u8,
    pub siz: u8,
    pub width: u32,
    pub addr: u32,
}

impl ImageBinding {
    #[must_use]
    pub fn format(self) -> Option<ImageFormat> {
        ImageFormat::from_bits(self.fmt)
    }
}

/// Screen-space scissor rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScissorRect {
    pub ulx: i32,
    pub uly: i32,
    pub lrx: i32,
    pub lry: i32,
}

impl ScissorRect {
    #[must_use]
    pub fn is_empty(self) -> bool {
        !(self.lrx > self.ulx && self.lry > self.uly)
    }
}

/// The full tracked pipeline state.
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    pub other_mode: OtherMode,
    pub combiner: CombinerConfig,
    pub blender: BlenderConfig,
    pub geometry_mode: GeometryMode,
    pub color_image: Option<ImageBinding>,
    pub depth_image: Option<ImageBinding>,
    pub texture_image: Option<ImageBinding>,
    pub scissor: Option<ScissorRect>,
    pub fill_color_set: bool,

    pub pipe_busy: bool,
    /// Set by primitive rendering, cleared only by `LoadSync`. This
    /// heuristic over-reports in practice, so it's gated behind
    /// `Options::warn_load_busy` rather than relied on unconditionally.
    pub load_busy: bool,
    /// Per-tile decay timer: 0 = clean, >0 = busy. Incremented each step
    /// a busy tile survives; resets to 0 once it reaches 2 (tiles
    /// self-clear after one subsequent command).
    pub tile_busy: [u8; crate::tile::TILE_COUNT],

    pub fullsync_seen: bool,
    scissor_cimg_checked: bool,
}

impl PipelineState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive the blender config from the current `other_mode.lo`
    /// render-mode bits. Called after every other-mode update.
    pub fn resync_blender(&mut self) {
        self.blender = BlenderConfig::decode(self.other_mode.render_mode_bits());
    }

    /// Decode and install a combine-mode word pair.
    pub fn set_combine(&mut self, word_hi: u32, word_lo: u32) {
        let word = ((word_hi as u64) << 32) | word_lo as u64;
        self.combiner = CombinerConfig::decode(word);
    }

    pub fn clear_pipesync(&mut self) -> bool {
        let was_busy = self.pipe_busy;
        self.pipe_busy = false;
        was_busy
    }

    pub fn clear_loadsync(&mut self) -> bool {
        let was_busy = self.load_busy;
        self.load_busy = false;
        was_busy
    }

    /// Clears every tile's busy timer; returns whether any tile was busy.
    pub fn clear_tilesync(&mut self) -> bool {
        let was_busy = self.tile_busy.iter().any(|&b| b > 0);
        self.tile_busy = [0; crate::tile::TILE_COUNT];
        was_busy
    }

    pub fn fullsync(&mut self) {
        self.pipe_busy = false;
        self.load_busy = false;
        self.clear_tilesync();
        self.fullsync_seen = true;
    }

    pub fn mark_tile_busy(&mut self, tile: usize) {
        if let Some(slot) = self.tile_busy.get_mut(tile) {
            *slot = 1;
        }
    }

    #[must_use]
    pub fn tile_is_busy(&self, tile: usize) -> bool {
        self.tile_busy.get(tile).copied().unwrap_or(0) > 0
    }

    /// Advance the per-tile decay timers. Called once per driver-loop step.
    pub fn decay_tile_busy(&mut self) {
        for slot in &mut self.tile_busy {
            if *slot > 0 {
                *slot += 1;
                if *slot >= 2 {
                    *slot = 0;
                }
            }
        }
    }

    /// Whether this is the first time a (cimg, scissor) pair has both been
    /// set, so the scissor×cimg bounds cross-check runs exactly once and
    /// doesn't re-fire noise on every subsequent scissor/cimg write.
    #[must_use]
    pub fn scissor_cimg_pair_is_new(&mut self) -> bool {
        if self.scissor_cimg_checked {
            return false;
        }
        if self.color_image.is_some() && self.scissor.is_some() {
            self.scissor_cimg_checked = true;
            return true;
        }
        false
    }

    #[must_use]
    pub fn cycle_type(&self) -> CycleType {
        self.other_mode.cycle_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipesync_clears_pipe_busy_and_reports_prior_state() {
        let mut state = PipelineState::new();
        state.pipe_busy = true;
        assert!(state.clear_pipesync());
        assert!(!state.pipe_busy);
        assert!(!state.clear_pipesync());
    }

    #[test]
    fn fullsync_clears_all_busy_flags_and_latches_seen() {
        let mut state = PipelineState::new();
        state.pipe_busy = true;
        state.load_busy = true;
        state.mark_tile_busy(2);
        state.fullsync();
        assert!(!state.pipe_busy);
        assert!(!state.load_busy);
        assert!(state.tile_busy.iter().all(|b| *b == 0));
        assert!(state.fullsync_seen);
    }

    #[test]
    fn tile_busy_decays_to_clean_after_two_steps() {
        let mut state = PipelineState::new();
        state.mark_tile_busy(0);
        assert!(state.tile_is_busy(0));
        state.decay_tile_busy();
        assert!(!state.tile_is_busy(0));
    }

    #[test]
    fn scissor_rect_with_equal_corners_is_empty() {
        let rect = ScissorRect {
            ulx: 0,
            uly: 0,
            lrx: 0,
            lry: 10,
        };
        assert!(rect.is_empty());
    }

    #[test]
    fn scissor_cimg_pair_checks_exactly_once() {
        let mut state = PipelineState::new();
        assert!(!state.scissor_cimg_pair_is_new());
        state.color_image = Some(ImageBinding::default());
        state.scissor = Some(ScissorRect {
            ulx: 0,
            uly: 0,
            lrx: 1,
            lry: 1,
        });
        assert!(state.scissor_cimg_pair_is_new());
        assert!(!state.scissor_cimg_pair_is_new());
    }
}
