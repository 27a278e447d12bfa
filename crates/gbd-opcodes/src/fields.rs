//! Packed pipeline-configuration field decoding: image formats, OtherMode
//! subfields, the color combiner mux selectors, and the blender selectors.

use bits::Bitfield;

/// Image pixel format (`fmt` field of color/depth/texture image bindings
/// and tile descriptors).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ImageFormat {
    Rgba = 0,
    Yuv = 1,
    ColorIndex = 2,
    IntensityAlpha = 3,
    Intensity = 4,
}

impl ImageFormat {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x7 {
            0 => Some(Self::Rgba),
            1 => Some(Self::Yuv),
            2 => Some(Self::ColorIndex),
            3 => Some(Self::IntensityAlpha),
            4 => Some(Self::Intensity),
            _ => None,
        }
    }
}

/// Image pixel size (`siz` field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ImageSize {
    Bits4 = 0,
    Bits8 = 1,
    Bits16 = 2,
    Bits32 = 3,
}

impl ImageSize {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x3 {
            0 => Some(Self::Bits4),
            1 => Some(Self::Bits8),
            2 => Some(Self::Bits16),
            3 => Some(Self::Bits32),
            _ => None,
        }
    }

    /// Bytes per texel (rounded down; 4-bit texels are handled specially
    /// by callers since two texels share a byte).
    #[must_use]
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            ImageSize::Bits4 => 0,
            ImageSize::Bits8 => 1,
            ImageSize::Bits16 => 2,
            ImageSize::Bits32 => 4,
        }
    }
}

/// RDP cycle type, `OtherMode.cycle_type`, consulted by the render-primitive
/// validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CycleType {
    OneCycle = 0,
    TwoCycle = 1,
    Copy = 2,
    Fill = 3,
}

impl CycleType {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::OneCycle,
            1 => Self::TwoCycle,
            2 => Self::Copy,
            _ => Self::Fill,
        }
    }
}

/// Per-primitive Z source selection, `OtherMode.z_src_sel`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZSrcSel {
    Pixel,
    Primitive,
}

/// The 64-bit OtherMode word, split into hi (set-mode-H half) and lo
/// (set-mode-L half). Subfield shifts below follow the historical
/// libultra `G_MDSFT_*` partitioning of the two halves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OtherMode {
    pub hi: u32,
    pub lo: u32,
}

const F_ALPHADITHER: Bitfield = Bitfield::new(4, 2);
const F_RGBDITHER: Bitfield = Bitfield::new(6, 2);
const F_COMBKEY: Bitfield = Bitfield::new(8, 1);
const F_TEXTCONV: Bitfield = Bitfield::new(9, 3);
const F_TEXTFILT: Bitfield = Bitfield::new(12, 2);
const F_TEXTLUT: Bitfield = Bitfield::new(14, 2);
const F_TEXTLOD: Bitfield = Bitfield::new(16, 1);
const F_TEXTDETAIL: Bitfield = Bitfield::new(17, 2);
const F_TEXTPERSP: Bitfield = Bitfield::new(19, 1);
const F_CYCLETYPE: Bitfield = Bitfield::new(20, 2);
const F_PIPELINE: Bitfield = Bitfield::new(23, 1);

const F_ALPHACOMPARE: Bitfield = Bitfield::new(0, 2);
const F_ZSRCSEL: Bitfield = Bitfield::new(2, 1);
const F_RENDERMODE: Bitfield = Bitfield::new(3, 27);

impl OtherMode {
    #[must_use]
    pub fn cycle_type(self) -> CycleType {
        CycleType::from_bits(F_CYCLETYPE.extract(self.hi as u64) as u8)
    }

    #[must_use]
    pub fn texture_persp_enabled(self) -> bool {
        F_TEXTPERSP.extract(self.hi as u64) != 0
    }

    #[must_use]
    pub fn texture_lut(self) -> u8 {
        F_TEXTLUT.extract(self.hi as u64) as u8
    }

    #[must_use]
    pub fn z_src_sel(self) -> ZSrcSel {
        if F_ZSRCSEL.extract(self.lo as u64) != 0 {
            ZSrcSel::Primitive
        } else {
            ZSrcSel::Pixel
        }
    }

    #[must_use]
    pub fn render_mode_bits(self) -> u32 {
        F_RENDERMODE.extract(self.lo as u64) as u32
    }

    #[must_use]
    pub fn z_compare_enabled(self) -> bool {
        self.render_mode_bits() & (1 << 1) != 0 // Z_CMP, bit 4 overall (bit1 within the field)
    }

    #[must_use]
    pub fn z_update_enabled(self) -> bool {
        self.render_mode_bits() & (1 << 2) != 0 // Z_UPD
    }

    #[must_use]
    pub fn image_read_enabled(self) -> bool {
        self.render_mode_bits() & (1 << 3) != 0 // IM_RD
    }

    #[must_use]
    pub fn aa_enabled(self) -> bool {
        self.render_mode_bits() & 1 != 0 // AA_EN
    }

    #[must_use]
    pub fn force_blend(self) -> bool {
        self.render_mode_bits() & (1 << 11) != 0 // FORCE_BL
    }

    /// Apply a bitfield-granular write: `shift`/`len` describe a window
    /// within the combined 64-bit word (hi in the high 32 bits, per the
    /// `DPSetOtherMode` partial-write encoding), `data` supplies the new
    /// bits.
    pub fn set_bits(&mut self, shift: u32, len: u32, data: u32) {
        let mut combined = ((self.hi as u64) << 32) | (self.lo as u64);
        let f = Bitfield::new(shift, len);
        combined = f.insert(combined, data as u64);
        self.hi = (combined >> 32) as u32;
        self.lo = combined as u32;
    }
}

/// One muxer selector's source.
///
/// This debugger cares about five specific sources for validation
/// (`COMBINED`, `COMBINED_ALPHA`, `TEXEL1`, `TEXEL1_ALPHA`, `SHADE`); all
/// other encodings are tracked opaquely as `Other(raw)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcInput {
    Combined,
    CombinedAlpha,
    Texel0,
    Texel0Alpha,
    Texel1,
    Texel1Alpha,
    Shade,
    ShadeAlpha,
    Other(u8),
}

impl CcInput {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Combined,
            1 => Self::Texel0,
            2 => Self::Texel1,
            3 => Self::Shade,
            9 => Self::CombinedAlpha,
            10 => Self::Texel0Alpha,
            11 => Self::Texel1Alpha,
            13 => Self::ShadeAlpha,
            other => Self::Other(other),
        }
    }
}

/// One decoded combiner cycle: the four RGB slots and four alpha slots
/// (a,b,c,d x RGB,alpha x cycle1,cycle2 is the full 16-selector layout).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CcCycle {
    pub rgb_a: u8,
    pub rgb_b: u8,
    pub rgb_c: u8,
    pub rgb_d: u8,
    pub alpha_a: u8,
    pub alpha_b: u8,
    pub alpha_c: u8,
    pub alpha_d: u8,
}

impl CcCycle {
    #[must_use]
    pub fn rgb_inputs(self) -> [CcInput; 4] {
        [
            CcInput::from_raw(self.rgb_a),
            CcInput::from_raw(self.rgb_b),
            CcInput::from_raw(self.rgb_c),
            CcInput::from_raw(self.rgb_d),
        ]
    }

    #[must_use]
    pub fn alpha_inputs(self) -> [CcInput; 4] {
        [
            CcInput::from_raw(self.alpha_a),
            CcInput::from_raw(self.alpha_b),
            CcInput::from_raw(self.alpha_c),
            CcInput::from_raw(self.alpha_d),
        ]
    }

    #[must_use]
    pub fn references_texel1(self) -> bool {
        self.rgb_inputs()
            .iter()
            .chain(self.alpha_inputs().iter())
            .any(|i| matches!(i, CcInput::Texel1 | CcInput::Texel1Alpha))
    }

    #[must_use]
    pub fn references_combined(self) -> bool {
        self.rgb_inputs()
            .iter()
            .chain(self.alpha_inputs().iter())
            .any(|i| matches!(i, CcInput::Combined | CcInput::CombinedAlpha))
    }

    #[must_use]
    pub fn references_shade(self) -> bool {
        self.rgb_inputs()
            .iter()
            .chain(self.alpha_inputs().iter())
            .any(|i| matches!(i, CcInput::Shade | CcInput::ShadeAlpha))
    }
}

/// The two-cycle combiner configuration, decoded from the 64-bit
/// `DPSetCombineMode` hi/lo words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombinerConfig {
    pub cycle1: CcCycle,
    pub cycle2: CcCycle,
}

const F_CC1_RGB_A: Bitfield = Bitfield::new(52, 4);
const F_CC1_RGB_B: Bitfield = Bitfield::new(28, 4);
const F_CC1_RGB_C: Bitfield = Bitfield::new(47, 5);
const F_CC1_RGB_D: Bitfield = Bitfield::new(15, 3);
const F_CC2_RGB_A: Bitfield = Bitfield::new(48, 4);
const F_CC2_RGB_B: Bitfield = Bitfield::new(24, 4);
const F_CC2_RGB_C: Bitfield = Bitfield::new(42, 5);
const F_CC2_RGB_D: Bitfield = Bitfield::new(12, 3);
const F_CC1_ALPHA_A: Bitfield = Bitfield::new(44, 3);
const F_CC1_ALPHA_B: Bitfield = Bitfield::new(12, 3);
const F_CC1_ALPHA_C: Bitfield = Bitfield::new(41, 3);
const F_CC1_ALPHA_D: Bitfield = Bitfield::new(9, 3);
const F_CC2_ALPHA_A: Bitfield = Bitfield::new(38, 3);
const F_CC2_ALPHA_B: Bitfield = Bitfield::new(9, 3);
const F_CC2_ALPHA_C: Bitfield = Bitfield::new(35, 3);
const F_CC2_ALPHA_D: Bitfield = Bitfield::new(6, 3);

impl CombinerConfig {
    /// Decode from the combined 64-bit `(hi << 32) | lo` combine-mode word
    /// (mirrors the real RDP `SetCombine` packing used by libultra's
    /// `gsDPSetCombineLERP`).
    #[must_use]
    pub fn decode(word: u64) -> Self {
        Self {
            cycle1: CcCycle {
                rgb_a: F_CC1_RGB_A.extract(word) as u8,
                rgb_b: F_CC1_RGB_B.extract(word) as u8,
                rgb_c: F_CC1_RGB_C.extract(word) as u8,
                rgb_d: F_CC1_RGB_D.extract(word) as u8,
                alpha_a: F_CC1_ALPHA_A.extract(word) as u8,
                alpha_b: F_CC1_ALPHA_B.extract(word) as u8,
                alpha_c: F_CC1_ALPHA_C.extract(word) as u8,
                alpha_d: F_CC1_ALPHA_D.extract(word) as u8,
            },
            cycle2: CcCycle {
                rgb_a: F_CC2_RGB_A.extract(word) as u8,
                rgb_b: F_CC2_RGB_B.extract(word) as u8,
                rgb_c: F_CC2_RGB_C.extract(word) as u8,
                rgb_d: F_CC2_RGB_D.extract(word) as u8,
                alpha_a: F_CC2_ALPHA_A.extract(word) as u8,
                alpha_b: F_CC2_ALPHA_B.extract(word) as u8,
                alpha_c: F_CC2_ALPHA_C.extract(word) as u8,
                alpha_d: F_CC2_ALPHA_D.extract(word) as u8,
            },
        }
    }

    #[must_use]
    pub fn stages_differ(self) -> bool {
        self.cycle1 != self.cycle2
    }
}

/// One blend cycle's four two-bit selectors (m1a/m1b/m2a/m2b; the full
/// blender config has 8 across both cycles).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlendCycle {
    pub p: u8,
    pub a: u8,
    pub m: u8,
    pub b: u8,
}

/// The two-cycle blender configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlenderConfig {
    pub cycle1: BlendCycle,
    pub cycle2: BlendCycle,
}

const F_BL_C1_P: Bitfield = Bitfield::new(30, 2);
const F_BL_C1_A: Bitfield = Bitfield::new(26, 2);
const F_BL_C1_M: Bitfield = Bitfield::new(22, 2);
const F_BL_C1_B: Bitfield = Bitfield::new(18, 2);
const F_BL_C2_P: Bitfield = Bitfield::new(28, 2);
const F_BL_C2_A: Bitfield = Bitfield::new(24, 2);
const F_BL_C2_M: Bitfield = Bitfield::new(20, 2);
const F_BL_C2_B: Bitfield = Bitfield::new(16, 2);

impl BlenderConfig {
    /// Decode from the render-mode bits of `OtherMode.lo` (the blend
    /// selectors occupy the top bits of the render-mode field, matching
    /// libultra's `GBL_c1`/`GBL_c2` packing).
    #[must_use]
    pub fn decode(render_mode_bits: u32) -> Self {
        let word = render_mode_bits as u64;
        Self {
            cycle1: BlendCycle {
                p: F_BL_C1_P.extract(word) as u8,
                a: F_BL_C1_A.extract(word) as u8,
                m: F_BL_C1_M.extract(word) as u8,
                b: F_BL_C1_B.extract(word) as u8,
            },
            cycle2: BlendCycle {
                p: F_BL_C2_P.extract(word) as u8,
                a: F_BL_C2_A.extract(word) as u8,
                m: F_BL_C2_M.extract(word) as u8,
                b: F_BL_C2_B.extract(word) as u8,
            },
        }
    }

    #[must_use]
    pub fn stages_differ(self) -> bool {
        self.cycle1 != self.cycle2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_type_decodes_all_four_values() {
        assert_eq!(CycleType::from_bits(0), CycleType::OneCycle);
        assert_eq!(CycleType::from_bits(1), CycleType::TwoCycle);
        assert_eq!(CycleType::from_bits(2), CycleType::Copy);
        assert_eq!(CycleType::from_bits(3), CycleType::Fill);
    }

    #[test]
    fn othermode_set_bits_is_windowed() {
        let mut m = OtherMode::default();
        m.set_bits(20, 2, 0b11); // cycle type = FILL
        assert_eq!(m.cycle_type(), CycleType::Fill);
    }

    #[test]
    fn cc_cycle_detects_texel1_reference() {
        let cycle = CcCycle {
            rgb_a: 2, // Texel1
            ..Default::default()
        };
        assert!(cycle.references_texel1());
    }

    #[test]
    fn combiner_config_round_trips_through_field_positions() {
        // rgb_a of cycle1 occupies bits [55:52].
        let word = 0b1010u64 << 52;
        let cfg = CombinerConfig::decode(word);
        assert_eq!(cfg.cycle1.rgb_a, 0b1010);
    }
}
