//! The diagnostic taxonomy: every warning/error kind the interpreter can
//! raise, each with a stable identifier, a severity, and a message
//! template.
//!
//! Every kind carries a stable identifier, a severity, and a message
//! template. `gbd-core` never constructs message strings itself — it picks
//! a `Kind` and supplies the arguments the template needs; this module owns
//! the wording so the post-mortem text is centralized in one place.

use std::fmt;

/// Severity of a diagnostic. An `Error` latches the interpreter's
/// "crashed" state; a `Warning` accumulates but never halts the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
        }
    }
}

macro_rules! diagnostic_kinds {
    ($($variant:ident => ($severity:expr, $template:expr)),* $(,)?) => {
        /// A stable diagnostic kind identifier.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Kind {
            $($variant),*
        }

        impl Kind {
            #[must_use]
            pub const fn severity(self) -> Severity {
                match self {
                    $(Kind::$variant => $severity),*
                }
            }

            /// printf-style message template; callers format it with the
            /// contextual arguments named in the template.
            #[must_use]
            pub const fn template(self) -> &'static str {
                match self {
                    $(Kind::$variant => $template),*
                }
            }
        }
    };
}

diagnostic_kinds! {
    // Address.
    AddrNotInRdram => (Severity::Error, "address 0x{:08X} is not within the RDRAM image"),
    RangeNotInRdram => (Severity::Error, "range [0x{:08X}, 0x{:08X}) is not entirely within the RDRAM image"),
    BadCimgAlignment => (Severity::Error, "color image address 0x{:08X} is not 64-byte aligned"),
    BadZimgAlignment => (Severity::Error, "depth image address 0x{:08X} is not 64-byte aligned"),
    DangerousTextureAlignment => (Severity::Warning, "texture image address 0x{:08X} is not 8-byte aligned"),

    // Segment.
    UnsetSegment => (Severity::Warning, "segment {} was never assigned before use"),
    InvalidSegmentNum => (Severity::Error, "segment number {} is out of range [0, 16)"),
    SegzeroNonzero => (Severity::Error, "segment 0 was assigned a nonzero base; this breaks absolute addressing"),

    // Stack.
    DlStackOverflow => (Severity::Error, "display-list call stack overflowed (depth > 18)"),
    MtxStackOverflow => (Severity::Error, "matrix stack overflowed the configured SP DRAM stack size"),
    MtxStackUnderflow => (Severity::Error, "matrix stack pop with no matching push"),
    MtxPopNotModelview => (Severity::Error, "matrix stack pop targets a register other than the modelview stack"),

    // Matrix.
    MtxPushedToProjection => (Severity::Error, "SPMatrix requested push of the projection matrix, which has no stack"),
    MulProjectionUnset => (Severity::Error, "matrix multiply targets the projection register before it was ever loaded"),
    MulModelviewUnset => (Severity::Error, "matrix multiply targets the modelview register before it was ever loaded"),

    // Primitive / format.
    InvalidCimgFmt => (Severity::Error, "color image format {} is not valid for a render target"),
    InvalidCimgFmtsiz => (Severity::Error, "color image format/size combination ({}, {}) is not valid"),
    InvalidTimgFmt => (Severity::Error, "texture image format {} is not a recognized format"),
    InvalidTimgFmtsiz => (Severity::Error, "texture image format/size combination ({}, {}) is not valid"),
    Fillmode4b => (Severity::Error, "a 4-bit color image cannot be rendered to in fill mode"),
    Copymode32b => (Severity::Error, "a 32-bit color image cannot be rendered to in copy mode"),
    TriInFillmode => (Severity::Error, "a triangle or texture rectangle cannot be drawn while in fill mode"),

    // Combiner.
    CcShadeInvalid => (Severity::Warning, "combiner references SHADE but shading is not guaranteed for this primitive"),
    CcShadeAlphaInvalid => (Severity::Warning, "combiner references SHADE_ALPHA but shading is not guaranteed for this primitive"),
    CcCombinedInC1 => (Severity::Error, "first cycle of a two-cycle combiner cannot reference COMBINED"),
    CcCombinedAlphaInC1 => (Severity::Error, "first cycle of a two-cycle combiner cannot reference COMBINED_ALPHA"),
    CcCombinedInC2C1 => (Severity::Error, "one-cycle combiner cannot reference COMBINED"),
    CcCombinedAlphaInC2C1 => (Severity::Error, "one-cycle combiner cannot reference COMBINED_ALPHA"),
    CcTexel1Rgba1Cyc => (Severity::Warning, "one-cycle combiner references TEXEL1, which is undefined in one-cycle mode"),
    CcTexel1RgbC22Cyc => (Severity::Warning, "second cycle of a two-cycle combiner references TEXEL1 RGB, which is stale"),
    CcTexel1AlphaC22Cyc => (Severity::Warning, "second cycle of a two-cycle combiner references TEXEL1_ALPHA, which is stale"),
    CcTexel1RgbaC22Cyc => (Severity::Warning, "second cycle of a two-cycle combiner references TEXEL1, which is stale"),
    CcStagesDiffer1Cyc => (Severity::Warning, "combiner stage 1 and stage 2 differ while in one-cycle mode"),

    // Blender.
    BlenderStagesDiffer1Cyc => (Severity::Warning, "blender stage 1 and stage 2 differ while in one-cycle mode"),
    BlenderSetButUnused => (Severity::Warning, "blender configuration was set but FORCE_BL / depth-write conditions never make it visible"),

    // Sync.
    MissingPipesync => (Severity::Warning, "pipeline state changed while pipe_busy was still set; missing DPPipeSync"),
    MissingLoadsync => (Severity::Warning, "TMEM load state changed while load_busy was still set; missing DPLoadSync"),
    MissingTilesync => (Severity::Warning, "tile descriptor changed while tile_busy was still set; missing DPTileSync"),
    SuperfluousPipesync => (Severity::Warning, "DPPipeSync with pipe_busy already clear"),
    SuperfluousLoadsync => (Severity::Warning, "DPLoadSync with load_busy already clear"),
    SuperfluousTilesync => (Severity::Warning, "DPTileSync with tile_busy already clear"),
    FullsyncSent => (Severity::Warning, "DPFullSync sent; this should occur at most once per frame"),

    // Texture-load.
    TimgLoad4b => (Severity::Error, "DPLoadBlock cannot load a 4-bit texel size"),
    TimgTileLoadNonmatching => (Severity::Warning, "load tile format/size does not match the last-set texture image"),
    TlutBadCoords => (Severity::Error, "DPLoadTLUT coordinates do not describe a valid palette range"),
    TlutTooLarge => (Severity::Error, "DPLoadTLUT would load more than 256 palette entries"),
    TlutBadFmt => (Severity::Error, "DPLoadTLUT texture image format must be RGBA16 or IA16"),
    TlutBadTmemAddr => (Severity::Error, "DPLoadTLUT destination must be in the upper half of TMEM"),
    LoadblockTooManyTexels => (Severity::Error, "DPLoadBlock would load more than 2048 texels"),
    LtbInvalidWidth => (Severity::Error, "load-tile-block texel width is invalid for the current image format"),
    LtbDxtCorruption => (Severity::Warning, "load-tile-block dxt parameter does not match the declared width; TMEM rows will be corrupted"),
    TexCi8NonzeroPal => (Severity::Warning, "CI8 texture references a nonzero palette number, which most ucodes ignore"),
    CiRenderTileNoTlut => (Severity::Error, "render tile is color-indexed but no TLUT has been loaded"),
    NoCiRenderTileTlut => (Severity::Warning, "a TLUT was loaded but the render tile is not color-indexed"),
    CopymodeMismatch8b => (Severity::Error, "copy mode requires the texture image size to match the color image size (8-bit case)"),
    CopymodeMismatch16b => (Severity::Error, "copy mode requires the texture image size to match the color image size (16-bit case)"),
    BadTimgAlignment => (Severity::Warning, "texture image address is not aligned to its format's natural boundary"),
    TimgBadTmemAddr => (Severity::Error, "tile descriptor TMEM address is out of range"),

    // Ucode.
    LoadUnrecognizedUcode => (Severity::Error, "SPLoadUcode text address 0x{:08X} does not match any registered ucode"),

    // Vertex.
    VtxLoadingZero => (Severity::Error, "SPVertex requested loading zero vertices"),
    VtxLoadingTooMany => (Severity::Error, "SPVertex requested loading more than 32 vertices in one call"),
    VtxCacheOverflow => (Severity::Error, "SPVertex destination range overflows the 32-entry vertex cache"),
    ModifyvtxOob => (Severity::Error, "vertex modification targets an index outside the vertex cache"),
    TriVtxOob => (Severity::Error, "primitive references a vertex index outside the vertex cache"),
    TriLeechingVerts => (Severity::Warning, "primitive references a vertex beyond the most recently loaded range"),
    CullingBadVerts => (Severity::Warning, "SPCullDisplayList range extends beyond the most recently loaded range"),
    CullingVertsOob => (Severity::Error, "SPCullDisplayList range is outside the vertex cache"),

    // Other.
    ScissorRegionEmpty => (Severity::Error, "scissor rectangle is empty (lower-right does not exceed upper-left)"),
    ScissorTooWide => (Severity::Warning, "scissor rectangle exceeds the configured framebuffer width"),
    ScissorStartInvalid => (Severity::Error, "scissor region's starting byte address is not within the RDRAM image"),
    ScissorEndInvalid => (Severity::Error, "scissor region's ending byte address is not within the RDRAM image"),
    InvalidGfxCmd => (Severity::Error, "opcode 0x{:02X} does not match any macro in the active ucode"),
    UnkDlVariant => (Severity::Warning, "display-list macro has an unrecognized variant flag; treating it as the base form"),
    UnkNoopTag3 => (Severity::Warning, "NoOp tag field 3 has an unrecognized discriminator value"),
    TexrectPerspCorrect => (Severity::Warning, "DPTextureRectangle was issued with perspective correction enabled, which the RDP does not apply to rects"),
    Rdp2LogInaccurate => (Severity::Warning, "computed log2 of a dimension is not exact; RDP hardware would round differently"),
    ScissorUnset => (Severity::Warning, "a primitive was drawn before any scissor region was set"),
    CimgUnset => (Severity::Error, "a primitive was drawn before any color image was set"),
    FillrectFillcolorUnset => (Severity::Warning, "DPFillRectangle issued before DPSetFillColor"),
    ZsPixelSetWithoutGZbuffer => (Severity::Warning, "z-source is PIXEL but G_ZBUFFER is not set in the geometry mode"),
    ZsrcInvalid => (Severity::Error, "z-source selector has an unrecognized value"),
    FillmodeCimgZimgRdPerPixel => (Severity::Error, "fill mode cannot perform a per-pixel color or depth image read"),
    FillmodeZimgWrPerPixel => (Severity::Error, "fill mode cannot perform a per-pixel depth image write"),
    CopymodeCimgZimgRdPerPixel => (Severity::Error, "copy mode cannot perform a per-pixel color or depth image read"),
    CopymodeZimgWrPerPixel => (Severity::Error, "copy mode cannot perform a per-pixel depth image write"),
    CopymodeAa => (Severity::Error, "copy mode cannot have antialiasing enabled"),
    CopymodeBlSet => (Severity::Error, "copy mode cannot have the blender enabled"),
    CopymodeTextureFilter => (Severity::Error, "copy mode requires point-sampled texture filtering"),
    TiledescBad => (Severity::Error, "tile descriptor index {} is out of range [0, 8)"),
    TriTxtrNoperspective => (Severity::Warning, "textured triangle drawn with texture perspective correction disabled"),
    CullingBadIndices => (Severity::Error, "SPCullDisplayList v0/vn indices are out of order or out of range"),
}

/// A fully-decoded diagnostic instance: a kind plus the formatted message
/// text (contextual arguments already substituted by the caller) and the
/// macro-expansion note line, if this occurred inside a compound macro.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: Kind,
    pub message: String,
    pub expansion_of: Option<&'static str>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: Kind, message: String) -> Self {
        Self {
            kind,
            message,
            expansion_of: None,
        }
    }

    #[must_use]
    pub fn in_expansion_of(mut self, macro_name: &'static str) -> Self {
        self.expansion_of = Some(macro_name);
        self
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.expansion_of {
            writeln!(f, "Note: In expansion of macro '{name}':")?;
        }
        write!(f, "{}: {}", self.severity(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_fatal() {
        assert!(Kind::DlStackOverflow.severity() == Severity::Error);
        assert!(Diagnostic::new(Kind::DlStackOverflow, "x".into()).is_fatal());
    }

    #[test]
    fn warning_kinds_are_not_fatal() {
        assert!(!Diagnostic::new(Kind::UnsetSegment, "x".into()).is_fatal());
    }

    #[test]
    fn expansion_note_is_prefixed() {
        let d = Diagnostic::new(Kind::TriVtxOob, "vertex 9 out of range".into())
            .in_expansion_of("SP1Triangle");
        let text = format!("{d}");
        assert!(text.starts_with("Note: In expansion of macro 'SP1Triangle':"));
    }
}
