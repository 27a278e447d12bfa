//! The `Decoder` collaborator contract: the Interpreter never looks at raw
//! command bytes itself, it asks a `Decoder` for the next logical macro and
//! reads typed arguments back out of the result.

use crate::macro_id::MacroId;

/// Typed argument payload for one decoded macro. Variants line up with the
/// handler classes in `gbd-core`; a macro that needs no arguments beyond
/// its id (the sync family, `SPEndDisplayList`) carries `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum MacroArgs {
    None,
    /// `SPDisplayList` / `SPBranchList`: call or branch target (segmented).
    DlTarget { target: u32 },
    /// `SPCullDisplayList`: vertex range.
    Cull { v0: u32, vn: u32 },
    /// `SPBranchLessZraw`: branch target, vertex slot, z threshold raw bits.
    BranchLessZ {
        dl: u32,
        vtx: u32,
        zval_raw: i32,
    },
    /// `SPSegment` / `SPSegmentRelative`: segment number and base.
    Segment { seg: u32, base: u32 },
    /// `SPMatrix`: segmented pointer and the packed parameter byte.
    Matrix { ptr: u32, param: u8 },
    /// `SPGeometryMode`: bits to clear then bits to set, applied in that
    /// order against the running `GeometryMode` state.
    GeometryMode { clear: u32, set: u32 },
    /// `SPVertex`: segmented source address, count, destination offset.
    Vertex { vaddr: u32, n: u32, v0: u32 },
    /// Triangle / quadrangle / line: up to four vertex-cache indices (only
    /// the first two are meaningful for a line).
    Primitive { indices: [u32; 4], count: u32 },
    /// `SP2Triangles`: both triangles' vertex-cache indices, packed into the
    /// hi/lo halves of a single command word.
    TwoTriangles { first: [u32; 3], second: [u32; 3] },
    /// `DPTextureRectangle` / `DPFillRectangle`: screen-space rect plus,
    /// for textured rects, the render tile index.
    Rect {
        ulx: i32,
        uly: i32,
        lrx: i32,
        lry: i32,
        tile: u8,
    },
    /// `DPSetOtherModeH` / `DPSetOtherModeL`, full-word form.
    OtherModeSet { hi: u32, lo: u32 },
    /// `DPSetOtherModeH` / `DPSetOtherModeL`, bitfield-granular form.
    OtherModeBits { shift: u32, len: u32, data: u32 },
    /// `DPSetCombineMode`: the two packed 32-bit words.
    Combine { word_hi: u32, word_lo: u32 },
    /// `DPSetColorImage` / `DPSetDepthImage` / `DPSetTextureImage`.
    SetImage {
        fmt: u8,
        siz: u8,
        width: u32,
        addr: u32,
    },
    /// `DPSetScissor`.
    Scissor {
        ulx: i32,
        uly: i32,
        lrx: i32,
        lry: i32,
    },
    /// `DPSetTile`.
    SetTile {
        tile: u8,
        fmt: u8,
        siz: u8,
        line: u32,
        tmem_addr: u32,
    },
    /// `DPSetTileSize`.
    SetTileSize {
        tile: u8,
        uls: u32,
        ult: u32,
        lrs: u32,
        lrt: u32,
    },
    /// `DPLoadBlock`.
    LoadBlock {
        tile: u8,
        uls: u32,
        ult: u32,
        lrs: u32,
        dxt: u32,
    },
    /// `DPLoadTile`.
    LoadTile {
        tile: u8,
        uls: u32,
        ult: u32,
        lrs: u32,
        lrt: u32,
    },
    /// `DPLoadTLUT`.
    LoadTlut { tile: u8, lrs: u32 },
    /// `SPLoadUcode` / `SPLoadUcodeEx`: segmented text pointer.
    LoadUcode { text_addr: u32 },
    /// `DPSetFillColor`.
    FillColor { color: u32 },
    /// NoOp tag (opcode 0): discriminator plus an optional free-form byte
    /// range in RDRAM for the string-tag case.
    NoOpTag {
        discriminator: u32,
        string_ptr: Option<u32>,
    },
}

/// One fully-decoded logical command: a macro id, the packet count it
/// occupies, typed arguments, and a pretty-printed rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMacro {
    pub id: MacroId,
    pub packet_count: u32,
    pub args: MacroArgs,
    pub pretty: String,
}

/// Decodes raw display-list bytes into [`DecodedMacro`]s. Implementors own
/// the bit layout of a particular microcode's command words; the
/// interpreter is generic over this trait and knows nothing about packet
/// encoding.
pub trait Decoder {
    /// Decode the command beginning at `bytes[0]`. `bytes` is guaranteed by
    /// the caller to hold at least 8 bytes (one packet); compound macros
    /// that need more are responsible for reporting a `packet_count`
    /// greater than 1 and reading any extra packets out of the same slice
    /// if the caller supplied them, or out of a follow-on fetch the
    /// interpreter performs on request.
    fn decode_at(&self, bytes: &[u8]) -> DecodedMacro;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_args_equality_distinguishes_variants() {
        let a = MacroArgs::Segment { seg: 1, base: 0 };
        let b = MacroArgs::Segment { seg: 2, base: 0 };
        assert_ne!(a, b);
    }
}
