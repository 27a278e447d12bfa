//! The finite set of decodable display-list macros.
//!
//! Grouped by handler class so the table-driven dispatch in `gbd-core`
//! reads the same way this file enumerates handler classes.

/// One decoded logical command. A macro may span more than one 8-byte
/// packet (`DecodedMacro::packet_count`), e.g. a matrix load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MacroId {
    // Display-list control.
    DisplayList,
    BranchList,
    EndDisplayList,
    CullDisplayList,
    BranchLessZ,

    // Segment.
    Segment,
    RelSegment,

    // Matrix.
    Matrix,
    MatrixPop,

    // Geometry mode.
    GeometryMode,

    // Vertex.
    Vertex,

    // Primitives.
    Triangle1,
    Triangle2,
    Quadrangle,
    Line3D,
    TextureRectangle,
    FillRectangle,

    // Other-mode.
    SetOtherModeH,
    SetOtherModeL,

    // Combiner.
    SetCombineMode,

    // Images.
    SetColorImage,
    SetDepthImage,
    SetTextureImage,

    // Scissor.
    SetScissor,

    // Tile / TMEM.
    SetTile,
    SetTileSize,
    LoadBlock,
    LoadTile,
    LoadTlut,

    // Sync.
    PipeSync,
    LoadSync,
    TileSync,
    FullSync,

    // Ucode.
    LoadUcode,

    // Misc.
    SetFillColor,
    NoOpTag,

    /// Unrecognized opcode word; drives `INVALID_GFX_CMD`.
    Invalid,
}

impl MacroId {
    /// Symbolic macro name as printed in the decoded-command trace line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MacroId::DisplayList => "SPDisplayList",
            MacroId::BranchList => "SPBranchList",
            MacroId::EndDisplayList => "SPEndDisplayList",
            MacroId::CullDisplayList => "SPCullDisplayList",
            MacroId::BranchLessZ => "SPBranchLessZraw",
            MacroId::Segment => "SPSegment",
            MacroId::RelSegment => "SPSegmentRelative",
            MacroId::Matrix => "SPMatrix",
            MacroId::MatrixPop => "SPPopMatrix",
            MacroId::GeometryMode => "SPGeometryMode",
            MacroId::Vertex => "SPVertex",
            MacroId::Triangle1 => "SP1Triangle",
            MacroId::Triangle2 => "SP2Triangles",
            MacroId::Quadrangle => "SP1Quadrangle",
            MacroId::Line3D => "SPLine3D",
            MacroId::TextureRectangle => "DPTextureRectangle",
            MacroId::FillRectangle => "DPFillRectangle",
            MacroId::SetOtherModeH => "DPSetOtherModeH",
            MacroId::SetOtherModeL => "DPSetOtherModeL",
            MacroId::SetCombineMode => "DPSetCombineMode",
            MacroId::SetColorImage => "DPSetColorImage",
            MacroId::SetDepthImage => "DPSetDepthImage",
            MacroId::SetTextureImage => "DPSetTextureImage",
            MacroId::SetScissor => "DPSetScissor",
            MacroId::SetTile => "DPSetTile",
            MacroId::SetTileSize => "DPSetTileSize",
            MacroId::LoadBlock => "DPLoadBlock",
            MacroId::LoadTile => "DPLoadTile",
            MacroId::LoadTlut => "DPLoadTLUT",
            MacroId::PipeSync => "DPPipeSync",
            MacroId::LoadSync => "DPLoadSync",
            MacroId::TileSync => "DPTileSync",
            MacroId::FullSync => "DPFullSync",
            MacroId::LoadUcode => "SPLoadUcode",
            MacroId::SetFillColor => "DPSetFillColor",
            MacroId::NoOpTag => "DPNoOpTag",
            MacroId::Invalid => "?invalid?",
        }
    }

    /// Number of 8-byte packets this macro occupies. Every F3DEX2 command
    /// word, including `SP2Triangles` (both triangles pack into the one
    /// 64-bit word's hi/lo 24-bit index blocks), is a single packet; wider
    /// payloads like a matrix load are fetched from their own pointer
    /// rather than the program-counter stream.
    #[must_use]
    pub fn packet_count(self) -> u32 {
        1
    }
}
