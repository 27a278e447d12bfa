//! F3DEX2 command-word decoding: the one concrete [`Decoder`] this crate
//! ships. Bit positions follow the historical F3DEX2 ucode's packing of
//! its `Gwords` command structs.

use crate::decoder::{DecodedMacro, Decoder, MacroArgs};
use crate::macro_id::MacroId;
use bits::Bitfield;

const OP: Bitfield = Bitfield::new(56, 8);

fn be_word(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(word)
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Decodes a plain F3DEX2 command stream. Opcode byte values follow the
/// historical libultra `gbi.h` assignments for this ucode family.
#[derive(Clone, Copy, Debug, Default)]
pub struct F3dex2Decoder;

impl F3dex2Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn decode_word(word: u64) -> (MacroId, MacroArgs, String) {
        let op = OP.extract(word) as u8;
        match op {
            0x00 => {
                let discriminator = Bitfield::new(48, 8).extract(word) as u32;
                (
                    MacroId::NoOpTag,
                    MacroArgs::NoOpTag {
                        discriminator,
                        string_ptr: if discriminator == 3 {
                            Some(word as u32)
                        } else {
                            None
                        },
                    },
                    format!("gsDPNoOpTag3(0x{:02X})", discriminator),
                )
            }
            0x01 => {
                let n = Bitfield::new(44, 8).extract(word) as u32;
                let v0 = Bitfield::new(33, 7).extract(word) as u32;
                let vaddr = word as u32;
                (
                    MacroId::Vertex,
                    MacroArgs::Vertex { vaddr, n, v0 },
                    format!("gsSPVertex(0x{vaddr:08X}, {n}, {v0})"),
                )
            }
            0x03 => {
                let v0 = Bitfield::new(33, 12).extract(word) as u32 / 2;
                let vn = Bitfield::new(21, 12).extract(word) as u32 / 2;
                (
                    MacroId::CullDisplayList,
                    MacroArgs::Cull { v0, vn },
                    format!("gsSPCullDisplayList({v0}, {vn})"),
                )
            }
            0x04 => {
                let dl = word as u32;
                let vtx = Bitfield::new(33, 12).extract(word) as u32 / 5;
                let zval_raw = Bitfield::new(21, 12).extract(word) as u32;
                (
                    MacroId::BranchLessZ,
                    MacroArgs::BranchLessZ {
                        dl,
                        vtx,
                        zval_raw: sign_extend(zval_raw, 12),
                    },
                    format!("gsSPBranchLessZraw(0x{dl:08X}, {vtx}, {zval_raw})"),
                )
            }
            0x05 => {
                let indices = triangle_indices(word, 16);
                (
                    MacroId::Triangle1,
                    MacroArgs::Primitive { indices, count: 3 },
                    format!(
                        "gsSP1Triangle({}, {}, {})",
                        indices[0], indices[1], indices[2]
                    ),
                )
            }
            0x06 => {
                let hi = triangle_indices(word, 16);
                let lo = triangle_indices(word, 0);
                (
                    MacroId::Triangle2,
                    MacroArgs::TwoTriangles {
                        first: [hi[0], hi[1], hi[2]],
                        second: [lo[0], lo[1], lo[2]],
                    },
                    format!(
                        "gsSP2Triangles({}, {}, {}, 0, {}, {}, {}, 0)",
                        hi[0], hi[1], hi[2], lo[0], lo[1], lo[2]
                    ),
                )
            }
            0x07 => {
                let indices = triangle_indices(word, 16);
                (
                    MacroId::Quadrangle,
                    MacroArgs::Primitive { indices, count: 4 },
                    format!(
                        "gsSP1Quadrangle({}, {}, {}, {})",
                        indices[0], indices[1], indices[2], indices[3]
                    ),
                )
            }
            0x08 => {
                let indices = triangle_indices(word, 16);
                (
                    MacroId::Line3D,
                    MacroArgs::Primitive { indices, count: 2 },
                    format!("gsSPLine3D({}, {})", indices[0], indices[1]),
                )
            }
            0xD8 => (
                MacroId::MatrixPop,
                MacroArgs::None,
                "gsSPPopMatrix(G_MTX_MODELVIEW)".to_string(),
            ),
            0xD9 => {
                let clear = Bitfield::new(32, 24).extract(word) as u32;
                let set = word as u32;
                (
                    MacroId::GeometryMode,
                    MacroArgs::GeometryMode { clear, set },
                    format!("gsSPGeometryMode(0x{clear:06X}, 0x{set:06X})"),
                )
            }
            0xDA => {
                let param = Bitfield::new(32, 8).extract(word) as u8;
                let ptr = word as u32;
                (
                    MacroId::Matrix,
                    MacroArgs::Matrix { ptr, param },
                    format!("gsSPMatrix(0x{ptr:08X}, 0x{param:02X})"),
                )
            }
            0xDB => {
                let index = Bitfield::new(48, 8).extract(word) as u8;
                let offset = Bitfield::new(32, 16).extract(word) as u32;
                let seg = offset / 4;
                let base = word as u32;
                if index == 0x0E {
                    (
                        MacroId::RelSegment,
                        MacroArgs::Segment { seg, base },
                        format!("gsSPSegment({seg}, 0x{base:08X}) /* relative */"),
                    )
                } else {
                    (
                        MacroId::Segment,
                        MacroArgs::Segment { seg, base },
                        format!("gsSPSegment({seg}, 0x{base:08X})"),
                    )
                }
            }
            0xDD => {
                let text_addr = word as u32;
                (
                    MacroId::LoadUcode,
                    MacroArgs::LoadUcode { text_addr },
                    format!("gsSPLoadUcode(0x{text_addr:08X})"),
                )
            }
            0xDE => {
                let target = word as u32;
                let is_branch = Bitfield::new(32, 8).extract(word) == 1;
                let id = if is_branch {
                    MacroId::BranchList
                } else {
                    MacroId::DisplayList
                };
                let name = if is_branch {
                    "gsSPBranchList"
                } else {
                    "gsSPDisplayList"
                };
                (
                    id,
                    MacroArgs::DlTarget { target },
                    format!("{name}(0x{target:08X})"),
                )
            }
            0xDF => (
                MacroId::EndDisplayList,
                MacroArgs::None,
                "gsSPEndDisplayList()".to_string(),
            ),
            0xE2 => {
                let shift = Bitfield::new(40, 8).extract(word) as u32;
                let len = Bitfield::new(32, 8).extract(word) as u32 + 1;
                let data = word as u32;
                (
                    MacroId::SetOtherModeL,
                    MacroArgs::OtherModeBits { shift, len, data },
                    format!("gsDPSetOtherMode(L, 0x{shift:02X}, {len}, 0x{data:08X})"),
                )
            }
            0xE3 => {
                let shift = Bitfield::new(40, 8).extract(word) as u32;
                let len = Bitfield::new(32, 8).extract(word) as u32 + 1;
                let data = word as u32;
                (
                    MacroId::SetOtherModeH,
                    MacroArgs::OtherModeBits { shift, len, data },
                    format!("gsDPSetOtherMode(H, 0x{shift:02X}, {len}, 0x{data:08X})"),
                )
            }
            0xE4 | 0xE5 => {
                let ulx = sign_extend(Bitfield::new(44, 12).extract(word) as u32, 12);
                let uly = sign_extend(Bitfield::new(32, 12).extract(word) as u32, 12);
                let lrx = sign_extend(Bitfield::new(12, 12).extract(word) as u32, 12);
                let lry = sign_extend(Bitfield::new(0, 12).extract(word) as u32, 12);
                let tile = Bitfield::new(24, 3).extract(word) as u8;
                (
                    MacroId::TextureRectangle,
                    MacroArgs::Rect {
                        ulx,
                        uly,
                        lrx,
                        lry,
                        tile,
                    },
                    format!("gsDPTextureRectangle({ulx}, {uly}, {lrx}, {lry}, {tile})"),
                )
            }
            0xE6 => (
                MacroId::LoadSync,
                MacroArgs::None,
                "gsDPLoadSync()".to_string(),
            ),
            0xE7 => (
                MacroId::PipeSync,
                MacroArgs::None,
                "gsDPPipeSync()".to_string(),
            ),
            0xE8 => (
                MacroId::TileSync,
                MacroArgs::None,
                "gsDPTileSync()".to_string(),
            ),
            0xE9 => (
                MacroId::FullSync,
                MacroArgs::None,
                "gsDPFullSync()".to_string(),
            ),
            0xED => {
                let ulx = sign_extend(Bitfield::new(44, 12).extract(word) as u32, 12);
                let uly = sign_extend(Bitfield::new(32, 12).extract(word) as u32, 12);
                let lrx = sign_extend(Bitfield::new(12, 12).extract(word) as u32, 12);
                let lry = sign_extend(Bitfield::new(0, 12).extract(word) as u32, 12);
                (
                    MacroId::SetScissor,
                    MacroArgs::Scissor { ulx, uly, lrx, lry },
                    format!("gsDPSetScissor({ulx}, {uly}, {lrx}, {lry})"),
                )
            }
            0xF0 => {
                let tile = Bitfield::new(24, 3).extract(word) as u8;
                let lrs = Bitfield::new(12, 12).extract(word) as u32;
                (
                    MacroId::LoadTlut,
                    MacroArgs::LoadTlut { tile, lrs },
                    format!("gsDPLoadTLUT({tile}, {lrs})"),
                )
            }
            0xF2 => {
                let tile = Bitfield::new(24, 3).extract(word) as u8;
                let uls = Bitfield::new(44, 12).extract(word) as u32;
                let ult = Bitfield::new(32, 12).extract(word) as u32;
                let lrs = Bitfield::new(12, 12).extract(word) as u32;
                let lrt = Bitfield::new(0, 12).extract(word) as u32;
                (
                    MacroId::LoadTile,
                    MacroArgs::LoadTile {
                        tile,
                        uls,
                        ult,
                        lrs,
                        lrt,
                    },
                    format!("gsDPLoadTile({tile}, {uls}, {ult}, {lrs}, {lrt})"),
                )
            }
            0xF3 => {
                let tile = Bitfield::new(24, 3).extract(word) as u8;
                let uls = Bitfield::new(44, 12).extract(word) as u32;
                let ult = Bitfield::new(32, 12).extract(word) as u32;
                let lrs = Bitfield::new(12, 12).extract(word) as u32;
                let lrt = Bitfield::new(0, 12).extract(word) as u32;
                (
                    MacroId::SetTileSize,
                    MacroArgs::SetTileSize {
                        tile,
                        uls,
                        ult,
                        lrs,
                        lrt,
                    },
                    format!("gsDPSetTileSize({tile}, {uls}, {ult}, {lrs}, {lrt})"),
                )
            }
            0xF4 => {
                let tile = Bitfield::new(24, 3).extract(word) as u8;
                let uls = Bitfield::new(44, 12).extract(word) as u32;
                let ult = Bitfield::new(32, 12).extract(word) as u32;
                let lrs = Bitfield::new(12, 12).extract(word) as u32;
                let dxt = Bitfield::new(0, 12).extract(word) as u32;
                (
                    MacroId::LoadBlock,
                    MacroArgs::LoadBlock {
                        tile,
                        uls,
                        ult,
                        lrs,
                        dxt,
                    },
                    format!("gsDPLoadBlock({tile}, {uls}, {ult}, {lrs}, {dxt})"),
                )
            }
            0xF5 => {
                let fmt = Bitfield::new(53, 3).extract(word) as u8;
                let siz = Bitfield::new(51, 2).extract(word) as u8;
                let line = Bitfield::new(41, 9).extract(word) as u32;
                let tmem_addr = Bitfield::new(32, 9).extract(word) as u32;
                let tile = Bitfield::new(24, 3).extract(word) as u8;
                (
                    MacroId::SetTile,
                    MacroArgs::SetTile {
                        tile,
                        fmt,
                        siz,
                        line,
                        tmem_addr,
                    },
                    format!("gsDPSetTile({fmt}, {siz}, {line}, 0x{tmem_addr:03X}, {tile})"),
                )
            }
            0xF6 => {
                let lrx = sign_extend(Bitfield::new(44, 12).extract(word) as u32, 12);
                let lry = sign_extend(Bitfield::new(32, 12).extract(word) as u32, 12);
                let ulx = sign_extend(Bitfield::new(12, 12).extract(word) as u32, 12);
                let uly = sign_extend(Bitfield::new(0, 12).extract(word) as u32, 12);
                (
                    MacroId::FillRectangle,
                    MacroArgs::Rect {
                        ulx,
                        uly,
                        lrx,
                        lry,
                        tile: 0,
                    },
                    format!("gsDPFillRectangle({ulx}, {uly}, {lrx}, {lry})"),
                )
            }
            0xF7 => {
                let color = word as u32;
                (
                    MacroId::SetFillColor,
                    MacroArgs::FillColor { color },
                    format!("gsDPSetFillColor(0x{color:08X})"),
                )
            }
            0xFC => {
                let word_hi = (word >> 32) as u32;
                let word_lo = word as u32;
                (
                    MacroId::SetCombineMode,
                    MacroArgs::Combine { word_hi, word_lo },
                    format!("gsDPSetCombineMode(0x{word_hi:08X}, 0x{word_lo:08X})"),
                )
            }
            0xFD | 0xFE | 0xFF => {
                let fmt = Bitfield::new(53, 3).extract(word) as u8;
                let siz = Bitfield::new(51, 2).extract(word) as u8;
                let width = Bitfield::new(32, 12).extract(word) as u32 + 1;
                let addr = word as u32;
                let id = match op {
                    0xFD => MacroId::SetTextureImage,
                    0xFE => MacroId::SetDepthImage,
                    _ => MacroId::SetColorImage,
                };
                let name = match op {
                    0xFD => "gsDPSetTextureImage",
                    0xFE => "gsDPSetDepthImage",
                    _ => "gsDPSetColorImage",
                };
                (
                    id,
                    MacroArgs::SetImage {
                        fmt,
                        siz,
                        width,
                        addr,
                    },
                    format!("{name}({fmt}, {siz}, {width}, 0x{addr:08X})"),
                )
            }
            _ => (
                MacroId::Invalid,
                MacroArgs::None,
                format!("/* unrecognized opcode 0x{op:02X} */"),
            ),
        }
    }
}

/// Split the 24-bit index block starting at `shift` into three
/// byte-granular vertex-cache slots divided by two (the F3DEX2 vertex-cache
/// convention where indices are tracked as `index * 2`).
fn triangle_indices(word: u64, shift: u32) -> [u32; 4] {
    let block = Bitfield::new(shift, 24).extract(word) as u32;
    [
        (block >> 16) & 0xFF,
        (block >> 8) & 0xFF,
        block & 0xFF,
        0,
    ]
    .map(|v| v / 2)
}

impl Decoder for F3dex2Decoder {
    fn decode_at(&self, bytes: &[u8]) -> DecodedMacro {
        let word = be_word(bytes);
        let (id, args, pretty) = Self::decode_word(word);
        DecodedMacro {
            packet_count: id.packet_count(),
            id,
            args,
            pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(op: u8, rest: u64) -> [u8; 8] {
        let word = ((op as u64) << 56) | (rest & 0x00FF_FFFF_FFFF_FFFF);
        word.to_be_bytes()
    }

    #[test]
    fn decodes_end_display_list() {
        let decoder = F3dex2Decoder::new();
        let decoded = decoder.decode_at(&packet(0xDF, 0));
        assert_eq!(decoded.id, MacroId::EndDisplayList);
        assert_eq!(decoded.packet_count, 1);
    }

    #[test]
    fn decodes_display_list_target() {
        let decoder = F3dex2Decoder::new();
        let bytes = packet(0xDE, 0x0102_0000_1000);
        let decoded = decoder.decode_at(&bytes);
        assert_eq!(decoded.id, MacroId::DisplayList);
        assert_eq!(decoded.args, MacroArgs::DlTarget { target: 0x0000_1000 });
    }

    #[test]
    fn decodes_unrecognized_opcode_as_invalid() {
        let decoder = F3dex2Decoder::new();
        let decoded = decoder.decode_at(&packet(0x55, 0));
        assert_eq!(decoded.id, MacroId::Invalid);
    }

    #[test]
    fn decodes_pipesync_as_argless() {
        let decoder = F3dex2Decoder::new();
        let decoded = decoder.decode_at(&packet(0xE7, 0));
        assert_eq!(decoded.id, MacroId::PipeSync);
        assert_eq!(decoded.args, MacroArgs::None);
    }

    #[test]
    fn decodes_geometry_mode() {
        let decoder = F3dex2Decoder::new();
        // clear(0x000001) at bits 32-55, set(0x000002) in the low word.
        let rest = (0x0000_01u64 << 32) | 0x0000_0002u64;
        let decoded = decoder.decode_at(&packet(0xD9, rest));
        assert_eq!(decoded.id, MacroId::GeometryMode);
        assert_eq!(decoded.args, MacroArgs::GeometryMode { clear: 0x000001, set: 0x000002 });
    }

    #[test]
    fn decodes_segment_assignment() {
        let decoder = F3dex2Decoder::new();
        // index 0x06 (absolute): offset = seg(6) * 4 = 0x18, data = base.
        let rest = (0x06u64 << 48) | (0x18u64 << 32) | 0x0010_0000u64;
        let decoded = decoder.decode_at(&packet(0xDB, rest));
        assert_eq!(decoded.id, MacroId::Segment);
        assert_eq!(decoded.args, MacroArgs::Segment { seg: 6, base: 0x0010_0000 });
    }

    #[test]
    fn decodes_relative_segment_assignment() {
        let decoder = F3dex2Decoder::new();
        // index 0x0E (relative): offset = seg(1) * 4 = 0x04, data = rel addr.
        let rest = (0x0Eu64 << 48) | (0x04u64 << 32) | 0x0000_1000u64;
        let decoded = decoder.decode_at(&packet(0xDB, rest));
        assert_eq!(decoded.id, MacroId::RelSegment);
        assert_eq!(decoded.args, MacroArgs::Segment { seg: 1, base: 0x0000_1000 });
    }

    #[test]
    fn decodes_load_tile() {
        let decoder = F3dex2Decoder::new();
        // tile(3) at bits 24-26, uls(0) at 44-55, ult(2) at 32-43, lrs(4) at
        // 12-23, lrt(8) at 0-11.
        let rest = (3u64 << 24) | (2u64 << 32) | (4u64 << 12) | 8u64;
        let decoded = decoder.decode_at(&packet(0xF2, rest));
        assert_eq!(decoded.id, MacroId::LoadTile);
        assert_eq!(
            decoded.args,
            MacroArgs::LoadTile {
                tile: 3,
                uls: 0,
                ult: 2,
                lrs: 4,
                lrt: 8,
            }
        );
    }
}
