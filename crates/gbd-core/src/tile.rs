//! Tile descriptor table and TMEM metadata.

use gbd_opcodes::fields::{ImageFormat, ImageSize};

/// Number of tile descriptors (`DPSetTile`'s `tile` field is 3 bits).
pub const TILE_COUNT: usize = 8;

/// One tile descriptor: format/size, TMEM placement, and the texture
/// coordinate window the last `DPSetTileSize`/`DPLoadTile` established.
#[derive(Clone, Copy, Debug, Default)]
pub struct TileDescriptor {
    pub fmt: u8,
    pub siz: u8,
    pub line: u32,
    pub tmem_addr: u32,
    pub uls: u32,
    pub ult: u32,
    pub lrs: u32,
    pub lrt: u32,
    pub set: bool,
}

impl TileDescriptor {
    #[must_use]
    pub fn format(self) -> Option<ImageFormat> {
        ImageFormat::from_bits(self.fmt)
    }

    #[must_use]
    pub fn size(self) -> Option<ImageSize> {
        ImageSize::from_bits(self.siz)
    }
}

/// The eight tile descriptors plus TLUT bookkeeping.
#[derive(Clone, Debug)]
pub struct TileTable {
    tiles: [TileDescriptor; TILE_COUNT],
    tlut_loaded: bool,
    tlut_is_ci_compatible: bool,
}

impl Default for TileTable {
    fn default() -> Self {
        Self {
            tiles: [TileDescriptor::default(); TILE_COUNT],
            tlut_loaded: false,
            tlut_is_ci_compatible: true,
        }
    }
}

impl TileTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, tile: usize) -> Option<&TileDescriptor> {
        self.tiles.get(tile)
    }

    pub fn set_tile(
        &mut self,
        tile: usize,
        fmt: u8,
        siz: u8,
        line: u32,
        tmem_addr: u32,
    ) -> Option<()> {
        let desc = self.tiles.get_mut(tile)?;
        desc.fmt = fmt;
        desc.siz = siz;
        desc.line = line;
        desc.tmem_addr = tmem_addr;
        desc.set = true;
        Some(())
    }

    pub fn set_tile_size(
        &mut self,
        tile: usize,
        uls: u32,
        ult: u32,
        lrs: u32,
        lrt: u32,
    ) -> Option<()> {
        let desc = self.tiles.get_mut(tile)?;
        desc.uls = uls;
        desc.ult = ult;
        desc.lrs = lrs;
        desc.lrt = lrt;
        Some(())
    }

    pub fn mark_tlut_loaded(&mut self, ci_compatible: bool) {
        self.tlut_loaded = true;
        self.tlut_is_ci_compatible = ci_compatible;
    }

    #[must_use]
    pub fn tlut_loaded(&self) -> bool {
        self.tlut_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_tile_populates_descriptor() {
        let mut table = TileTable::new();
        table.set_tile(3, 2, 1, 4, 0x100).unwrap();
        let desc = table.get(3).unwrap();
        assert_eq!(desc.fmt, 2);
        assert_eq!(desc.tmem_addr, 0x100);
        assert!(desc.set);
    }

    #[test]
    fn set_tile_out_of_range_returns_none() {
        let mut table = TileTable::new();
        assert_eq!(table.set_tile(8, 0, 0, 0, 0), None);
    }

    #[test]
    fn tlut_starts_unloaded() {
        let table = TileTable::new();
        assert!(!table.tlut_loaded());
    }
}
