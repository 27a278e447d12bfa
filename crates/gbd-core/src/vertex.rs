//! Vertex cache and clip-code tracking for vertex load, triangle/quad/line
//! primitives, display-list culling, and branch-less-z.

/// Capacity of the vertex cache (`SPVertex`'s `n`/`v0` must satisfy
/// `v0 + n <= VERTEX_CACHE_SIZE`).
pub const VERTEX_CACHE_SIZE: usize = 32;

bitflags::bitflags! {
    /// Per-vertex clip-code bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ClipCode: u8 {
        const PLUS_X = 1 << 0;
        const MINUS_X = 1 << 1;
        const PLUS_Y = 1 << 2;
        const MINUS_Y = 1 << 3;
        const W = 1 << 4;
    }
}

/// One cached vertex record: clip-space depth/w slots and clip codes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CachedVertex {
    pub depth: f32,
    pub w: f32,
    pub clip: ClipCode,
}

/// The 32-entry vertex cache plus the "last loaded" bookkeeping the
/// leech/cull checks need.
#[derive(Clone, Debug)]
pub struct VertexCache {
    slots: [CachedVertex; VERTEX_CACHE_SIZE],
    last_loaded_vtx_num: u32,
}

impl Default for VertexCache {
    fn default() -> Self {
        Self {
            slots: [CachedVertex::default(); VERTEX_CACHE_SIZE],
            last_loaded_vtx_num: 0,
        }
    }
}

impl VertexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_loaded_vtx_num(&self) -> u32 {
        self.last_loaded_vtx_num
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&CachedVertex> {
        self.slots.get(index as usize)
    }

    /// Compute clip-space depth/w/clipcode for a transformed clip-space
    /// point `[x', y', z', w']` and store it at `index`.
    pub fn store(&mut self, index: u32, clip_space: [f32; 4]) -> Option<()> {
        let [x, y, z, w] = clip_space;
        let mut clip = ClipCode::empty();
        if x > w {
            clip |= ClipCode::PLUS_X;
        }
        if x < -w {
            clip |= ClipCode::MINUS_X;
        }
        if y > w {
            clip |= ClipCode::PLUS_Y;
        }
        if y < -w {
            clip |= ClipCode::MINUS_Y;
        }
        if w < 0.01 {
            clip |= ClipCode::W;
        }
        let slot = self.slots.get_mut(index as usize)?;
        *slot = CachedVertex {
            depth: (z / w) * 1023.0,
            w,
            clip,
        };
        Some(())
    }

    pub fn set_last_loaded(&mut self, n: u32) {
        self.last_loaded_vtx_num = n;
    }

    /// Bitwise-AND of clip codes over `[v0, vn]` inclusive: zero iff at
    /// least one vertex in the range is on-screen.
    #[must_use]
    pub fn clip_and(&self, v0: u32, vn: u32) -> Option<ClipCode> {
        if v0 as usize >= self.slots.len() || vn as usize >= self.slots.len() || v0 > vn {
            return None;
        }
        let mut acc = ClipCode::all();
        for i in v0..=vn {
            acc &= self.slots[i as usize].clip;
        }
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_computes_depth_and_w_slots() {
        let mut cache = VertexCache::new();
        cache.store(0, [0.0, 0.0, 512.0, 1.0]).unwrap();
        let v = cache.get(0).unwrap();
        assert_eq!(v.depth, 512.0 * 1023.0);
        assert_eq!(v.w, 1.0);
    }

    #[test]
    fn store_sets_plus_x_clip_code_when_x_exceeds_w() {
        let mut cache = VertexCache::new();
        cache.store(0, [2.0, 0.0, 0.0, 1.0]).unwrap();
        assert!(cache.get(0).unwrap().clip.contains(ClipCode::PLUS_X));
    }

    #[test]
    fn store_never_sets_both_plus_and_minus_x_for_positive_w() {
        let mut cache = VertexCache::new();
        cache.store(0, [2.0, 0.0, 0.0, 1.0]).unwrap();
        let clip = cache.get(0).unwrap().clip;
        assert!(!(clip.contains(ClipCode::PLUS_X) && clip.contains(ClipCode::MINUS_X)));
    }

    #[test]
    fn clip_and_is_zero_when_any_vertex_is_onscreen() {
        let mut cache = VertexCache::new();
        cache.store(0, [2.0, 0.0, 0.0, 1.0]).unwrap(); // offscreen +X
        cache.store(1, [0.0, 0.0, 0.0, 1.0]).unwrap(); // onscreen
        assert_eq!(cache.clip_and(0, 1), Some(ClipCode::empty()));
    }

    #[test]
    fn out_of_range_store_returns_none() {
        let mut cache = VertexCache::new();
        assert_eq!(cache.store(VERTEX_CACHE_SIZE as u32, [0.0; 4]), None);
    }
}
