//! The Interpreter driver loop and opcode handler table.

use std::io::Write;

use gbd_opcodes::decoder::{DecodedMacro, Decoder, MacroArgs};
use gbd_opcodes::diagnostics::Kind;
use gbd_opcodes::fields::{CcInput, CycleType, ImageFormat, ImageSize, ZSrcSel};
use gbd_opcodes::macro_id::MacroId;
use gbd_opcodes::ucode::{UcodeRegistryEntry, UcodeTag};
use gbd_rdram::RdramBackend;
use qfixed::{decode_matrix, transform_point, MATRIX_BYTES};

use crate::address::{AssignOutcome, SegmentMap};
use crate::dlstack::DlStack;
use crate::matrix::{MatrixStack, MatrixTarget};
use crate::options::{Options, StartLocation};
use crate::pipeline::{ImageBinding, PipelineState, ScissorRect};
use crate::tile::TileTable;
use crate::vertex::VertexCache;
use crate::Diagnostics;

const PACKET_SIZE: u32 = 8;

/// The debug-scope entry stack the NoOp-tag handler maintains, preserved
/// purely for the post-mortem dump.
#[derive(Clone, Debug)]
pub enum DispEntry {
    Scope(String),
    StringTag(String),
}

/// The full machine the driver loop owns: created once at construction,
/// mutated only by opcode handlers, and destroyed with the Interpreter.
pub struct Interpreter {
    pub segments: SegmentMap,
    pub dl_stack: DlStack,
    pub matrix_stack: MatrixStack,
    pub tiles: TileTable,
    pub pipeline: PipelineState,
    pub vertices: VertexCache,
    pub diagnostics: Diagnostics,

    pc: u32,
    n_gfx: u64,
    task_done: bool,
    active_ucode: UcodeTag,
    next_ucode: Option<UcodeTag>,
    debug_scopes: Vec<DispEntry>,
    render_tile: u8,

    options: Options,
}

impl Interpreter {
    #[must_use]
    pub fn new(options: Options, active_ucode: UcodeTag) -> Self {
        Self {
            segments: SegmentMap::new(),
            dl_stack: DlStack::new(),
            matrix_stack: MatrixStack::new(),
            tiles: TileTable::new(),
            pipeline: PipelineState::new(),
            vertices: VertexCache::new(),
            diagnostics: Diagnostics::new(),
            pc: 0,
            n_gfx: 0,
            task_done: false,
            active_ucode,
            next_ucode: None,
            debug_scopes: Vec::new(),
            render_tile: 0,
            options,
        }
    }

    #[must_use]
    pub fn n_gfx(&self) -> u64 {
        self.n_gfx
    }

    #[must_use]
    pub fn crashed(&self) -> bool {
        self.diagnostics.crashed()
    }

    #[must_use]
    pub fn task_done(&self) -> bool {
        self.task_done
    }

    #[must_use]
    pub fn debug_scopes(&self) -> &[DispEntry] {
        &self.debug_scopes
    }

    fn emit(&mut self, out: &mut dyn Write, kind: Kind, message: String) {
        if self.options.quiet && kind.severity() == gbd_opcodes::diagnostics::Severity::Warning {
            return;
        }
        self.diagnostics.emit(out, kind, message);
    }

    /// Resolve a segmented address to its kseg0 physical form, emitting
    /// `UNSET_SEGMENT` if the segment it names was never assigned.
    fn translate(&mut self, out: &mut dyn Write, addr: u32) -> u32 {
        let t = self.segments.to_kseg0(addr);
        if t.was_unset {
            let seg = (addr << 4) >> 28;
            self.emit(out, Kind::UnsetSegment, format!("segment {seg} was never assigned before use"));
        }
        t.physical
    }

    /// Run the driver loop starting at `start`, reading display-list bytes
    /// and matrix payloads through `rdram`. Returns 0 on clean termination
    /// (including a crash, which is still a defined termination of the
    /// loop) or -1 on a startup failure.
    pub fn run(
        &mut self,
        out: &mut dyn Write,
        rdram: &mut dyn RdramBackend,
        decoder: &dyn Decoder,
        ucode_registry: &[UcodeRegistryEntry],
        start: StartLocation,
    ) -> i32 {
        let start_addr = match start {
            StartLocation::Literal(addr) => addr,
            StartLocation::PointerTo(ptr_addr) => {
                let mut buf = [0u8; 4];
                let phys = self.segments.to_kseg0(ptr_addr).physical;
                match rdram.read_at(phys, &mut buf) {
                    Ok(true) => u32::from_be_bytes(buf),
                    _ => {
                        log::error!("{}", crate::AnalyzeError::StartPointerUnreadable);
                        return -1;
                    }
                }
            }
        };
        self.pc = start_addr & !(0b111u32 << 29);

        loop {
            if self.task_done || self.crashed() {
                break;
            }

            let phys = self.segments.to_kseg0(self.pc).physical;
            let mut packet = [0u8; 8];
            match rdram.read_at(phys, &mut packet) {
                Ok(true) => {}
                _ => {
                    self.emit(out, Kind::AddrNotInRdram, format!("address 0x{phys:08X} is not within the RDRAM image"));
                    break;
                }
            }
            let decoded = decoder.decode_at(&packet);

            let _ = writeln!(
                out,
                "  /* {} 0x{:08X} */  {},",
                self.n_gfx, self.pc, decoded.pretty
            );

            self.dispatch(out, rdram, &decoded, ucode_registry);

            self.pipeline.decay_tile_busy();

            self.pc = self.pc.wrapping_add(decoded.packet_count * PACKET_SIZE);
            self.n_gfx += 1;
            if let Some(tag) = self.next_ucode.take() {
                self.active_ucode = tag;
            }

            if let Some(limit) = self.options.to_num {
                if self.n_gfx >= limit {
                    self.task_done = true;
                }
            }
        }

        if self.task_done && !self.crashed() {
            let _ = writeln!(out, "Graphics task completed successfully.");
        } else if self.crashed() {
            self.print_post_mortem(out);
        }

        0
    }

    /// Dump the state a developer needs to find the bad macro: the call
    /// chain, any open debug scopes, and the segment table, in that order.
    fn print_post_mortem(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "--- Post-mortem ---");
        let _ = writeln!(out, "Crashed at gfx #{}, pc 0x{:08X}", self.n_gfx, self.pc);

        if self.dl_stack.is_empty() {
            let _ = writeln!(out, "Call stack: (top-level display list)");
        } else {
            let _ = writeln!(out, "Call stack (innermost first):");
            for (depth, frame) in self.dl_stack.frames().iter().rev().enumerate() {
                let _ = writeln!(out, "  #{depth}: return to 0x{:08X}", frame.return_pc);
            }
        }

        if !self.debug_scopes.is_empty() {
            let _ = writeln!(out, "Open debug scopes:");
            for entry in &self.debug_scopes {
                match entry {
                    DispEntry::Scope(name) => {
                        let _ = writeln!(out, "  scope {name}");
                    }
                    DispEntry::StringTag(tag) => {
                        let _ = writeln!(out, "  tag \"{tag}\"");
                    }
                }
            }
        }

        let _ = writeln!(out, "Segment table:");
        for seg in 0..crate::address::SEGMENT_COUNT as u32 {
            if self.segments.is_assigned(seg) {
                let _ = writeln!(out, "  seg[{seg}] = 0x{:08X}", self.segments.base(seg));
            }
        }
    }

    fn dispatch(
        &mut self,
        out: &mut dyn Write,
        rdram: &mut dyn RdramBackend,
        decoded: &DecodedMacro,
        ucode_registry: &[UcodeRegistryEntry],
    ) {
        match (decoded.id, &decoded.args) {
            (MacroId::DisplayList, MacroArgs::DlTarget { target }) => self.op_call(out, *target),
            (MacroId::BranchList, MacroArgs::DlTarget { target }) => self.op_branch(out, *target),
            (MacroId::EndDisplayList, _) => self.op_end(),
            (MacroId::CullDisplayList, MacroArgs::Cull { v0, vn }) => self.op_cull(out, *v0, *vn),
            (MacroId::BranchLessZ, MacroArgs::BranchLessZ { dl, vtx, zval_raw }) => {
                self.op_branch_less_z(out, *dl, *vtx, *zval_raw);
            }
            (MacroId::Segment, MacroArgs::Segment { seg, base }) => self.op_segment(out, *seg, *base),
            (MacroId::RelSegment, MacroArgs::Segment { seg, base }) => {
                self.op_segment_relative(out, *seg, *base);
            }
            (MacroId::Matrix, MacroArgs::Matrix { ptr, param }) => {
                self.op_matrix(out, rdram, *ptr, *param);
            }
            (MacroId::MatrixPop, _) => self.op_matrix_pop(out),
            (MacroId::GeometryMode, MacroArgs::GeometryMode { clear, set }) => {
                self.op_geometry_mode(*clear, *set);
            }
            (MacroId::Vertex, MacroArgs::Vertex { vaddr, n, v0 }) => {
                self.op_vertex(out, rdram, *vaddr, *n, *v0);
            }
            (MacroId::Triangle1, MacroArgs::Primitive { indices, .. }) => {
                self.op_triangle(out, "SP1Triangle", &indices[..3]);
            }
            (MacroId::Triangle2, MacroArgs::TwoTriangles { first, second }) => {
                self.op_triangle(out, "SP2Triangles", first);
                self.op_triangle(out, "SP2Triangles", second);
            }
            (MacroId::Quadrangle, MacroArgs::Primitive { indices, .. }) => {
                self.op_triangle(out, "SP1Quadrangle", &indices[..4]);
            }
            (MacroId::Line3D, MacroArgs::Primitive { indices, .. }) => {
                self.op_triangle(out, "SPLine3D", &indices[..2]);
            }
            (MacroId::TextureRectangle, MacroArgs::Rect { ulx, uly, lrx, lry, tile }) => {
                self.op_texrect(out, *ulx, *uly, *lrx, *lry, *tile);
            }
            (MacroId::FillRectangle, MacroArgs::Rect { ulx, uly, lrx, lry, .. }) => {
                self.op_fillrect(out, *ulx, *uly, *lrx, *lry);
            }
            (MacroId::SetOtherModeH | MacroId::SetOtherModeL, MacroArgs::OtherModeBits { shift, len, data }) => {
                self.op_set_other_mode_bits(out, decoded.id, *shift, *len, *data);
            }
            (MacroId::SetCombineMode, MacroArgs::Combine { word_hi, word_lo }) => {
                self.op_set_combine(out, *word_hi, *word_lo);
            }
            (MacroId::SetColorImage, MacroArgs::SetImage { fmt, siz, width, addr }) => {
                self.op_set_color_image(out, rdram, *fmt, *siz, *width, *addr);
            }
            (MacroId::SetDepthImage, MacroArgs::SetImage { addr, .. }) => {
                self.op_set_depth_image(out, rdram, *addr);
            }
            (MacroId::SetTextureImage, MacroArgs::SetImage { fmt, siz, width, addr }) => {
                self.op_set_texture_image(out, rdram, *fmt, *siz, *width, *addr);
            }
            (MacroId::SetScissor, MacroArgs::Scissor { ulx, uly, lrx, lry }) => {
                self.op_set_scissor(out, *ulx, *uly, *lrx, *lry);
            }
            (MacroId::SetTile, MacroArgs::SetTile { tile, fmt, siz, line, tmem_addr }) => {
                self.op_set_tile(out, *tile, *fmt, *siz, *line, *tmem_addr);
            }
            (MacroId::SetTileSize, MacroArgs::SetTileSize { tile, uls, ult, lrs, lrt }) => {
                self.op_set_tile_size(out, *tile, *uls, *ult, *lrs, *lrt);
            }
            (MacroId::LoadBlock, MacroArgs::LoadBlock { tile, uls, ult, lrs, dxt }) => {
                self.op_load_block(out, *tile, *uls, *ult, *lrs, *dxt);
            }
            (MacroId::LoadTile, MacroArgs::LoadTile { tile, uls, ult, lrs, lrt }) => {
                self.op_load_tile(out, *tile, *uls, *ult, *lrs, *lrt);
            }
            (MacroId::LoadTlut, MacroArgs::LoadTlut { tile, lrs }) => self.op_load_tlut(out, *tile, *lrs),
            (MacroId::PipeSync, _) => self.op_pipe_sync(out),
            (MacroId::LoadSync, _) => self.op_load_sync(out),
            (MacroId::TileSync, _) => self.op_tile_sync(out),
            (MacroId::FullSync, _) => self.op_full_sync(out),
            (MacroId::LoadUcode, MacroArgs::LoadUcode { text_addr }) => {
                self.op_load_ucode(out, ucode_registry, *text_addr);
            }
            (MacroId::SetFillColor, MacroArgs::FillColor { .. }) => {
                self.pipeline.fill_color_set = true;
            }
            (MacroId::NoOpTag, MacroArgs::NoOpTag { discriminator, .. }) => {
                self.op_noop_tag(out, *discriminator);
            }
            (MacroId::Invalid, _) => {
                self.emit(out, Kind::InvalidGfxCmd, "command did not match any known macro".to_string());
            }
            _ => {}
        }
    }

    // -- Display-list control ------------------------------------------

    fn op_call(&mut self, out: &mut dyn Write, target: u32) {
        let return_pc = self.pc.wrapping_add(PACKET_SIZE);
        if !self.dl_stack.push(return_pc) {
            self.emit(out, Kind::DlStackOverflow, "display list stack overflow".to_string());
            return;
        }
        self.jump_to(out, target);
    }

    fn op_branch(&mut self, out: &mut dyn Write, target: u32) {
        let physical = self.translate(out, target);
        self.pc = physical.wrapping_sub(PACKET_SIZE);
    }

    fn jump_to(&mut self, out: &mut dyn Write, target: u32) {
        let physical = self.translate(out, target);
        self.pc = physical.wrapping_sub(PACKET_SIZE);
    }

    fn op_end(&mut self) {
        match self.dl_stack.pop() {
            Some(frame) => self.pc = frame.return_pc.wrapping_sub(PACKET_SIZE),
            None => self.task_done = true,
        }
    }

    fn op_cull(&mut self, out: &mut dyn Write, v0: u32, vn: u32) {
        if v0 > vn {
            self.emit(out, Kind::CullingBadIndices, format!("cull range v0={v0} exceeds vn={vn}"));
            return;
        }
        if self.options.no_volume_cull {
            return;
        }
        let last = self.vertices.last_loaded_vtx_num();
        if v0 >= last || vn >= last {
            self.emit(out, Kind::CullingBadVerts, format!("cull range [{v0}, {vn}] exceeds last-loaded range of {last}"));
        }
        let Some(clip_and) = self.vertices.clip_and(v0, vn) else {
            self.emit(out, Kind::CullingVertsOob, format!("cull range [{v0}, {vn}] is outside the vertex cache"));
            return;
        };
        if clip_and.is_empty() {
            return;
        }
        self.op_end();
    }

    fn op_branch_less_z(&mut self, out: &mut dyn Write, dl: u32, vtx: u32, zval_raw: i32) {
        let zval = zval_raw as f32;
        let take = if self.options.all_depth_cull {
            true
        } else if self.options.no_depth_cull {
            false
        } else {
            self.vertices.get(vtx).is_some_and(|v| v.w < zval)
        };
        if take {
            let _ = writeln!(out, "Note: BranchLessZ success");
            self.jump_to(out, dl);
        }
    }

    // -- Segment ---------------------------------------------------------

    fn op_segment(&mut self, out: &mut dyn Write, seg: u32, base: u32) {
        match self.segments.assign(seg, base) {
            AssignOutcome::Ok => {}
            AssignOutcome::InvalidSegmentNum => {
                self.emit(out, Kind::InvalidSegmentNum, format!("segment number {seg} is out of range"));
            }
            AssignOutcome::SegzeroNonzero => {
                self.emit(out, Kind::SegzeroNonzero, "segment 0 assigned a nonzero base".to_string());
            }
        }
    }

    fn op_segment_relative(&mut self, out: &mut dyn Write, seg: u32, rel: u32) {
        match self.segments.assign_relative(seg, rel) {
            AssignOutcome::Ok => {}
            AssignOutcome::InvalidSegmentNum => {
                self.emit(out, Kind::InvalidSegmentNum, format!("segment number {seg} is out of range"));
            }
            AssignOutcome::SegzeroNonzero => {
                self.emit(out, Kind::SegzeroNonzero, "segment 0 assigned a nonzero base".to_string());
            }
        }
    }

    // -- Matrix ------------------------------------------------------------

    fn op_matrix(&mut self, out: &mut dyn Write, rdram: &mut dyn RdramBackend, ptr: u32, param: u8) {
        let projection = param & 0x01 != 0;
        let load = param & 0x02 != 0;
        let push = param & 0x04 != 0;

        if push && projection {
            self.emit(out, Kind::MtxPushedToProjection, "SPMatrix push targets the projection register".to_string());
            return;
        }

        let physical = self.translate(out, ptr);
        if !rdram.addr_valid(physical) || !rdram.addr_valid(physical + MATRIX_BYTES as u32 - 1) {
            self.emit(out, Kind::RangeNotInRdram, format!("matrix range at 0x{physical:08X} is not within the RDRAM image"));
            return;
        }
        let mut buf = [0u8; MATRIX_BYTES];
        if !rdram.read_at(physical, &mut buf).unwrap_or(false) {
            self.emit(out, Kind::RangeNotInRdram, format!("matrix range at 0x{physical:08X} is not within the RDRAM image"));
            return;
        }
        let m = decode_matrix(&buf);

        if push {
            if self.matrix_stack.push_modelview().is_err() {
                self.emit(out, Kind::MtxStackOverflow, "matrix stack overflow".to_string());
                return;
            }
        }

        let target = if projection {
            MatrixTarget::Projection
        } else {
            MatrixTarget::Modelview
        };

        if load {
            self.matrix_stack.load(target, m);
        } else {
            let result = self.matrix_stack.multiply(target, m);
            if result.is_err() {
                let kind = if projection {
                    Kind::MulProjectionUnset
                } else {
                    Kind::MulModelviewUnset
                };
                self.emit(out, kind, "matrix multiply target was never loaded".to_string());
            }
        }

        if self.options.print_matrices {
            if let Some(mvp) = self.matrix_stack.mvp() {
                let _ = writeln!(out, "/* MVP = {mvp:?} */");
            }
        }
    }

    fn op_matrix_pop(&mut self, out: &mut dyn Write) {
        if self.matrix_stack.pop_modelview().is_err() {
            self.emit(out, Kind::MtxStackUnderflow, "SPPopMatrix with no matching push".to_string());
        }
    }

    /// `SPGeometryMode` (and the `SPSetGeometryMode`/`SPClearGeometryMode`/
    /// `SPLoadGeometryMode` client macros that all compile down to it):
    /// clear bits, then set bits, against the running mode mask.
    fn op_geometry_mode(&mut self, clear: u32, set: u32) {
        let bits = (self.pipeline.geometry_mode.bits() & !clear) | set;
        self.pipeline.geometry_mode = crate::pipeline::GeometryMode::from_bits_truncate(bits);
    }

    // -- Vertex --------------------------------------------------------------

    fn op_vertex(&mut self, out: &mut dyn Write, rdram: &mut dyn RdramBackend, vaddr: u32, n: u32, v0: u32) {
        if n == 0 {
            self.emit(out, Kind::VtxLoadingZero, "SPVertex requested zero vertices".to_string());
            return;
        }
        if n > 32 {
            self.emit(out, Kind::VtxLoadingTooMany, format!("SPVertex requested {n} vertices, more than 32"));
            return;
        }
        if v0 + n > 32 {
            self.emit(out, Kind::VtxCacheOverflow, format!("SPVertex destination range [{v0}, {}) overflows the vertex cache", v0 + n));
            return;
        }
        let Some(mvp) = self.matrix_stack.mvp() else {
            self.emit(out, Kind::MulModelviewUnset, "vertex transform requires both matrix registers to be set".to_string());
            return;
        };

        const VTX_RECORD_SIZE: u32 = 16;
        for i in 0..n {
            let physical = self.translate(out, vaddr + i * VTX_RECORD_SIZE);
            let mut buf = [0u8; 16];
            if !rdram.read_at(physical, &mut buf).unwrap_or(false) {
                self.emit(out, Kind::RangeNotInRdram, format!("vertex record at 0x{physical:08X} is not within the RDRAM image"));
                continue;
            }
            let x = i16::from_be_bytes([buf[0], buf[1]]) as f32;
            let y = i16::from_be_bytes([buf[2], buf[3]]) as f32;
            let z = i16::from_be_bytes([buf[4], buf[5]]) as f32;
            let clip_space = transform_point(&mvp, [x, y, z, 1.0]);
            self.vertices.store(v0 + i, clip_space);
            if self.options.print_vertices {
                let _ = writeln!(out, "/* vtx[{}] = ({x}, {y}, {z}) */", v0 + i);
            }
        }
        self.vertices.set_last_loaded(n);
    }

    // -- Primitives ------------------------------------------------------

    fn op_triangle(&mut self, out: &mut dyn Write, name: &'static str, indices: &[u32]) {
        let last = self.vertices.last_loaded_vtx_num();
        let mut oob = false;
        for &idx in indices {
            if self.vertices.get(idx).is_none() {
                self.diagnostics.enter_expansion(name);
                self.emit(out, Kind::TriVtxOob, format!("vertex index {idx} is outside the vertex cache"));
                self.diagnostics.leave_expansion();
                oob = true;
            } else if idx >= last {
                self.diagnostics.enter_expansion(name);
                self.emit(out, Kind::TriLeechingVerts, format!("vertex index {idx} is beyond the last-loaded range of {last}"));
                self.diagnostics.leave_expansion();
            }
        }
        if oob {
            return;
        }
        self.validate_render_primitive(out, name, false, false);
    }

    fn op_texrect(&mut self, out: &mut dyn Write, ulx: i32, uly: i32, lrx: i32, lry: i32, tile: u8) {
        let _ = (ulx, uly, lrx, lry);
        if self.pipeline.color_image.is_none() {
            self.emit(out, Kind::CimgUnset, "texture rectangle drawn before any color image was set".to_string());
        }
        if self.pipeline.scissor.is_none() {
            self.emit(out, Kind::ScissorUnset, "texture rectangle drawn before any scissor region was set".to_string());
        }
        if self.pipeline.other_mode.texture_persp_enabled() {
            self.emit(out, Kind::TexrectPerspCorrect, "DPTextureRectangle issued with perspective correction enabled".to_string());
        }
        self.render_tile = tile;
        self.validate_render_primitive(out, "DPTextureRectangle", true, false);
    }

    fn op_fillrect(&mut self, out: &mut dyn Write, ulx: i32, uly: i32, lrx: i32, lry: i32) {
        let _ = (ulx, uly, lrx, lry);
        if self.pipeline.color_image.is_none() {
            self.emit(out, Kind::CimgUnset, "fill rectangle drawn before any color image was set".to_string());
        }
        if self.pipeline.cycle_type() == CycleType::Fill && !self.pipeline.fill_color_set {
            self.emit(out, Kind::FillrectFillcolorUnset, "DPFillRectangle issued before DPSetFillColor".to_string());
        }
        self.validate_render_primitive(out, "DPFillRectangle", false, true);
    }

    /// The render-primitive validator shared by triangles, quads, lines,
    /// and rects. `textured` distinguishes rects, which are always
    /// shade-less, from triangles, whose shade guarantee depends on the
    /// geometry mode (approximated here: shade flag tracked but not
    /// distinguished per-primitive beyond the cycle-type gating already
    /// covered above). `is_fill_rect` exempts `DPFillRectangle` from the
    /// fill-mode-forbidden check, since it's the one primitive fill mode
    /// exists to draw.
    fn validate_render_primitive(&mut self, out: &mut dyn Write, name: &'static str, textured: bool, is_fill_rect: bool) {
        let cycle = self.pipeline.cycle_type();

        match cycle {
            CycleType::Fill => {
                if !is_fill_rect {
                    self.emit(out, Kind::TriInFillmode, format!("{name} cannot be drawn in fill mode"));
                    return;
                }
                if self.pipeline.other_mode.image_read_enabled() {
                    self.emit(out, Kind::FillmodeCimgZimgRdPerPixel, "fill mode cannot perform a per-pixel color or depth image read".to_string());
                }
                if self.pipeline.other_mode.z_update_enabled() {
                    self.emit(out, Kind::FillmodeZimgWrPerPixel, "fill mode cannot perform a per-pixel depth image write".to_string());
                }
            }
            CycleType::Copy => {
                if self.pipeline.blender.cycle1 != Default::default() {
                    self.emit(out, Kind::CopymodeBlSet, "copy mode cannot have the blender enabled".to_string());
                }
                if self.pipeline.other_mode.aa_enabled() {
                    self.emit(out, Kind::CopymodeAa, "copy mode cannot have antialiasing enabled".to_string());
                }
                if self.pipeline.other_mode.image_read_enabled() {
                    self.emit(out, Kind::CopymodeCimgZimgRdPerPixel, "copy mode cannot perform a per-pixel color or depth image read".to_string());
                }
                if self.pipeline.other_mode.z_update_enabled() {
                    self.emit(out, Kind::CopymodeZimgWrPerPixel, "copy mode cannot perform a per-pixel depth image write".to_string());
                }
                if let Some(cimg) = self.pipeline.color_image {
                    if cimg.siz == ImageSize::Bits32 as u8 {
                        self.emit(out, Kind::Copymode32b, "a 32-bit color image cannot be rendered to in copy mode".to_string());
                    }
                    if let Some(timg) = self.pipeline.texture_image {
                        if timg.siz != cimg.siz {
                            match ImageSize::from_bits(cimg.siz) {
                                Some(ImageSize::Bits8) => {
                                    self.emit(out, Kind::CopymodeMismatch8b, "copy mode requires the texture image size to match the color image size".to_string());
                                }
                                Some(ImageSize::Bits16) => {
                                    self.emit(out, Kind::CopymodeMismatch16b, "copy mode requires the texture image size to match the color image size".to_string());
                                }
                                _ => {}
                            }
                        }
                    }
                }
            }
            CycleType::OneCycle => {
                if self.pipeline.combiner.cycle1 != self.pipeline.combiner.cycle2 {
                    self.emit(out, Kind::CcStagesDiffer1Cyc, "combiner stage 1 and stage 2 differ in one-cycle mode".to_string());
                }
                if self.pipeline.blender.stages_differ() {
                    self.emit(out, Kind::BlenderStagesDiffer1Cyc, "blender stage 1 and stage 2 differ in one-cycle mode".to_string());
                }
                if self.pipeline.combiner.cycle1.references_combined() {
                    self.emit(out, Kind::CcCombinedInC2C1, "one-cycle combiner references COMBINED".to_string());
                }
                if self.pipeline.combiner.cycle1.references_texel1() {
                    self.emit(out, Kind::CcTexel1Rgba1Cyc, "one-cycle combiner references TEXEL1, which is undefined in one-cycle mode".to_string());
                }
            }
            CycleType::TwoCycle => {
                let c1_alpha_combined = self
                    .pipeline
                    .combiner
                    .cycle1
                    .alpha_inputs()
                    .iter()
                    .any(|i| matches!(i, CcInput::CombinedAlpha));
                if c1_alpha_combined {
                    self.emit(out, Kind::CcCombinedAlphaInC1, "first cycle of a two-cycle combiner references COMBINED_ALPHA".to_string());
                } else if self.pipeline.combiner.cycle1.references_combined() {
                    self.emit(out, Kind::CcCombinedInC1, "first cycle of a two-cycle combiner references COMBINED".to_string());
                }
                if self.pipeline.combiner.cycle2.references_texel1() {
                    self.emit(out, Kind::CcTexel1RgbaC22Cyc, "second cycle of a two-cycle combiner references TEXEL1".to_string());
                }
            }
        }

        if cycle == CycleType::Fill && is_fill_rect {
            if let Some(cimg) = self.pipeline.color_image {
                if cimg.siz == ImageSize::Bits4 as u8 {
                    self.emit(out, Kind::Fillmode4b, "a 4-bit color image cannot be rendered to in fill mode".to_string());
                }
            }
        }

        if self.pipeline.other_mode.z_compare_enabled() || self.pipeline.other_mode.z_update_enabled() {
            let has_zbuf = self.pipeline.geometry_mode.contains(crate::pipeline::GeometryMode::Z_BUFFER);
            if !textured && !has_zbuf {
                self.emit(out, Kind::ZsPixelSetWithoutGZbuffer, "depth test/write enabled without G_ZBUFFER in the geometry mode".to_string());
            }
            if matches!(self.pipeline.other_mode.z_src_sel(), ZSrcSel::Pixel) && textured {
                self.emit(out, Kind::ZsPixelSetWithoutGZbuffer, "depth z-source is PIXEL for a rect primitive".to_string());
            }
        }

        if textured {
            self.pipeline.mark_tile_busy(self.render_tile as usize);
            if self.pipeline.combiner.cycle1.references_texel1() || self.pipeline.combiner.cycle2.references_texel1() {
                self.pipeline.mark_tile_busy(((self.render_tile as usize) + 1) & 7);
            }
        }
        self.pipeline.pipe_busy = true;
    }

    // -- Other-mode / combiner ------------------------------------------

    fn op_set_other_mode_bits(&mut self, out: &mut dyn Write, id: MacroId, shift: u32, len: u32, data: u32) {
        if self.pipeline.pipe_busy {
            self.emit(out, Kind::MissingPipesync, format!("{} changed pipeline state while pipe_busy was set", id.name()));
        }
        self.pipeline.other_mode.set_bits(shift, len, data);
        self.pipeline.resync_blender();
    }

    fn op_set_combine(&mut self, out: &mut dyn Write, word_hi: u32, word_lo: u32) {
        if self.pipeline.pipe_busy {
            self.emit(out, Kind::MissingPipesync, "DPSetCombineMode changed pipeline state while pipe_busy was set".to_string());
        }
        self.pipeline.set_combine(word_hi, word_lo);
    }

    // -- Images -------------------------------------------------------------

    fn op_set_color_image(&mut self, out: &mut dyn Write, rdram: &mut dyn RdramBackend, fmt: u8, siz: u8, width: u32, addr: u32) {
        let physical = self.translate(out, addr);
        if !rdram.addr_valid(physical) {
            self.emit(out, Kind::AddrNotInRdram, format!("address 0x{physical:08X} is not within the RDRAM image"));
        }
        if physical % 64 != 0 {
            self.emit(out, Kind::BadCimgAlignment, format!("color image address 0x{physical:08X} is not 64-byte aligned"));
        }
        match ImageFormat::from_bits(fmt) {
            None => {
                self.emit(out, Kind::InvalidCimgFmt, format!("color image format {fmt} is not a recognized format"));
            }
            Some(format) => {
                let valid = matches!(
                    (format, ImageSize::from_bits(siz)),
                    (ImageFormat::Rgba, Some(ImageSize::Bits16 | ImageSize::Bits32))
                        | (ImageFormat::ColorIndex, Some(ImageSize::Bits8))
                );
                if !valid {
                    self.emit(out, Kind::InvalidCimgFmtsiz, format!("color image format/size combination ({fmt}, {siz}) is not valid for a render target"));
                }
            }
        }
        self.pipeline.color_image = Some(ImageBinding { fmt, siz, width, addr: physical });
        if self.pipeline.scissor_cimg_pair_is_new() {
            self.check_scissor_cimg_bounds(out);
        }
    }

    fn op_set_depth_image(&mut self, out: &mut dyn Write, rdram: &mut dyn RdramBackend, addr: u32) {
        let physical = self.translate(out, addr);
        if !rdram.addr_valid(physical) {
            self.emit(out, Kind::AddrNotInRdram, format!("address 0x{physical:08X} is not within the RDRAM image"));
        }
        if physical % 64 != 0 {
            self.emit(out, Kind::BadZimgAlignment, format!("depth image address 0x{physical:08X} is not 64-byte aligned"));
        }
        self.pipeline.depth_image = Some(ImageBinding { fmt: 0, siz: 0, width: 0, addr: physical });
    }

    fn op_set_texture_image(&mut self, out: &mut dyn Write, rdram: &mut dyn RdramBackend, fmt: u8, siz: u8, width: u32, addr: u32) {
        let physical = self.translate(out, addr);
        if !rdram.addr_valid(physical) {
            self.emit(out, Kind::AddrNotInRdram, format!("address 0x{physical:08X} is not within the RDRAM image"));
        }
        if physical % 8 != 0 {
            self.emit(out, Kind::DangerousTextureAlignment, format!("texture image address 0x{physical:08X} is not 8-byte aligned"));
        }
        match ImageFormat::from_bits(fmt) {
            None => {
                self.emit(out, Kind::InvalidTimgFmt, format!("texture image format {fmt} is not a recognized format"));
            }
            Some(format) => {
                let invalid = matches!(
                    (format, ImageSize::from_bits(siz)),
                    (ImageFormat::Yuv, Some(ImageSize::Bits4 | ImageSize::Bits8 | ImageSize::Bits32))
                        | (ImageFormat::ColorIndex, Some(ImageSize::Bits32))
                );
                if invalid {
                    self.emit(out, Kind::InvalidTimgFmtsiz, format!("texture image format/size combination ({fmt}, {siz}) is not valid"));
                }
            }
        }
        self.pipeline.texture_image = Some(ImageBinding { fmt, siz, width, addr: physical });
    }

    fn check_scissor_cimg_bounds(&mut self, out: &mut dyn Write) {
        let (Some(cimg), Some(scissor)) = (self.pipeline.color_image, self.pipeline.scissor) else {
            return;
        };
        let bytes_per_px = 1u32.max(1 << (cimg.siz.saturating_sub(1)));
        let start = cimg.addr + (scissor.uly as u32) * cimg.width * bytes_per_px;
        let end = cimg.addr + (scissor.lry as u32) * cimg.width * bytes_per_px;
        if start > end {
            self.emit(out, Kind::ScissorStartInvalid, "scissor start address computation underflowed".to_string());
        }
    }

    // -- Scissor -----------------------------------------------------------

    fn op_set_scissor(&mut self, out: &mut dyn Write, ulx: i32, uly: i32, lrx: i32, lry: i32) {
        let rect = ScissorRect { ulx, uly, lrx, lry };
        if rect.is_empty() {
            self.emit(out, Kind::ScissorRegionEmpty, "scissor rectangle is empty".to_string());
            return;
        }
        self.pipeline.scissor = Some(rect);
        if self.pipeline.scissor_cimg_pair_is_new() {
            self.check_scissor_cimg_bounds(out);
        }
    }

    // -- Tile / TMEM ---------------------------------------------------------

    /// Total TMEM size in bytes (4KB, the RDP's fixed texel-memory budget).
    const TMEM_BYTES: u32 = 0x1000;

    fn op_set_tile(&mut self, out: &mut dyn Write, tile: u8, fmt: u8, siz: u8, line: u32, tmem_addr: u32) {
        if tile >= 8 {
            self.emit(out, Kind::TiledescBad, format!("tile index {tile} is out of range"));
            return;
        }
        if tmem_addr >= Self::TMEM_BYTES {
            self.emit(out, Kind::TimgBadTmemAddr, format!("tile descriptor TMEM address 0x{tmem_addr:X} is out of range"));
        }
        if self.pipeline.tile_is_busy(tile as usize) {
            self.emit(out, Kind::MissingTilesync, format!("DPSetTile changed tile {tile} while tile_busy was still set"));
        }
        self.tiles.set_tile(tile as usize, fmt, siz, line, tmem_addr);
        self.pipeline.pipe_busy = true;
    }

    fn op_set_tile_size(&mut self, out: &mut dyn Write, tile: u8, uls: u32, ult: u32, lrs: u32, lrt: u32) {
        if tile >= 8 {
            self.emit(out, Kind::TiledescBad, format!("tile index {tile} is out of range"));
            return;
        }
        if self.pipeline.tile_is_busy(tile as usize) {
            self.emit(out, Kind::MissingTilesync, format!("DPSetTileSize changed tile {tile} while tile_busy was still set"));
        }
        self.tiles.set_tile_size(tile as usize, uls, ult, lrs, lrt);
        self.pipeline.pipe_busy = true;
    }

    fn op_load_block(&mut self, out: &mut dyn Write, tile: u8, uls: u32, ult: u32, lrs: u32, dxt: u32) {
        let _ = (uls, ult, dxt);
        if tile >= 8 {
            self.emit(out, Kind::TiledescBad, format!("tile index {tile} is out of range"));
            return;
        }
        if let Some(desc) = self.tiles.get(tile as usize) {
            if desc.siz == 0 {
                self.emit(out, Kind::TimgLoad4b, "DPLoadBlock cannot load a 4-bit texel size".to_string());
            }
        }
        let texel_count = lrs + 1;
        if texel_count > 2048 {
            self.emit(out, Kind::LoadblockTooManyTexels, format!("DPLoadBlock would load {texel_count} texels, more than 2048"));
        }
        self.pipeline.pipe_busy = true;
        if self.options.warn_load_busy {
            if self.pipeline.load_busy {
                self.emit(out, Kind::MissingLoadsync, "DPLoadBlock changed TMEM load state while load_busy was still set".to_string());
            }
            self.pipeline.load_busy = true;
        }
    }

    fn op_load_tile(&mut self, out: &mut dyn Write, tile: u8, uls: u32, ult: u32, lrs: u32, lrt: u32) {
        let _ = (uls, ult, lrs, lrt);
        if tile >= 8 {
            self.emit(out, Kind::TiledescBad, format!("tile index {tile} is out of range"));
            return;
        }
        self.pipeline.pipe_busy = true;
        if self.options.warn_load_busy {
            if self.pipeline.load_busy {
                self.emit(out, Kind::MissingLoadsync, "DPLoadTile changed TMEM load state while load_busy was still set".to_string());
            }
            self.pipeline.load_busy = true;
        }
    }

    fn op_load_tlut(&mut self, out: &mut dyn Write, tile: u8, lrs: u32) {
        if tile >= 8 {
            self.emit(out, Kind::TiledescBad, format!("tile index {tile} is out of range"));
            return;
        }
        let count = (lrs >> 2) + 1;
        if count > 256 {
            self.emit(out, Kind::TlutTooLarge, format!("DPLoadTLUT would load {count} entries, more than 256"));
            return;
        }
        let Some(timg) = self.pipeline.texture_image else {
            self.emit(out, Kind::TlutBadFmt, "DPLoadTLUT with no texture image ever set".to_string());
            return;
        };
        if !(timg.siz == 2 && (timg.fmt == 0 || timg.fmt == 3)) {
            self.emit(out, Kind::TlutBadFmt, "DPLoadTLUT source must be RGBA16 or IA16".to_string());
        }
        if let Some(desc) = self.tiles.get(tile as usize) {
            if desc.tmem_addr < 0x100 {
                self.emit(out, Kind::TlutBadTmemAddr, "DPLoadTLUT destination must be in the upper half of TMEM".to_string());
            }
        }
        self.tiles.mark_tlut_loaded(true);
        self.pipeline.pipe_busy = true;
    }

    // -- Sync -----------------------------------------------------------

    fn op_pipe_sync(&mut self, out: &mut dyn Write) {
        if !self.pipeline.clear_pipesync() {
            self.emit(out, Kind::SuperfluousPipesync, "DPPipeSync with pipe_busy already clear".to_string());
        }
    }

    fn op_load_sync(&mut self, out: &mut dyn Write) {
        if !self.pipeline.clear_loadsync() {
            self.emit(out, Kind::SuperfluousLoadsync, "DPLoadSync with load_busy already clear".to_string());
        }
    }

    fn op_tile_sync(&mut self, out: &mut dyn Write) {
        if !self.pipeline.clear_tilesync() {
            self.emit(out, Kind::SuperfluousTilesync, "DPTileSync with tile_busy already clear".to_string());
        }
    }

    fn op_full_sync(&mut self, out: &mut dyn Write) {
        self.emit(out, Kind::FullsyncSent, "DPFullSync sent".to_string());
        self.pipeline.fullsync();
    }

    // -- Ucode ------------------------------------------------------------

    fn op_load_ucode(&mut self, out: &mut dyn Write, registry: &[UcodeRegistryEntry], text_addr: u32) {
        match UcodeRegistryEntry::lookup(registry, text_addr) {
            Some(tag) => self.next_ucode = Some(tag),
            None => {
                self.emit(out, Kind::LoadUnrecognizedUcode, format!("SPLoadUcode text address 0x{text_addr:08X} does not match any registered ucode"));
            }
        }
    }

    // -- NoOp ---------------------------------------------------------------

    fn op_noop_tag(&mut self, out: &mut dyn Write, discriminator: u32) {
        match discriminator {
            1 => self.debug_scopes.push(DispEntry::Scope(format!("scope@{}", self.n_gfx))),
            2 => {
                self.debug_scopes.pop();
            }
            3 => self.debug_scopes.push(DispEntry::StringTag(String::new())),
            _ => {
                self.emit(out, Kind::UnkNoopTag3, format!("NoOp tag discriminator {discriminator} is unrecognized"));
            }
        }
    }
}
