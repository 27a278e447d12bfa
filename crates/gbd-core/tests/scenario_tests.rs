//! End-to-end scenarios driven through the full `analyze` entry point: a
//! synthetic RDRAM image built packet-by-packet, decoded by the real
//! F3DEX2 decoder, and checked against the printed trace/diagnostics.

use gbd_core::{Interpreter, Options, StartLocation};
use gbd_opcodes::f3dex2::F3dex2Decoder;
use gbd_opcodes::ucode::UcodeTag;
use gbd_rdram::FileRdram;

/// Minimum size synthetic images are padded to: large enough that the small
/// fixed offsets these scenarios bind images to (0x1000, 0x2000, ...) read
/// as in-bounds, while a scenario that deliberately targets a huge segment
/// offset still lands outside it.
const MIN_IMAGE_SIZE: usize = 0x4000;

/// Drives the interpreter directly over a pre-built image, the same way
/// `analyze` does once its RDRAM backend is open.
fn run(mut image: Vec<u8>) -> (i32, String) {
    if image.len() < MIN_IMAGE_SIZE {
        image.resize(MIN_IMAGE_SIZE, 0);
    }
    let decoder = F3dex2Decoder::new();
    let mut rdram = FileRdram::from_image(image);
    let mut out = Vec::new();
    let mut interp = Interpreter::new(Options::new(), UcodeTag::F3dex2);
    let code = interp.run(&mut out, &mut rdram, &decoder, &[], StartLocation::Literal(0));
    (code, String::from_utf8(out).unwrap())
}

fn packets(words: &[u64]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

const OP_END_DISPLAY_LIST: u64 = 0xDF << 56;

fn op_display_list(target: u32) -> u64 {
    (0xDEu64 << 56) | target as u64
}

fn op_branch_list(target: u32) -> u64 {
    (0xDEu64 << 56) | (1u64 << 32) | target as u64
}

fn op_triangle1(v0: u32, v1: u32, v2: u32) -> u64 {
    let block = ((v0 * 2) << 16) | ((v1 * 2) << 8) | (v2 * 2);
    (0x05u64 << 56) | ((block as u64) << 16)
}

fn op_set_other_mode_h(shift: u32, len: u32, data: u32) -> u64 {
    (0xE3u64 << 56) | ((shift as u64) << 40) | (((len - 1) as u64) << 32) | data as u64
}

fn op_set_texture_image(fmt: u32, siz: u32, addr: u32) -> u64 {
    (0xFDu64 << 56) | ((fmt as u64) << 53) | ((siz as u64) << 51) | addr as u64
}

fn op_set_tile(tile: u32, tmem_addr: u32) -> u64 {
    (0xF5u64 << 56) | ((tmem_addr as u64) << 32) | ((tile as u64) << 24)
}

fn op_load_tlut(tile: u32, lrs: u32) -> u64 {
    (0xF0u64 << 56) | ((tile as u64) << 24) | ((lrs as u64) << 12)
}

fn op_set_color_image(fmt: u32, siz: u32, width_minus_one: u32, addr: u32) -> u64 {
    (0xFFu64 << 56) | ((fmt as u64) << 53) | ((siz as u64) << 51) | ((width_minus_one as u64) << 32) | addr as u64
}

fn op_set_fill_color(color: u32) -> u64 {
    (0xF7u64 << 56) | color as u64
}

fn op_fillrect(lrx: u32, lry: u32, ulx: u32, uly: u32) -> u64 {
    (0xF6u64 << 56) | ((lrx as u64 & 0xFFF) << 44) | ((lry as u64 & 0xFFF) << 32) | ((ulx as u64 & 0xFFF) << 12) | (uly as u64 & 0xFFF)
}

fn op_scissor(ulx: u32, uly: u32, lrx: u32, lry: u32) -> u64 {
    (0xEDu64 << 56) | ((ulx as u64 & 0xFFF) << 44) | ((uly as u64 & 0xFFF) << 32) | ((lrx as u64 & 0xFFF) << 12) | (lry as u64 & 0xFFF)
}

fn op_set_tile_fmt(tile: u32, fmt: u32, siz: u32) -> u64 {
    (0xF5u64 << 56) | ((fmt as u64) << 53) | ((siz as u64) << 51) | ((tile as u64) << 24)
}

fn op_load_block(tile: u32, lrs: u32) -> u64 {
    (0xF4u64 << 56) | ((tile as u64) << 24) | ((lrs as u64) << 12)
}

fn op_geometry_mode(clear: u32, set: u32) -> u64 {
    (0xD9u64 << 56) | ((clear as u64 & 0x00FF_FFFF) << 32) | set as u64
}

fn op_set_other_mode_l(shift: u32, len: u32, data: u32) -> u64 {
    (0xE2u64 << 56) | ((shift as u64) << 40) | (((len - 1) as u64) << 32) | data as u64
}

#[test]
fn clean_termination_prints_success() {
    let (code, out) = run(packets(&[OP_END_DISPLAY_LIST]));
    assert_eq!(code, 0);
    assert!(out.contains("Graphics task completed successfully."));
}

#[test]
fn triangle_in_fill_mode_is_fatal() {
    // other_mode.hi cycle-type field lives at absolute bit 52 of the
    // combined hi:lo doubleword; value 3 selects G_CYC_FILL.
    let image = packets(&[op_set_other_mode_h(52, 2, 3), op_triangle1(0, 1, 2)]);
    let (_code, out) = run(image);
    assert!(out.contains("Error:"));
    assert!(out.contains("fill mode"));
}

#[test]
fn unassigned_segment_warns_but_does_not_crash() {
    // SPBranchList into segment 3, which is never assigned.
    let (code, out) = run(packets(&[op_branch_list(0x0300_0008), OP_END_DISPLAY_LIST]));
    assert_eq!(code, 0);
    assert!(out.contains("Warning:"));
    assert!(out.contains("segment 3"));
    assert!(out.contains("Graphics task completed successfully."));
}

#[test]
fn display_list_call_chain_past_depth_overflows() {
    // 19 nested SPDisplayList calls, each targeting the next packet, with
    // no matching SPEndDisplayList: depth 18 is reachable, the 19th push
    // is not.
    const DEPTH: u32 = 19;
    let mut words = Vec::new();
    for i in 0..DEPTH {
        let next = (i + 1) * 8;
        words.push(op_display_list(next));
    }
    words.push(OP_END_DISPLAY_LIST);
    let (_code, out) = run(packets(&words));
    assert!(out.contains("Error:"));
    assert!(out.contains("overflow"));
}

#[test]
fn fillrect_in_fill_mode_is_accepted() {
    // DPFillRectangle is the one primitive fill mode exists to draw; it
    // must not trip the generic "primitive in fill mode" rejection.
    let image = packets(&[
        op_set_other_mode_h(52, 2, 3),
        op_set_color_image(0, 2, 319, 0x2000),
        op_set_fill_color(0xFFFF_FFFF),
        op_fillrect(100, 100, 0, 0),
        OP_END_DISPLAY_LIST,
    ]);
    let (code, out) = run(image);
    assert_eq!(code, 0);
    assert!(!out.contains("cannot be drawn in fill mode"), "unexpected rejection in: {out}");
    assert!(out.contains("Graphics task completed successfully."));
}

#[test]
fn color_image_with_invalid_format_size_is_fatal() {
    // CI (format 2) at 16-bit size is not a valid render-target combination.
    let image = packets(&[op_set_color_image(2, 2, 319, 0x2000), OP_END_DISPLAY_LIST]);
    let (_code, out) = run(image);
    assert!(out.contains("Error:"));
    assert!(out.contains("is not valid for a render target"));
}

#[test]
fn tlut_load_with_maximal_count_is_accepted() {
    let image = packets(&[
        op_set_texture_image(0, 2, 0x1000),
        op_set_tile(0, 0x100),
        op_load_tlut(0, 0x3FC),
        OP_END_DISPLAY_LIST,
    ]);
    let (code, out) = run(image);
    assert_eq!(code, 0);
    assert!(!out.contains("TLUT"), "unexpected TLUT diagnostic in: {out}");
    assert!(out.contains("Graphics task completed successfully."));
}

#[test]
fn tlut_load_one_past_maximal_count_is_rejected() {
    // lrs = 0x400 -> count = (0x400 >> 2) + 1 = 257, one past the 256 cap.
    let image = packets(&[
        op_set_texture_image(0, 2, 0x1000),
        op_set_tile(0, 0x100),
        op_load_tlut(0, 0x400),
        OP_END_DISPLAY_LIST,
    ]);
    let (_code, out) = run(image);
    assert!(out.contains("Error:"));
    assert!(out.contains("more than 256"));
}

#[test]
fn load_block_at_exactly_2048_texels_is_accepted() {
    let image = packets(&[op_set_tile_fmt(0, 0, 2), op_load_block(0, 2047), OP_END_DISPLAY_LIST]);
    let (code, out) = run(image);
    assert_eq!(code, 0);
    assert!(!out.contains("more than 2048"), "unexpected rejection in: {out}");
}

#[test]
fn load_block_one_past_2048_texels_is_fatal() {
    let image = packets(&[op_set_tile_fmt(0, 0, 2), op_load_block(0, 2048), OP_END_DISPLAY_LIST]);
    let (_code, out) = run(image);
    assert!(out.contains("Error:"));
    assert!(out.contains("more than 2048"));
}

#[test]
fn scissor_with_equal_corners_is_rejected_as_empty() {
    let image = packets(&[op_scissor(10, 10, 10, 20), OP_END_DISPLAY_LIST]);
    let (_code, out) = run(image);
    assert!(out.contains("Error:"));
    assert!(out.contains("scissor rectangle is empty"));
}

#[test]
fn zbuffer_missing_when_depth_compare_enabled_without_geometry_bit() {
    // Z_CMP (render-mode bit 4, len 1) set with no prior SPGeometryMode.
    let image = packets(&[op_set_other_mode_l(4, 1, 1), op_triangle1(0, 1, 2), OP_END_DISPLAY_LIST]);
    let (code, out) = run(image);
    assert_eq!(code, 0);
    assert!(out.contains("Warning:"));
    assert!(out.contains("G_ZBUFFER"));
}

#[test]
fn zbuffer_warning_is_suppressed_once_geometry_mode_sets_it() {
    let image = packets(&[
        op_geometry_mode(0, 0x0000_0001), // set Z_BUFFER
        op_set_other_mode_l(4, 1, 1),
        op_triangle1(0, 1, 2),
        OP_END_DISPLAY_LIST,
    ]);
    let (code, out) = run(image);
    assert_eq!(code, 0);
    assert!(!out.contains("G_ZBUFFER"), "unexpected zbuffer warning in: {out}");
}

#[test]
fn unassigned_segment_call_past_image_bounds_crashes() {
    // SPDisplayList into segment 3, never assigned, at an offset far past
    // the tiny synthetic image: resolves with a warning (segment 3 was
    // never assigned) and then fails to read at the resulting physical
    // address, crashing instead of completing cleanly.
    let (_code, out) = run(packets(&[op_display_list(0x03FF_FFF8), OP_END_DISPLAY_LIST]));
    assert!(out.contains("Warning:"));
    assert!(out.contains("segment 3"));
    assert!(out.contains("Error:"));
    assert!(out.contains("is not within the RDRAM image"));
    assert!(!out.contains("Graphics task completed successfully."));
}
