//! Run options: a flat record of recognized flags and their effects, built
//! by the CLI layer and passed by value into [`crate::analyze`].

/// Flat option record mirroring the recognized CLI flag set.
#[derive(Clone, Debug)]
pub struct Options {
    pub quiet: bool,
    pub print_vertices: bool,
    pub print_textures: bool,
    pub print_matrices: bool,
    pub print_lights: bool,
    pub print_multi_packet: bool,
    pub hex_color: bool,
    pub q_macros: bool,
    pub to_num: Option<u64>,
    pub no_volume_cull: bool,
    pub no_depth_cull: bool,
    pub all_depth_cull: bool,
    /// Gates the `load_busy` heuristic diagnostics. The heuristic
    /// over-reports in practice, so it's opt-in rather than always-on;
    /// defaults to disabled.
    pub warn_load_busy: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            quiet: false,
            print_vertices: false,
            print_textures: false,
            print_matrices: false,
            print_lights: false,
            print_multi_packet: false,
            hex_color: false,
            q_macros: false,
            to_num: None,
            no_volume_cull: false,
            no_depth_cull: false,
            all_depth_cull: false,
            warn_load_busy: false,
        }
    }
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Start-location sum type: either a literal address or "read a
/// big-endian pointer at this address and use that".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartLocation {
    Literal(u32),
    PointerTo(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_permissive() {
        let opts = Options::new();
        assert!(!opts.quiet);
        assert!(opts.to_num.is_none());
    }
}
