//! Ucode registry: the table `SPLoadUcode` consults to identify which
//! microcode variant a text-segment pointer refers to.

/// Which microcode variant a registry entry names. S2DEX2 and F3DEX3 are
/// tracked as distinct entries so ucode switching and
/// `LOAD_UNRECOGNIZED_UCODE` behave correctly even though this debugger's
/// command tables currently only cover the F3DEX2 layout; an unsupported
/// per-variant opcode still decodes to `MacroId::Invalid` rather than
/// silently misdecoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UcodeTag {
    F3dex2,
    S2dex2,
    F3dex3,
    /// A registry entry present for completeness but with no known
    /// command table; any macro decoded under it is `MacroId::Invalid`.
    Unknown,
}

/// One entry in the ucode registry, matched by masking kseg bits off both
/// the entry's `text_start` and the `SPLoadUcode` pointer under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UcodeRegistryEntry {
    pub text_start: u32,
    pub tag: UcodeTag,
}

const KSEG_MASK: u32 = 0b111 << 29;

impl UcodeRegistryEntry {
    #[must_use]
    pub const fn new(text_start: u32, tag: UcodeTag) -> Self {
        Self { text_start, tag }
    }

    fn masked(addr: u32) -> u32 {
        addr & !KSEG_MASK
    }

    /// Find the registry entry whose `text_start` matches `addr` once kseg
    /// bits are masked from both sides.
    #[must_use]
    pub fn lookup(registry: &[UcodeRegistryEntry], addr: u32) -> Option<UcodeTag> {
        let target = Self::masked(addr);
        registry
            .iter()
            .find(|e| Self::masked(e.text_start) == target)
            .map(|e| e.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_regardless_of_kseg_bits() {
        let registry = [UcodeRegistryEntry::new(0x0010_0000, UcodeTag::F3dex2)];
        assert_eq!(
            UcodeRegistryEntry::lookup(&registry, 0x8010_0000),
            Some(UcodeTag::F3dex2)
        );
    }

    #[test]
    fn lookup_returns_none_for_unregistered_address() {
        let registry = [UcodeRegistryEntry::new(0x0010_0000, UcodeTag::F3dex2)];
        assert_eq!(UcodeRegistryEntry::lookup(&registry, 0x0020_0000), None);
    }
}
