use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_TABLE: &str = include_str!("../data/legacy_map.toml");

/// One legacy HMI address aliasing a canonical register offset. `width`
/// is how many words the canonical register occupies (1 for the int32
/// registers nothing here uses, 2 for every float register the legacy
/// table actually maps — spec §3's 0x40xx window is entirely float-view
/// aliases).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LegacyAlias {
    pub legacy_addr: u16,
    pub canonical_offset: usize,
    #[serde(default = "default_width")]
    pub width: usize,
}

fn default_width() -> usize {
    2
}

#[derive(Debug, Deserialize)]
struct LegacyTableFile {
    alias: Vec<LegacyAlias>,
}

/// Maps legacy `0x40xx`-window addresses to their canonical offset in the
/// unified register space, loaded from a data file instead of hardcoded
/// match arms so new aliases don't require a code change.
#[derive(Debug, Clone)]
pub struct LegacyTable {
    by_legacy_addr: HashMap<u16, LegacyAlias>,
}

impl LegacyTable {
    /// Parses the table shipped with this crate (`data/legacy_map.toml`).
    pub fn builtin() -> Self {
        Self::parse(DEFAULT_TABLE).expect("built-in legacy_map.toml must parse")
    }

    pub fn parse(toml_text: &str) -> anyhow::Result<Self> {
        let file: LegacyTableFile = toml::from_str(toml_text)?;
        let by_legacy_addr = file.alias.into_iter().map(|a| (a.legacy_addr, a)).collect();
        Ok(Self { by_legacy_addr })
    }

    pub fn resolve(&self, legacy_addr: u16) -> Option<LegacyAlias> {
        self.by_legacy_addr.get(&legacy_addr).copied()
    }

    pub fn len(&self) -> usize {
        self.by_legacy_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_legacy_addr.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_resolves_the_documented_examples() {
        let table = LegacyTable::builtin();
        assert_eq!(table.resolve(0x4045).unwrap().canonical_offset, 402);
        assert_eq!(table.resolve(0x4049).unwrap().canonical_offset, 220);
    }

    #[test]
    fn unknown_address_resolves_to_none() {
        let table = LegacyTable::builtin();
        assert!(table.resolve(0x4FFF).is_none());
    }

    #[test]
    fn every_alias_falls_within_the_documented_window() {
        let table = LegacyTable::builtin();
        for addr in table.by_legacy_addr.keys() {
            assert!((0x4000..=0x40FF).contains(addr));
        }
    }
}
