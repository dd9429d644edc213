//! Parameter Store: the on-disk representation of an iteration recipe,
//! shared by the worker and broker processes.

pub mod load;
pub mod params;
pub mod phase;
pub mod save;

pub use load::{changed, load, mtime};
pub use params::{AoChannel, AoSource, ChannelScale, Chemistry, DacLink, IterationParams, Parity, RtuLink};
pub use phase::{IterationPhase, PhaseError, CHANNELS, MAX_PHASES};
pub use save::{render, save_atomic};

/// A store bound to a single file path, tracking the mtime it last
/// loaded from so callers can cheaply detect out-of-process edits
/// (spec §4.2: "the broker polls mtime rather than re-parsing on a
/// timer").
pub struct ParamStore {
    path: std::path::PathBuf,
    cached_mtime: Option<std::time::SystemTime>,
}

impl ParamStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached_mtime: None,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the file and remembers its mtime. Returns the parsed-count
    /// alongside the params so the caller can decide whether to trust an
    /// empty/missing file as "nothing to apply" rather than overwrite
    /// good in-memory state with defaults.
    pub fn load(&mut self) -> (IterationParams, usize) {
        self.cached_mtime = load::mtime(&self.path);
        load::load(&self.path)
    }

    /// True if the file's mtime differs from what was cached at the last
    /// `load`/`save`.
    pub fn externally_changed(&self) -> bool {
        load::changed(&self.path, self.cached_mtime)
    }

    pub fn save(&mut self, params: &IterationParams) -> anyhow::Result<()> {
        save::save_atomic(&self.path, params)?;
        self.cached_mtime = load::mtime(&self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_tracks_external_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iter_params.txt");
        let mut store = ParamStore::new(&path);

        store.save(&IterationParams::default()).unwrap();
        assert!(!store.externally_changed());

        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&path, "repeats=9\n").unwrap();
        assert!(store.externally_changed());
    }
}
