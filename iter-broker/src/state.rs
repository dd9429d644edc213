use iter_regbank::RegisterBank;
use iter_store::IterationParams;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::Notify;

/// Shared state behind every Modbus connection (TCP or RTU): the register
/// bank itself, the last-reconciled parameter set, and a dirty marker the
/// persister debounces against. One process, one bank — unlike the
/// original's per-transport `modbus_mapping_t`, every transport here reads
/// and writes the same `RegisterBank` so TCP and RTU clients always see a
/// consistent view.
pub struct BrokerState {
    pub bank: Mutex<RegisterBank>,
    pub params: Mutex<IterationParams>,
    dirty_since: Mutex<Option<Instant>>,
    pub dirty_notify: Notify,
}

impl BrokerState {
    pub fn new(bank: RegisterBank, params: IterationParams) -> Self {
        Self {
            bank: Mutex::new(bank),
            params: Mutex::new(params),
            dirty_since: Mutex::new(None),
            dirty_notify: Notify::new(),
        }
    }

    /// Marks the parameter set as needing a debounced save, restarting the
    /// dirty timer on every call so the save always waits out the debounce
    /// window from the *last* write, not the first.
    pub fn mark_dirty(&self) {
        let mut dirty = self.dirty_since.lock().unwrap();
        *dirty = Some(Instant::now());
        self.dirty_notify.notify_one();
    }

    /// Returns the dirty-since instant if still unset by a clear, without
    /// consuming it.
    pub fn dirty_since(&self) -> Option<Instant> {
        *self.dirty_since.lock().unwrap()
    }

    pub fn clear_dirty(&self) {
        *self.dirty_since.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_dirty_restarts_the_timer() {
        let state = BrokerState::new(RegisterBank::with_builtin_legacy_table(), IterationParams::default());
        assert!(state.dirty_since().is_none());
        state.mark_dirty();
        let first = state.dirty_since().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        state.mark_dirty();
        assert!(state.dirty_since().unwrap() > first);
        state.clear_dirty();
        assert!(state.dirty_since().is_none());
    }
}
