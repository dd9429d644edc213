use crate::state::BrokerState;
use iter_store::ParamStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a parameter change must sit dirty before it's written to disk
/// (spec §4.3's "≈3 s" debounce). A named constant so tests can shrink it
/// instead of waiting out the real window.
pub const PERSIST_DEBOUNCE: Duration = Duration::from_secs(3);

/// One housekeeping pass: flushes a debounced parameter change to disk,
/// and reloads from disk if the file changed underneath the broker (an
/// operator editing `iter_params.txt` directly, or the Worker writing a
/// recovered default). Returns whether either action happened, for tests.
pub fn tick(state: &Arc<BrokerState>, store: &mut ParamStore, debounce: Duration) -> anyhow::Result<(bool, bool)> {
    let mut saved = false;
    let mut reloaded = false;

    if let Some(since) = state.dirty_since() {
        if since.elapsed() >= debounce {
            let params = state.params.lock().unwrap().clone();
            store.save(&params)?;
            state.clear_dirty();
            saved = true;
            tracing::info!("settings updated and saved");
        }
    }

    if !saved && store.externally_changed() {
        let (params, parsed) = store.load();
        if parsed > 0 {
            let mut bank = state.bank.lock().unwrap();
            let mut current = state.params.lock().unwrap();
            *current = params;
            bank.project(&current);
            reloaded = true;
            tracing::info!("params reloaded");
        }
    }

    Ok((saved, reloaded))
}

/// Runs `tick` on a fixed interval until the shutdown flag is set.
pub async fn run(state: Arc<BrokerState>, mut store: ParamStore, shutdown: iter_common::ShutdownFlag) {
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        interval.tick().await;
        if shutdown.is_set() {
            if let Err(e) = tick(&state, &mut store, Duration::ZERO) {
                tracing::error!(error = %e, "failed to flush parameters on shutdown");
            }
            return;
        }
        if let Err(e) = tick(&state, &mut store, PERSIST_DEBOUNCE) {
            tracing::error!(error = %e, "failed to persist parameters");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iter_regbank::RegisterBank;
    use iter_store::IterationParams;

    #[test]
    fn save_waits_out_the_debounce_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iter_params.txt");
        let mut store = ParamStore::new(&path);
        store.save(&IterationParams::default()).unwrap();

        let state = Arc::new(BrokerState::new(
            RegisterBank::with_builtin_legacy_table(),
            IterationParams::default(),
        ));
        state.mark_dirty();

        let (saved, _) = tick(&state, &mut store, Duration::from_secs(10)).unwrap();
        assert!(!saved);

        let (saved, _) = tick(&state, &mut store, Duration::from_millis(0)).unwrap();
        assert!(saved);
        assert!(state.dirty_since().is_none());
    }

    #[test]
    fn external_edit_is_picked_up_on_next_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iter_params.txt");
        let mut store = ParamStore::new(&path);
        store.save(&IterationParams::default()).unwrap();

        let state = Arc::new(BrokerState::new(
            RegisterBank::with_builtin_legacy_table(),
            IterationParams::default(),
        ));

        std::thread::sleep(Duration::from_millis(10));
        std::fs::write(&path, "repeats=9\n").unwrap();

        let (saved, reloaded) = tick(&state, &mut store, PERSIST_DEBOUNCE).unwrap();
        assert!(!saved);
        assert!(reloaded);
        assert_eq!(state.params.lock().unwrap().repeats, 9);
    }
}
