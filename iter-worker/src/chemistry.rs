use crate::ema::EmaFilter;
use iter_regbank::ChemistryResults;
use iter_store::Chemistry;

/// Per-cycle EMA state for the three filtered quantities — concentration
/// and the two redox channels — reset at the start of every cycle (spec
/// §5's "filters reset before a new measurement series", recovered from
/// the original's `ema_initialized = 0` at the top of the cycle loop).
#[derive(Debug, Clone, Default)]
pub struct ChemistryState {
    concentration: EmaFilter,
    redox1: EmaFilter,
    redox2: EmaFilter,
}

impl ChemistryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.concentration.reset();
        self.redox1.reset();
        self.redox2.reset();
    }
}

/// The last published values, kept around so the analog-output projection
/// can use them between chemistry calculations (mirrors `g_last_pH` /
/// `g_last_C_filt` / `g_last_R1_avg` / `g_last_R2_avg`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChemistryOutputs {
    pub ph: f32,
    pub c_filtered: f32,
    pub r1_avg: f32,
    pub r2_avg: f32,
}

/// Runs the pH derivation (spec §5 "pH path"). Requires `num_phases >= 2`;
/// the caller is responsible for the "Chemistry skipped" diagnostic when
/// it isn't, since that's a per-cycle, not per-call, log line.
pub fn derive_ph(
    state: &mut ChemistryState,
    chem: &Chemistry,
    phase1_ch1: f32,
    phase2_ch1: f32,
) -> (ChemistryResults, f32 /* ph */, f32 /* c_filtered */) {
    let c_raw = (phase1_ch1 * chem.tok1_k + phase2_ch1 * chem.tok2_k) * chem.k_sum + chem.b_sum;
    let c_filtered = state.concentration.update(c_raw, chem.alpha_c);

    let mut c_acid = 0.0;
    let mut c_alkali = 0.0;
    let mut ph = chem.ph_neutral;

    if c_filtered < -chem.deadband_acid.abs() {
        c_acid = c_filtered.abs();
        let log_arg = c_acid / 10.0;
        if log_arg > 1e-6 {
            ph = chem.k_acid * log_arg.log10() + chem.b_acid;
        }
    } else if c_filtered > chem.deadband_alkali.abs() {
        c_alkali = c_filtered;
        let log_arg = c_alkali / 100.0;
        if log_arg > 1e-6 {
            ph = chem.k_alkali * log_arg.log10() + chem.b_alkali;
        }
    }

    let results = ChemistryResults {
        c_raw,
        c_filtered,
        c_acid,
        c_alkali,
        ph,
        ..Default::default()
    };
    (results, ph, c_filtered)
}

/// Runs the redox derivation (spec §5 "redox path") over the last phase's
/// channel 2/3 snapshots. Requires `num_phases > 0`, which the caller
/// always satisfies since a cycle never runs with zero phases.
pub fn derive_redox(
    state: &mut ChemistryState,
    chem: &Chemistry,
    last_phase_ch2: f32,
    last_phase_ch3: f32,
) -> (f32 /* r1_avg */, f32 /* r2_avg */, ChemistryResults) {
    let r1_avg = state.redox1.update(last_phase_ch2, chem.alpha_redox1);
    let r2_avg = state.redox2.update(last_phase_ch3, chem.alpha_redox2);

    let results = ChemistryResults {
        r1_raw: last_phase_ch2,
        r1_avg,
        r2_raw: last_phase_ch3,
        r2_avg,
        ..Default::default()
    };
    (r1_avg, r2_avg, results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chem() -> Chemistry {
        Chemistry {
            tok1_k: 1.0,
            tok2_k: 1.0,
            k_sum: 1.0,
            b_sum: 0.0,
            alpha_c: 0.0,
            deadband_acid: 0.05,
            deadband_alkali: 0.05,
            ph_neutral: 7.0,
            k_acid: -1.0,
            b_acid: 7.0,
            k_alkali: 1.0,
            b_alkali: 7.0,
            alpha_redox1: 0.5,
            alpha_redox2: 0.5,
            ..Chemistry::default()
        }
    }

    #[test]
    fn worked_example_from_spec_matches() {
        // spec.md's two-phase pH cycle example: phase1 ch1 = -0.3, phase2 ch1 = -0.2
        let mut state = ChemistryState::new();
        let (results, ph, c_filtered) = derive_ph(&mut state, &chem(), -0.3, -0.2);
        assert!((results.c_raw - (-0.5)).abs() < 1e-6);
        assert!((c_filtered - (-0.5)).abs() < 1e-6);
        assert!((results.c_acid - 0.5).abs() < 1e-6);
        assert!((ph - 8.301).abs() < 0.001);
    }

    #[test]
    fn within_deadband_reports_neutral_ph() {
        let mut state = ChemistryState::new();
        let (results, ph, _) = derive_ph(&mut state, &chem(), 0.0, 0.0);
        assert_eq!(ph, 7.0);
        assert_eq!(results.c_acid, 0.0);
        assert_eq!(results.c_alkali, 0.0);
    }

    #[test]
    fn alkaline_branch_uses_the_100_divisor() {
        let mut state = ChemistryState::new();
        let (results, ph, _) = derive_ph(&mut state, &chem(), 0.5, 0.5);
        assert!(results.c_alkali > 0.0);
        // k_alkali=1, b_alkali=7: pH = log10(1.0/100) + 7 = -2 + 7 = 5.0
        assert!((ph - 5.0).abs() < 1e-4);
    }

    #[test]
    fn redox_ema_seeds_then_tracks() {
        let mut state = ChemistryState::new();
        let (r1, r2, _) = derive_redox(&mut state, &chem(), 2.0, 3.0);
        assert_eq!(r1, 2.0);
        assert_eq!(r2, 3.0);
        let (r1, r2, _) = derive_redox(&mut state, &chem(), 4.0, 5.0);
        assert_eq!(r1, 3.0); // 0.5*2 + 0.5*4
        assert_eq!(r2, 4.0);
    }

    #[test]
    fn reset_clears_all_three_filters() {
        let mut state = ChemistryState::new();
        derive_ph(&mut state, &chem(), -0.3, -0.2);
        derive_redox(&mut state, &chem(), 2.0, 3.0);
        state.reset();
        let (_, _, c_filtered) = derive_ph(&mut state, &chem(), -0.3, -0.2);
        assert!((c_filtered - (-0.5)).abs() < 1e-6);
    }
}
