use crate::params::IterationParams;
use crate::phase::MAX_PHASES;
use std::fmt::Write as _;
use std::path::Path;

/// Serializes `params` back to the `key=value` text format `load` accepts,
/// phase 1 using bare names and phases 2..N using the `stepN_` prefix — the
/// same convention the original firmware's `save_iter_params` writes, so a
/// file this crate saves is legible to the same tooling that reads it.
pub fn render(params: &IterationParams) -> String {
    let mut out = String::new();

    writeln!(out, "repeats={}", params.repeats).unwrap();
    writeln!(out, "phases={}", params.num_phases).unwrap();

    for (i, phase) in params.active_phases().iter().enumerate() {
        let prefix = if i == 0 {
            String::new()
        } else {
            format!("step{}_", i + 1)
        };
        writeln!(out, "{prefix}start_mV={}", phase.start_mv).unwrap();
        writeln!(out, "{prefix}end_mV={}", phase.end_mv).unwrap();
        writeln!(out, "{prefix}step_mV={}", phase.step_mv).unwrap();
        writeln!(out, "{prefix}period_ms={}", phase.period_ms).unwrap();
        writeln!(out, "{prefix}settle_ms={}", phase.settle_ms).unwrap();
        writeln!(out, "{prefix}pause_ms={}", phase.pause_ms).unwrap();
    }

    for (i, ch) in params.channel_scale.iter().enumerate() {
        writeln!(out, "ch{}_k={}", i + 1, ch.k).unwrap();
        writeln!(out, "ch{}_b={}", i + 1, ch.b).unwrap();
    }

    let chem = &params.chemistry;
    writeln!(out, "calc_k_sum={}", chem.k_sum).unwrap();
    writeln!(out, "calc_b_sum={}", chem.b_sum).unwrap();
    writeln!(out, "calc_alpha_c={}", chem.alpha_c).unwrap();
    writeln!(out, "calc_deadband_acid={}", chem.deadband_acid).unwrap();
    writeln!(out, "calc_deadband_alkali={}", chem.deadband_alkali).unwrap();
    writeln!(out, "calc_ph_neutral={}", chem.ph_neutral).unwrap();
    writeln!(out, "calc_k_acid={}", chem.k_acid).unwrap();
    writeln!(out, "calc_b_acid={}", chem.b_acid).unwrap();
    writeln!(out, "calc_k_alkali={}", chem.k_alkali).unwrap();
    writeln!(out, "calc_b_alkali={}", chem.b_alkali).unwrap();
    writeln!(out, "calc_alpha_redox1={}", chem.alpha_redox1).unwrap();
    writeln!(out, "calc_alpha_redox2={}", chem.alpha_redox2).unwrap();
    writeln!(out, "tok1_k={}", chem.tok1_k).unwrap();
    writeln!(out, "tok2_k={}", chem.tok2_k).unwrap();

    for (i, ao) in params.ao_map.iter().enumerate() {
        writeln!(out, "ao{}_source={}", i + 1, ao.source.to_code()).unwrap();
        writeln!(out, "ao{}_min={}", i + 1, ao.min_val).unwrap();
        writeln!(out, "ao{}_max={}", i + 1, ao.max_val).unwrap();
    }

    writeln!(out, "rs485_ip={}", params.dac_link.ip).unwrap();
    writeln!(out, "rs485_port={}", params.dac_link.port).unwrap();
    writeln!(out, "rs485_slave={}", params.dac_link.slave_id).unwrap();

    writeln!(out, "rtu_port={}", params.rtu_link.device).unwrap();
    writeln!(out, "rtu_baud={}", params.rtu_link.baud).unwrap();
    let parity = match params.rtu_link.parity {
        crate::params::Parity::None => "N",
        crate::params::Parity::Even => "E",
        crate::params::Parity::Odd => "O",
    };
    writeln!(out, "rtu_parity={parity}").unwrap();
    writeln!(out, "rtu_data_bit={}", params.rtu_link.data_bits).unwrap();
    writeln!(out, "rtu_stop_bit={}", params.rtu_link.stop_bits).unwrap();
    writeln!(out, "rtu_slave_id={}", params.rtu_link.slave_id).unwrap();

    debug_assert!(params.num_phases as usize <= MAX_PHASES);
    out
}

/// Writes `params` to `path` via a temp-file-and-rename (spec §4.3's
/// deferred-persist redesign uses this as its flush primitive, debounced by
/// the caller — this function itself is a single atomic write). The temp
/// file is created in `path`'s own directory so the rename stays on one
/// filesystem.
pub fn save_atomic(path: &Path, params: &IterationParams) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, render(params).as_bytes())?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load;

    #[test]
    fn round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iter_params.txt");

        let mut params = IterationParams::default();
        params.num_phases = 2;
        params.phases[1].start_mv = -2000;
        params.phases[1].step_mv = 250;
        params.repeats = 3;
        params.dac_link.ip = "10.0.0.9".to_string();

        save_atomic(&path, &params).unwrap();
        let (reloaded, parsed) = load::load(&path);

        assert!(parsed > 0);
        assert_eq!(reloaded.num_phases, 2);
        assert_eq!(reloaded.phases[1].start_mv, -2000);
        assert_eq!(reloaded.repeats, 3);
        assert_eq!(reloaded.dac_link.ip, "10.0.0.9");
    }

    #[test]
    fn phase_one_uses_bare_names() {
        let params = IterationParams::default();
        let text = render(&params);
        assert!(text.contains("start_mV=-5000"));
        assert!(!text.contains("step1_start_mV"));
    }
}
