use crate::params::{AoSource, IterationParams, Parity};
use crate::phase::{CHANNELS, MAX_PHASES};
use std::path::Path;
use std::time::SystemTime;

/// Splits a phase-scoped key like `step3_period_ms` or `phase3_period_ms`
/// into its zero-based phase index and bare suffix. A key with neither
/// prefix is treated as belonging to phase 0 (spec §6: "N=1 uses bare
/// names").
fn parse_phase_key(key: &str) -> (usize, &str) {
    for prefix in ["step", "phase"] {
        if let Some(rest) = key.strip_prefix(prefix) {
            let digit_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digit_len > 0 {
                let (digits, tail) = rest.split_at(digit_len);
                if let (Ok(n), Some(suffix)) = (digits.parse::<usize>(), tail.strip_prefix('_')) {
                    if (1..=MAX_PHASES).contains(&n) {
                        return (n - 1, suffix);
                    }
                }
            }
        }
    }
    (0, key)
}

fn parse_parity(s: &str) -> Option<Parity> {
    match s.trim() {
        "N" | "n" => Some(Parity::None),
        "E" | "e" => Some(Parity::Even),
        "O" | "o" => Some(Parity::Odd),
        _ => None,
    }
}

/// Loads a parameter file, returning the fully populated struct and a count
/// of successfully-applied `key=value` assignments.
///
/// A missing file returns defaults with `parsed_count == 0` — spec §4.1:
/// "Always returns a fully populated struct; `parsed_count = 0` signals
/// 'file unusable or empty' and the caller must suppress persistence." A
/// malformed numeric value leaves the field at its prior (default) value
/// and is simply not counted; unknown keys are silently skipped.
pub fn load(path: &Path) -> (IterationParams, usize) {
    let mut params = IterationParams::default();
    let mut parsed = 0usize;

    let Ok(content) = std::fs::read_to_string(path) else {
        return (params, 0);
    };

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if apply_key(&mut params, key, value) {
            parsed += 1;
        }
    }

    params.normalize();
    for phase in params.phases.iter_mut() {
        // A phase that fails validation (zero step) keeps its prior value;
        // defaults are always valid, so this only discards a bad write.
        let before = *phase;
        if phase.validate().is_err() {
            *phase = before;
        }
    }

    (params, parsed)
}

fn apply_key(params: &mut IterationParams, key: &str, value: &str) -> bool {
    if let Some(rest) = key.strip_prefix("calc_") {
        return apply_chemistry_key(params, rest, value);
    }
    if key == "tok1_k" {
        return parse_into(value, &mut params.chemistry.tok1_k);
    }
    if key == "tok2_k" {
        return parse_into(value, &mut params.chemistry.tok2_k);
    }
    if let Some(rest) = key.strip_prefix("ao") {
        if let Some(idx_char) = rest.chars().next() {
            if let Some(idx) = idx_char.to_digit(10).and_then(|d| (1..=3).contains(&d).then_some(d as usize - 1)) {
                let suffix = &rest[1..];
                return apply_ao_key(params, idx, suffix, value);
            }
        }
    }
    if let Some(rest) = key.strip_prefix("ch") {
        if let Some(idx_char) = rest.chars().next() {
            if let Some(idx) = idx_char
                .to_digit(10)
                .and_then(|d| (1..=CHANNELS as u32).contains(&d).then_some(d as usize - 1))
            {
                let suffix = &rest[1..];
                return apply_channel_key(params, idx, suffix, value);
            }
        }
    }
    match key {
        "rs485_ip" => {
            params.dac_link.ip = value.to_string();
            true
        }
        "rs485_port" => parse_into(value, &mut params.dac_link.port),
        "rs485_slave" => parse_into(value, &mut params.dac_link.slave_id),
        "rtu_port" => {
            params.rtu_link.device = value.to_string();
            true
        }
        "rtu_baud" => parse_into(value, &mut params.rtu_link.baud),
        "rtu_parity" => {
            if let Some(p) = parse_parity(value) {
                params.rtu_link.parity = p;
                true
            } else {
                false
            }
        }
        "rtu_data_bit" => parse_into(value, &mut params.rtu_link.data_bits),
        "rtu_stop_bit" => parse_into(value, &mut params.rtu_link.stop_bits),
        "rtu_slave_id" => parse_into(value, &mut params.rtu_link.slave_id),
        "repeats" => parse_into(value, &mut params.repeats),
        "phases" => {
            if let Ok(n) = value.parse::<u8>() {
                if (1..=MAX_PHASES as u8).contains(&n) {
                    params.num_phases = n;
                    return true;
                }
            }
            false
        }
        _ => apply_phase_key(params, key, value),
    }
}

fn apply_chemistry_key(params: &mut IterationParams, suffix: &str, value: &str) -> bool {
    let chem = &mut params.chemistry;
    match suffix {
        "k_sum" => parse_into(value, &mut chem.k_sum),
        "b_sum" => parse_into(value, &mut chem.b_sum),
        // legacy alias, recovered from original_source/iter_modbus_server.c
        "filter_size" | "alpha_c" => parse_into(value, &mut chem.alpha_c),
        "deadband_acid" => parse_into(value, &mut chem.deadband_acid),
        "deadband_alkali" => parse_into(value, &mut chem.deadband_alkali),
        "ph_neutral" => parse_into(value, &mut chem.ph_neutral),
        "k_acid" => parse_into(value, &mut chem.k_acid),
        "b_acid" => parse_into(value, &mut chem.b_acid),
        "k_alkali" => parse_into(value, &mut chem.k_alkali),
        "b_alkali" => parse_into(value, &mut chem.b_alkali),
        "filter_redox1" | "alpha_redox1" => parse_into(value, &mut chem.alpha_redox1),
        "filter_redox2" | "alpha_redox2" => parse_into(value, &mut chem.alpha_redox2),
        _ => false,
    }
}

fn apply_ao_key(params: &mut IterationParams, idx: usize, suffix: &str, value: &str) -> bool {
    let ao = &mut params.ao_map[idx];
    match suffix {
        "_source" => {
            if let Ok(code) = value.parse::<f32>() {
                ao.source = AoSource::from_code(code);
                true
            } else {
                false
            }
        }
        "_min" => parse_into(value, &mut ao.min_val),
        "_max" => parse_into(value, &mut ao.max_val),
        _ => false,
    }
}

fn apply_channel_key(params: &mut IterationParams, idx: usize, suffix: &str, value: &str) -> bool {
    let ch = &mut params.channel_scale[idx];
    match suffix {
        "_k" => parse_into(value, &mut ch.k),
        "_b" => parse_into(value, &mut ch.b),
        _ => false,
    }
}

fn apply_phase_key(params: &mut IterationParams, key: &str, value: &str) -> bool {
    let (idx, suffix) = parse_phase_key(key);
    let idx = idx.min(MAX_PHASES - 1);
    let phase = &mut params.phases[idx];
    let applied = match suffix {
        "start_mV" => parse_into(value, &mut phase.start_mv),
        "end_mV" => parse_into(value, &mut phase.end_mv),
        "step_mV" => parse_into(value, &mut phase.step_mv),
        "period_ms" => parse_into(value, &mut phase.period_ms),
        "settle_ms" => parse_into(value, &mut phase.settle_ms),
        "pause_ms" => parse_into(value, &mut phase.pause_ms),
        _ => false,
    };
    if applied && idx + 1 > params.num_phases as usize {
        params.num_phases = (idx + 1) as u8;
    }
    applied
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) -> bool {
    match value.parse() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}

/// Returns the file's modification time, or `None` if it doesn't exist /
/// can't be stat'd.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Whether the file's current mtime differs from `cached`.
pub fn changed(path: &Path, cached: Option<SystemTime>) -> bool {
    mtime(path) != cached
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_yields_defaults_and_zero_parsed() {
        let (params, parsed) = load(Path::new("/nonexistent/iter_params.txt"));
        assert_eq!(parsed, 0);
        assert_eq!(params, IterationParams::default());
    }

    #[test]
    fn bare_names_address_phase_one() {
        let f = write_temp("start_mV=-1000\nend_mV=1000\nstep_mV=500\n");
        let (params, parsed) = load(f.path());
        assert_eq!(parsed, 3);
        assert_eq!(params.phases[0].start_mv, -1000);
        assert_eq!(params.phases[0].end_mv, 1000);
        assert_eq!(params.phases[0].step_mv, 500);
    }

    #[test]
    fn step_and_phase_prefixes_are_both_accepted() {
        let f = write_temp("phases=2\nstep2_start_mV=10\nphase2_end_mV=20\n");
        let (params, _) = load(f.path());
        assert_eq!(params.phases[1].start_mv, 10);
        assert_eq!(params.phases[1].end_mv, 20);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let f = write_temp("# a comment\n\nrepeats=5\n  # indented comment\n");
        let (params, parsed) = load(f.path());
        assert_eq!(parsed, 1);
        assert_eq!(params.repeats, 5);
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let f = write_temp("not_a_real_key=123\nrepeats=2\n");
        let (params, parsed) = load(f.path());
        assert_eq!(parsed, 1);
        assert_eq!(params.repeats, 2);
    }

    #[test]
    fn malformed_numeric_leaves_default() {
        let f = write_temp("repeats=not-a-number\n");
        let (params, parsed) = load(f.path());
        assert_eq!(parsed, 0);
        assert_eq!(params.repeats, 1);
    }

    #[test]
    fn repeats_sentinels_canonicalize_to_infinite() {
        let f = write_temp("repeats=-1\n");
        let (params, _) = load(f.path());
        assert_eq!(params.repeats, 0);

        let f = write_temp("repeats=0\n");
        let (params, _) = load(f.path());
        assert_eq!(params.repeats, 0);
    }

    #[test]
    fn other_negative_repeats_normalizes_to_one() {
        let f = write_temp("repeats=-7\n");
        let (params, _) = load(f.path());
        assert_eq!(params.repeats, 1);
    }

    #[test]
    fn legacy_chemistry_aliases_are_accepted() {
        let f = write_temp("calc_filter_size=0.25\ncalc_filter_redox1=0.75\n");
        let (params, parsed) = load(f.path());
        assert_eq!(parsed, 2);
        assert_eq!(params.chemistry.alpha_c, 0.25);
        assert_eq!(params.chemistry.alpha_redox1, 0.75);
    }

    #[test]
    fn ao_source_parses_rounded_code() {
        let f = write_temp("ao1_source=2.0\nao1_min=1.5\nao1_max=9.5\n");
        let (params, _) = load(f.path());
        assert_eq!(params.ao_map[0].source, AoSource::C);
        assert_eq!(params.ao_map[0].min_val, 1.5);
        assert_eq!(params.ao_map[0].max_val, 9.5);
    }

    #[test]
    fn zero_step_write_is_rejected_keeping_default() {
        let f = write_temp("step_mV=0\n");
        let (params, _) = load(f.path());
        assert_eq!(params.phases[0], crate::phase::IterationPhase::default());
    }
}
