use iter_regbank::numeric::round_half_away_from_zero;

/// AO0's bipolar output range, fixed by the DAC module's wiring
/// (recovered from `AO_MIN_V`/`AO_MAX_V` in the original firmware).
pub const BIPOLAR_MIN_V: f64 = -5.0;
pub const BIPOLAR_MAX_V: f64 = 5.0;
const CODE_MIN: i64 = 0;
const CODE_MAX: i64 = 4095;

/// Maps a voltage in `[BIPOLAR_MIN_V, BIPOLAR_MAX_V]` to a 12-bit DAC code,
/// clamping out-of-range input rather than wrapping.
pub fn voltage_to_code(v: f64) -> u16 {
    let v = v.clamp(BIPOLAR_MIN_V, BIPOLAR_MAX_V);
    let ratio = (v - BIPOLAR_MIN_V) / (BIPOLAR_MAX_V - BIPOLAR_MIN_V);
    let code = round_half_away_from_zero((ratio * (CODE_MAX - CODE_MIN) as f64) as f32);
    code.clamp(CODE_MIN, CODE_MAX) as u16
}

/// Inverse of [`voltage_to_code`], used to report the AO0 voltage actually
/// commanded (logged/CSV'd alongside the requested millivolt target).
pub fn code_to_voltage(code: u16) -> f64 {
    let code = (code as i64).min(CODE_MAX) as f64;
    let ratio = (code - CODE_MIN as f64) / (CODE_MAX - CODE_MIN) as f64;
    BIPOLAR_MIN_V + ratio * (BIPOLAR_MAX_V - BIPOLAR_MIN_V)
}

/// Scales a mapped value into the 4-20 mA loop range given the channel's
/// configured `min_val`/`max_val` span, clamping the ratio to `[0, 1]`.
pub fn value_to_ma(value: f32, min_val: f32, max_val: f32) -> f32 {
    let span = max_val - min_val;
    let ratio = if span.abs() < f32::EPSILON {
        0.0
    } else {
        ((value - min_val) / span).clamp(0.0, 1.0)
    };
    4.0 + ratio * 16.0
}

/// Maps a 4-20 mA loop value to the AO1-3 12-bit DAC code.
pub fn ma_to_code(ma: f32) -> u16 {
    let ma = ma.clamp(4.0, 20.0);
    let ratio = (ma - 4.0) / 16.0;
    let code = round_half_away_from_zero(ratio * (CODE_MAX - CODE_MIN) as f32);
    code.clamp(CODE_MIN, CODE_MAX) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_code_round_trip_is_close() {
        for v in [-5.0, -2.5, 0.0, 2.5, 5.0] {
            let code = voltage_to_code(v);
            let back = code_to_voltage(code);
            assert!((back - v).abs() < 0.01, "{v} -> {code} -> {back}");
        }
    }

    #[test]
    fn voltage_clamps_out_of_range() {
        assert_eq!(voltage_to_code(-10.0), voltage_to_code(BIPOLAR_MIN_V));
        assert_eq!(voltage_to_code(10.0), voltage_to_code(BIPOLAR_MAX_V));
    }

    #[test]
    fn value_to_ma_spans_four_to_twenty() {
        assert_eq!(value_to_ma(0.0, 0.0, 100.0), 4.0);
        assert_eq!(value_to_ma(100.0, 0.0, 100.0), 20.0);
        assert_eq!(value_to_ma(50.0, 0.0, 100.0), 12.0);
    }

    #[test]
    fn value_to_ma_clamps_outside_span() {
        assert_eq!(value_to_ma(-10.0, 0.0, 100.0), 4.0);
        assert_eq!(value_to_ma(200.0, 0.0, 100.0), 20.0);
    }

    #[test]
    fn degenerate_span_does_not_divide_by_zero() {
        assert_eq!(value_to_ma(5.0, 3.0, 3.0), 4.0);
    }

    #[test]
    fn ma_to_code_spans_full_range() {
        assert_eq!(ma_to_code(4.0), 0);
        assert_eq!(ma_to_code(20.0), 4095);
    }
}
