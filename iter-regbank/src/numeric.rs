/// Rounds half away from zero, e.g. `2.5 -> 3`, `-2.5 -> -3`. Both the
/// int32-register view's float->int narrowing and the DAC/ADC voltage and
/// current conversions in `iter-devices` need this exact rule rather than
/// the banker's rounding `f32::round_ties_even` gives.
pub fn round_half_away_from_zero(v: f32) -> i64 {
    if v >= 0.0 {
        (v + 0.5).floor() as i64
    } else {
        (v - 0.5).ceil() as i64
    }
}

/// Packs a big-endian `i32` into two 16-bit registers, high word first —
/// the word order `int32_to_regs` in the original firmware uses.
pub fn i32_to_regs(v: i32) -> [u16; 2] {
    let u = v as u32;
    [(u >> 16) as u16, (u & 0xFFFF) as u16]
}

pub fn regs_to_i32(regs: [u16; 2]) -> i32 {
    (((regs[0] as u32) << 16) | regs[1] as u32) as i32
}

/// Packs an `f32`'s IEEE-754 bit pattern into two 16-bit registers, high
/// word first.
pub fn f32_to_regs(v: f32) -> [u16; 2] {
    let u = v.to_bits();
    [(u >> 16) as u16, (u & 0xFFFF) as u16]
}

pub fn regs_to_f32(regs: [u16; 2]) -> f32 {
    f32::from_bits(((regs[0] as u32) << 16) | regs[1] as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero_both_directions() {
        assert_eq!(round_half_away_from_zero(2.5), 3);
        assert_eq!(round_half_away_from_zero(-2.5), -3);
        assert_eq!(round_half_away_from_zero(2.4), 2);
        assert_eq!(round_half_away_from_zero(-2.4), -2);
    }

    #[test]
    fn int32_register_round_trips() {
        for v in [0i32, 1, -1, i32::MIN, i32::MAX, 123_456, -987_654] {
            assert_eq!(regs_to_i32(i32_to_regs(v)), v);
        }
    }

    #[test]
    fn float_register_round_trips() {
        for v in [0.0f32, 1.0, -1.0, 3.14159, -5000.0, f32::MIN, f32::MAX] {
            assert_eq!(regs_to_f32(f32_to_regs(v)), v);
        }
    }
}
