//! Register offsets, fixed by the original firmware's wire layout and
//! carried forward unchanged (recovered from
//! `original_source/iter_modbus_server.c`).

use iter_store::{CHANNELS, MAX_PHASES};

pub const INT_HEADER_REGS: usize = 6;
pub const INT_PHASE_REGS_PER_PHASE: usize = 12;
pub const INT_BASE: usize = 0;
pub const INT_BLOCK_WORDS: usize = INT_HEADER_REGS + MAX_PHASES * INT_PHASE_REGS_PER_PHASE; // 66

pub const FLOAT_HEADER_REGS: usize = 6;
pub const FLOAT_PHASE_REGS_PER_PHASE: usize = 12;
pub const FLOAT_BASE: usize = INT_BASE + INT_BLOCK_WORDS; // 66
pub const FLOAT_BLOCK_WORDS: usize = FLOAT_HEADER_REGS + MAX_PHASES * FLOAT_PHASE_REGS_PER_PHASE; // 66

pub const CONTROL_REG_ADDR: usize = FLOAT_BASE + FLOAT_BLOCK_WORDS; // 132
pub const CONTROL_REG_COUNT: usize = 2;

pub const CALC_SETTINGS_START: usize = 200;
pub const CALC_SETTINGS_WORDS: usize = CHANNELS * 2 * 2; // k[8] + b[8], 2 words/float -> 32

pub const CHEM_SETTINGS_START: usize = 400;
pub const CHEM_K_SUM: usize = CHEM_SETTINGS_START;
pub const CHEM_B_SUM: usize = CHEM_SETTINGS_START + 2;
pub const CHEM_ALPHA_C: usize = CHEM_SETTINGS_START + 4;
pub const CHEM_DEADBAND_ACID: usize = CHEM_SETTINGS_START + 6;
pub const CHEM_DEADBAND_ALKALI: usize = CHEM_SETTINGS_START + 8;
pub const CHEM_PH_NEUTRAL: usize = CHEM_SETTINGS_START + 10;
pub const CHEM_K_ACID: usize = CHEM_SETTINGS_START + 12;
pub const CHEM_B_ACID: usize = CHEM_SETTINGS_START + 14;
pub const CHEM_K_ALKALI: usize = CHEM_SETTINGS_START + 16;
pub const CHEM_B_ALKALI: usize = CHEM_SETTINGS_START + 18;
pub const CHEM_ALPHA_REDOX1: usize = CHEM_SETTINGS_START + 20;
pub const CHEM_ALPHA_REDOX2: usize = CHEM_SETTINGS_START + 22;
pub const CHEM_TOK1_K: usize = CHEM_SETTINGS_START + 24; // 424
pub const CHEM_TOK2_K: usize = CHEM_SETTINGS_START + 26; // 426
pub const CHEM_SETTINGS_WORDS: usize = 30; // 400..430

pub const AO_MAP_START: usize = 430;
pub const AO_MAP_WORDS: usize = 18; // 3 channels * (source, min, max) * 2 words

pub const RESULTS_START: usize = 1000;
pub const RESULTS_WORDS: usize = 16;

pub const PHASE_RESULTS_START: usize = 3000;
pub const PHASE_RESULTS_WORDS_PER_PHASE: usize = 16;
pub const PHASE_RESULTS_WORDS: usize = MAX_PHASES * PHASE_RESULTS_WORDS_PER_PHASE; // 80

pub const CHEM_RESULTS_START: usize = 4000;
pub const CHEM_RESULTS_WORDS: usize = 20;

/// Chemistry result sub-offsets within the 4000 block.
pub const CHEM_RESULT_C_RAW: usize = CHEM_RESULTS_START;
pub const CHEM_RESULT_C_FILTERED: usize = CHEM_RESULTS_START + 2;
pub const CHEM_RESULT_C_ACID: usize = CHEM_RESULTS_START + 4;
pub const CHEM_RESULT_C_ALKALI: usize = CHEM_RESULTS_START + 6;
pub const CHEM_RESULT_PH: usize = CHEM_RESULTS_START + 8;
pub const CHEM_RESULT_R1_RAW: usize = CHEM_RESULTS_START + 10;
pub const CHEM_RESULT_R1_AVG: usize = CHEM_RESULTS_START + 12;
pub const CHEM_RESULT_R2_RAW: usize = CHEM_RESULTS_START + 14;
pub const CHEM_RESULT_R2_AVG: usize = CHEM_RESULTS_START + 16;

/// Total addressable span, high enough to hold every block above.
pub const TOTAL_REGS: usize = CHEM_RESULTS_START + CHEM_RESULTS_WORDS;

/// Whether a write of `count` registers starting at `start` overlaps the
/// half-open block `[block_start, block_start + block_size)`.
pub fn write_hits_block(start: usize, count: usize, block_start: usize, block_size: usize) -> bool {
    count > 0 && start < block_start + block_size && start + count > block_start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_offsets_match_recovered_layout() {
        assert_eq!(INT_BLOCK_WORDS, 66);
        assert_eq!(FLOAT_BASE, 66);
        assert_eq!(FLOAT_BLOCK_WORDS, 66);
        assert_eq!(CONTROL_REG_ADDR, 132);
        assert_eq!(CHEM_B_SUM, 402);
    }

    #[test]
    fn write_hits_block_detects_overlap_and_adjacency() {
        assert!(write_hits_block(130, 4, 132, 2));
        assert!(!write_hits_block(100, 2, 132, 2));
        assert!(write_hits_block(132, 1, 132, 2));
        assert!(!write_hits_block(134, 1, 132, 2));
    }
}
