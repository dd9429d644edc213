use crate::control::ControlCommand;
use crate::layout::*;
use crate::legacy::LegacyTable;
use crate::numeric::{f32_to_regs, i32_to_regs, regs_to_f32, regs_to_i32};
use iter_store::{AoChannel, AoSource, ChannelScale, Chemistry, IterationParams, IterationPhase, CHANNELS, MAX_PHASES};

/// Which sub-region a write landed in, before reconciliation. Transport
/// configuration (`dac_link`/`rtu_link`) has no register representation —
/// the original firmware's `registers_to_params` never touches those
/// fields either, since an IP address or device path doesn't fit a 16-bit
/// word; they live in the Parameter Store only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterView {
    Int,
    Float,
    Legacy(u16),
}

/// What a [`RegisterBank::dispatch_write`] call triggered. The caller
/// reconciles a changed view with [`RegisterBank::reflect`] and persists
/// via the Parameter Store; a changed control word is handled directly
/// since it never touches the parameter struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    pub view: Option<RegisterView>,
    pub control: Option<ControlCommand>,
}

/// The shared register array plus the legacy address table used to
/// translate writes into canonical offsets before they land.
pub struct RegisterBank {
    words: Vec<u16>,
    legacy: LegacyTable,
}

impl RegisterBank {
    pub fn new(legacy: LegacyTable) -> Self {
        Self {
            words: vec![0; TOTAL_REGS],
            legacy,
        }
    }

    pub fn with_builtin_legacy_table() -> Self {
        Self::new(LegacyTable::builtin())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn read(&self, start: usize, count: usize) -> &[u16] {
        &self.words[start..start + count]
    }

    fn read_pair(&self, offset: usize) -> [u16; 2] {
        [self.words[offset], self.words[offset + 1]]
    }

    fn write_pair(&mut self, offset: usize, regs: [u16; 2]) {
        self.words[offset] = regs[0];
        self.words[offset + 1] = regs[1];
    }

    pub fn read_float(&self, offset: usize) -> f32 {
        regs_to_f32(self.read_pair(offset))
    }

    pub fn read_int32(&self, offset: usize) -> i32 {
        regs_to_i32(self.read_pair(offset))
    }

    /// Writes raw words starting at `start`, translating a legacy `0x40xx`
    /// address to its canonical offset first so the rest of the pipeline
    /// only ever deals in canonical space. Reports which view (if any) was
    /// touched and what control command (if any) resulted.
    pub fn dispatch_write(&mut self, start: usize, values: &[u16]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let legacy_addr = if start >= 0x4000 { Some(start as u16) } else { None };

        let canonical_start = match legacy_addr {
            Some(addr) => match self.legacy.resolve(addr) {
                Some(alias) if alias.width == values.len() => alias.canonical_offset,
                _ => return outcome, // unknown legacy address, or width mismatch: ignored
            },
            None => start,
        };

        for (i, v) in values.iter().enumerate() {
            self.words[canonical_start + i] = *v;
        }

        if write_hits_block(canonical_start, values.len(), CONTROL_REG_ADDR, CONTROL_REG_COUNT) {
            let cmd = ControlCommand::decode(self.read_pair(CONTROL_REG_ADDR));
            self.write_pair(CONTROL_REG_ADDR, cmd.encode());
            outcome.control = Some(cmd);
        }

        if write_hits_block(canonical_start, values.len(), INT_BASE, 200) {
            outcome.view = Some(legacy_addr.map_or(RegisterView::Int, RegisterView::Legacy));
        } else if write_hits_block(canonical_start, values.len(), CALC_SETTINGS_START, CALC_SETTINGS_WORDS)
            || write_hits_block(canonical_start, values.len(), CHEM_SETTINGS_START, CHEM_SETTINGS_WORDS)
            || write_hits_block(canonical_start, values.len(), AO_MAP_START, AO_MAP_WORDS)
        {
            outcome.view = Some(legacy_addr.map_or(RegisterView::Float, RegisterView::Legacy));
        }

        outcome
    }

    /// Re-derives a full [`IterationParams`] from the canonical registers:
    /// phase shape and `repeats`/`num_phases` from the INT block, scaling
    /// and chemistry constants from the FLOAT/CALC/CHEM/AO blocks. This is
    /// the same asymmetric split the original firmware's
    /// `registers_to_params` uses — transport config is left untouched
    /// since it has no register representation.
    pub fn reflect(&self, base: &IterationParams) -> IterationParams {
        let mut params = base.clone();

        params.repeats = self.read_int32(2) as i64;
        if params.repeats < 0 && params.repeats != -1 {
            params.repeats = 1;
        }

        let mut num_phases = self.read_int32(4);
        if num_phases < 1 {
            num_phases = 1;
        }
        if num_phases as usize > MAX_PHASES {
            num_phases = MAX_PHASES as i32;
        }
        params.num_phases = num_phases as u8;

        for i in 0..MAX_PHASES {
            let base_off = INT_HEADER_REGS + i * INT_PHASE_REGS_PER_PHASE;
            params.phases[i] = IterationPhase {
                start_mv: self.read_int32(base_off),
                end_mv: self.read_int32(base_off + 2),
                step_mv: self.read_int32(base_off + 4),
                period_ms: self.read_int32(base_off + 6).max(1) as u32,
                settle_ms: self.read_int32(base_off + 8).max(0) as u32,
                pause_ms: self.read_int32(base_off + 10).max(0) as u32,
            };
        }

        for i in 0..CHANNELS {
            params.channel_scale[i] = ChannelScale {
                k: self.read_float(CALC_SETTINGS_START + i * 2),
                b: self.read_float(CALC_SETTINGS_START + 16 + i * 2),
            };
        }

        params.chemistry = Chemistry {
            k_sum: self.read_float(CHEM_K_SUM),
            b_sum: self.read_float(CHEM_B_SUM),
            alpha_c: self.read_float(CHEM_ALPHA_C),
            deadband_acid: self.read_float(CHEM_DEADBAND_ACID),
            deadband_alkali: self.read_float(CHEM_DEADBAND_ALKALI),
            ph_neutral: self.read_float(CHEM_PH_NEUTRAL),
            k_acid: self.read_float(CHEM_K_ACID),
            b_acid: self.read_float(CHEM_B_ACID),
            k_alkali: self.read_float(CHEM_K_ALKALI),
            b_alkali: self.read_float(CHEM_B_ALKALI),
            alpha_redox1: self.read_float(CHEM_ALPHA_REDOX1),
            alpha_redox2: self.read_float(CHEM_ALPHA_REDOX2),
            tok1_k: self.read_float(CHEM_TOK1_K),
            tok2_k: self.read_float(CHEM_TOK2_K),
        };

        for c in 0..3 {
            let base_off = AO_MAP_START + c * 6;
            params.ao_map[c] = AoChannel {
                source: AoSource::from_code(self.read_float(base_off)),
                min_val: self.read_float(base_off + 2),
                max_val: self.read_float(base_off + 4),
            };
        }

        params
    }

    /// Renders `params` into the int, float, calc, chem and AO blocks,
    /// preserving whatever is currently in the control word and the
    /// results/snapshot/chem-result blocks — mirrors the original
    /// `params_to_registers`' backup/memset/restore dance, since a
    /// parameter write must never clobber the Worker's in-flight results.
    pub fn project(&mut self, params: &IterationParams) {
        let ctrl_backup = self.read_pair(CONTROL_REG_ADDR);
        let results_backup: Vec<u16> = self.words[RESULTS_START..RESULTS_START + RESULTS_WORDS].to_vec();
        let phase_results_backup: Vec<u16> =
            self.words[PHASE_RESULTS_START..PHASE_RESULTS_START + PHASE_RESULTS_WORDS].to_vec();
        let chem_results_backup: Vec<u16> =
            self.words[CHEM_RESULTS_START..CHEM_RESULTS_START + CHEM_RESULTS_WORDS].to_vec();

        self.write_pair(0, i32_to_regs(1));
        self.write_pair(2, i32_to_regs(params.repeats as i32));
        self.write_pair(4, i32_to_regs(params.num_phases as i32));

        for (i, phase) in params.phases.iter().enumerate() {
            let base_off = INT_HEADER_REGS + i * INT_PHASE_REGS_PER_PHASE;
            self.write_pair(base_off, i32_to_regs(phase.start_mv));
            self.write_pair(base_off + 2, i32_to_regs(phase.end_mv));
            self.write_pair(base_off + 4, i32_to_regs(phase.step_mv));
            self.write_pair(base_off + 6, i32_to_regs(phase.period_ms as i32));
            self.write_pair(base_off + 8, i32_to_regs(phase.settle_ms as i32));
            self.write_pair(base_off + 10, i32_to_regs(phase.pause_ms as i32));
        }

        self.write_pair(FLOAT_BASE, f32_to_regs(1.0));
        self.write_pair(FLOAT_BASE + 2, f32_to_regs(params.repeats as f32));
        self.write_pair(FLOAT_BASE + 4, f32_to_regs(params.num_phases as f32));
        for (i, phase) in params.phases.iter().enumerate() {
            let base_off = FLOAT_BASE + FLOAT_HEADER_REGS + i * FLOAT_PHASE_REGS_PER_PHASE;
            self.write_pair(base_off, f32_to_regs(phase.start_mv as f32));
            self.write_pair(base_off + 2, f32_to_regs(phase.end_mv as f32));
            self.write_pair(base_off + 4, f32_to_regs(phase.step_mv as f32));
            self.write_pair(base_off + 6, f32_to_regs(phase.period_ms as f32));
            self.write_pair(base_off + 8, f32_to_regs(phase.settle_ms as f32));
            self.write_pair(base_off + 10, f32_to_regs(phase.pause_ms as f32));
        }

        for (i, ch) in params.channel_scale.iter().enumerate() {
            self.write_pair(CALC_SETTINGS_START + i * 2, f32_to_regs(ch.k));
            self.write_pair(CALC_SETTINGS_START + 16 + i * 2, f32_to_regs(ch.b));
        }

        let chem = &params.chemistry;
        self.write_pair(CHEM_K_SUM, f32_to_regs(chem.k_sum));
        self.write_pair(CHEM_B_SUM, f32_to_regs(chem.b_sum));
        self.write_pair(CHEM_ALPHA_C, f32_to_regs(chem.alpha_c));
        self.write_pair(CHEM_DEADBAND_ACID, f32_to_regs(chem.deadband_acid));
        self.write_pair(CHEM_DEADBAND_ALKALI, f32_to_regs(chem.deadband_alkali));
        self.write_pair(CHEM_PH_NEUTRAL, f32_to_regs(chem.ph_neutral));
        self.write_pair(CHEM_K_ACID, f32_to_regs(chem.k_acid));
        self.write_pair(CHEM_B_ACID, f32_to_regs(chem.b_acid));
        self.write_pair(CHEM_K_ALKALI, f32_to_regs(chem.k_alkali));
        self.write_pair(CHEM_B_ALKALI, f32_to_regs(chem.b_alkali));
        self.write_pair(CHEM_ALPHA_REDOX1, f32_to_regs(chem.alpha_redox1));
        self.write_pair(CHEM_ALPHA_REDOX2, f32_to_regs(chem.alpha_redox2));
        self.write_pair(CHEM_TOK1_K, f32_to_regs(chem.tok1_k));
        self.write_pair(CHEM_TOK2_K, f32_to_regs(chem.tok2_k));

        for (c, ao) in params.ao_map.iter().enumerate() {
            let base_off = AO_MAP_START + c * 6;
            self.write_pair(base_off, f32_to_regs(ao.source.to_code()));
            self.write_pair(base_off + 2, f32_to_regs(ao.min_val));
            self.write_pair(base_off + 4, f32_to_regs(ao.max_val));
        }

        self.write_pair(CONTROL_REG_ADDR, ctrl_backup);
        self.words[RESULTS_START..RESULTS_START + RESULTS_WORDS].copy_from_slice(&results_backup);
        self.words[PHASE_RESULTS_START..PHASE_RESULTS_START + PHASE_RESULTS_WORDS]
            .copy_from_slice(&phase_results_backup);
        self.words[CHEM_RESULTS_START..CHEM_RESULTS_START + CHEM_RESULTS_WORDS]
            .copy_from_slice(&chem_results_backup);
    }

    /// Publishes one cycle's 8 scaled channel values as big-endian float
    /// pairs at the result base (spec §5's "Apply channel scaling ...
    /// publish 16 big-endian float-pair words at result base 1000").
    pub fn publish_results(&mut self, channels: &[f32; CHANNELS]) {
        for (i, v) in channels.iter().enumerate() {
            self.write_pair(RESULTS_START + i * 2, f32_to_regs(*v));
        }
    }

    /// Publishes a phase's mid-pause snapshot at `3000 + 16*phase`.
    pub fn publish_phase_snapshot(&mut self, phase: usize, channels: &[f32; CHANNELS]) {
        let base_off = PHASE_RESULTS_START + phase * PHASE_RESULTS_WORDS_PER_PHASE;
        for (i, v) in channels.iter().enumerate() {
            self.write_pair(base_off + i * 2, f32_to_regs(*v));
        }
    }

    pub fn publish_chemistry_results(&mut self, results: &ChemistryResults) {
        self.write_pair(CHEM_RESULT_C_RAW, f32_to_regs(results.c_raw));
        self.write_pair(CHEM_RESULT_C_FILTERED, f32_to_regs(results.c_filtered));
        self.write_pair(CHEM_RESULT_C_ACID, f32_to_regs(results.c_acid));
        self.write_pair(CHEM_RESULT_C_ALKALI, f32_to_regs(results.c_alkali));
        self.write_pair(CHEM_RESULT_PH, f32_to_regs(results.ph));
        self.write_pair(CHEM_RESULT_R1_RAW, f32_to_regs(results.r1_raw));
        self.write_pair(CHEM_RESULT_R1_AVG, f32_to_regs(results.r1_avg));
        self.write_pair(CHEM_RESULT_R2_RAW, f32_to_regs(results.r2_raw));
        self.write_pair(CHEM_RESULT_R2_AVG, f32_to_regs(results.r2_avg));
    }
}

/// The ten/nine published chemistry fields at offset 4000 (spec §5's pH
/// and redox derivation).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChemistryResults {
    pub c_raw: f32,
    pub c_filtered: f32,
    pub c_acid: f32,
    pub c_alkali: f32,
    pub ph: f32,
    pub r1_raw: f32,
    pub r1_avg: f32,
    pub r2_raw: f32,
    pub r2_avg: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> RegisterBank {
        RegisterBank::with_builtin_legacy_table()
    }

    #[test]
    fn project_then_reflect_round_trips_params() {
        let mut b = bank();
        let mut params = IterationParams::default();
        params.num_phases = 3;
        params.phases[2].step_mv = 250;
        params.chemistry.ph_neutral = 6.5;
        params.channel_scale[4].k = 2.5;

        b.project(&params);
        let reflected = b.reflect(&IterationParams::default());

        assert_eq!(reflected.num_phases, 3);
        assert_eq!(reflected.phases[2].step_mv, 250);
        assert_eq!(reflected.chemistry.ph_neutral, 6.5);
        assert_eq!(reflected.channel_scale[4].k, 2.5);
    }

    #[test]
    fn project_preserves_results_and_control_blocks() {
        let mut b = bank();
        b.publish_results(&[1.0; CHANNELS]);
        b.write_pair(CONTROL_REG_ADDR, f32_to_regs(1.0));

        b.project(&IterationParams::default());

        assert_eq!(b.read_float(RESULTS_START), 1.0);
        assert_eq!(regs_to_f32(b.read_pair(CONTROL_REG_ADDR)), 1.0);
    }

    #[test]
    fn legacy_write_lands_on_canonical_offset() {
        let mut b = bank();
        b.dispatch_write(0x4045, &f32_to_regs(-3.5));
        assert_eq!(b.read_float(CHEM_B_SUM), -3.5);
    }

    #[test]
    fn legacy_write_reports_float_view() {
        let mut b = bank();
        let outcome = b.dispatch_write(0x4049, &f32_to_regs(9.0));
        assert_eq!(outcome.view, Some(RegisterView::Legacy(0x4049)));
        assert_eq!(b.read_float(220), 9.0);
    }

    #[test]
    fn unknown_legacy_address_is_ignored() {
        let mut b = bank();
        let before = b.read(0, TOTAL_REGS).to_vec();
        let outcome = b.dispatch_write(0x4FF0, &[1, 2]);
        assert_eq!(outcome, WriteOutcome::default());
        assert_eq!(b.read(0, TOTAL_REGS), before.as_slice());
    }

    #[test]
    fn control_write_canonicalizes_to_bitmask_plus_float() {
        let mut b = bank();
        let outcome = b.dispatch_write(CONTROL_REG_ADDR, &[0x0001, 0]);
        assert_eq!(outcome.control, Some(ControlCommand::Start));
        assert_eq!(regs_to_f32(b.read_pair(CONTROL_REG_ADDR)), 1.0);
    }

    #[test]
    fn write_spanning_control_and_int_block_reports_both() {
        let mut b = bank();
        // A write starting just before CONTROL_REG_ADDR that extends into it
        // should flag both the INT view and the control word.
        let outcome = b.dispatch_write(CONTROL_REG_ADDR - 1, &[0, 1, 0]);
        assert_eq!(outcome.view, Some(RegisterView::Int));
        assert!(outcome.control.is_some());
    }
}
