use crate::ao_projection::project_ao_currents;
use crate::chemistry::{derive_ph, derive_redox, ChemistryOutputs, ChemistryState};
use crate::control_state::{RunState, WorkerControlState};
use crate::scheduler::DeadlineClock;
use crate::sinks::{CsvRow, WorkerSinks};
use iter_devices::{ma_to_code, voltage_to_code, AnalogInput, AnalogOutput, LoopbackClient};
use iter_regbank::layout::{CHEM_RESULTS_START, CONTROL_REG_ADDR, PHASE_RESULTS_START, PHASE_RESULTS_WORDS_PER_PHASE, RESULTS_START};
use iter_regbank::numeric::f32_to_regs;
use iter_regbank::ChemistryResults;
use iter_store::{IterationParams, ParamStore, CHANNELS, MAX_PHASES};
use std::time::Instant as StdInstant;

/// AO0's register address on the DAC module — it carries the iteration
/// ramp voltage, distinct from AO1-3's chemistry outputs.
const AO0_REG_ADDR: u8 = 0;

fn pack_channels(values: &[f32; CHANNELS]) -> Vec<u16> {
    let mut out = Vec::with_capacity(CHANNELS * 2);
    for v in values {
        out.extend_from_slice(&f32_to_regs(*v));
    }
    out
}

/// One cycle's per-phase, per-channel snapshot (`current_cycle_snapshots`
/// in the original): the last scaled sample taken in each phase, used by
/// the chemistry derivation once the sweep finishes.
pub struct CycleOutcome {
    pub snapshots: [[f32; CHANNELS]; MAX_PHASES],
}

pub struct Worker<AO, AI> {
    pub ao: AO,
    pub ai: AI,
    pub loopback: LoopbackClient,
    pub sinks: WorkerSinks,
    pub store: ParamStore,
    pub control: WorkerControlState,
    pub chemistry: ChemistryState,
    prev_ai: [f32; CHANNELS],
    last_outputs: ChemistryOutputs,
}

impl<AO: AnalogOutput, AI: AnalogInput> Worker<AO, AI> {
    pub fn new(ao: AO, ai: AI, loopback: LoopbackClient, sinks: WorkerSinks, store: ParamStore) -> Self {
        Self {
            ao,
            ai,
            loopback,
            sinks,
            store,
            control: WorkerControlState::new(),
            chemistry: ChemistryState::new(),
            prev_ai: [0.0; CHANNELS],
            last_outputs: ChemistryOutputs::default(),
        }
    }

    /// Consumes and applies one pending control-word command, if any.
    /// Returns `true` if it was a restart request.
    pub async fn poll_control(&mut self) -> bool {
        let Ok(regs) = self.loopback.read_control_word().await else {
            return false;
        };
        let cmd = iter_regbank::ControlCommand::decode(regs);
        if cmd == iter_regbank::ControlCommand::None {
            return false;
        }
        let _ = self.loopback.write_registers(CONTROL_REG_ADDR as u16, &[0, 0]).await;
        self.control.apply(cmd)
    }

    /// Runs every configured phase once, honoring a Stop or Restart raised
    /// mid-flight. Returns `None` if the cycle was aborted before every
    /// phase finished (stop, restart, or a persistent DAC error).
    pub async fn run_cycle(
        &mut self,
        params: &IterationParams,
        cycle: u64,
        t0: StdInstant,
    ) -> anyhow::Result<Option<CycleOutcome>> {
        self.sinks.begin_cycle()?;
        let mut snapshots = [[0.0f32; CHANNELS]; MAX_PHASES];
        let mut clock = DeadlineClock::starting_now();

        for (ph, phase) in params.active_phases().iter().enumerate() {
            if self.poll_control().await || self.control.run_state() == RunState::Stopped {
                self.sinks.abort_cycle();
                return Ok(None);
            }

            let mut iter_mv = phase.start_mv;
            let mut idx = 0u32;
            let mut had_steps = false;
            let mut last_calc = [0.0f32; CHANNELS];

            while phase.in_range(iter_mv) {
                if self.poll_control().await || self.control.run_state() == RunState::Stopped {
                    self.sinks.abort_cycle();
                    return Ok(None);
                }

                if phase.pause_ms == 0 {
                    iter_mv += phase.step_mv;
                    continue;
                }

                clock.advance_and_sleep(phase.period_ms).await;
                had_steps = true;

                let code = voltage_to_code(iter_mv as f64 / 1000.0);
                if self.ao.write_dac(AO0_REG_ADDR, code).await.is_err() {
                    tracing::error!("persistent DAC error, aborting cycle");
                    self.sinks.abort_cycle();
                    return Ok(None);
                }

                clock.sleep_until_offset(phase.settle_ms).await;

                let mut ai = [0.0f32; CHANNELS];
                for (c, slot) in ai.iter_mut().enumerate() {
                    *slot = match self.ai.read_channel(c as u8).await {
                        Ok((v, _status)) => {
                            self.prev_ai[c] = v;
                            v
                        }
                        Err(_) => self.prev_ai[c],
                    };
                }

                let mut calc = [0.0f32; CHANNELS];
                for c in 0..CHANNELS {
                    calc[c] = params.channel_scale[c].k * ai[c] + params.channel_scale[c].b;
                }
                last_calc = calc;

                let _ = self.loopback.write_registers(RESULTS_START as u16, &pack_channels(&calc)).await;

                let elapsed_ms = StdInstant::now().saturating_duration_since(t0).as_secs_f64() * 1000.0;
                self.sinks.append_row(&CsvRow {
                    cycle,
                    phase: (ph + 1) as u32,
                    idx,
                    time_ms: elapsed_ms,
                    iter_mv,
                    ao_v: iter_devices::code_to_voltage(code),
                    ai,
                    calc,
                })?;

                idx += 1;
                iter_mv += phase.step_mv;
            }

            if self.control.run_state() == RunState::Stopped {
                self.sinks.abort_cycle();
                return Ok(None);
            }

            if had_steps {
                snapshots[ph] = last_calc;
            }

            if phase.pause_ms > 0 && had_steps {
                let half = phase.pause_ms / 2;
                let remaining = phase.pause_ms - half;
                clock.sleep_until_offset(half).await;

                let mut ai_mid = [0.0f32; CHANNELS];
                for (c, slot) in ai_mid.iter_mut().enumerate() {
                    *slot = match self.ai.read_channel(c as u8).await {
                        Ok((v, _)) => {
                            self.prev_ai[c] = v;
                            v
                        }
                        Err(_) => self.prev_ai[c],
                    };
                }
                let mut calc_mid = [0.0f32; CHANNELS];
                for c in 0..CHANNELS {
                    calc_mid[c] = params.channel_scale[c].k * ai_mid[c] + params.channel_scale[c].b;
                }
                snapshots[ph] = calc_mid;

                let phase_addr = PHASE_RESULTS_START + ph * PHASE_RESULTS_WORDS_PER_PHASE;
                let _ = self.loopback.write_registers(phase_addr as u16, &pack_channels(&calc_mid)).await;

                clock.advance(half);
                tokio::time::sleep_until(clock.current() + std::time::Duration::from_millis(remaining as u64)).await;
                clock.advance(remaining);
            } else {
                self.sinks.flush()?;
            }
        }

        Ok(Some(CycleOutcome { snapshots }))
    }

    /// Derives pH and redox from the cycle's snapshots, publishes the
    /// results to the loopback bank, and projects AO1-3 from them.
    pub async fn perform_chemistry(&mut self, params: &IterationParams, snapshots: &[[f32; CHANNELS]; MAX_PHASES]) {
        let chem = &params.chemistry;
        let mut results = ChemistryResults::default();

        if params.num_phases >= 2 {
            let (r, ph, c_filtered) = derive_ph(&mut self.chemistry, chem, snapshots[0][1], snapshots[1][1]);
            results.c_raw = r.c_raw;
            results.c_filtered = r.c_filtered;
            results.c_acid = r.c_acid;
            results.c_alkali = r.c_alkali;
            results.ph = r.ph;
            self.last_outputs.ph = ph;
            self.last_outputs.c_filtered = c_filtered;
        } else {
            tracing::warn!(got = params.num_phases, "Chemistry skipped! Need >= 2 phases.");
        }

        let last_ph = params.num_phases.max(1) as usize - 1;
        let (r1_avg, r2_avg, r) = derive_redox(&mut self.chemistry, chem, snapshots[last_ph][2], snapshots[last_ph][3]);
        results.r1_raw = r.r1_raw;
        results.r1_avg = r1_avg;
        results.r2_raw = r.r2_raw;
        results.r2_avg = r2_avg;
        self.last_outputs.r1_avg = r1_avg;
        self.last_outputs.r2_avg = r2_avg;

        let mut regs = Vec::with_capacity(18);
        for v in [
            results.c_raw,
            results.c_filtered,
            results.c_acid,
            results.c_alkali,
            results.ph,
            results.r1_raw,
            results.r1_avg,
            results.r2_raw,
            results.r2_avg,
        ] {
            regs.extend_from_slice(&f32_to_regs(v));
        }
        let _ = self.loopback.write_registers(CHEM_RESULTS_START as u16, &regs).await;

        let currents = project_ao_currents(&self.last_outputs, &params.ao_map);
        for (i, ma) in currents.iter().enumerate() {
            let code = ma_to_code(*ma);
            let _ = self.ao.write_dac((i + 1) as u8, code).await;
        }
    }

    /// The top-level loop: load params, run cycles until `repeats`
    /// exhausts (`0` means run forever), honoring Stop/Restart and the
    /// shutdown flag between cycles. Mirrors the original's outer
    /// `for (cycle = 0; repeats == 0 || cycle < repeats; cycle++)` loop.
    pub async fn run_forever(&mut self, shutdown: &iter_common::ShutdownFlag) -> anyhow::Result<()> {
        let t0 = StdInstant::now();
        let (mut params, _) = self.store.load();
        let mut cycle: u64 = 0;

        loop {
            if shutdown.is_set() {
                return Ok(());
            }

            if self.control.run_state() == RunState::Stopped {
                if self.poll_control().await {
                    params = self.store.load().0;
                    self.chemistry.reset();
                } else {
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    continue;
                }
            }

            if params.repeats > 0 && cycle >= params.repeats as u64 {
                return Ok(());
            }

            if self.store.externally_changed() {
                params = self.store.load().0;
            }

            match self.run_cycle(&params, cycle, t0).await? {
                Some(outcome) => {
                    self.perform_chemistry(&params, &outcome.snapshots).await;
                    self.sinks.finish_cycle_success()?;
                    cycle += 1;
                }
                None => {
                    if self.control.run_state() == RunState::Running {
                        // A restart landed mid-cycle: reload and go again
                        // immediately rather than counting this as a cycle.
                        params = self.store.load().0;
                        self.chemistry.reset();
                    }
                }
            }
        }
    }
}
