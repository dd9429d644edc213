use crate::phase::{IterationPhase, CHANNELS, MAX_PHASES};

/// Per-channel linear scaling applied to a raw ADC sample: `k * raw + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScale {
    pub k: f32,
    pub b: f32,
}

impl Default for ChannelScale {
    fn default() -> Self {
        Self { k: 1.0, b: 0.0 }
    }
}

/// Chemistry derivation coefficients (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chemistry {
    pub k_sum: f32,
    pub b_sum: f32,
    pub alpha_c: f32,
    pub deadband_acid: f32,
    pub deadband_alkali: f32,
    pub ph_neutral: f32,
    pub k_acid: f32,
    pub b_acid: f32,
    pub k_alkali: f32,
    pub b_alkali: f32,
    pub alpha_redox1: f32,
    pub alpha_redox2: f32,
    pub tok1_k: f32,
    pub tok2_k: f32,
}

impl Default for Chemistry {
    fn default() -> Self {
        Self {
            k_sum: 1.0,
            b_sum: 0.0,
            alpha_c: 0.5,
            deadband_acid: 0.1,
            deadband_alkali: 0.1,
            ph_neutral: 7.0,
            k_acid: 1.0,
            b_acid: 0.0,
            k_alkali: 1.0,
            b_alkali: 0.0,
            alpha_redox1: 0.5,
            alpha_redox2: 0.5,
            tok1_k: 1.0,
            tok2_k: 1.0,
        }
    }
}

/// The quantity an analog output channel is driven from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoSource {
    Off,
    Ph,
    C,
    R1,
    R2,
}

impl AoSource {
    /// Decodes the real-valued register encoding 0..4 -> {OFF, pH, C, R1, R2},
    /// rounding half-away-from-zero as the original firmware's
    /// `(int)(source + 0.5f)` does. Anything outside `0..=4` is treated as OFF.
    pub fn from_code(code: f32) -> Self {
        let rounded = (code + 0.5).floor() as i32;
        match rounded {
            1 => AoSource::Ph,
            2 => AoSource::C,
            3 => AoSource::R1,
            4 => AoSource::R2,
            _ => AoSource::Off,
        }
    }

    pub fn to_code(self) -> f32 {
        match self {
            AoSource::Off => 0.0,
            AoSource::Ph => 1.0,
            AoSource::C => 2.0,
            AoSource::R1 => 3.0,
            AoSource::R2 => 4.0,
        }
    }
}

/// Configuration for one of the three derived-output channels (AO1..AO3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoChannel {
    pub source: AoSource,
    pub min_val: f32,
    pub max_val: f32,
}

impl Default for AoChannel {
    fn default() -> Self {
        Self {
            source: AoSource::Off,
            min_val: 0.0,
            max_val: 100.0,
        }
    }
}

/// Modbus/TCP link to the DAC module.
#[derive(Debug, Clone, PartialEq)]
pub struct DacLink {
    pub ip: String,
    pub port: u16,
    pub slave_id: u8,
}

impl Default for DacLink {
    fn default() -> Self {
        Self {
            ip: "192.168.2.2".to_string(),
            port: 502,
            slave_id: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Serial-link configuration for the Modbus/RTU transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RtuLink {
    pub device: String,
    pub baud: u32,
    pub parity: Parity,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub slave_id: u8,
}

impl Default for RtuLink {
    fn default() -> Self {
        Self {
            device: "/dev/ttyAP0".to_string(),
            baud: 9600,
            parity: Parity::None,
            data_bits: 8,
            stop_bits: 1,
            slave_id: 1,
        }
    }
}

/// The full set of iteration parameters: phases, scaling, chemistry
/// coefficients, analog-output mapping and the two link configurations.
/// Never uninitialized — [`IterationParams::default`] supplies every field
/// before a file is ever read.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationParams {
    pub phases: [IterationPhase; MAX_PHASES],
    /// Number of phases actually in use, 1..=5.
    pub num_phases: u8,
    /// 0 means infinite. `-1` from a parameter file is canonicalized to `0`
    /// at load time (spec §9's open question: both sentinels mean infinite).
    pub repeats: i64,
    pub channel_scale: [ChannelScale; CHANNELS],
    pub chemistry: Chemistry,
    pub ao_map: [AoChannel; 3],
    pub dac_link: DacLink,
    pub rtu_link: RtuLink,
}

impl Default for IterationParams {
    fn default() -> Self {
        Self {
            phases: [IterationPhase::default(); MAX_PHASES],
            num_phases: 1,
            repeats: 1,
            channel_scale: [ChannelScale::default(); CHANNELS],
            chemistry: Chemistry::default(),
            ao_map: [AoChannel::default(); 3],
            dac_link: DacLink::default(),
            rtu_link: RtuLink::default(),
        }
    }
}

impl IterationParams {
    /// Clamps `num_phases` into `[1, MAX_PHASES]` and normalizes `repeats`,
    /// then validates every phase in use. A phase failing validation (zero
    /// step) is left at its previous value by the caller — this function
    /// only reports which phases are bad.
    pub fn normalize(&mut self) {
        if self.num_phases < 1 {
            self.num_phases = 1;
        }
        if self.num_phases as usize > MAX_PHASES {
            self.num_phases = MAX_PHASES as u8;
        }
        if self.repeats < 0 {
            self.repeats = if self.repeats == -1 { 0 } else { 1 };
        }
    }

    pub fn active_phases(&self) -> &[IterationPhase] {
        &self.phases[..self.num_phases as usize]
    }
}
