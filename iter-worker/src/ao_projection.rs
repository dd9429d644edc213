use crate::chemistry::ChemistryOutputs;
use iter_devices::value_to_ma;
use iter_store::{AoChannel, AoSource};

/// Projects the last chemistry outputs onto the three AO1-3 channels
/// (spec §5, recovered loop order from `update_analog_outputs`): `OFF`
/// channels report `0.0 mA` (below the 4 mA floor, decoded by the
/// receiving DAC as "off").
pub fn project_ao_currents(outputs: &ChemistryOutputs, ao_map: &[AoChannel; 3]) -> [f32; 3] {
    let mut currents = [0.0f32; 3];
    for (i, ao) in ao_map.iter().enumerate() {
        currents[i] = match ao.source {
            AoSource::Off => 0.0,
            AoSource::Ph => value_to_ma(outputs.ph, ao.min_val, ao.max_val),
            AoSource::C => value_to_ma(outputs.c_filtered, ao.min_val, ao.max_val),
            AoSource::R1 => value_to_ma(outputs.r1_avg, ao.min_val, ao.max_val),
            AoSource::R2 => value_to_ma(outputs.r2_avg, ao.min_val, ao.max_val),
        };
    }
    currents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_channel_reports_zero_ma_not_the_four_ma_floor() {
        let outputs = ChemistryOutputs {
            ph: 8.0,
            ..Default::default()
        };
        let ao_map = [AoChannel::default(); 3];
        let currents = project_ao_currents(&outputs, &ao_map);
        assert_eq!(currents, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn ph_channel_maps_into_its_configured_span() {
        let outputs = ChemistryOutputs {
            ph: 7.0,
            ..Default::default()
        };
        let mut ao_map = [AoChannel::default(); 3];
        ao_map[0] = AoChannel {
            source: AoSource::Ph,
            min_val: 0.0,
            max_val: 14.0,
        };
        let currents = project_ao_currents(&outputs, &ao_map);
        assert!((currents[0] - 12.0).abs() < 1e-4); // 4 + (7/14)*16
    }
}
