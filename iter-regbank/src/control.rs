use crate::numeric::{f32_to_regs, regs_to_f32};

const CMD_START: u16 = 0x0001;
const CMD_STOP: u16 = 0x0002;
const CMD_RESTART: u16 = 0x0004;

/// The decoded state of the two-word control register at
/// [`crate::layout::CONTROL_REG_ADDR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    None,
    Start,
    Stop,
    Restart,
}

impl ControlCommand {
    fn bits(self) -> u16 {
        match self {
            ControlCommand::None => 0,
            ControlCommand::Start => CMD_START,
            ControlCommand::Stop => CMD_STOP,
            ControlCommand::Restart => CMD_RESTART,
        }
    }

    fn as_float(self) -> f32 {
        match self {
            ControlCommand::None => 0.0,
            ControlCommand::Start => 1.0,
            ControlCommand::Stop => 2.0,
            ControlCommand::Restart => 3.0,
        }
    }

    fn from_bits(bits: u16) -> Self {
        // Priority order matches the original's `control_bits_to_float`:
        // restart beats stop beats start when more than one bit is set.
        if bits & CMD_RESTART != 0 {
            ControlCommand::Restart
        } else if bits & CMD_STOP != 0 {
            ControlCommand::Stop
        } else if bits & CMD_START != 0 {
            ControlCommand::Start
        } else {
            ControlCommand::None
        }
    }

    /// Decodes the raw two-word control register. The first word is tried
    /// as a float-encoded command (1.0/2.0/3.0, within `0.001`); if that
    /// doesn't match a known command and the raw word is nonzero, it is
    /// tried as a bitmask. Float takes priority because a float-aware
    /// client that wrote `1.0` would otherwise see its command lost to
    /// the bitmask fallback reading the same bits as a bogus mask.
    pub fn decode(regs: [u16; 2]) -> Self {
        let cmd = regs_to_f32(regs);
        if (cmd - 1.0).abs() < 0.001 {
            return ControlCommand::Start;
        }
        if (cmd - 2.0).abs() < 0.001 {
            return ControlCommand::Stop;
        }
        if (cmd - 3.0).abs() < 0.001 {
            return ControlCommand::Restart;
        }
        if regs[0] != 0 {
            return ControlCommand::from_bits(regs[0]);
        }
        ControlCommand::None
    }

    /// Re-encodes the decoded command into its canonical on-wire form: the
    /// bitmask in word 0 paired with the float-encoded command packed over
    /// both words, matching `check_and_save_changes`'s write-back in the
    /// original — whatever form a client wrote, readers always see the
    /// same canonical bytes afterward.
    pub fn encode(self) -> [u16; 2] {
        if self == ControlCommand::None {
            return [0, 0];
        }
        let mut regs = f32_to_regs(self.as_float());
        regs[0] = self.bits();
        regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_float_encoded_commands() {
        assert_eq!(ControlCommand::decode(f32_to_regs(1.0)), ControlCommand::Start);
        assert_eq!(ControlCommand::decode(f32_to_regs(2.0)), ControlCommand::Stop);
        assert_eq!(ControlCommand::decode(f32_to_regs(3.0)), ControlCommand::Restart);
        assert_eq!(ControlCommand::decode(f32_to_regs(0.0)), ControlCommand::None);
    }

    #[test]
    fn decodes_bitmask_fallback() {
        assert_eq!(ControlCommand::decode([CMD_START, 0]), ControlCommand::Start);
        assert_eq!(ControlCommand::decode([CMD_STOP, 0]), ControlCommand::Stop);
        assert_eq!(ControlCommand::decode([CMD_RESTART, 0]), ControlCommand::Restart);
    }

    #[test]
    fn restart_bit_wins_over_stop_and_start() {
        assert_eq!(
            ControlCommand::decode([CMD_START | CMD_STOP | CMD_RESTART, 0]),
            ControlCommand::Restart
        );
    }

    #[test]
    fn encode_is_idempotent_under_redecode() {
        for cmd in [
            ControlCommand::None,
            ControlCommand::Start,
            ControlCommand::Stop,
            ControlCommand::Restart,
        ] {
            assert_eq!(ControlCommand::decode(cmd.encode()), cmd);
        }
    }

    #[test]
    fn unrecognized_nonzero_bits_pass_through_as_none_when_no_known_bit_set() {
        assert_eq!(ControlCommand::decode([0x0008, 0]), ControlCommand::None);
    }
}
