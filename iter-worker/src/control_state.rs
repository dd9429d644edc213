use iter_regbank::ControlCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// The Worker's own half of the control-word protocol: consumes a decoded
/// command and reports the resulting run state plus whether a restart was
/// requested. Grounded in `poll_control_commands` — `Restart` always
/// forces the state back to `Running` alongside raising the restart flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerControlState {
    run_state_stopped: bool,
}

impl WorkerControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_state(&self) -> RunState {
        if self.run_state_stopped {
            RunState::Stopped
        } else {
            RunState::Running
        }
    }

    /// Applies a decoded control command, returning `true` if it was a
    /// restart request (the caller reloads parameters and resets filters
    /// when this is set, then clears it).
    pub fn apply(&mut self, cmd: ControlCommand) -> bool {
        match cmd {
            ControlCommand::None => false,
            ControlCommand::Start => {
                self.run_state_stopped = false;
                false
            }
            ControlCommand::Stop => {
                self.run_state_stopped = true;
                false
            }
            ControlCommand::Restart => {
                self.run_state_stopped = false;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_clears_stopped_state() {
        let mut s = WorkerControlState::new();
        s.apply(ControlCommand::Stop);
        assert_eq!(s.run_state(), RunState::Stopped);
        s.apply(ControlCommand::Start);
        assert_eq!(s.run_state(), RunState::Running);
    }

    #[test]
    fn restart_forces_running_and_reports_true() {
        let mut s = WorkerControlState::new();
        s.apply(ControlCommand::Stop);
        assert!(s.apply(ControlCommand::Restart));
        assert_eq!(s.run_state(), RunState::Running);
    }

    #[test]
    fn none_is_a_no_op() {
        let mut s = WorkerControlState::new();
        assert!(!s.apply(ControlCommand::None));
        assert_eq!(s.run_state(), RunState::Running);
    }
}
