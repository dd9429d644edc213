//! Sweep Worker: drives the DAC through each configured phase, samples the
//! ADC, derives pH/redox chemistry, and publishes results to the Broker's
//! loopback Modbus listener.

pub mod ao_projection;
pub mod chemistry;
pub mod cli;
pub mod control_state;
pub mod ema;
pub mod runner;
pub mod scheduler;
pub mod sinks;

pub use cli::WorkerArgs;
pub use runner::{CycleOutcome, Worker};
