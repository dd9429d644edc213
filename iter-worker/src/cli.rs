use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};

/// The Sweep Worker: drives the DAC through each configured phase, samples
/// the ADC, and derives chemistry results from the per-cycle snapshots.
#[derive(Debug, Parser)]
#[command(name = "iter-worker", version, styles = iter_common::get_styles())]
pub struct WorkerArgs {
    /// Path to the iteration-parameters file.
    #[arg(long, default_value = "./iter_params.txt")]
    pub params: String,

    /// DAC module address, overriding the parameter file's `rs485_ip` at
    /// startup only.
    #[arg(long)]
    pub dac_ip: Option<String>,

    #[arg(long)]
    pub dac_port: Option<u16>,

    #[arg(long)]
    pub dac_slave: Option<u8>,

    /// Broker loopback address for reading the control word and
    /// publishing results.
    #[arg(long, default_value = "127.0.0.1:1502")]
    pub control_addr: String,

    /// Directory for `iter_current.csv` / `iter_previous.csv`.
    #[arg(long, default_value = ".")]
    pub csv_dir: String,

    /// Directory for `worker_current.log` / `worker_previous.log`.
    #[arg(long, default_value = ".")]
    pub log_dir: String,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl WorkerArgs {
    pub fn max_tracing_level(&self) -> &'static tracing::Level {
        use clap_verbosity_flag::Level;
        match self.verbosity.log_level() {
            Some(Level::Error) => &tracing::Level::ERROR,
            Some(Level::Warn) => &tracing::Level::WARN,
            Some(Level::Info) => &tracing::Level::INFO,
            Some(Level::Debug) => &tracing::Level::DEBUG,
            Some(Level::Trace) => &tracing::Level::TRACE,
            None => &tracing::Level::ERROR,
        }
    }
}
