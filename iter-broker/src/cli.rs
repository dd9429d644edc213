use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};

/// The Register Broker: serves the shared register bank over Modbus/TCP
/// and Modbus/RTU, persisting parameter changes back to disk.
#[derive(Debug, Parser)]
#[command(name = "iter-broker", version, styles = iter_common::get_styles())]
pub struct BrokerArgs {
    /// Path to the iteration-parameters file.
    #[arg(long, default_value = "./iter_params.txt")]
    pub params: String,

    /// Modbus/TCP bind address.
    #[arg(long, default_value = "0.0.0.0:1502")]
    pub tcp_addr: String,

    /// Maximum concurrent TCP client connections.
    #[arg(long, default_value_t = 10)]
    pub max_clients: usize,

    /// Overrides the parameter file's RTU device path at startup only.
    #[arg(long)]
    pub rtu_device: Option<String>,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl BrokerArgs {
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
