//! Register Broker: the multi-transport Modbus server that exposes the
//! shared register bank over TCP and RTU, and persists parameter changes
//! back to the Parameter Store.

pub mod cli;
pub mod persister;
pub mod rtu_link;
pub mod service;
pub mod state;
pub mod tcp_link;

pub use cli::BrokerArgs;
pub use service::BankService;
pub use state::BrokerState;
