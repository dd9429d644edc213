//! Register Bank: the dense word array shared by the Worker and the
//! Broker, its three aliased views over the iteration parameters, and the
//! control-word codec.

pub mod bank;
pub mod control;
pub mod layout;
pub mod legacy;
pub mod numeric;

pub use bank::{ChemistryResults, RegisterBank, RegisterView, WriteOutcome};
pub use control::ControlCommand;
pub use legacy::{LegacyAlias, LegacyTable};
