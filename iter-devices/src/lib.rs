//! Device abstractions: the `AnalogOutput`/`AnalogInput` capability
//! traits, their Modbus/TCP and loopback-client implementations, and the
//! voltage/current conversion helpers shared with the register bank's
//! rounding rule.

pub mod convert;
pub mod loopback;
pub mod modbus_ao;
pub mod traits;

pub use convert::{code_to_voltage, ma_to_code, value_to_ma, voltage_to_code};
pub use loopback::{LinkState, LoopbackClient};
pub use modbus_ao::ModbusAnalogOutput;
pub use traits::{AnalogInput, AnalogOutput, ChannelStatus, NullAnalogInput, OutputKind};
