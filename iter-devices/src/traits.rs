use async_trait::async_trait;

/// The wiring mode an analog-output channel is configured for on the DAC
/// module itself, written to its type-select registers at startup
/// (recovered from `adam6224_iter_step.c::init_adam6224_ao_types`: AO0 is
/// wired `±5V`, AO1-3 are wired `4-20 mA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Bipolar5V,
    Current4to20mA,
}

/// Capability for driving a DAC module's analog outputs.
#[async_trait]
pub trait AnalogOutput: Send {
    async fn write_dac(&mut self, channel: u8, code: u16) -> anyhow::Result<()>;
    async fn set_channel_type(&mut self, channel: u8, kind: OutputKind) -> anyhow::Result<()>;
}

/// Per-sample status an ADC channel can report alongside its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Ok,
    Overrange,
    Underrange,
    Unavailable,
}

/// Capability for reading a vendor ADC module's analog inputs. The real
/// implementation lives outside this crate against the vendor driver
/// (out of scope per the ambient device layer's Non-goals); this crate
/// only defines the trait plus a test double.
#[async_trait]
pub trait AnalogInput: Send {
    async fn read_channel(&mut self, channel: u8) -> anyhow::Result<(f32, ChannelStatus)>;
    async fn configure(&mut self, auto_filter: bool, integration_mode: u8) -> anyhow::Result<()>;
}

/// An [`AnalogInput`] that always reports the same fixed value and `Ok`
/// status — used in Worker tests in place of the vendor ADC.
pub struct NullAnalogInput {
    pub fixed_value: f32,
}

impl NullAnalogInput {
    pub fn new(fixed_value: f32) -> Self {
        Self { fixed_value }
    }
}

#[async_trait]
impl AnalogInput for NullAnalogInput {
    async fn read_channel(&mut self, _channel: u8) -> anyhow::Result<(f32, ChannelStatus)> {
        Ok((self.fixed_value, ChannelStatus::Ok))
    }

    async fn configure(&mut self, _auto_filter: bool, _integration_mode: u8) -> anyhow::Result<()> {
        Ok(())
    }
}
