use crate::traits::{AnalogOutput, OutputKind};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_modbus::client::{tcp, Context as ModbusContext};
use tokio_modbus::prelude::*;

/// The DAC module's output-type select block, `40201..40204` 1-based
/// (`200..204` 0-based) in the original firmware.
const AO_TYPE_REG_BASE: u16 = 200;

fn type_code(kind: OutputKind) -> u16 {
    match kind {
        OutputKind::Current4to20mA => 1,
        OutputKind::Bipolar5V => 4,
    }
}

/// A Modbus/TCP client for the DAC module (ADAM-6224-class device). Holds
/// no internal reconnect loop of its own — the Worker drives reconnection
/// the same way it drives everything else, against a deadline, so this
/// type only needs a plain `connect`/`write` surface.
pub struct ModbusAnalogOutput {
    ctx: ModbusContext,
}

impl ModbusAnalogOutput {
    pub async fn connect(addr: SocketAddr, slave_id: u8) -> anyhow::Result<Self> {
        let mut ctx = tcp::connect(addr).await?;
        ctx.set_slave(Slave(slave_id));
        Ok(Self { ctx })
    }

    pub async fn connect_with_timeout(
        addr: SocketAddr,
        slave_id: u8,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        tokio::time::timeout(timeout, Self::connect(addr, slave_id))
            .await
            .map_err(|_| anyhow::anyhow!("timed out connecting to DAC at {addr}"))?
    }

    /// Writes the four AO type-select registers in one call, as the
    /// original firmware's `init_adam6224_ao_types` does.
    pub async fn init_output_types(&mut self, kinds: [OutputKind; 4]) -> anyhow::Result<()> {
        let words: Vec<u16> = kinds.iter().map(|k| type_code(*k)).collect();
        self.ctx.write_multiple_registers(AO_TYPE_REG_BASE, &words).await??;
        Ok(())
    }
}

#[async_trait]
impl AnalogOutput for ModbusAnalogOutput {
    async fn write_dac(&mut self, channel: u8, code: u16) -> anyhow::Result<()> {
        let addr = channel as u16;
        self.ctx.write_single_register(addr, code).await??;
        Ok(())
    }

    async fn set_channel_type(&mut self, channel: u8, kind: OutputKind) -> anyhow::Result<()> {
        self.ctx
            .write_single_register(AO_TYPE_REG_BASE + channel as u16, type_code(kind))
            .await??;
        Ok(())
    }
}
