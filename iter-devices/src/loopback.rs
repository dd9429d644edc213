use iter_regbank::layout::CONTROL_REG_ADDR;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_modbus::client::{tcp, Context as ModbusContext};
use tokio_modbus::prelude::*;

/// The three states the Worker's connection to the Broker (or the DAC
/// connection, which reconnects the same way) can observe from the
/// outside — spec §9's "three observable states" note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Reconnecting,
    CoolingDown,
}

/// Worker-side Modbus/TCP client against the Broker's loopback listener.
/// Best-effort: every call tolerates a dropped connection by attempting
/// one reconnect before giving up for this call, matching the original
/// firmware's `poll_control_commands`/result-publish pattern where a
/// stale link never blocks the scheduler past its own retry budget.
pub struct LoopbackClient {
    addr: SocketAddr,
    slave_id: u8,
    ctx: Option<ModbusContext>,
    backoff: Duration,
    max_backoff: Duration,
}

impl LoopbackClient {
    pub fn new(addr: SocketAddr, slave_id: u8) -> Self {
        Self {
            addr,
            slave_id,
            ctx: None,
            backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }

    pub fn state(&self) -> LinkState {
        if self.ctx.is_some() {
            LinkState::Connected
        } else if self.backoff <= Duration::from_millis(100) {
            LinkState::Reconnecting
        } else {
            LinkState::CoolingDown
        }
    }

    async fn ensure_connected(&mut self) -> anyhow::Result<&mut ModbusContext> {
        if self.ctx.is_none() {
            match tokio::time::timeout(Duration::from_millis(500), tcp::connect(self.addr)).await {
                Ok(Ok(mut ctx)) => {
                    ctx.set_slave(Slave(self.slave_id));
                    self.ctx = Some(ctx);
                    self.backoff = Duration::from_millis(100);
                }
                _ => {
                    tokio::time::sleep(self.backoff).await;
                    self.backoff = (self.backoff * 2).min(self.max_backoff);
                    anyhow::bail!("could not reach broker at {}", self.addr);
                }
            }
        }
        Ok(self.ctx.as_mut().expect("just ensured"))
    }

    /// Reads the two-word control register, dropping the connection on
    /// any transport error so the next call retries fresh.
    pub async fn read_control_word(&mut self) -> anyhow::Result<[u16; 2]> {
        let result = {
            let ctx = self.ensure_connected().await?;
            ctx.read_holding_registers(CONTROL_REG_ADDR as u16, 2).await
        };
        match result {
            Ok(Ok(words)) => Ok([words[0], words[1]]),
            other => {
                self.ctx = None;
                match other {
                    Ok(Err(e)) => anyhow::bail!("broker rejected control-word read: {e:?}"),
                    Err(e) => anyhow::bail!("broker link dropped: {e}"),
                    Ok(Ok(_)) => unreachable!(),
                }
            }
        }
    }

    /// Best-effort publish of `words` starting at `start`. Errors are
    /// swallowed into a `bool` success flag rather than propagated — the
    /// scheduler must never block a cycle on a dead loopback link (spec
    /// §9's "result publish is best-effort").
    pub async fn write_registers(&mut self, start: u16, words: &[u16]) -> bool {
        let ctx = match self.ensure_connected().await {
            Ok(ctx) => ctx,
            Err(_) => return false,
        };
        match ctx.write_multiple_registers(start, words).await {
            Ok(Ok(())) => true,
            _ => {
                self.ctx = None;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_starts_disconnected_as_reconnecting() {
        let client = LoopbackClient::new("127.0.0.1:1502".parse().unwrap(), 1);
        assert_eq!(client.state(), LinkState::Reconnecting);
    }
}
