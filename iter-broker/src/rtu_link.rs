use crate::service::BankService;
use iter_store::{Parity, RtuLink};
use std::time::{Duration, Instant};
use tokio_serial::SerialPortBuilderExt;

/// The RTU link's observable connection state (spec §9's "three observable
/// states", recovered from the original's `ctx_rtu == NULL` / retry-with-
/// `sleep(1)` loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtuState {
    Connected,
    Reconnecting,
    CoolingDown,
}

fn data_bits(n: u8) -> tokio_serial::DataBits {
    match n {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    }
}

fn stop_bits(n: u8) -> tokio_serial::StopBits {
    match n {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    }
}

fn parity(p: Parity) -> tokio_serial::Parity {
    match p {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    }
}

fn open(link: &RtuLink) -> anyhow::Result<tokio_serial::SerialStream> {
    let builder = tokio_serial::new(&link.device, link.baud)
        .data_bits(data_bits(link.data_bits))
        .stop_bits(stop_bits(link.stop_bits))
        .parity(parity(link.parity));
    Ok(builder.open_native_async()?)
}

/// Keeps the RTU serial port open and serving Modbus/RTU requests against
/// `service`, reconnecting with a throttled diagnostic on failure (at most
/// one "RTU open failed" line per 5 s, per spec §4.4). Runs until
/// `shutdown` is set; a single bad open or a broken session both fall back
/// to the same reconnect path, mirroring the original's blanket
/// `ctx_rtu = NULL` reset on any RTU error.
pub async fn run(link: RtuLink, service: BankService, shutdown: iter_common::ShutdownFlag) {
    const LOG_THROTTLE: Duration = Duration::from_secs(5);
    let mut last_logged: Option<Instant> = None;

    while !shutdown.is_set() {
        match open(&link) {
            Ok(serial) => {
                tracing::info!(device = %link.device, "RTU port opened");
                let server = tokio_modbus::server::rtu::Server::new(serial);
                if let Err(e) = server.serve_forever(service.clone()).await {
                    tracing::warn!(error = %e, "RTU session ended, reconnecting");
                }
            }
            Err(e) => {
                if last_logged.map(|t| t.elapsed() >= LOG_THROTTLE).unwrap_or(true) {
                    tracing::warn!(error = %e, device = %link.device, "RTU open failed, retrying");
                    last_logged = Some(Instant::now());
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
