use clap::Parser;
use iter_devices::{LoopbackClient, ModbusAnalogOutput, NullAnalogInput, OutputKind};
use iter_worker::{WorkerArgs, Worker};
use std::fs::File;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let args = WorkerArgs::parse();

    let log_dir = std::path::Path::new(&args.log_dir);
    std::fs::create_dir_all(log_dir)?;
    std::fs::create_dir_all(&args.csv_dir)?;
    let log_file = File::create(log_dir.join("worker_current.log"))?;
    iter_common::logging_setup(args.max_tracing_level(), Some(log_file));

    let shutdown = iter_common::ShutdownFlag::install()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args, shutdown))
}

async fn run(args: WorkerArgs, shutdown: iter_common::ShutdownFlag) -> anyhow::Result<()> {
    let mut store = iter_store::ParamStore::new(&args.params);
    let (mut params, _) = store.load();

    if let Some(ip) = &args.dac_ip {
        params.dac_link.ip = ip.clone();
    }
    if let Some(port) = args.dac_port {
        params.dac_link.port = port;
    }
    if let Some(slave) = args.dac_slave {
        params.dac_link.slave_id = slave;
    }

    let dac_addr: std::net::SocketAddr = format!("{}:{}", params.dac_link.ip, params.dac_link.port).parse()?;
    let mut ao = loop {
        if shutdown.is_set() {
            return Ok(());
        }
        match ModbusAnalogOutput::connect_with_timeout(dac_addr, params.dac_link.slave_id, Duration::from_secs(2)).await {
            Ok(ao) => break ao,
            Err(e) => {
                tracing::warn!(error = %e, "DAC not reachable yet, retrying");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    ao.init_output_types([
        OutputKind::Bipolar5V,
        OutputKind::Current4to20mA,
        OutputKind::Current4to20mA,
        OutputKind::Current4to20mA,
    ])
    .await?;

    let control_addr: std::net::SocketAddr = args.control_addr.parse()?;
    let loopback = LoopbackClient::new(control_addr, 1);
    let ai = NullAnalogInput::new(0.0);
    let sinks = iter_worker::sinks::WorkerSinks::new(&args.csv_dir, &args.log_dir)?;

    let mut worker = Worker::new(ao, ai, loopback, sinks, store);
    worker.run_forever(&shutdown).await
}
