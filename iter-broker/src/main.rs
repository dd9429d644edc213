use clap::Parser;
use iter_broker::{BankService, BrokerArgs, BrokerState};
use iter_regbank::RegisterBank;
use std::fs::File;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let args = BrokerArgs::parse();

    let log_file = File::create("broker_current.log").ok();
    iter_common::logging_setup(args.max_tracing_level(), log_file);

    let shutdown = iter_common::ShutdownFlag::install()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args, shutdown))
}

async fn run(args: BrokerArgs, shutdown: iter_common::ShutdownFlag) -> anyhow::Result<()> {
    let mut store = iter_store::ParamStore::new(&args.params);
    let (mut params, _) = store.load();
    if let Some(device) = &args.rtu_device {
        params.rtu_link.device = device.clone();
    }

    let mut bank = RegisterBank::with_builtin_legacy_table();
    bank.project(&params);

    let rtu_link = params.rtu_link.clone();
    let state = Arc::new(BrokerState::new(bank, params));
    let service = BankService::new(state.clone());

    let tcp_addr: std::net::SocketAddr = args.tcp_addr.parse()?;

    let persister = tokio::spawn(iter_broker::persister::run(state.clone(), store, shutdown.clone()));
    let rtu = tokio::spawn(iter_broker::rtu_link::run(rtu_link, service.clone(), shutdown.clone()));
    let tcp = iter_broker::tcp_link::run(tcp_addr, args.max_clients, service);

    tokio::select! {
        res = tcp => res?,
        _ = persister => {},
        _ = rtu => {},
    }
    Ok(())
}
