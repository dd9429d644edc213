use crate::service::BankService;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

/// Accepts Modbus/TCP sessions against `service`, refusing new connections
/// once `max_clients` are active — mirroring the original's fixed
/// `client_sockets[MAX_CLIENTS]` table, but counted rather than scanned.
pub async fn run(addr: SocketAddr, max_clients: usize, service: BankService) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, max_clients, "Modbus/TCP listener ready");

    let server = Server::new(listener);
    let active = Arc::new(AtomicUsize::new(0));

    let on_connected = move |stream, socket_addr: SocketAddr| {
        let service = service.clone();
        let active = active.clone();
        async move {
            if active.load(Ordering::SeqCst) >= max_clients {
                tracing::warn!(%socket_addr, "rejecting connection, at max-clients");
                return Ok(None);
            }
            active.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(%socket_addr, "client connected");
            accept_tcp_connection(stream, socket_addr, move |_addr| Ok(Some(service.clone())))
        }
    };
    let on_process_error = |e| tracing::warn!(error = %e, "Modbus/TCP session error");

    server.serve(&on_connected, on_process_error).await?;
    Ok(())
}
