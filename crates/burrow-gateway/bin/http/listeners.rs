use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use burrow_gateway::grpc;
use burrow_gateway::AppState;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;

use crate::cli::TlsPaths;

const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves once the shutdown flag flips.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

pub async fn serve_http(
    addr: SocketAddr,
    router: Router,
    tls: Option<&TlsPaths>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let Some(tls) = tls else {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %listener.local_addr()?, "starting http server");
        axum::serve(listener, app)
            .with_graceful_shutdown(stopped(shutdown))
            .await?;
        return Ok(());
    };

    let config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
        .await
        .with_context(|| format!("failed to load certificate {}", tls.cert.display()))?;

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            stopped(shutdown).await;
            handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        }
    });

    info!(listen_addr = %addr, "starting https server");
    axum_server::bind_rustls(addr, config)
        .handle(handle)
        .serve(app)
        .await?;
    Ok(())
}

pub async fn serve_grpc(
    addr: SocketAddr,
    state: AppState,
    tls: Option<&TlsPaths>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut builder = Server::builder();
    if let Some(tls) = tls {
        let cert = tokio::fs::read(&tls.cert)
            .await
            .with_context(|| format!("failed to read certificate {}", tls.cert.display()))?;
        let key = tokio::fs::read(&tls.key)
            .await
            .with_context(|| format!("failed to read key {}", tls.key.display()))?;
        builder = builder.tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))?;
    }

    info!(listen_addr = %addr, tls = tls.is_some(), "starting grpc server");
    builder
        .add_service(grpc::service(state))
        .serve_with_shutdown(addr, stopped(shutdown))
        .await?;
    Ok(())
}
