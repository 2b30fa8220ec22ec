mod cli;
mod listeners;
mod telemetry;

use std::sync::Arc;

use burrow_core::Storage;
use burrow_deleter::{DeletionQueue, DeletionWorker, WorkerSettings, DEFAULT_CAPACITY};
use burrow_gateway::{App, AppState, TokenService};
use burrow_generator::RandomGenerator;
use burrow_storage::{FileStorage, InMemoryStorage, PostgresStorage};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cli::{Cli, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().resolve()?;
    telemetry::init(&config.log_level, config.log_json)?;
    if config.tls.is_some() {
        // Several dependencies pull in rustls; pin the provider once.
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    info!(
        server_address = %config.server_address,
        grpc_address = %config.grpc_address,
        https = config.tls.is_some(),
        base_url = %config.base_url,
        storage_backend = %config.backend,
        "starting gateway"
    );

    let storage: Arc<dyn Storage> = match &config.backend {
        StorageBackend::Memory => Arc::new(InMemoryStorage::new()),
        StorageBackend::File(path) => Arc::new(FileStorage::new(path)),
        StorageBackend::Postgres(dsn) => Arc::new(PostgresStorage::connect(dsn).await?),
    };
    storage.init().await?;

    let token_secret = config.token_secret.clone().unwrap_or_else(|| {
        warn!("token secret not configured, identities will not survive a restart");
        Uuid::new_v4().simple().to_string()
    });

    let (deletions, receiver) = DeletionQueue::channel(DEFAULT_CAPACITY);
    let worker =
        DeletionWorker::new(storage.clone(), receiver, WorkerSettings::default()).spawn();

    let state = AppState::builder()
        .storage(storage)
        .generator(Arc::new(RandomGenerator::new()))
        .deletions(deletions)
        .tokens(Arc::new(TokenService::new(&token_secret)))
        .base_url(config.base_url.clone())
        .trusted_subnet(config.trusted_subnet.clone())
        .build();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let served = tokio::try_join!(
        listeners::serve_http(
            config.server_address,
            App::router(state.clone()),
            config.tls.as_ref(),
            shutdown_rx.clone(),
        ),
        listeners::serve_grpc(
            config.grpc_address,
            state,
            config.tls.as_ref(),
            shutdown_rx,
        ),
    );
    if let Err(err) = &served {
        error!(error = %err, "listener failed, shutting down");
    }

    // Requests still queued are flushed before exit.
    worker.shutdown().await;
    info!("gateway stopped");

    served.map(|_| ())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
