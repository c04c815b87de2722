use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use supply_ledger as ledger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = ledger::config::load_config().context("loading configuration")?;
    ledger::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB only for the database backend
    let db = if cfg.uses_database() {
        let pool = ledger::db::establish_connection_from_app_config(&cfg)
            .await
            .context("connecting to database")?;
        if cfg.auto_migrate {
            ledger::db::run_migrations(&pool).await.map_err(|e| {
                error!("Failed running migrations: {}", e);
                e
            })?;
        }
        Some(Arc::new(pool))
    } else {
        info!("Using in-memory storage; ledger contents are lost on restart");
        None
    };
    let repository = ledger::repositories::create_repository(&cfg, db)?;

    // Init events
    let (event_sender, event_rx) = ledger::events::EventSender::channel(cfg.event_channel_capacity);
    tokio::spawn(ledger::events::process_events(event_rx));

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    let state = ledger::AppState::new(cfg, repository, event_sender);
    let app = ledger::app(state)?;

    // Bind and serve
    info!("supply-ledger listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("supply-ledger stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
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
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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
}
