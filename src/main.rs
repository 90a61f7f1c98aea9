use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use maintops_api::{
    app,
    clock::SystemClock,
    config::{init_tracing, load_config},
    db::{establish_connection_from_app_config, run_migrations},
    events::{process_events, EventSender},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("loading configuration")?;
    init_tracing(config.log_level(), config.log_json);

    let db = establish_connection_from_app_config(&config)
        .await
        .context("connecting to database")?;
    if config.auto_migrate {
        run_migrations(&db).await.context("running migrations")?;
    }

    let (tx, rx) = mpsc::channel(1024);
    tokio::spawn(process_events(rx));

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(
        Arc::new(db),
        config,
        Arc::new(SystemClock),
        EventSender::new(tx),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending().await,
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
