use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use crate::app::create_app;
use crate::configs::Settings;
use crate::errors::ServerError;
use crate::services::{EVENT_BUFFER, LineReader, Notifier, Pipeline, connector_from_settings};

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod services;
pub mod signals;

pub async fn run(settings: &Arc<Settings>) -> Result<(), ServerError> {
    let ip_addr = settings
        .server
        .host
        .parse::<IpAddr>()
        .map_err(|_| ServerError::InvalidAddress(settings.server.host.clone()))?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("listening on {:?}", address);

    serve(listener, settings, signals::shutdown_signal()).await
}

/// Start the pipeline and the line reader, then serve subscribers on
/// `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    settings: &Settings,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let notifier = Notifier::from_settings(settings)?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (stop_tx, stop_rx) = oneshot::channel();
    let pipeline = tokio::spawn(Pipeline::new(notifier).run(events_rx, stop_rx));

    let reader_stop = Arc::new(AtomicBool::new(false));
    match connector_from_settings(&settings.transport) {
        Some(connector) => {
            LineReader::new(connector, settings.transport.reconnect_delay())
                .spawn(events_tx.clone(), reader_stop.clone())?;
        }
        None => tracing::warn!("No transport configured, accepting readings from subscribers only"),
    }

    let app = create_app(events_tx);

    let stop_flag = reader_stop.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        stop_flag.store(true, Ordering::Relaxed);
        let _ = stop_tx.send(());
    })
    .await?;

    reader_stop.store(true, Ordering::Relaxed);
    if let Err(e) = pipeline.await {
        tracing::error!("Pipeline task failed: {}", e);
    }

    tracing::info!("Server stopped");
    Ok(())
}
