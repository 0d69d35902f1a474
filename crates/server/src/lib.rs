//! HTTP surface for hearth price predictions.
//!
//! Serves a landing page, an HTML form that posts back to itself, and a JSON
//! API. The [`Predictor`] is built once before the server starts and shared
//! by every request.

mod error;
pub mod pages;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

pub use error::ServerError;
use hearth_predict::Predictor;

/// Serve `predictor` on `bind` until Ctrl+C.
pub async fn serve(predictor: Arc<Predictor>, bind: &str) -> Result<(), ServerError> {
    let addr: SocketAddr = bind.parse().map_err(|_| ServerError::bind(bind))?;

    let name = predictor.name().to_string();
    let state = Arc::new(routes::AppState { predictor });
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(ServerError::io)?;
    let local = listener.local_addr().map_err(ServerError::io)?;
    log::info!("serving '{name}' on http://{local}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::io)?;

    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
