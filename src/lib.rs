//! Publishing backend for a recipe and blog site.
//!
//! Entries are markdown files with YAML front matter under a content root,
//! one directory per kind and category. Images are transcoded to WebP and
//! stored under the public root, next to where the site serves them from.
//! The HTTP API in [`routes`] lists, searches, saves and deletes entries;
//! [`form`] models the admin editing form that feeds the save pipeline.

use std::sync::Arc;

use log::{error, info};
use tokio::{net::TcpListener, signal};

pub mod context;
pub mod error;
pub mod form;
pub mod frontmatter;
pub mod images;
pub mod metadata;
pub mod naming;
pub mod renderer;
pub mod routes;
pub mod save;
pub mod search;
pub mod store;

use context::Context;

/// Serve the API on `address` until ctrl-c or SIGTERM.
pub async fn start_server(ctx: Arc<Context>, address: &str) -> std::io::Result<()> {
    info!("Serving {:?}", ctx.site_name);
    info!(
        "Content in {}, images in {}",
        ctx.store.content_root().display(),
        ctx.store.public_root().display()
    );

    let app = routes::router(ctx);

    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
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
