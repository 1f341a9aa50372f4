use std::net::SocketAddr;

use axum::Router;

/// Bind `app` on `bind_addr` and serve it until the process exits.
pub async fn serve(name: &'static str, bind_addr: &str, app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {name} bind address '{bind_addr}': {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(server = name, %addr, "listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Like [`serve`] but on a background task; failures are logged.
pub fn spawn(name: &'static str, bind_addr: &str, app: Router) -> anyhow::Result<()> {
    let bind_addr = bind_addr.to_string();
    let _: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {name} bind address '{bind_addr}': {e}"))?;

    tokio::spawn(async move {
        if let Err(e) = serve(name, &bind_addr, app).await {
            tracing::error!(server = name, error = %e, "server error");
        }
    });
    Ok(())
}
