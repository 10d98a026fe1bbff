use anyhow::Context;

use crate::app::app;

pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let port = port
        .or_else(|| {
            std::env::var("REGISTRAR_API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("Registrar API server listening on http://{}", bind_addr);

    axum::serve(listener, app()).await.context("server")?;
    Ok(())
}
