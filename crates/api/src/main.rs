use anyhow::Context;

use stardust_infra::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stardust_observability::init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let bind_addr = config.bind_addr;

    let app = stardust_api::app::build_app(&config);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
