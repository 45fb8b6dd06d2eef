use stockroom_auth::StaticTokenAuth;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let tokens_spec = std::env::var("API_TOKENS").unwrap_or_else(|_| {
        tracing::warn!("API_TOKENS not set; no bearer token will be accepted");
        String::new()
    });
    let tokens = StaticTokenAuth::from_spec(&tokens_spec)?;

    let app = stockroom_api::app::build_app(tokens).await?;

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
