use anyhow::Result;
use relay_server::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    let ax = relay_server::build(&config).await?;

    let addr = config.addr();
    tracing::info!("listening on http://{addr}");

    ax.listen(addr).await?;

    Ok(())
}
