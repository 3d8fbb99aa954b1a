use kniffel::{KniffelError, KniffelServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), KniffelError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;
    let server = KniffelServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "kniffel server listening");
    server.run().await
}
