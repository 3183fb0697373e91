use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use otp_service_core::config::MongoConfig;

/// Build a client from the URI plus pool and timeout overrides, then ping `admin`.
pub async fn connect(config: &MongoConfig) -> Result<Client> {
    let mut options = ClientOptions::parse(&config.uri)
        .await
        .context("invalid MongoDB URI")?;
    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);
    options.heartbeat_freq = Some(config.heartbeat_interval);

    let client = Client::with_options(options).context("failed to build MongoDB client")?;
    health_check(&client).await?;

    tracing::info!(
        database = %config.database,
        collection = %config.collection,
        max_pool_size = config.max_pool_size,
        "MongoDB connection established"
    );

    Ok(client)
}

pub async fn health_check(client: &Client) -> Result<()> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .context("MongoDB ping failed")?;

    tracing::debug!("MongoDB health check passed");
    Ok(())
}
