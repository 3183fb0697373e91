use anyhow::{Context, Result};
use otp_service_api::observability::init_telemetry;
use otp_service_core::AppConfig;

mod server;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors surface on stderr; the JSON subscriber is not up yet.
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let telemetry = init_telemetry(&config).context("failed to initialize telemetry")?;

    tracing::info!(
        service = %config.tracing.service_name,
        version = %config.tracing.service_version,
        mode = config.app.mode.as_str(),
        "Starting OTP service"
    );

    if let Err(e) = server::run(config, telemetry).await {
        tracing::error!(error = format!("{e:#}"), "OTP service stopped with error");
        return Err(e);
    }

    tracing::info!("OTP service stopped");
    Ok(())
}
