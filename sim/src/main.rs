use std::error::Error;

use sim::SimConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let config = SimConfig::from_env();
    tracing::info!(
        "Simulating {} motors, {} ms per mm",
        config.motor_count,
        config.step.as_millis()
    );
    sim::serve(config).await?;
    Ok(())
}
