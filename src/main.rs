//! Leadgate server binary.
//!
//! Loads configuration from the environment and runs the intake service
//! until SIGTERM or Ctrl+C.

use leadgate::IntakeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = IntakeConfig::load()?;
    leadgate::start_server(config).await?;
    Ok(())
}
