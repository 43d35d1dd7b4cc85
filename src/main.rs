use std::error::Error;

use energy_bill_service::config::ServiceConfig;
use energy_bill_service::logging::{self, Component, LogLevel};
use energy_bill_service::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = match ServiceConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // Logger is not initialised yet.
            eprintln!("   ✗ CONFIG: {}", e);
            return Err(e.into());
        }
    };

    let level = config.log_level().unwrap_or(LogLevel::Info);
    logging::init_logger(level, config.log_file.as_deref(), config.console_timestamps);
    logging::info(Component::Config, None, &format!("configuration from {}", config.origin));

    server::start(&config, server::shutdown_signal()).await?;
    logging::info(Component::System, None, "stopped");
    Ok(())
}
