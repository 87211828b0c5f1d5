use std::sync::Arc;

use prometrics::config::{load_config, print_schema};
use prometrics::startup;
use prometrics::utils::logger::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if std::env::args().nth(1).as_deref() == Some("--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing configuration schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    info!(
        service_name = config.logging.service_name.as_str(),
        service_version = config.logging.service_version.as_str(),
        "starting prometrics"
    );

    if let Err(e) = startup::run(config).await {
        error!("prometrics stopped with error: {}", e);
        std::process::exit(1);
    }
}
