use dotenv::dotenv;
use quotation_backend::app::app::App;
use quotation_backend::config::app_conf::AppConfig;
use quotation_backend::util::logger::Logger;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file before anything reads them
    let dotenv_result = dotenv();
    let config = AppConfig::from_env();

    // Keep the guards alive for the lifetime of the process so file writers flush
    let _logger = match Logger::new(&config.log_dir) {
        Ok(logger) => Some(logger),
        Err(e) => {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .init();
            warn!("File logging unavailable ({}), logging to console only", e);
            None
        }
    };

    info!("🚀 Starting Quotation Backend");
    match dotenv_result {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let app = App::new(config).await;
    app.start().await;
}
