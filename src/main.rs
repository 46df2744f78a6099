use anyhow::{Context, Result};
use dotenv::dotenv;

use syccbot::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    // Load token, admin chat and grading service settings
    dotenv().ok();
    let config = config::Config::from_env()
        .context("Could not load configuration.")?;

    log::info!("Using database at {}", config.db_path.display());

    ccbot::run_bot(config).await
}
