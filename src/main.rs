//! nlq-service - natural-language to SQL over HTTP.

use nlq::cli::Cli;
use nlq::config::Config;
use nlq::error::NlqError;
use nlq::{app, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments use the environment.
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        match e.downcast_ref::<NlqError>() {
            Some(err) => error!("{}: {}", err.category(), err.detail()),
            None => error!("{e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_to(&mut config);

    app::run(config, cli.seed.clone()).await?;
    Ok(())
}
