use anyhow::Context;
use stock_advisor::app::App;
use stock_advisor::config::AdvisorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // .env is optional; a plain environment variable works the same way.
    dotenvy::dotenv().ok();

    let config = AdvisorConfig::from_env().context("Failed to load configuration")?;
    let mut app = App::new(config);
    app.run().await
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
