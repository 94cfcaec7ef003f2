mod app;
mod catalog;
mod config;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::SiteConfig::from_env();
    logging::init(&config)?;
    app::run(config).await
}
