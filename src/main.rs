use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use titanic_dash::config::Config;
use titanic_dash::data::features::derive;
use titanic_dash::data::loader::load_source;
use titanic_dash::server::{DashboardContext, router};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let dataset = load_source(&config.train).records().map(|records| {
        let dataset = derive(records);
        info!("derived features for {} passengers", dataset.len());
        dataset
    });

    let ctx = Arc::new(DashboardContext::new(dataset, config.train, config.test));
    let app = router(ctx);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!("dashboard listening on http://{}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
