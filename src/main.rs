use std::error::Error;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use holiday_lens::{CachedHolidayProvider, Config, HolidayService, NagerProvider, Server, api};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "holiday API stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    info!(
        upstream = %config.upstream_url,
        max_cache_size = config.max_cache_size.get(),
        timeout = ?config.upstream_timeout,
        "configuration loaded"
    );

    let upstream = NagerProvider::new(&config.upstream_url, config.upstream_timeout)?;
    let cache = CachedHolidayProvider::with_capacity(upstream, config.max_cache_size);
    let service = Arc::new(HolidayService::new(cache));

    let server = Server::bind(&config.bind_addr).await?;
    server
        .serve(api::routes(service), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("holiday API shut down");
    Ok(())
}
