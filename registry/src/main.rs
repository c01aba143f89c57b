use anyhow::Context;
use sensor_registry::config::Config;
use sensor_registry::repository::SqliteSensorRepository;
use sensor_registry::{create_router, db, logging, metrics, seed};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.log_level, config.log_format) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!("Starting Sensor Registry");
    info!("Database: {}", config.database_path.display());
    info!("Seed data: {}", config.seed_data_path.display());

    metrics::init_metrics().context("Failed to register metrics")?;

    let pool = db::make_pool(&config.database_path)
        .await
        .context("Failed to connect to database")?;

    seed::seed_from_file(&pool, &config.seed_data_path)
        .await
        .context("Failed to seed database")?;

    let app = create_router(SqliteSensorRepository::new(pool.clone()), &config.api_token);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
