mod config;
mod consumer;
mod table;

use clap::Parser;
use clickhouse::Client as ClickHouseClient;

use config::CliArgs;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse();

    let ch_client = ClickHouseClient::default()
        .with_url(args.clickhouse_url())
        .with_database(&args.clickhouse_database)
        .with_user(&args.clickhouse_user)
        .with_password(&args.clickhouse_password);

    table::ensure_table(&ch_client).await?;
    tracing::info!(database = %args.clickhouse_database, "click_events table ensured");

    let (connection, channel) =
        consumer::connect(&args.rabbitmq_url, &args.rabbitmq_exchange, &args.rabbitmq_queue).await?;
    tracing::info!(queue = %args.rabbitmq_queue, "connected to rabbitmq; consuming");

    tokio::select! {
        result = consumer::run(channel, &args.rabbitmq_queue, ch_client) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received; stopping consumer");
        }
    }

    connection.close(0, "consumer shutting down").await?;
    tracing::info!("shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl+c"),
        () = terminate => tracing::info!("received sigterm"),
    }
}
