use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use redis::aio::ConnectionManager;
use shortener_core::{ShortflakeGenerator, SystemClock};
use shortener_registry::WorkerIdLease;
use shortener_server::config::CliArgs;
use shortener_server::state::AppState;
use shortener_store::{MappingRepository, Publisher, RedirectCache};
use sqlx::postgres::PgPoolOptions;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse();

    // Startup order per §9: KV -> worker-ID -> generator -> publisher.
    let redis_client = redis::Client::open(args.redis_url.clone())?;
    let redis_conn = ConnectionManager::new(redis_client).await?;
    tracing::info!("connected to redis");

    let lease = WorkerIdLease::acquire(
        redis_conn.clone(),
        args.max_worker_id,
        args.worker_id_lease_ttl,
        args.worker_id_renewal_interval,
    )
    .await?;
    let worker_id = lease.worker_id();
    tracing::info!(worker_id, "acquired worker id lease");

    let generator = Arc::new(ShortflakeGenerator::new(worker_id, SystemClock)?);

    let publisher = Arc::new(
        Publisher::connect(&args.rabbitmq_url, &args.rabbitmq_exchange, &args.rabbitmq_queue).await,
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(args.db_max_connections())
        .acquire_timeout(args.db_pool_timeout())
        .max_lifetime(args.db_pool_recycle())
        .connect(&args.pg_dsn)
        .await?;
    tracing::info!("connected to postgres");

    let state = AppState {
        mappings: MappingRepository::new(pg_pool),
        cache: RedirectCache::new(redis_conn),
        generator,
        publisher,
        base_url: args.base_url.clone(),
    };

    let app = shortener_server::app(state);

    let addr: SocketAddr = args.server_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = serve => {
            result?;
            // Teardown in reverse order: publisher -> worker-id release -> kv
            // close. The publisher and connection manager have no explicit
            // close; only the lease needs an orderly release.
            lease.release().await;
            tracing::info!("shut down cleanly");
            Ok(())
        }
        reason = lease.wait_lease_lost() => {
            // Per the lease-lost policy: a running generator cannot have its
            // worker id hot-swapped safely, so this process exits rather
            // than continuing to mint IDs under a possibly-duplicated id.
            tracing::error!(worker_id, %reason, "worker id lease lost; exiting");
            std::process::exit(1);
        }
    }
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
